//! Backup and export port trait.

use crate::domain::error::TradelogError;
use crate::domain::ledger::LedgerTable;
use std::path::PathBuf;

/// Files written by one backup run.
#[derive(Debug, Clone, PartialEq)]
pub struct BackupReceipt {
    pub snapshot: PathBuf,
    pub export: PathBuf,
}

pub trait BackupPort {
    /// Write a dated snapshot copy of `table` plus a spreadsheet-style export.
    fn backup(&self, account: &str, table: &LedgerTable) -> Result<BackupReceipt, TradelogError>;
}
