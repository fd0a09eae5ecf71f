//! Dated snapshot and CSV export of a ledger.

use crate::adapters::csv_adapter::write_view_csv;
use crate::adapters::sqlite_adapter::SqliteLedgerStore;
use crate::domain::error::TradelogError;
use crate::domain::ledger::LedgerTable;
use crate::domain::view::{View, ViewOptions};
use crate::ports::backup_port::{BackupPort, BackupReceipt};
use crate::ports::ledger_store::LedgerStore;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

pub struct FileBackupAdapter {
    dir: PathBuf,
    today: fn() -> NaiveDate,
}

fn local_today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

impl FileBackupAdapter {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            today: local_today,
        }
    }

    /// Adapter stamping files with a fixed date.
    pub fn with_clock(dir: PathBuf, today: fn() -> NaiveDate) -> Self {
        Self { dir, today }
    }

    fn stem(&self, account: &str) -> String {
        format!("{}_{}", account, (self.today)().format("%y-%m-%d"))
    }
}

impl BackupPort for FileBackupAdapter {
    fn backup(&self, account: &str, table: &LedgerTable) -> Result<BackupReceipt, TradelogError> {
        if !self.dir.is_dir() {
            fs::create_dir_all(&self.dir)?;
            tracing::info!(dir = %self.dir.display(), "created folder for backups");
        }

        let stem = self.stem(account);
        let snapshot = self.dir.join(format!("{stem}.db"));
        let export = self.dir.join(format!("{stem}.csv"));

        SqliteLedgerStore::open(&snapshot)?.save(table)?;
        write_view_csv(&View::project(table, &ViewOptions::backup_export()), &export)?;

        tracing::info!(
            account,
            snapshot = %snapshot.display(),
            export = %export.display(),
            "backed up ledger"
        );
        Ok(BackupReceipt { snapshot, export })
    }
}
