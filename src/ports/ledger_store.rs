//! Ledger persistence port trait.

use crate::domain::error::TradelogError;
use crate::domain::ledger::LedgerTable;

/// Whole-table persistence for one account's ledger.
pub trait LedgerStore {
    /// Fails with [`TradelogError::NotFound`] when nothing was ever saved.
    fn load(&self) -> Result<LedgerTable, TradelogError>;

    /// Replace the stored table. Must be atomic: a failed save leaves the
    /// previous table readable.
    fn save(&self, table: &LedgerTable) -> Result<(), TradelogError>;
}
