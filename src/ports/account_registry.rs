//! Account name registry port trait.

use crate::domain::error::TradelogError;

pub const DEFAULT_ACCOUNT: &str = "ta";

/// Ordered set of account names, most recently used first.
pub trait AccountRegistry {
    fn current_account_name(&self) -> Result<String, TradelogError>;

    /// Make `name` the current account, creating it if unknown. Returns all
    /// names with `name` first.
    fn switch_or_create(&self, name: &str) -> Result<Vec<String>, TradelogError>;

    fn account_names(&self) -> Result<Vec<String>, TradelogError>;
}
