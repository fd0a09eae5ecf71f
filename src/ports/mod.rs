//! Port traits implemented by adapters.

pub mod account_registry;
pub mod backup_port;
pub mod config_port;
pub mod ledger_store;
pub mod quote_port;
