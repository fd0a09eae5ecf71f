//! Concrete adapter implementations for ports.

pub mod account_registry_adapter;
pub mod backup_adapter;
pub mod csv_adapter;
pub mod file_config_adapter;
pub mod sqlite_adapter;
