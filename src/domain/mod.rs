//! Ledger domain types and logic.

pub mod error;
pub mod ledger;
pub mod settings;
pub mod valuation;
pub mod view;
