//! tradelog: personal trading account logbook.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`], and the [`session`] that ties an
//! account's store to the ledger operations.

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod session;
pub mod logging;
pub mod cli;
