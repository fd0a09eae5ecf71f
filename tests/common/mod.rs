#![allow(dead_code)]

use chrono::NaiveDate;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tradelog::domain::error::TradelogError;
use tradelog::domain::ledger::LedgerTable;
use tradelog::domain::settings::LedgerSettings;
use tradelog::ports::backup_port::{BackupPort, BackupReceipt};
use tradelog::ports::ledger_store::LedgerStore;
use tradelog::ports::quote_port::QuotePort;
use tradelog::session::Session;

/// In-memory ledger store; clones share the same table.
#[derive(Clone, Default)]
pub struct MockStore {
    pub table: Rc<RefCell<Option<LedgerTable>>>,
    pub saves: Rc<RefCell<usize>>,
}

impl LedgerStore for MockStore {
    fn load(&self) -> Result<LedgerTable, TradelogError> {
        self.table.borrow().clone().ok_or(TradelogError::NotFound {
            account: "mock".into(),
        })
    }

    fn save(&self, table: &LedgerTable) -> Result<(), TradelogError> {
        *self.table.borrow_mut() = Some(table.clone());
        *self.saves.borrow_mut() += 1;
        Ok(())
    }
}

/// Records the row count of every table it is asked to back up.
#[derive(Clone, Default)]
pub struct MockBackup {
    pub calls: Rc<RefCell<Vec<usize>>>,
}

impl BackupPort for MockBackup {
    fn backup(&self, account: &str, table: &LedgerTable) -> Result<BackupReceipt, TradelogError> {
        self.calls.borrow_mut().push(table.len());
        Ok(BackupReceipt {
            snapshot: format!("{account}.db").into(),
            export: format!("{account}.csv").into(),
        })
    }
}

pub struct MockQuotes {
    pub values: HashMap<String, f64>,
}

impl MockQuotes {
    pub fn new(pairs: &[(&str, f64)]) -> Self {
        Self {
            values: pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        }
    }
}

impl QuotePort for MockQuotes {
    fn current_values(&self) -> Result<HashMap<String, f64>, TradelogError> {
        Ok(self.values.clone())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn fixed_today() -> NaiveDate {
    date(2024, 6, 30)
}

pub fn values(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

/// Session over mock collaborators, with handles to inspect them.
pub fn mock_session() -> (Session, MockStore, MockBackup) {
    let store = MockStore::default();
    let backup = MockBackup::default();
    let session = Session::new(
        "ta",
        Box::new(store.clone()),
        Box::new(backup.clone()),
        LedgerSettings::default(),
    )
    .with_clock(fixed_today);
    (session, store, backup)
}
