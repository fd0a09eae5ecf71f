//! Account session: the active ledger store plus the operations on it.
//!
//! Every mutating call is one load / modify / append / save cycle against the
//! session's store. Rejected operations (buying an open holding, selling one
//! that is not open) are logged as notices and leave the store untouched.

use chrono::NaiveDate;
use std::collections::HashMap;

use crate::adapters::backup_adapter::FileBackupAdapter;
use crate::adapters::sqlite_adapter::SqliteLedgerStore;
use crate::domain::error::{LedgerError, TradelogError};
use crate::domain::ledger::{LedgerRow, LedgerTable, TotalValuePoint, UpdateSummary};
use crate::domain::settings::LedgerSettings;
use crate::domain::view::{View, ViewOptions};
use crate::ports::account_registry::AccountRegistry;
use crate::ports::backup_port::{BackupPort, BackupReceipt};
use crate::ports::ledger_store::LedgerStore;
use crate::ports::quote_port::QuotePort;

pub struct Session {
    account: String,
    store: Box<dyn LedgerStore>,
    backup: Box<dyn BackupPort>,
    settings: LedgerSettings,
    today: fn() -> NaiveDate,
}

fn local_today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

fn require_finite(what: &str, value: f64) -> Result<(), TradelogError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(TradelogError::InvalidInput {
            reason: format!("{what} must be a finite number, got {value}"),
        })
    }
}

fn require_name(name: &str) -> Result<(), TradelogError> {
    if name.trim().is_empty() {
        return Err(TradelogError::InvalidInput {
            reason: "holding name must not be empty".to_string(),
        });
    }
    Ok(())
}

impl Session {
    pub fn new(
        account: impl Into<String>,
        store: Box<dyn LedgerStore>,
        backup: Box<dyn BackupPort>,
        settings: LedgerSettings,
    ) -> Self {
        Session {
            account: account.into(),
            store,
            backup,
            settings,
            today: local_today,
        }
    }

    /// Date used when a caller does not supply one.
    pub fn with_clock(mut self, today: fn() -> NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Session for the registry's current account, stored under the
    /// configured data directory.
    pub fn open(settings: LedgerSettings, registry: &dyn AccountRegistry) -> Result<Self, TradelogError> {
        let account = registry.current_account_name()?;
        let store = SqliteLedgerStore::for_account(&settings.data_dir, &account)?;
        let backup = FileBackupAdapter::new(settings.backup_dir.clone());
        Ok(Self::new(account, Box::new(store), Box::new(backup), settings))
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn settings(&self) -> &LedgerSettings {
        &self.settings
    }

    pub fn load(&self) -> Result<LedgerTable, TradelogError> {
        self.store.load()
    }

    /// Whether this account has a ledger yet.
    pub fn is_initialized(&self) -> Result<bool, TradelogError> {
        match self.store.load() {
            Ok(_) => Ok(true),
            Err(TradelogError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn resolve(&self, date: Option<NaiveDate>) -> NaiveDate {
        date.unwrap_or_else(self.today)
    }

    fn commit<T>(
        &self,
        mut table: LedgerTable,
        action: impl FnOnce(&mut LedgerTable) -> Result<T, LedgerError>,
    ) -> Result<T, TradelogError> {
        match action(&mut table) {
            Ok(out) => {
                self.store.save(&table)?;
                Ok(out)
            }
            Err(e) => {
                if e.is_notice() {
                    tracing::warn!(account = %self.account, "{e}");
                }
                Err(e.into())
            }
        }
    }

    fn apply<T>(
        &self,
        action: impl FnOnce(&mut LedgerTable) -> Result<T, LedgerError>,
    ) -> Result<T, TradelogError> {
        let table = self.store.load()?;
        self.commit(table, action)
    }

    /// Deposit or withdraw cash. The first call on an account creates its
    /// ledger.
    pub fn record_cash_flow(
        &self,
        amount: f64,
        date: Option<NaiveDate>,
        comment: Option<&str>,
    ) -> Result<(), TradelogError> {
        require_finite("amount", amount)?;
        let date = self.resolve(date);
        let table = match self.store.load() {
            Ok(table) => table,
            Err(TradelogError::NotFound { .. }) => {
                tracing::info!(account = %self.account, "no ledger found, created a new one");
                LedgerTable::new()
            }
            Err(e) => return Err(e),
        };
        self.commit(table, |t| {
            t.record_cash_flow(amount, date, comment);
            Ok(())
        })?;
        tracing::info!(account = %self.account, amount, %date, "recorded cash flow");
        Ok(())
    }

    pub fn buy(&self, name: &str, value: f64, fee: f64, date: Option<NaiveDate>) -> Result<(), TradelogError> {
        require_name(name)?;
        require_finite("value", value)?;
        require_finite("fee", fee)?;
        if value <= 0.0 {
            return Err(TradelogError::InvalidInput {
                reason: format!("purchase value must be positive, got {value}"),
            });
        }
        let date = self.resolve(date);
        self.apply(|t| t.buy(name, value, fee, date))?;
        tracing::info!(account = %self.account, holding = name, value, fee, %date, "bought holding");
        Ok(())
    }

    pub fn update_valuations(
        &self,
        values: &HashMap<String, f64>,
        date: Option<NaiveDate>,
    ) -> Result<UpdateSummary, TradelogError> {
        for (name, value) in values {
            require_finite(&format!("value for {name}"), *value)?;
            if *value <= 0.0 {
                return Err(TradelogError::InvalidInput {
                    reason: format!("value for {name} must be positive, sell the holding to close it"),
                });
            }
        }
        let date = self.resolve(date);
        let fee = self.settings.standard_fee;
        let summary = self.apply(|t| t.update_valuations(values, date, fee))?;
        for name in &summary.ignored {
            tracing::warn!(account = %self.account, holding = %name, "not an open holding, value ignored");
        }
        tracing::info!(account = %self.account, updated = summary.updated.len(), %date, "updated valuations");
        Ok(summary)
    }

    /// Update from whatever the market-data collaborator currently reports.
    pub fn update_from_quotes(
        &self,
        quotes: &dyn QuotePort,
        date: Option<NaiveDate>,
    ) -> Result<UpdateSummary, TradelogError> {
        let values = quotes.current_values()?;
        self.update_valuations(&values, date)
    }

    pub fn record_dividend(&self, name: &str, amount: f64, date: Option<NaiveDate>) -> Result<(), TradelogError> {
        require_finite("amount", amount)?;
        if amount < 0.0 {
            return Err(TradelogError::InvalidInput {
                reason: format!("dividend amount must not be negative, got {amount}"),
            });
        }
        let date = self.resolve(date);
        let fee = self.settings.standard_fee;
        self.apply(|t| t.record_dividend(name, amount, date, fee))?;
        tracing::info!(account = %self.account, holding = name, amount, %date, "recorded dividend");
        Ok(())
    }

    /// Close `name`, returning the realized annualized return in percent.
    pub fn sell(&self, name: &str, amount: f64, date: Option<NaiveDate>) -> Result<Option<f64>, TradelogError> {
        require_finite("amount", amount)?;
        let date = self.resolve(date);
        let realized = self.apply(|t| t.sell(name, amount, date))?;
        tracing::info!(account = %self.account, holding = name, amount, %date, realized_pct = ?realized, "sold holding");
        Ok(realized)
    }

    /// Back up the ledger, then remove its last row. Nothing else is rolled
    /// back: cash or holdings touched by that row stay as the earlier rows
    /// describe them.
    pub fn drop_last_row(&self) -> Result<LedgerRow, TradelogError> {
        let mut table = self.store.load()?;
        if table.is_empty() {
            return Err(LedgerError::NotInitialized.into());
        }
        let receipt = self.backup.backup(&self.account, &table)?;
        let dropped = table.drop_last_row()?;
        self.store.save(&table)?;
        tracing::warn!(
            account = %self.account,
            comment = %dropped.comment,
            backup = %receipt.snapshot.display(),
            "backed up ledger and deleted last row; reconcile any other changes manually"
        );
        Ok(dropped)
    }

    pub fn backup(&self) -> Result<BackupReceipt, TradelogError> {
        let table = self.store.load()?;
        self.backup.backup(&self.account, &table)
    }

    pub fn total_value(&self) -> Result<Vec<TotalValuePoint>, TradelogError> {
        Ok(self.store.load()?.total_value(self.settings.standard_fee))
    }

    pub fn view(&self, options: &ViewOptions) -> Result<View, TradelogError> {
        Ok(View::project(&self.store.load()?, options))
    }

    /// Holding names, all columns or only the open ones.
    pub fn holdings(&self, include_closed: bool) -> Result<Vec<String>, TradelogError> {
        let table = self.store.load()?;
        let names = if include_closed {
            table.all_holdings()
        } else {
            table.active_holdings()
        };
        Ok(names.into_iter().map(str::to_string).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::valuation::CLOSED;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct MemoryStore {
        table: Rc<RefCell<Option<LedgerTable>>>,
        saves: Rc<RefCell<usize>>,
    }

    impl LedgerStore for MemoryStore {
        fn load(&self) -> Result<LedgerTable, TradelogError> {
            self.table.borrow().clone().ok_or(TradelogError::NotFound {
                account: "test".into(),
            })
        }

        fn save(&self, table: &LedgerTable) -> Result<(), TradelogError> {
            *self.table.borrow_mut() = Some(table.clone());
            *self.saves.borrow_mut() += 1;
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingBackup {
        calls: Rc<RefCell<Vec<usize>>>,
    }

    impl BackupPort for CountingBackup {
        fn backup(&self, _account: &str, table: &LedgerTable) -> Result<BackupReceipt, TradelogError> {
            self.calls.borrow_mut().push(table.len());
            Ok(BackupReceipt {
                snapshot: "snap.db".into(),
                export: "snap.csv".into(),
            })
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    fn session() -> (Session, Rc<RefCell<usize>>, Rc<RefCell<Vec<usize>>>) {
        let store = MemoryStore::default();
        let saves = store.saves.clone();
        let backup = CountingBackup::default();
        let calls = backup.calls.clone();
        let session = Session::new(
            "test",
            Box::new(store),
            Box::new(backup),
            LedgerSettings::default(),
        )
        .with_clock(today);
        (session, saves, calls)
    }

    #[test]
    fn first_deposit_creates_ledger() {
        let (session, saves, _) = session();
        assert!(!session.is_initialized().unwrap());
        session.record_cash_flow(1000.0, None, Some("ignored")).unwrap();

        let table = session.load().unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.last().unwrap().date, today());
        assert_eq!(table.last().unwrap().comment, "Opening deposit");
        assert_eq!(*saves.borrow(), 1);
        assert!(session.is_initialized().unwrap());
    }

    #[test]
    fn buy_before_deposit_is_not_found() {
        let (session, saves, _) = session();
        let err = session.buy("ABC", 100.0, 1.0, None).unwrap_err();
        assert!(matches!(err, TradelogError::NotFound { .. }));
        assert_eq!(*saves.borrow(), 0);
    }

    #[test]
    fn notice_does_not_save() {
        let (session, saves, _) = session();
        session.record_cash_flow(1000.0, None, None).unwrap();
        session.buy("ABC", 100.0, 1.0, None).unwrap();
        let err = session.buy("ABC", 100.0, 1.0, None).unwrap_err();

        assert!(err.is_notice());
        assert_eq!(*saves.borrow(), 2);
        assert_eq!(session.load().unwrap().len(), 2);
    }

    #[test]
    fn invalid_inputs_are_rejected_before_loading() {
        let (session, _, _) = session();
        session.record_cash_flow(1000.0, None, None).unwrap();
        assert!(matches!(
            session.buy("ABC", 0.0, 1.0, None),
            Err(TradelogError::InvalidInput { .. })
        ));
        assert!(matches!(
            session.buy(" ", 10.0, 1.0, None),
            Err(TradelogError::InvalidInput { .. })
        ));
        assert!(matches!(
            session.record_cash_flow(f64::NAN, None, None),
            Err(TradelogError::InvalidInput { .. })
        ));
        let values = HashMap::from([("ABC".to_string(), f64::INFINITY)]);
        assert!(matches!(
            session.update_valuations(&values, None),
            Err(TradelogError::InvalidInput { .. })
        ));
        let values = HashMap::from([("ABC".to_string(), 0.0)]);
        assert!(matches!(
            session.update_valuations(&values, None),
            Err(TradelogError::InvalidInput { .. })
        ));
        assert_eq!(session.load().unwrap().len(), 1);
    }

    #[test]
    fn sell_reports_realized_return() {
        let (session, _, _) = session();
        let start = NaiveDate::from_ymd_opt(2023, 5, 2).unwrap();
        session.record_cash_flow(1000.0, Some(start), None).unwrap();
        session.buy("ABC", 100.0, 1.0, Some(start)).unwrap();
        let realized = session.sell("ABC", 200.0, None).unwrap().unwrap();

        assert!((realized - (200.0_f64 / 101.0).ln() * 100.0).abs() < 1e-9);
        let table = session.load().unwrap();
        assert_eq!(table.last().unwrap().holding("ABC"), Some(&CLOSED));
        assert_eq!(table.account_balance(), Some(1099.0));
    }

    #[test]
    fn drop_last_row_backs_up_first() {
        let (session, _, calls) = session();
        session.record_cash_flow(1000.0, None, None).unwrap();
        session.buy("ABC", 100.0, 1.0, None).unwrap();

        let dropped = session.drop_last_row().unwrap();
        assert_eq!(dropped.comment, "Buy ABC");
        assert_eq!(*calls.borrow(), vec![2]);
        assert_eq!(session.load().unwrap().len(), 1);
    }

    #[test]
    fn drop_last_row_on_empty_ledger_skips_backup() {
        let (session, saves, calls) = session();
        session.record_cash_flow(1000.0, None, None).unwrap();
        session.drop_last_row().unwrap();
        let saves_before = *saves.borrow();

        let err = session.drop_last_row().unwrap_err();
        assert!(matches!(err, TradelogError::Ledger(LedgerError::NotInitialized)));
        assert_eq!(*calls.borrow(), vec![1]);
        assert_eq!(*saves.borrow(), saves_before);
    }

    #[test]
    fn holdings_lists_active_or_all() {
        let (session, _, _) = session();
        session.record_cash_flow(1000.0, None, None).unwrap();
        session.buy("ABC", 100.0, 1.0, None).unwrap();
        session.buy("XYZ", 100.0, 1.0, None).unwrap();
        session.sell("ABC", 90.0, None).unwrap();

        assert_eq!(session.holdings(false).unwrap(), vec!["XYZ"]);
        assert_eq!(session.holdings(true).unwrap(), vec!["ABC", "XYZ"]);
    }

    #[test]
    fn total_value_uses_configured_fee() {
        let store = MemoryStore::default();
        let settings = LedgerSettings {
            standard_fee: 5.0,
            ..LedgerSettings::default()
        };
        let session = Session::new("t", Box::new(store), Box::new(CountingBackup::default()), settings)
            .with_clock(today);
        session.record_cash_flow(621.0, None, None).unwrap();
        session.buy("ABC", 120.0, 1.0, None).unwrap();

        let totals = session.total_value().unwrap();
        assert_eq!(totals.last().unwrap().total, 500.0 + 120.0 - 5.0);
    }
}
