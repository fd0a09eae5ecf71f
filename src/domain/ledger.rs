//! Append-only ledger table.
//!
//! Every mutation copies the last row forward, applies its delta and pushes
//! the result, so row `i` is always derived from row `i - 1`. Holding columns
//! are only ever added; a closed position keeps its column, filled with
//! [`CLOSED`].

use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};

use super::error::LedgerError;
use super::valuation::{HoldingValuation, CLOSED};

pub const OPENING_DEPOSIT: &str = "Opening deposit";

#[derive(Debug, Clone, PartialEq)]
pub struct LedgerRow {
    pub date: NaiveDate,
    pub account_balance: f64,
    pub comment: String,
    pub holdings: BTreeMap<String, HoldingValuation>,
}

impl LedgerRow {
    pub fn holding(&self, name: &str) -> Option<&HoldingValuation> {
        self.holdings.get(name)
    }

    pub fn is_open(&self, name: &str) -> bool {
        self.holding(name).is_some_and(|h| h.is_open())
    }

    pub fn open_count(&self) -> usize {
        self.holdings.values().filter(|h| h.is_open()).count()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TotalValuePoint {
    pub date: NaiveDate,
    pub total: f64,
}

/// What [`LedgerTable::update_valuations`] did with the supplied values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UpdateSummary {
    pub updated: Vec<String>,
    /// Names in the value map that are not open holdings.
    pub ignored: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LedgerTable {
    columns: Vec<String>,
    rows: Vec<LedgerRow>,
}

impl LedgerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a table from stored rows. Cells missing from a row are filled
    /// with the closed sentinel, and names found in rows but not in
    /// `columns` are appended to the column list.
    pub fn from_rows(columns: Vec<String>, mut rows: Vec<LedgerRow>) -> Self {
        let mut columns = columns;
        for row in &rows {
            for name in row.holdings.keys() {
                if !columns.contains(name) {
                    columns.push(name.clone());
                }
            }
        }
        for row in &mut rows {
            for name in &columns {
                row.holdings.entry(name.clone()).or_insert(CLOSED);
            }
        }
        LedgerTable { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[LedgerRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn last(&self) -> Option<&LedgerRow> {
        self.rows.last()
    }

    pub fn account_balance(&self) -> Option<f64> {
        self.last().map(|r| r.account_balance)
    }

    /// Every holding name ever bought, in the order it was introduced.
    pub fn all_holdings(&self) -> Vec<&str> {
        self.columns.iter().map(String::as_str).collect()
    }

    /// Holdings open in the most recent row.
    pub fn active_holdings(&self) -> Vec<&str> {
        match self.last() {
            Some(row) => self
                .columns
                .iter()
                .filter(|name| row.is_open(name))
                .map(String::as_str)
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn is_open(&self, name: &str) -> bool {
        self.last().is_some_and(|row| row.is_open(name))
    }

    fn push_derived(&mut self, date: NaiveDate, comment: String) -> Result<&mut LedgerRow, LedgerError> {
        let mut next = self.last().cloned().ok_or(LedgerError::NotInitialized)?;
        next.date = date;
        next.comment = comment;
        self.rows.push(next);
        self.rows.last_mut().ok_or(LedgerError::NotInitialized)
    }

    /// Deposit (positive) or withdraw (negative) cash. On an empty table this
    /// creates the opening row and the caller's comment is ignored.
    pub fn record_cash_flow(&mut self, amount: f64, date: NaiveDate, comment: Option<&str>) {
        let Some(last) = self.rows.last() else {
            self.rows.push(LedgerRow {
                date,
                account_balance: amount,
                comment: OPENING_DEPOSIT.to_string(),
                holdings: self.columns.iter().map(|c| (c.clone(), CLOSED)).collect(),
            });
            return;
        };
        let mut next = last.clone();
        next.date = date;
        next.comment = match comment {
            Some(c) => c.to_string(),
            None if amount < 0.0 => "Withdrawal".to_string(),
            None => "Deposit".to_string(),
        };
        next.account_balance += amount;
        self.rows.push(next);
    }

    pub fn buy(&mut self, name: &str, value: f64, fee: f64, date: NaiveDate) -> Result<(), LedgerError> {
        if self.is_empty() {
            return Err(LedgerError::NotInitialized);
        }
        if self.is_open(name) {
            return Err(LedgerError::HoldingAlreadyOpen(name.to_string()));
        }
        if !self.columns.iter().any(|c| c == name) {
            self.columns.push(name.to_string());
            for row in &mut self.rows {
                row.holdings.insert(name.to_string(), CLOSED);
            }
        }
        let row = self.push_derived(date, format!("Buy {name}"))?;
        row.account_balance -= value + fee;
        row.holdings
            .insert(name.to_string(), HoldingValuation::open(value, fee, date));
        Ok(())
    }

    /// Re-mark every open holding as of `date`. Holdings missing from `values`
    /// keep their current value but still get a fresh annualized return.
    /// A value at or below zero for an open holding is rejected; selling is
    /// what closes a position.
    pub fn update_valuations(
        &mut self,
        values: &HashMap<String, f64>,
        date: NaiveDate,
        standard_fee: f64,
    ) -> Result<UpdateSummary, LedgerError> {
        let active: Vec<String> = self
            .active_holdings()
            .into_iter()
            .map(str::to_string)
            .collect();
        let mut ignored: Vec<String> = values
            .keys()
            .filter(|name| !active.contains(name))
            .cloned()
            .collect();
        ignored.sort();

        for name in &active {
            if let Some(&value) = values.get(name) {
                if value <= 0.0 {
                    return Err(LedgerError::NonPositiveValue {
                        holding: name.clone(),
                        value,
                    });
                }
            }
        }

        let row = self.push_derived(date, "Update".to_string())?;
        for name in &active {
            if let Some(cell) = row.holdings.get_mut(name) {
                let value = values.get(name).copied().unwrap_or(cell.current_value());
                *cell = cell.with_update(Some(value), None, date, standard_fee);
            }
        }
        Ok(UpdateSummary {
            updated: active,
            ignored,
        })
    }

    pub fn record_dividend(
        &mut self,
        name: &str,
        amount: f64,
        date: NaiveDate,
        standard_fee: f64,
    ) -> Result<(), LedgerError> {
        if self.is_empty() {
            return Err(LedgerError::NotInitialized);
        }
        if !self.is_open(name) {
            return Err(LedgerError::HoldingNotOpen(name.to_string()));
        }
        if amount < 0.0 {
            return Err(LedgerError::NegativeDividend {
                holding: name.to_string(),
                amount,
            });
        }
        let row = self.push_derived(date, format!("Dividend {name}"))?;
        row.account_balance += amount;
        if let Some(cell) = row.holdings.get_mut(name) {
            *cell = cell.with_update(None, Some(amount), date, standard_fee);
        }
        Ok(())
    }

    /// Close a position for `amount` credited to the account. Returns the
    /// realized annualized return in percent, undefined when the position was
    /// opened on the sale date.
    pub fn sell(&mut self, name: &str, amount: f64, date: NaiveDate) -> Result<Option<f64>, LedgerError> {
        if self.is_empty() {
            return Err(LedgerError::NotInitialized);
        }
        if !self.is_open(name) {
            return Err(LedgerError::HoldingNotOpen(name.to_string()));
        }
        let row = self.push_derived(date, format!("Sell {name}"))?;
        row.account_balance += amount;
        let realized = row
            .holdings
            .insert(name.to_string(), CLOSED)
            .and_then(|held| held.realized_return_pct(amount, date));
        Ok(realized)
    }

    /// Remove the most recent row. Columns introduced by that row stay.
    pub fn drop_last_row(&mut self) -> Result<LedgerRow, LedgerError> {
        self.rows.pop().ok_or(LedgerError::NotInitialized)
    }

    /// Account value per row, net of the fee it would take to unwind every
    /// open position.
    pub fn total_value(&self, standard_fee: f64) -> Vec<TotalValuePoint> {
        self.rows
            .iter()
            .map(|row| {
                let open: Vec<&HoldingValuation> =
                    row.holdings.values().filter(|h| h.is_open()).collect();
                let holdings: f64 = open.iter().map(|h| h.current_value()).sum();
                TotalValuePoint {
                    date: row.date,
                    total: row.account_balance + holdings - open.len() as f64 * standard_fee,
                }
            })
            .collect()
    }
}
