//! SQLite ledger store.
//!
//! One database file per account. A save rewrites the whole table inside a
//! single transaction, so readers only ever see a complete ledger.

use crate::domain::error::TradelogError;
use crate::domain::ledger::{LedgerRow, LedgerTable};
use crate::domain::valuation::HoldingValuation;
use crate::ports::ledger_store::LedgerStore;
use chrono::NaiveDate;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const SCHEMA_VERSION: i64 = 1;
const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct SqliteLedgerStore {
    pool: Pool<SqliteConnectionManager>,
    path: Option<PathBuf>,
    label: String,
}

fn pool_error(e: r2d2::Error) -> TradelogError {
    TradelogError::Database {
        reason: e.to_string(),
    }
}

fn query_error(e: rusqlite::Error) -> TradelogError {
    TradelogError::DatabaseQuery {
        reason: e.to_string(),
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, rusqlite::Error> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            raw.len(),
            rusqlite::types::Type::Text,
            Box::new(e),
        )
    })
}

impl SqliteLedgerStore {
    /// Store backed by the file at `path`. The file is only created on the
    /// first save.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, TradelogError> {
        let path = path.as_ref().to_path_buf();
        let manager = SqliteConnectionManager::file(&path);
        let pool = Pool::builder()
            .max_size(1)
            .min_idle(Some(0))
            .build(manager)
            .map_err(pool_error)?;

        let label = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self {
            pool,
            path: Some(path),
            label,
        })
    }

    /// Store for `account` inside `data_dir`.
    pub fn for_account<P: AsRef<Path>>(data_dir: P, account: &str) -> Result<Self, TradelogError> {
        Self::open(Self::account_path(data_dir, account))
    }

    pub fn account_path<P: AsRef<Path>>(data_dir: P, account: &str) -> PathBuf {
        data_dir.as_ref().join(format!("{account}.db"))
    }

    pub fn in_memory() -> Result<Self, TradelogError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(pool_error)?;

        Ok(Self {
            pool,
            path: None,
            label: "memory".to_string(),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn connection(&self) -> Result<PooledConnection<SqliteConnectionManager>, TradelogError> {
        self.pool.get().map_err(pool_error)
    }

    pub fn initialize_schema(&self) -> Result<(), TradelogError> {
        let conn = self.connection()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS ledger_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS ledger_columns (
                position INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE
            );
            CREATE TABLE IF NOT EXISTS ledger_rows (
                row_index INTEGER PRIMARY KEY,
                date TEXT NOT NULL,
                account_balance REAL NOT NULL,
                comment TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS ledger_cells (
                row_index INTEGER NOT NULL,
                holding TEXT NOT NULL,
                purchase_price REAL NOT NULL,
                purchase_date TEXT,
                current_value REAL NOT NULL,
                dividends REAL NOT NULL,
                annualized_return REAL,
                PRIMARY KEY (row_index, holding)
            );",
        )
        .map_err(query_error)?;
        Ok(())
    }

    fn schema_version(&self) -> Result<Option<i64>, TradelogError> {
        let conn = self.connection()?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT value FROM ledger_meta WHERE key = 'schema_version'",
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(query_error)?;
        raw.map(|v| {
            v.parse::<i64>().map_err(|e| TradelogError::Database {
                reason: format!("corrupt schema_version '{v}': {e}"),
            })
        })
        .transpose()
    }

    fn load_columns(&self) -> Result<Vec<String>, TradelogError> {
        let conn = self.connection()?;
        let mut stmt = conn
            .prepare("SELECT name FROM ledger_columns ORDER BY position ASC")
            .map_err(query_error)?;
        let names = stmt
            .query_map([], |row| row.get(0))
            .map_err(query_error)?
            .collect::<Result<Vec<String>, _>>()
            .map_err(query_error)?;
        Ok(names)
    }

    fn load_cells(&self) -> Result<BTreeMap<i64, BTreeMap<String, HoldingValuation>>, TradelogError> {
        let conn = self.connection()?;
        let mut stmt = conn
            .prepare(
                "SELECT row_index, holding, purchase_price, purchase_date,
                        current_value, dividends, annualized_return
                 FROM ledger_cells",
            )
            .map_err(query_error)?;

        let cells = stmt
            .query_map([], |row| {
                let purchase_date: Option<String> = row.get(3)?;
                let purchase_date = purchase_date.as_deref().map(parse_date).transpose()?;
                let valuation = HoldingValuation::from_parts(
                    row.get(2)?,
                    purchase_date,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                );
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?, valuation))
            })
            .map_err(query_error)?;

        let mut by_row: BTreeMap<i64, BTreeMap<String, HoldingValuation>> = BTreeMap::new();
        for cell in cells {
            let (row_index, holding, valuation) = cell.map_err(query_error)?;
            by_row.entry(row_index).or_default().insert(holding, valuation);
        }
        Ok(by_row)
    }
}

impl LedgerStore for SqliteLedgerStore {
    fn load(&self) -> Result<LedgerTable, TradelogError> {
        if let Some(path) = &self.path {
            if !path.exists() {
                return Err(TradelogError::NotFound {
                    account: self.label.clone(),
                });
            }
        }
        self.initialize_schema()?;

        match self.schema_version()? {
            None => {
                return Err(TradelogError::NotFound {
                    account: self.label.clone(),
                });
            }
            Some(v) if v > SCHEMA_VERSION => {
                return Err(TradelogError::Database {
                    reason: format!(
                        "ledger schema version {v} is newer than supported version {SCHEMA_VERSION}"
                    ),
                });
            }
            Some(_) => {}
        }

        let columns = self.load_columns()?;
        let mut cells = self.load_cells()?;

        let conn = self.connection()?;
        let mut stmt = conn
            .prepare(
                "SELECT row_index, date, account_balance, comment
                 FROM ledger_rows ORDER BY row_index ASC",
            )
            .map_err(query_error)?;
        let headers = stmt
            .query_map([], |row| {
                let date: String = row.get(1)?;
                Ok((
                    row.get::<_, i64>(0)?,
                    parse_date(&date)?,
                    row.get::<_, f64>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })
            .map_err(query_error)?;

        let mut rows = Vec::new();
        for header in headers {
            let (row_index, date, account_balance, comment) = header.map_err(query_error)?;
            rows.push(LedgerRow {
                date,
                account_balance,
                comment,
                holdings: cells.remove(&row_index).unwrap_or_default(),
            });
        }

        tracing::debug!(account = %self.label, rows = rows.len(), "loaded ledger");
        Ok(LedgerTable::from_rows(columns, rows))
    }

    fn save(&self, table: &LedgerTable) -> Result<(), TradelogError> {
        if let Some(dir) = self.path.as_deref().and_then(Path::parent) {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }
        self.initialize_schema()?;

        let mut conn = self.connection()?;
        let tx = conn.transaction().map_err(query_error)?;

        tx.execute_batch(
            "DELETE FROM ledger_cells;
             DELETE FROM ledger_rows;
             DELETE FROM ledger_columns;",
        )
        .map_err(query_error)?;

        for (position, name) in table.columns().iter().enumerate() {
            tx.execute(
                "INSERT INTO ledger_columns (position, name) VALUES (?1, ?2)",
                params![position as i64, name],
            )
            .map_err(query_error)?;
        }

        for (row_index, row) in table.rows().iter().enumerate() {
            tx.execute(
                "INSERT INTO ledger_rows (row_index, date, account_balance, comment)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    row_index as i64,
                    row.date.format(DATE_FORMAT).to_string(),
                    row.account_balance,
                    row.comment
                ],
            )
            .map_err(query_error)?;

            for (holding, valuation) in &row.holdings {
                tx.execute(
                    "INSERT INTO ledger_cells (row_index, holding, purchase_price, purchase_date,
                                               current_value, dividends, annualized_return)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        row_index as i64,
                        holding,
                        valuation.purchase_price(),
                        valuation
                            .purchase_date()
                            .map(|d| d.format(DATE_FORMAT).to_string()),
                        valuation.current_value(),
                        valuation.dividends(),
                        valuation.annualized_return()
                    ],
                )
                .map_err(query_error)?;
            }
        }

        tx.execute(
            "INSERT OR REPLACE INTO ledger_meta (key, value) VALUES ('schema_version', ?1)",
            params![SCHEMA_VERSION.to_string()],
        )
        .map_err(query_error)?;

        tx.commit().map_err(query_error)?;
        tracing::debug!(account = %self.label, rows = table.len(), "saved ledger");
        Ok(())
    }
}
