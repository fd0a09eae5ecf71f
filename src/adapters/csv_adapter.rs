//! CSV quote file reader and view exporter.

use crate::domain::error::TradelogError;
use crate::domain::view::View;
use crate::ports::quote_port::QuotePort;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Reads `holding,price,quantity` rows and values each holding at
/// `price * quantity`. The quantity column may be omitted, meaning 1.
pub struct CsvQuoteAdapter {
    path: PathBuf,
}

impl CsvQuoteAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

fn quote_error(path: &Path, line: usize, reason: impl std::fmt::Display) -> TradelogError {
    TradelogError::InvalidInput {
        reason: format!("{}:{}: {}", path.display(), line, reason),
    }
}

impl QuotePort for CsvQuoteAdapter {
    fn current_values(&self) -> Result<HashMap<String, f64>, TradelogError> {
        let content = fs::read_to_string(&self.path).map_err(|e| TradelogError::InvalidInput {
            reason: format!("failed to read {}: {}", self.path.display(), e),
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(content.as_bytes());
        let mut values = HashMap::new();

        for (i, result) in rdr.records().enumerate() {
            // header is line 1
            let line = i + 2;
            let record = result.map_err(|e| quote_error(&self.path, line, e))?;

            let name = record
                .get(0)
                .filter(|s| !s.is_empty())
                .ok_or_else(|| quote_error(&self.path, line, "missing holding column"))?;

            let price: f64 = record
                .get(1)
                .ok_or_else(|| quote_error(&self.path, line, "missing price column"))?
                .parse()
                .map_err(|e| quote_error(&self.path, line, format!("invalid price: {e}")))?;

            let quantity: f64 = match record.get(2).filter(|s| !s.is_empty()) {
                Some(raw) => raw
                    .parse()
                    .map_err(|e| quote_error(&self.path, line, format!("invalid quantity: {e}")))?,
                None => 1.0,
            };

            let value = price * quantity;
            if !value.is_finite() {
                return Err(quote_error(&self.path, line, "value is not a finite number"));
            }
            if values.insert(name.to_string(), value).is_some() {
                return Err(quote_error(&self.path, line, format!("duplicate holding {name}")));
            }
        }

        tracing::debug!(path = %self.path.display(), quotes = values.len(), "read quote file");
        Ok(values)
    }
}

/// Write `view` as CSV, index column first.
pub fn write_view_csv<P: AsRef<Path>>(view: &View, path: P) -> Result<(), TradelogError> {
    let path = path.as_ref();
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)?;
        }
    }
    let mut wtr = csv::Writer::from_path(path).map_err(csv_error)?;

    let mut header = vec![view.index_label.clone()];
    header.extend(view.headers.iter().cloned());
    wtr.write_record(&header).map_err(csv_error)?;

    for row in &view.rows {
        let mut record = vec![row.index.to_string()];
        record.extend(row.cells.iter().map(|c| c.to_string()));
        wtr.write_record(&record).map_err(csv_error)?;
    }

    wtr.flush()?;
    Ok(())
}

fn csv_error(e: csv::Error) -> TradelogError {
    match e.into_kind() {
        csv::ErrorKind::Io(io) => TradelogError::Io(io),
        other => TradelogError::InvalidInput {
            reason: format!("CSV write error: {other:?}"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ledger::LedgerTable;
    use crate::domain::view::ViewOptions;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn write_quotes(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("quotes.csv");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn reads_price_times_quantity() {
        let dir = TempDir::new().unwrap();
        let path = write_quotes(
            &dir,
            "holding,price,quantity\nABC, 12.5, 10\nXYZ,3.0,\nFUND,101.25\n",
        );
        let values = CsvQuoteAdapter::new(path).current_values().unwrap();

        assert_eq!(values.len(), 3);
        assert_eq!(values["ABC"], 125.0);
        assert_eq!(values["XYZ"], 3.0);
        assert_eq!(values["FUND"], 101.25);
    }

    #[test]
    fn header_only_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let path = write_quotes(&dir, "holding,price,quantity\n");
        assert!(CsvQuoteAdapter::new(path).current_values().unwrap().is_empty());
    }

    #[test]
    fn bad_price_reports_line() {
        let dir = TempDir::new().unwrap();
        let path = write_quotes(&dir, "holding,price\nABC,1.0\nXYZ,lots\n");
        match CsvQuoteAdapter::new(path).current_values() {
            Err(TradelogError::InvalidInput { reason }) => {
                assert!(reason.contains(":3:"), "{reason}");
                assert!(reason.contains("invalid price"), "{reason}");
            }
            other => panic!("expected InvalidInput, got: {other:?}"),
        }
    }

    #[test]
    fn duplicate_holding_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_quotes(&dir, "holding,price\nABC,1.0\nABC,2.0\n");
        assert!(CsvQuoteAdapter::new(path).current_values().is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        let adapter = CsvQuoteAdapter::new(PathBuf::from("/nonexistent/quotes.csv"));
        assert!(adapter.current_values().is_err());
    }

    #[test]
    fn exports_view_with_index_column() {
        let dir = TempDir::new().unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 2, 3).unwrap();
        let mut table = LedgerTable::new();
        table.record_cash_flow(1000.0, date, None);
        table.buy("ABC", 100.0, 1.0, date).unwrap();

        let view = View::project(&table, &ViewOptions::backup_export());
        let path = dir.path().join("out").join("ledger.csv");
        write_view_csv(&view, &path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "Date,Acct Bal,Comment,ABC");
        assert_eq!(lines[1], "24-02-03,1000,Opening deposit,0");
        assert_eq!(lines[2], "24-02-03,899,Buy ABC,100");
    }
}
