//! Read-only projections of the ledger for display and export.

use chrono::NaiveDate;
use std::fmt;

use super::ledger::LedgerTable;
use super::valuation::{DisplayValue, ValueMode};

pub const DATE_HEADER: &str = "Date";
pub const BALANCE_HEADER: &str = "Acct Bal";
pub const COMMENT_HEADER: &str = "Comment";
pub const TEXT_DATE_FORMAT: &str = "%y-%m-%d";

#[derive(Debug, Clone, PartialEq)]
pub struct ViewOptions {
    /// Include closed holdings as well as open ones.
    pub include_all_holdings: bool,
    pub include_comments: bool,
    pub include_account_balance: bool,
    /// Render dates as `yy-mm-dd` strings.
    pub format_dates_as_text: bool,
    /// Key rows by date instead of by row number.
    pub index_by_date: bool,
    pub value_mode: ValueMode,
}

impl Default for ViewOptions {
    fn default() -> Self {
        ViewOptions {
            include_all_holdings: false,
            include_comments: false,
            include_account_balance: false,
            format_dates_as_text: false,
            index_by_date: false,
            value_mode: ValueMode::Rel,
        }
    }
}

impl ViewOptions {
    /// Annualized returns keyed by date.
    pub fn relative() -> Self {
        ViewOptions {
            index_by_date: true,
            ..Self::default()
        }
    }

    /// Composite `return (value, dividends)` strings with balance and comments.
    pub fn composite() -> Self {
        ViewOptions {
            include_comments: true,
            include_account_balance: true,
            value_mode: ValueMode::All,
            ..Self::default()
        }
    }

    /// Current values and account balance keyed by date.
    pub fn share_values() -> Self {
        ViewOptions {
            include_account_balance: true,
            index_by_date: true,
            value_mode: ValueMode::Shr,
            ..Self::default()
        }
    }

    /// Layout used for backups: every holding, comments, text dates.
    pub fn backup_export() -> Self {
        ViewOptions {
            include_all_holdings: true,
            include_comments: true,
            format_dates_as_text: true,
            ..Self::share_values()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewCell {
    Date(NaiveDate),
    Text(String),
    Number(f64),
    Undefined,
}

impl ViewCell {
    pub fn render(&self, precision: usize) -> String {
        match self {
            ViewCell::Number(v) => format!("{v:.precision$}"),
            other => other.to_string(),
        }
    }
}

impl From<DisplayValue> for ViewCell {
    fn from(value: DisplayValue) -> Self {
        match value {
            DisplayValue::Number(v) => ViewCell::Number(v),
            DisplayValue::Undefined => ViewCell::Undefined,
            DisplayValue::Text(s) => ViewCell::Text(s),
        }
    }
}

impl fmt::Display for ViewCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewCell::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            ViewCell::Text(s) => f.write_str(s),
            ViewCell::Number(v) => write!(f, "{v}"),
            ViewCell::Undefined => f.write_str("nan"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RowIndex {
    Position(usize),
    Date(ViewCell),
}

impl fmt::Display for RowIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowIndex::Position(i) => write!(f, "{i}"),
            RowIndex::Date(cell) => write!(f, "{cell}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewRow {
    pub index: RowIndex,
    pub cells: Vec<ViewCell>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct View {
    /// `"Date"` when rows are keyed by date, empty otherwise.
    pub index_label: String,
    pub headers: Vec<String>,
    pub rows: Vec<ViewRow>,
    pub value_mode: ValueMode,
}

impl View {
    pub fn project(table: &LedgerTable, options: &ViewOptions) -> Self {
        let holdings = if options.include_all_holdings {
            table.all_holdings()
        } else {
            table.active_holdings()
        };

        let mut headers = Vec::new();
        if !options.index_by_date {
            headers.push(DATE_HEADER.to_string());
        }
        if options.include_account_balance {
            headers.push(BALANCE_HEADER.to_string());
        }
        if options.include_comments {
            headers.push(COMMENT_HEADER.to_string());
        }
        headers.extend(holdings.iter().map(|h| h.to_string()));

        let rows = table
            .rows()
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let date = if options.format_dates_as_text {
                    ViewCell::Text(row.date.format(TEXT_DATE_FORMAT).to_string())
                } else {
                    ViewCell::Date(row.date)
                };
                let mut cells = Vec::with_capacity(headers.len());
                let index = if options.index_by_date {
                    RowIndex::Date(date)
                } else {
                    cells.push(date);
                    RowIndex::Position(i)
                };
                if options.include_account_balance {
                    cells.push(ViewCell::Number(row.account_balance));
                }
                if options.include_comments {
                    cells.push(ViewCell::Text(row.comment.clone()));
                }
                for name in &holdings {
                    let cell = row
                        .holding(name)
                        .map(|h| h.value_as(options.value_mode).into())
                        .unwrap_or(ViewCell::Undefined);
                    cells.push(cell);
                }
                ViewRow { index, cells }
            })
            .collect();

        View {
            index_label: if options.index_by_date {
                DATE_HEADER.to_string()
            } else {
                String::new()
            },
            headers,
            rows,
            value_mode: options.value_mode,
        }
    }

    pub fn column(&self, header: &str) -> Option<Vec<&ViewCell>> {
        let idx = self.headers.iter().position(|h| h == header)?;
        Some(self.rows.iter().map(|r| &r.cells[idx]).collect())
    }

    /// Fixed-width text table for terminal output.
    pub fn render(&self) -> String {
        let holding_precision = match self.value_mode {
            ValueMode::Rel => 4,
            _ => 2,
        };
        let precision_for = |header: &str| {
            if header == BALANCE_HEADER { 2 } else { holding_precision }
        };

        let mut grid: Vec<Vec<String>> = Vec::with_capacity(self.rows.len() + 1);
        let mut head = vec![self.index_label.clone()];
        head.extend(self.headers.iter().cloned());
        grid.push(head);
        for row in &self.rows {
            let mut line = vec![row.index.to_string()];
            for (header, cell) in self.headers.iter().zip(&row.cells) {
                line.push(cell.render(precision_for(header)));
            }
            grid.push(line);
        }

        let columns = grid[0].len();
        let widths: Vec<usize> = (0..columns)
            .map(|c| grid.iter().map(|l| l[c].chars().count()).max().unwrap_or(0))
            .collect();

        let mut output = String::new();
        for line in &grid {
            // index column reads left-aligned, values right-aligned
            let rendered: Vec<String> = line
                .iter()
                .zip(&widths)
                .enumerate()
                .map(|(c, (text, &width))| {
                    if c == 0 {
                        format!("{text:<width$}")
                    } else {
                        format!("{text:>width$}")
                    }
                })
                .collect();
            output.push_str(rendered.join("  ").trim_end());
            output.push('\n');
        }
        output
    }
}
