//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::account_registry_adapter::FileAccountRegistry;
use crate::adapters::csv_adapter::{write_view_csv, CsvQuoteAdapter};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::error::TradelogError;
use crate::domain::settings::{build_settings, LedgerSettings};
use crate::domain::valuation::ValueMode;
use crate::domain::view::ViewOptions;
use crate::logging;
use crate::ports::account_registry::AccountRegistry;
use crate::ports::quote_port::QuotePort;
use crate::session::Session;

#[derive(Parser, Debug)]
#[command(name = "tradelog", about = "Trading account logbook")]
pub struct Cli {
    /// INI configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Pay cash into the account (the first deposit opens the ledger)
    Deposit {
        amount: f64,
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
        #[arg(long)]
        comment: Option<String>,
    },
    /// Take cash out of the account
    Withdraw {
        amount: f64,
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
        #[arg(long)]
        comment: Option<String>,
    },
    /// Buy a new holding
    Buy {
        name: String,
        /// Value of the shares bought, excluding the fee
        #[arg(long)]
        value: f64,
        #[arg(long, default_value_t = 0.0)]
        fee: f64,
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
    },
    /// Re-mark open holdings; unlisted holdings keep their value
    Update {
        /// NAME=VALUE pairs
        #[arg(value_parser = parse_value_pair)]
        values: Vec<(String, f64)>,
        /// CSV file of holding,price,quantity rows
        #[arg(long)]
        quotes: Option<PathBuf>,
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
    },
    /// Log a dividend paid by an open holding
    Dividend {
        name: String,
        amount: f64,
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
    },
    /// Sell an open holding for the amount credited to the account
    Sell {
        name: String,
        amount: f64,
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
    },
    /// Back up the ledger and delete its last row
    DropLast,
    /// Total account value per row
    Total,
    /// Display the ledger
    View {
        #[arg(long, value_enum, default_value_t = ViewPreset::Relative)]
        preset: ViewPreset,
        /// rel, all, shr, eff or div (overrides the preset)
        #[arg(long, value_parser = parse_mode)]
        mode: Option<ValueMode>,
        /// Include closed holdings
        #[arg(long)]
        all: bool,
        #[arg(long)]
        comments: bool,
        #[arg(long)]
        balance: bool,
        /// Print dates as yy-mm-dd
        #[arg(long)]
        text_dates: bool,
        /// Also write the view to this CSV file
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// List holding names
    Holdings {
        /// Include closed holdings
        #[arg(long)]
        all: bool,
    },
    /// Show accounts, or switch to (or create) one
    Account { name: Option<String> },
    /// Write a dated snapshot and CSV export of the ledger
    Backup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ViewPreset {
    /// Annualized returns keyed by date
    Relative,
    /// Return (value, dividends) strings with balance and comments
    Composite,
    /// Current values with balance, keyed by date
    Shares,
    /// Plain defaults: active holdings, row numbers, returns
    Plain,
}

pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| format!("invalid date '{s}' (expected YYYY-MM-DD)"))
}

pub fn parse_mode(s: &str) -> Result<ValueMode, String> {
    s.parse::<ValueMode>().map_err(|e| e.to_string())
}

pub fn parse_value_pair(s: &str) -> Result<(String, f64), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{s}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing holding name in '{s}'"));
    }
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid value in '{s}'"))?;
    Ok((name.to_string(), value))
}

pub fn view_options(
    preset: ViewPreset,
    mode: Option<ValueMode>,
    all: bool,
    comments: bool,
    balance: bool,
    text_dates: bool,
) -> ViewOptions {
    let mut options = match preset {
        ViewPreset::Relative => ViewOptions::relative(),
        ViewPreset::Composite => ViewOptions::composite(),
        ViewPreset::Shares => ViewOptions::share_values(),
        ViewPreset::Plain => ViewOptions::default(),
    };
    if let Some(mode) = mode {
        options.value_mode = mode;
    }
    options.include_all_holdings |= all;
    options.include_comments |= comments;
    options.include_account_balance |= balance;
    options.format_dates_as_text |= text_dates;
    options
}

pub fn load_settings(config_path: Option<&PathBuf>) -> Result<LedgerSettings, TradelogError> {
    let adapter = match config_path {
        Some(path) => FileConfigAdapter::from_file(path).map_err(|e| TradelogError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        })?,
        None => FileConfigAdapter::empty(),
    };
    build_settings(&adapter)
}

pub fn run(cli: Cli) -> ExitCode {
    let settings = match load_settings(cli.config.as_ref()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    if let Err(e) = logging::init_tracing(&settings.log_filter, settings.log_format) {
        eprintln!("warning: {e}");
    }
    execute(cli.command, &settings)
}

/// Run one command against the current account.
pub fn execute(command: Command, settings: &LedgerSettings) -> ExitCode {
    let registry = FileAccountRegistry::in_dir(&settings.data_dir);

    if let Command::Account { name } = &command {
        return run_account(&registry, settings, name.as_deref());
    }

    let session = match Session::open(settings.clone(), &registry) {
        Ok(s) => s,
        Err(e) => return report(&e),
    };

    let result = match command {
        Command::Deposit {
            amount,
            date,
            comment,
        } => session.record_cash_flow(amount, date, comment.as_deref()),
        Command::Withdraw {
            amount,
            date,
            comment,
        } => session.record_cash_flow(-amount.abs(), date, comment.as_deref()),
        Command::Buy {
            name,
            value,
            fee,
            date,
        } => session.buy(&name, value, fee, date),
        Command::Update {
            values,
            quotes,
            date,
        } => run_update(&session, values, quotes, date),
        Command::Dividend { name, amount, date } => session.record_dividend(&name, amount, date),
        Command::Sell { name, amount, date } => run_sell(&session, &name, amount, date),
        Command::DropLast => session.drop_last_row().map(|row| {
            println!("Deleted row: {} {}", row.date, row.comment);
        }),
        Command::Total => run_total(&session),
        Command::View {
            preset,
            mode,
            all,
            comments,
            balance,
            text_dates,
            csv,
        } => {
            let options = view_options(preset, mode, all, comments, balance, text_dates);
            run_view(&session, &options, csv)
        }
        Command::Holdings { all } => session.holdings(all).map(|names| {
            for name in names {
                println!("{name}");
            }
        }),
        Command::Backup => session.backup().map(|receipt| {
            println!("{}", receipt.snapshot.display());
            println!("{}", receipt.export.display());
        }),
        Command::Account { .. } => Ok(()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report(&e),
    }
}

/// Notices were already logged by the session and do not fail the command.
fn report(err: &TradelogError) -> ExitCode {
    if err.is_notice() {
        return ExitCode::SUCCESS;
    }
    if let TradelogError::NotFound { .. } = err {
        eprintln!("error: {err} (open it with `tradelog deposit <amount>`)");
    } else {
        eprintln!("error: {err}");
    }
    err.into()
}

fn run_update(
    session: &Session,
    pairs: Vec<(String, f64)>,
    quotes: Option<PathBuf>,
    date: Option<NaiveDate>,
) -> Result<(), TradelogError> {
    let mut values: HashMap<String, f64> = match quotes {
        Some(path) => CsvQuoteAdapter::new(path).current_values()?,
        None => HashMap::new(),
    };
    // explicit pairs win over the quote file
    values.extend(pairs);
    let summary = session.update_valuations(&values, date)?;
    eprintln!("Updated {} holdings", summary.updated.len());
    Ok(())
}

fn run_sell(session: &Session, name: &str, amount: f64, date: Option<NaiveDate>) -> Result<(), TradelogError> {
    match session.sell(name, amount, date)? {
        Some(r) => println!("{name} was sold with an overall return of {r:.1}%."),
        None => println!("{name} was sold on its purchase date; no annualized return."),
    }
    Ok(())
}

fn run_total(session: &Session) -> Result<(), TradelogError> {
    let points = session.total_value()?;
    println!("{:<10}  {:>12}", "Date", "Total Value");
    for p in points {
        println!("{:<10}  {:>12.2}", p.date.format("%Y-%m-%d").to_string(), p.total);
    }
    Ok(())
}

fn run_view(session: &Session, options: &ViewOptions, csv: Option<PathBuf>) -> Result<(), TradelogError> {
    let view = session.view(options)?;
    print!("{}", view.render());
    if let Some(path) = csv {
        write_view_csv(&view, &path)?;
        eprintln!("Wrote {}", path.display());
    }
    Ok(())
}

fn run_account(registry: &FileAccountRegistry, settings: &LedgerSettings, name: Option<&str>) -> ExitCode {
    let names = match name {
        Some(n) => registry.switch_or_create(n),
        None => registry.account_names(),
    };
    let names = match names {
        Ok(n) => n,
        Err(e) => return report(&e),
    };

    for (i, n) in names.iter().enumerate() {
        let marker = if i == 0 { "*" } else { " " };
        println!("{marker} {n}");
    }

    let Some(current) = names.first() else {
        return ExitCode::SUCCESS;
    };
    let initialized = Session::open(settings.clone(), registry).and_then(|s| s.is_initialized());
    match initialized {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => {
            tracing::warn!(
                account = %current,
                "account has no ledger yet; open it with `tradelog deposit <amount>` before anything else"
            );
            ExitCode::SUCCESS
        }
        Err(e) => report(&e),
    }
}
