//! Ledger settings and their validation.

use crate::domain::error::TradelogError;
use crate::ports::config_port::ConfigPort;
use std::path::PathBuf;

/// Approximate cost of one transaction, used only when estimating returns.
pub const DEFAULT_STANDARD_FEE: f64 = 15.0;
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LedgerSettings {
    pub standard_fee: f64,
    pub data_dir: PathBuf,
    pub backup_dir: PathBuf,
    pub log_filter: String,
    pub log_format: LogFormat,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        LedgerSettings {
            standard_fee: DEFAULT_STANDARD_FEE,
            data_dir: PathBuf::from("."),
            backup_dir: PathBuf::from("./backups"),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            log_format: LogFormat::Text,
        }
    }
}

pub fn build_settings(config: &dyn ConfigPort) -> Result<LedgerSettings, TradelogError> {
    validate_standard_fee(config)?;
    let log_format = parse_log_format(config)?;

    let data_dir = config
        .get_string("ledger", "data_dir")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    let backup_dir = config
        .get_string("backup", "dir")
        .map(PathBuf::from)
        .unwrap_or_else(|| data_dir.join("backups"));

    Ok(LedgerSettings {
        standard_fee: config.get_double("ledger", "standard_fee", DEFAULT_STANDARD_FEE),
        data_dir,
        backup_dir,
        log_filter: config
            .get_string("logging", "filter")
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
        log_format,
    })
}

fn validate_standard_fee(config: &dyn ConfigPort) -> Result<(), TradelogError> {
    let raw = match config.get_string("ledger", "standard_fee") {
        Some(raw) => raw,
        None => return Ok(()),
    };
    let value: f64 = raw.trim().parse().map_err(|_| TradelogError::ConfigInvalid {
        section: "ledger".to_string(),
        key: "standard_fee".to_string(),
        reason: format!("'{raw}' is not a number"),
    })?;
    if !value.is_finite() || value < 0.0 {
        return Err(TradelogError::ConfigInvalid {
            section: "ledger".to_string(),
            key: "standard_fee".to_string(),
            reason: "standard_fee must be a non-negative number".to_string(),
        });
    }
    Ok(())
}

fn parse_log_format(config: &dyn ConfigPort) -> Result<LogFormat, TradelogError> {
    match config.get_string("logging", "format") {
        None => Ok(LogFormat::Text),
        Some(raw) => match raw.trim().to_lowercase().as_str() {
            "text" | "" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(TradelogError::ConfigInvalid {
                section: "logging".to_string(),
                key: "format".to_string(),
                reason: format!("unknown format '{raw}' (expected text or json)"),
            }),
        },
    }
}
