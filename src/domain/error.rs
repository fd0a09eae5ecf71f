//! Domain error types.

/// Contract failures raised by the ledger itself.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LedgerError {
    #[error("{0} is already an open holding, no changes made")]
    HoldingAlreadyOpen(String),

    #[error("{0} is not an open holding, no action taken")]
    HoldingNotOpen(String),

    #[error("ledger has no rows yet, open it with a deposit first")]
    NotInitialized,

    #[error("unrecognized value mode: {0} (expected rel, all, shr, eff or div)")]
    UnrecognizedMode(String),

    #[error("value for {holding} must be positive, got {value}; sell the holding to close it")]
    NonPositiveValue { holding: String, value: f64 },

    #[error("dividend for {holding} must not be negative, got {amount}")]
    NegativeDividend { holding: String, amount: f64 },
}

impl LedgerError {
    /// Rejected operations that leave the ledger untouched and are reported
    /// rather than treated as failures.
    pub fn is_notice(&self) -> bool {
        matches!(
            self,
            LedgerError::HoldingAlreadyOpen(_) | LedgerError::HoldingNotOpen(_)
        )
    }
}

/// Top-level error type for tradelog.
#[derive(Debug, thiserror::Error)]
pub enum TradelogError {
    #[error("no ledger found for account {account}")]
    NotFound { account: String },

    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TradelogError {
    pub fn is_notice(&self) -> bool {
        matches!(self, TradelogError::Ledger(e) if e.is_notice())
    }
}

impl From<&TradelogError> for std::process::ExitCode {
    fn from(err: &TradelogError) -> Self {
        let code: u8 = match err {
            TradelogError::Io(_) => 1,
            TradelogError::ConfigParse { .. }
            | TradelogError::ConfigInvalid { .. }
            | TradelogError::InvalidInput { .. } => 2,
            TradelogError::Database { .. } | TradelogError::DatabaseQuery { .. } => 3,
            TradelogError::Ledger(_) => 4,
            TradelogError::NotFound { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
