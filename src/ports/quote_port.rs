//! Market data port trait.

use crate::domain::error::TradelogError;
use std::collections::HashMap;

/// Source of current position values keyed by holding name.
pub trait QuotePort {
    fn current_values(&self) -> Result<HashMap<String, f64>, TradelogError>;
}
