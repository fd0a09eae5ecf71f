//! Holding valuation model.
//!
//! A [`HoldingValuation`] is an immutable snapshot of one position: what it
//! cost, what it is worth now, the dividends it has paid and the
//! continuously-compounded annualized return those numbers imply.

use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;

use super::error::LedgerError;

pub const DAYS_PER_YEAR: f64 = 365.0;

/// Projection applied to a valuation when it is displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueMode {
    /// Annualized return.
    #[default]
    Rel,
    /// `"<rel> (<value>, <dividends>)"`.
    All,
    /// Current value.
    Shr,
    /// Current value plus dividends.
    Eff,
    /// Dividends.
    Div,
}

impl ValueMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueMode::Rel => "rel",
            ValueMode::All => "all",
            ValueMode::Shr => "shr",
            ValueMode::Eff => "eff",
            ValueMode::Div => "div",
        }
    }
}

impl FromStr for ValueMode {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rel" => Ok(ValueMode::Rel),
            "all" => Ok(ValueMode::All),
            "shr" => Ok(ValueMode::Shr),
            "eff" => Ok(ValueMode::Eff),
            "div" => Ok(ValueMode::Div),
            other => Err(LedgerError::UnrecognizedMode(other.to_string())),
        }
    }
}

impl fmt::Display for ValueMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of [`HoldingValuation::value_as`].
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayValue {
    Number(f64),
    Undefined,
    Text(String),
}

impl fmt::Display for DisplayValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayValue::Number(v) => write!(f, "{v}"),
            DisplayValue::Undefined => f.write_str("nan"),
            DisplayValue::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HoldingValuation {
    purchase_price: f64,
    purchase_date: Option<NaiveDate>,
    current_value: f64,
    dividends: f64,
    annualized_return: Option<f64>,
}

/// Placeholder stored in every column whose position is not open.
pub const CLOSED: HoldingValuation = HoldingValuation {
    purchase_price: 0.0,
    purchase_date: None,
    current_value: 0.0,
    dividends: 0.0,
    annualized_return: None,
};

impl HoldingValuation {
    /// A freshly bought position. The fee is folded into the cost basis.
    pub fn open(value: f64, fee: f64, purchase_date: NaiveDate) -> Self {
        HoldingValuation {
            purchase_price: value + fee,
            purchase_date: Some(purchase_date),
            current_value: value,
            dividends: 0.0,
            annualized_return: None,
        }
    }

    /// Rebuild a valuation from stored parts.
    pub fn from_parts(
        purchase_price: f64,
        purchase_date: Option<NaiveDate>,
        current_value: f64,
        dividends: f64,
        annualized_return: Option<f64>,
    ) -> Self {
        HoldingValuation {
            purchase_price,
            purchase_date,
            current_value,
            dividends,
            annualized_return,
        }
    }

    pub fn purchase_price(&self) -> f64 {
        self.purchase_price
    }

    pub fn purchase_date(&self) -> Option<NaiveDate> {
        self.purchase_date
    }

    pub fn current_value(&self) -> f64 {
        self.current_value
    }

    pub fn dividends(&self) -> f64 {
        self.dividends
    }

    pub fn annualized_return(&self) -> Option<f64> {
        self.annualized_return
    }

    pub fn is_open(&self) -> bool {
        !(self.current_value == 0.0 && self.dividends == 0.0)
    }

    /// Whole days between purchase and `as_of`. Zero for the closed sentinel.
    pub fn days_held(&self, as_of: NaiveDate) -> i64 {
        self.purchase_date
            .map(|d| (as_of - d).num_days())
            .unwrap_or(0)
    }

    /// Next snapshot of this position.
    ///
    /// The return is only recomputed when at least one whole day has passed
    /// since purchase; otherwise the previous figure carries over.
    pub fn with_update(
        &self,
        new_value: Option<f64>,
        dividend_delta: Option<f64>,
        as_of: NaiveDate,
        standard_fee: f64,
    ) -> Self {
        let mut next = self.clone();
        if let Some(value) = new_value {
            next.current_value = value;
        }
        if let Some(delta) = dividend_delta {
            next.dividends += delta;
        }
        let days = next.days_held(as_of);
        if days > 0 {
            next.annualized_return = annualized_log_return(
                next.current_value + next.dividends - standard_fee,
                next.purchase_price,
                days,
            );
        }
        next
    }

    /// Return realized by closing this position for `proceeds` on `sale_date`,
    /// in percent per year.
    pub fn realized_return_pct(&self, proceeds: f64, sale_date: NaiveDate) -> Option<f64> {
        let days = self.days_held(sale_date);
        if days <= 0 {
            return None;
        }
        annualized_log_return(proceeds + self.dividends, self.purchase_price, days)
            .map(|r| r * 100.0)
    }

    pub fn value_as(&self, mode: ValueMode) -> DisplayValue {
        match mode {
            ValueMode::Rel => match self.annualized_return {
                Some(r) => DisplayValue::Number(r),
                None => DisplayValue::Undefined,
            },
            ValueMode::All => {
                let rel = match self.annualized_return {
                    Some(r) => format!("{r:.4}"),
                    None => "nan".to_string(),
                };
                DisplayValue::Text(format!(
                    "{} ({:.2}, {:.2})",
                    rel, self.current_value, self.dividends
                ))
            }
            ValueMode::Shr => DisplayValue::Number(self.current_value),
            ValueMode::Eff => DisplayValue::Number(self.current_value + self.dividends),
            ValueMode::Div => DisplayValue::Number(self.dividends),
        }
    }
}

/// `ln(realized / cost) * 365 / days`, or `None` when the ratio has no
/// real logarithm.
pub fn annualized_log_return(realized: f64, cost: f64, days: i64) -> Option<f64> {
    if days <= 0 {
        return None;
    }
    let ratio = realized / cost;
    if !ratio.is_finite() || ratio <= 0.0 {
        return None;
    }
    Some(ratio.ln() * DAYS_PER_YEAR / days as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn day(n: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(n)
    }

    #[test]
    fn open_folds_fee_into_cost_basis() {
        let v = HoldingValuation::open(100.0, 1.0, day(0));
        assert_eq!(v.purchase_price(), 101.0);
        assert_eq!(v.current_value(), 100.0);
        assert_eq!(v.dividends(), 0.0);
        assert_eq!(v.annualized_return(), None);
        assert_eq!(v.purchase_date(), Some(day(0)));
        assert!(v.is_open());
    }

    #[test]
    fn closed_sentinel_is_not_open() {
        assert!(!CLOSED.is_open());
        assert_eq!(CLOSED.value_as(ValueMode::Rel), DisplayValue::Undefined);
        assert_eq!(CLOSED.value_as(ValueMode::Shr), DisplayValue::Number(0.0));
    }

    #[test]
    fn update_after_one_year() {
        let v = HoldingValuation::open(100.0, 1.0, day(0));
        let next = v.with_update(Some(150.0), None, day(365), 15.0);
        assert_eq!(next.current_value(), 150.0);
        assert_relative_eq!(
            next.annualized_return().unwrap(),
            (135.0_f64 / 101.0).ln(),
            epsilon = 1e-12
        );
        // the source valuation is untouched
        assert_eq!(v.current_value(), 100.0);
        assert_eq!(v.annualized_return(), None);
    }

    #[test]
    fn update_scales_by_days_held() {
        let v = HoldingValuation::open(100.0, 0.0, day(0));
        let next = v.with_update(Some(115.0), None, day(73), 15.0);
        assert_relative_eq!(next.annualized_return().unwrap(), 0.0, epsilon = 1e-12);

        let next = v.with_update(Some(215.0), None, day(73), 15.0);
        assert_relative_eq!(
            next.annualized_return().unwrap(),
            2.0_f64.ln() * 5.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn same_day_update_keeps_previous_return() {
        let v = HoldingValuation::open(100.0, 1.0, day(0))
            .with_update(Some(150.0), None, day(10), 15.0);
        let before = v.annualized_return();
        let again = v.with_update(Some(90.0), None, day(0), 15.0);
        assert_eq!(again.current_value(), 90.0);
        assert_eq!(again.annualized_return(), before);
    }

    #[test]
    fn dividends_accumulate() {
        let v = HoldingValuation::open(100.0, 1.0, day(0))
            .with_update(None, Some(5.0), day(30), 15.0)
            .with_update(None, Some(2.5), day(60), 15.0);
        assert_eq!(v.dividends(), 7.5);
        assert_eq!(v.current_value(), 100.0);
        assert_relative_eq!(
            v.annualized_return().unwrap(),
            (92.5_f64 / 101.0).ln() * 365.0 / 60.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn non_positive_log_argument_is_undefined() {
        let v = HoldingValuation::open(10.0, 1.0, day(0));
        let next = v.with_update(Some(5.0), None, day(30), 15.0);
        assert_eq!(next.annualized_return(), None);
        assert!(next.is_open());
    }

    #[test]
    fn realized_return_after_one_year() {
        let v = HoldingValuation::open(100.0, 1.0, day(0));
        let r = v.realized_return_pct(200.0, day(365)).unwrap();
        assert_relative_eq!(r, (200.0_f64 / 101.0).ln() * 100.0, epsilon = 1e-9);
    }

    #[test]
    fn realized_return_same_day_is_undefined() {
        let v = HoldingValuation::open(100.0, 1.0, day(0));
        assert_eq!(v.realized_return_pct(200.0, day(0)), None);
    }

    #[test]
    fn value_modes() {
        let v = HoldingValuation::open(100.0, 1.0, day(0))
            .with_update(Some(150.0), Some(4.0), day(365), 15.0);
        let rel = v.annualized_return().unwrap();

        assert_eq!(v.value_as(ValueMode::Rel), DisplayValue::Number(rel));
        assert_eq!(v.value_as(ValueMode::Shr), DisplayValue::Number(150.0));
        assert_eq!(v.value_as(ValueMode::Eff), DisplayValue::Number(154.0));
        assert_eq!(v.value_as(ValueMode::Div), DisplayValue::Number(4.0));
        assert_eq!(
            v.value_as(ValueMode::All),
            DisplayValue::Text(format!("{rel:.4} (150.00, 4.00)"))
        );
    }

    #[test]
    fn composite_text_prints_nan_for_undefined_return() {
        let v = HoldingValuation::open(100.0, 1.0, day(0));
        assert_eq!(
            v.value_as(ValueMode::All),
            DisplayValue::Text("nan (100.00, 0.00)".to_string())
        );
    }

    #[test]
    fn parse_value_modes() {
        for mode in ["rel", "all", "shr", "eff", "div"] {
            assert_eq!(mode.parse::<ValueMode>().unwrap().as_str(), mode);
        }
    }

    #[test]
    fn parse_unknown_mode_fails() {
        let err = "abs".parse::<ValueMode>().unwrap_err();
        assert!(matches!(err, LedgerError::UnrecognizedMode(m) if m == "abs"));
    }

    #[test]
    fn days_held_counts_whole_days() {
        let v = HoldingValuation::open(100.0, 1.0, day(5));
        assert_eq!(v.days_held(day(5)), 0);
        assert_eq!(v.days_held(day(40)), 35);
        assert_eq!(v.days_held(day(2)), -3);
        assert_eq!(CLOSED.days_held(day(40)), 0);
    }
}
