use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Upper bound accepted for share counts, cost bases and quoted prices.
///
/// Keeps `shares * price` well inside the range of `Decimal`.
pub const MAX_AMOUNT: Decimal = dec!(1_000_000_000_000);

/// Smallest accepted `shares * cost_basis`.
///
/// With values capped at `MAX_AMOUNT`, a gain over a cost of at least this
/// much stays representable as a percentage.
pub const MIN_COST_VALUE: Decimal = dec!(0.01);

/// Current position in one ticker symbol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holding {
    pub symbol: String,
    pub shares: Decimal,
    /// Price per share at acquisition
    pub cost_basis: Decimal,
    /// Record date, overwritten when the holding is re-added
    pub acquired_on: NaiveDate,
}

impl Holding {
    pub fn new(
        symbol: impl Into<String>,
        shares: Decimal,
        cost_basis: Decimal,
        acquired_on: NaiveDate,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            shares,
            cost_basis,
            acquired_on,
        }
    }

    /// Total amount paid for the position (`shares * cost_basis`), `None`
    /// if it does not fit in a `Decimal`
    pub fn cost_value(&self) -> Option<Decimal> {
        self.shares.checked_mul(self.cost_basis)
    }
}

/// Canonical form of a user-entered ticker: trimmed and upper-cased.
pub fn normalize_symbol(raw: &str) -> String {
    raw.trim().to_uppercase()
}
