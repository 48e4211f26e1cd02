//! Utility functions for formatting
//!
//! Centralized formatting of currency, percentage and share values so every
//! output path renders numbers the same way.

use rust_decimal::{Decimal, RoundingStrategy};

/// Default currency sign
pub const DEFAULT_CURRENCY_SYMBOL: &str = "$";

/// Round to cents, midpoint away from zero. Never yields negative zero.
pub fn round2(value: Decimal) -> Decimal {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    if rounded.is_zero() {
        Decimal::ZERO
    } else {
        rounded
    }
}

/// Format with an explicit currency sign: `$1234.56`, `$-300.00`.
///
/// # Examples
/// ```
/// use stockfolio::utils::format_currency_with;
/// use rust_decimal_macros::dec;
///
/// assert_eq!(format_currency_with(dec!(1234.5), "€"), "€1234.50");
/// ```
pub fn format_currency_with(value: Decimal, symbol: &str) -> String {
    format!("{}{:.2}", symbol, round2(value))
}

/// Format with the default `$` sign.
///
/// # Examples
/// ```
/// use stockfolio::utils::format_currency;
/// use rust_decimal_macros::dec;
///
/// assert_eq!(format_currency(dec!(1800)), "$1800.00");
/// assert_eq!(format_currency(dec!(-300)), "$-300.00");
/// ```
pub fn format_currency(value: Decimal) -> String {
    format_currency_with(value, DEFAULT_CURRENCY_SYMBOL)
}

/// Two decimals with a trailing `%`.
///
/// # Examples
/// ```
/// use stockfolio::utils::format_percent;
/// use rust_decimal_macros::dec;
///
/// assert_eq!(format_percent(dec!(20)), "20.00%");
/// assert_eq!(format_percent(dec!(-12.345)), "-12.35%");
/// ```
pub fn format_percent(value: Decimal) -> String {
    format!("{:.2}%", round2(value))
}

/// Share counts without trailing zeros: `10`, `0.5`
pub fn format_shares(value: Decimal) -> String {
    value.normalize().to_string()
}
