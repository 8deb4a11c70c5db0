//! Change, percent change and trend computed from two extracted prices.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};

use crate::types::Trend;

/// Fields computed from the current price and the previous close.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Derived {
    /// Signed difference, e.g. `+32.10`.
    pub change: String,
    /// Signed percentage, e.g. `+0.59%`.
    pub percent_change: String,
    pub trend: Trend,
}

/// Parse a page-formatted amount, ignoring thousands separators.
fn parse_amount(formatted: &str) -> Option<Decimal> {
    Decimal::from_str(&formatted.replace(',', "")).ok()
}

/// Two decimal places with an explicit sign taken from the unrounded value.
fn signed(value: Decimal) -> String {
    let sign = if value < Decimal::ZERO { '-' } else { '+' };
    let mut magnitude = value
        .abs()
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    magnitude.rescale(2);
    format!("{sign}{magnitude}")
}

/// Compute the move since the previous close.
///
/// Returns `None` when either amount does not parse or the previous close is
/// zero; the caller then leaves all three derived fields out. A flat move is
/// `+0.00` and trends UP.
pub fn derive_change(current_price: &str, previous_close: &str) -> Option<Derived> {
    let current = parse_amount(current_price)?;
    let previous = parse_amount(previous_close)?;
    if previous.is_zero() {
        return None;
    }

    let change = current.checked_sub(previous)?;
    let percent = change
        .checked_div(previous)?
        .checked_mul(Decimal::ONE_HUNDRED)?;

    let trend = if percent < Decimal::ZERO {
        Trend::Down
    } else {
        Trend::Up
    };

    Some(Derived {
        change: signed(change),
        percent_change: format!("{}%", signed(percent)),
        trend,
    })
}
