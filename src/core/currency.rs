//! Decimal helpers for monetary amounts

use crate::core::error::AdvisorError;
use rust_decimal::prelude::*;

/// Largest magnitude accepted for a caller-supplied amount. Keeps every
/// derived amount (percentages, multiples of months) inside `Decimal` range.
pub const MAX_AMOUNT: f64 = 1e15;

/// Converts a caller-supplied number into a decimal. NaN, infinities and
/// values beyond [`MAX_AMOUNT`] are rejected.
pub fn to_decimal(value: f64, field: &str) -> Result<Decimal, AdvisorError> {
    if !value.is_finite() {
        return Err(AdvisorError::InvalidInput(format!(
            "{field} must be a finite number"
        )));
    }
    if value.abs() > MAX_AMOUNT {
        return Err(AdvisorError::InvalidInput(format!(
            "{field} is out of range, the limit is {MAX_AMOUNT:e}"
        )));
    }
    Decimal::from_f64(value)
        .ok_or_else(|| AdvisorError::InvalidInput(format!("{field} is out of range")))
}

/// Rounds to the smallest currency unit, half away from zero.
pub fn round_to_unit(amount: Decimal, decimal_places: u32) -> Decimal {
    amount.round_dp_with_strategy(decimal_places, RoundingStrategy::MidpointAwayFromZero)
}

/// Formats a whole amount with thousands separators for advisory text, e.g.
/// `150000` with symbol `₹` becomes `₹150,000`.
pub fn format_amount(amount: Decimal, symbol: &str) -> String {
    let rounded = round_to_unit(amount, 0);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    let digits = rounded.abs().trunc().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{sign}{symbol}{grouped}")
}
