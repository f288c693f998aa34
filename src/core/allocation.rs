//! Percentage splits with exact remainder assignment

use crate::core::currency::round_to_unit;
use rust_decimal::Decimal;

/// Splits `total` according to `percentages`, rounding each share to
/// `decimal_places`. The share at `remainder_index` receives whatever is left
/// after the others are rounded, so the shares always sum to `total`.
pub fn split_by_percentages(
    total: Decimal,
    percentages: &[Decimal],
    remainder_index: usize,
    decimal_places: u32,
) -> Vec<Decimal> {
    let mut shares: Vec<Decimal> = percentages
        .iter()
        .map(|pct| round_to_unit(total * (*pct / Decimal::ONE_HUNDRED), decimal_places))
        .collect();

    if remainder_index < shares.len() {
        let others: Decimal = shares
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != remainder_index)
            .map(|(_, share)| *share)
            .sum();
        shares[remainder_index] = total - others;
    }

    shares
}

/// Index of the largest percentage; the first one wins on ties.
pub fn largest_share_index(percentages: &[Decimal]) -> usize {
    percentages
        .iter()
        .enumerate()
        .fold((0, Decimal::MIN), |(best, best_pct), (i, pct)| {
            if *pct > best_pct { (i, *pct) } else { (best, best_pct) }
        })
        .0
}
