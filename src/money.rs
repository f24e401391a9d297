//! Decimal arithmetic for prices and stock quantities.
//!
//! Values are stored and serialized as `f64` (like every other numeric field in
//! the store), but every sum, product and rounding step goes through `Decimal`
//! so that `0.1 kg + 0.2 kg` stays `0.3 kg`.

use crate::error::InventoryError;
use rust_decimal::prelude::*;

/// Weight and volume quantities keep three decimal places.
pub const QUANTITY_PLACES: u32 = 3;

/// Revenue and cost totals keep two decimal places.
pub const MONEY_PLACES: u32 = 2;

/// Largest accepted unit price. With MAX_QUANTITY this keeps every line
/// total below 1e18 and any sum over u32::MAX products inside Decimal range.
pub const MAX_PRICE: f64 = 1e9;

/// Largest quantity a movement or a stored stock level may reach.
pub const MAX_QUANTITY: f64 = 1e9;

/// Convert f64 to Decimal for calculation
#[inline]
pub fn to_decimal(value: f64) -> Result<Decimal, InventoryError> {
    Decimal::from_f64(value).ok_or(InventoryError::OutOfRange(value))
}

/// Convert Decimal back to f64 for storage
#[inline]
pub fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or_default()
}

/// Round a weight/volume quantity to three decimals, half away from zero.
/// Values Decimal cannot hold come back unchanged; callers bound them first.
pub fn round_quantity(value: f64) -> f64 {
    match Decimal::from_f64(value) {
        Some(d) => to_f64(
            d.round_dp_with_strategy(QUANTITY_PLACES, RoundingStrategy::MidpointAwayFromZero),
        ),
        None => value,
    }
}

/// Drop the fractional part (discrete units and packets).
pub fn truncate_quantity(value: f64) -> f64 {
    value.trunc()
}

pub fn is_whole(value: f64) -> bool {
    value.is_finite() && value.fract() == 0.0
}

/// `a > b` compared in Decimal.
pub fn exceeds(a: f64, b: f64) -> Result<bool, InventoryError> {
    Ok(to_decimal(a)? > to_decimal(b)?)
}

/// `a + b` without binary floating point drift.
pub fn add_quantities(a: f64, b: f64) -> Result<f64, InventoryError> {
    to_decimal(a)?
        .checked_add(to_decimal(b)?)
        .map(to_f64)
        .ok_or(InventoryError::Overflow)
}

/// `quantity × unit_price`, rounded to cents.
pub fn line_total(quantity: f64, unit_price: f64) -> Result<f64, InventoryError> {
    let total = to_decimal(quantity)?
        .checked_mul(to_decimal(unit_price)?)
        .ok_or(InventoryError::Overflow)?;
    Ok(to_f64(
        total.round_dp_with_strategy(MONEY_PLACES, RoundingStrategy::MidpointAwayFromZero),
    ))
}

/// Sum of money amounts, rounded to cents.
pub fn sum_money<I: IntoIterator<Item = f64>>(values: I) -> Result<f64, InventoryError> {
    let total = values.into_iter().try_fold(Decimal::ZERO, |acc, value| {
        acc.checked_add(to_decimal(value)?).ok_or(InventoryError::Overflow)
    })?;
    Ok(to_f64(
        total.round_dp_with_strategy(MONEY_PLACES, RoundingStrategy::MidpointAwayFromZero),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_quantities_has_no_float_drift() {
        assert_eq!(add_quantities(0.1, 0.2).unwrap(), 0.3);
        assert_eq!(add_quantities(2.5, -0.75).unwrap(), 1.75);
    }

    #[test]
    fn test_round_quantity() {
        assert_eq!(round_quantity(1.23456), 1.235);
        assert_eq!(round_quantity(0.0005), 0.001);
        assert_eq!(round_quantity(7.0), 7.0);
    }

    #[test]
    fn test_truncate_and_whole() {
        assert_eq!(truncate_quantity(9.99), 9.0);
        assert!(is_whole(12.0));
        assert!(!is_whole(12.5));
        assert!(!is_whole(f64::NAN));
        assert_eq!(truncate_quantity(1e30), 1e30);
    }

    #[test]
    fn test_line_total_rounds_to_cents() {
        assert_eq!(line_total(3.0, 19.99).unwrap(), 59.97);
        assert_eq!(line_total(0.333, 10.0).unwrap(), 3.33);
        assert_eq!(sum_money(vec![0.1, 0.2, 0.3]).unwrap(), 0.6);
    }

    #[test]
    fn test_overflow_is_an_error_not_a_panic() {
        assert!(matches!(line_total(1e15, 1e15), Err(InventoryError::Overflow)));
        assert!(matches!(sum_money(vec![5e28, 5e28]), Err(InventoryError::Overflow)));
        assert!(matches!(add_quantities(7e28, 7e28), Err(InventoryError::Overflow)));
    }

    #[test]
    fn test_values_beyond_decimal_range_are_rejected() {
        assert!(matches!(to_decimal(1e29), Err(InventoryError::OutOfRange(_))));
        assert!(matches!(line_total(1.0, 1e29), Err(InventoryError::OutOfRange(_))));
        assert!(to_decimal(f64::NAN).is_err());
        assert_eq!(round_quantity(1e30), 1e30);
    }

    #[test]
    fn test_largest_line_total_fits() {
        assert_eq!(line_total(MAX_QUANTITY, MAX_PRICE).unwrap(), 1e18);
    }
}
