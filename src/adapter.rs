//! Adapter layer: converts between the engine's f64 balances and `Decimal`
//! used for exact ledger totals.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

/// Convert f64 to Decimal (lossy but sufficient for simulation).
/// Non-finite values map to zero.
pub fn to_decimal(v: f64) -> Decimal {
    Decimal::from_f64(v).unwrap_or(Decimal::ZERO)
}

/// Convert Decimal to f64.
pub fn from_decimal(d: Decimal) -> f64 {
    d.to_f64().unwrap_or(0.0)
}

/// Exact sum of f64 amounts.
pub fn decimal_sum<I: IntoIterator<Item = f64>>(values: I) -> Decimal {
    values.into_iter().map(to_decimal).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_round_trip() {
        assert_eq!(to_decimal(12.5), dec!(12.5));
        assert!((from_decimal(dec!(0.25)) - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_non_finite_maps_to_zero() {
        assert_eq!(to_decimal(f64::NAN), Decimal::ZERO);
        assert_eq!(to_decimal(f64::INFINITY), Decimal::ZERO);
    }

    #[test]
    fn test_decimal_sum_avoids_float_drift() {
        let total = decimal_sum(vec![0.1; 10]);
        assert_eq!(total, dec!(1.0));
    }
}
