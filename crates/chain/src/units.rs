//! Conversions between the chain's smallest balance unit and display units.

use alloy::primitives::U256;

/// Base-unit divisor: 10^18 smallest units per whole coin or token.
pub const BASE_UNIT_DIVISOR: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);

/// Fractional digits kept in [`to_decimal_string`].
pub const DECIMAL_PRECISION: usize = 18;

/// Exact fixed-point rendering, e.g. `1500000000000000000` → `"1.500000000000000000"`.
pub fn to_decimal_string(value: U256) -> String {
    let whole = value / BASE_UNIT_DIVISOR;
    let fraction = value % BASE_UNIT_DIVISOR;
    format!(
        "{whole}.{:0>width$}",
        fraction.to_string(),
        width = DECIMAL_PRECISION
    )
}

/// Best-effort floating value, for display and sorting only.
///
/// The reference value is `value / 10^18` computed in a 100-bit binary float
/// and converted to `f64`. Here the exact decimal rendering is parsed
/// instead, which rounds once to the nearest `f64` and therefore never lands
/// further from the true quotient than the reference does.
pub fn to_float(value: U256) -> f64 {
    to_decimal_string(value).parse().unwrap_or(f64::MAX)
}

/// Whole units, truncated. Saturates at `i64::MAX`.
pub fn to_whole_units(value: U256) -> i64 {
    i64::try_from(value / BASE_UNIT_DIVISOR).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_and_a_half_coins() {
        let raw = U256::from(1_500_000_000_000_000_000u128);
        assert_eq!(to_decimal_string(raw), "1.500000000000000000");
        assert!((to_float(raw) - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn sub_unit_balance_keeps_leading_zeros() {
        assert_eq!(to_decimal_string(U256::from(42u64)), "0.000000000000000042");
        assert_eq!(to_decimal_string(U256::ZERO), "0.000000000000000000");
    }

    #[test]
    fn whole_units_truncate() {
        let raw = U256::from(2_500_000_000_000_000_000u128);
        assert_eq!(to_whole_units(raw), 2);
        assert_eq!(to_whole_units(U256::MAX), i64::MAX);
    }

    #[test]
    fn float_is_the_nearest_f64_of_the_quotient() {
        assert_eq!(to_float(U256::from(1u64)), 1e-18);
        assert_eq!(to_float(U256::from(123_456_789u64)), 1.23456789e-10);
        assert_eq!(to_float(BASE_UNIT_DIVISOR * U256::from(3u64)), 3.0);
    }
}
