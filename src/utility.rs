//! General utility functions.

use rust_decimal::prelude::*;
use rust_decimal::Decimal;

/// Round price to target tick value
pub fn round_to(value: f64, target: f64) -> f64 {
    let decimal_value = Decimal::from_f64(value).unwrap_or_default();
    let decimal_target = Decimal::from_f64(target).unwrap_or(Decimal::ONE);

    if decimal_target.is_zero() {
        return value;
    }

    let result = (decimal_value / decimal_target).round() * decimal_target;
    result.to_f64().unwrap_or(value)
}

/// Floor to target float number
pub fn floor_to(value: f64, target: f64) -> f64 {
    let decimal_value = Decimal::from_f64(value).unwrap_or_default();
    let decimal_target = Decimal::from_f64(target).unwrap_or(Decimal::ONE);

    if decimal_target.is_zero() {
        return value;
    }

    let result = (decimal_value / decimal_target).floor() * decimal_target;
    result.to_f64().unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(10.126, 0.01), 10.13);
        assert_eq!(round_to(10.124, 0.01), 10.12);
        assert_eq!(round_to(10.5, 0.0), 10.5);
    }

    #[test]
    fn test_floor_to() {
        assert_eq!(floor_to(10.129, 0.01), 10.12);
        assert_eq!(floor_to(199.9, 100.0), 100.0);
    }
}
