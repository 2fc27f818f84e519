//! Currency amount conversion.
//!
//! The gateway bills in minor units (centavos) while the storefront works
//! in major units (reais). Conversion rounds half away from zero rather
//! than truncating, so `19.995` becomes `2000` centavos and not `1999`.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

/// Errors converting a major-unit amount into minor units.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    /// Amount is zero or negative.
    #[error("amount must be positive, got {0}")]
    NotPositive(Decimal),

    /// Amount does not fit in an integer number of minor units.
    #[error("amount out of range: {0}")]
    OutOfRange(Decimal),
}

/// Convert a major-unit amount (e.g. reais) into whole minor units
/// (centavos), rounding half away from zero.
///
/// # Errors
///
/// Returns [`MoneyError::NotPositive`] for zero or negative amounts and
/// [`MoneyError::OutOfRange`] when the result does not fit in `i64`.
pub fn to_minor_units(amount: Decimal) -> Result<i64, MoneyError> {
    if amount <= Decimal::ZERO {
        return Err(MoneyError::NotPositive(amount));
    }

    let cents = (amount * Decimal::from(100))
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);

    cents.to_i64().ok_or(MoneyError::OutOfRange(amount))
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_whole_amount() {
        assert_eq!(to_minor_units(dec!(25)), Ok(2500));
    }

    #[test]
    fn test_fractional_amount() {
        assert_eq!(to_minor_units(dec!(19.9)), Ok(1990));
    }

    #[test]
    fn test_rounds_instead_of_truncating() {
        assert_eq!(to_minor_units(dec!(19.995)), Ok(2000));
        assert_eq!(to_minor_units(dec!(19.994)), Ok(1999));
    }

    #[test]
    fn test_sub_centavo_amount_rounds_up() {
        assert_eq!(to_minor_units(dec!(0.005)), Ok(1));
    }

    #[test]
    fn test_zero_rejected() {
        assert_eq!(
            to_minor_units(Decimal::ZERO),
            Err(MoneyError::NotPositive(Decimal::ZERO))
        );
    }

    #[test]
    fn test_negative_rejected() {
        assert!(matches!(
            to_minor_units(dec!(-1)),
            Err(MoneyError::NotPositive(_))
        ));
    }
}
