//! Rate Value Object
//!
//! A commission percentage (10 means 10%), between 0 and 100.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::money::{Money, MoneyError};

/// Percentage rate
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Rate(Decimal);

impl Rate {
    pub fn new(percent: Decimal) -> Result<Self, RateError> {
        if percent.is_sign_negative() && !percent.is_zero() {
            return Err(RateError::Negative(percent));
        }
        if percent > Decimal::ONE_HUNDRED {
            return Err(RateError::AboveHundred(percent));
        }
        Ok(Self(percent))
    }

    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    pub fn percent(&self) -> Decimal {
        self.0
    }

    /// Scale the rate by a non-negative factor (e.g. the trailing reduction).
    pub fn scaled(&self, factor: Decimal) -> Result<Rate, RateError> {
        let scaled = self.0.checked_mul(factor).ok_or(RateError::AboveHundred(Decimal::MAX))?;
        Rate::new(scaled)
    }

    /// `round(base * rate / 100)` to cents.
    pub fn apply_to(&self, base: Money) -> Result<Money, MoneyError> {
        let raw = base
            .amount()
            .checked_mul(self.0)
            .and_then(|product| product.checked_div(Decimal::ONE_HUNDRED))
            .ok_or(MoneyError::Overflow)?;
        Ok(Money::new(raw)?.rounded())
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl TryFrom<Decimal> for Rate {
    type Error = RateError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Rate::new(value)
    }
}

impl From<Rate> for Decimal {
    fn from(value: Rate) -> Self {
        value.0
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0.normalize())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RateError {
    #[error("rate cannot be negative: {0}")]
    Negative(Decimal),
    #[error("rate cannot exceed 100%: {0}")]
    AboveHundred(Decimal),
    #[error("reduction factor cannot exceed 1: {0}")]
    FactorAboveOne(Decimal),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_apply_rate() {
        let rate = Rate::new(dec!(10)).unwrap();
        assert_eq!(rate.apply_to(Money::new(dec!(100)).unwrap()).unwrap().amount(), dec!(10.00));
    }

    #[test]
    fn test_fractional_rate_rounds_to_cents() {
        let rate = Rate::new(dec!(2.5)).unwrap();
        // 33.33 * 2.5% = 0.83325
        assert_eq!(rate.apply_to(Money::new(dec!(33.33)).unwrap()).unwrap().amount(), dec!(0.83));
    }

    #[test]
    fn test_zero_rate() {
        assert!(Rate::zero().apply_to(Money::new(dec!(999)).unwrap()).unwrap().is_zero());
    }

    #[test]
    fn test_scaled() {
        let rate = Rate::new(dec!(5)).unwrap().scaled(dec!(0.5)).unwrap();
        assert_eq!(rate.percent(), dec!(2.5));
        assert!(Rate::new(dec!(5)).unwrap().scaled(dec!(-1)).is_err());
    }

    #[test]
    fn test_bounded_to_one_hundred() {
        assert!(Rate::new(dec!(100)).is_ok());
        assert_eq!(Rate::new(dec!(100.01)), Err(RateError::AboveHundred(dec!(100.01))));
        assert!(Rate::new(dec!(60)).unwrap().scaled(dec!(2)).is_err());
    }

    #[test]
    fn test_apply_overflow_is_an_error() {
        let rate = Rate::new(dec!(10)).unwrap();
        let max = Money::new(Decimal::MAX).unwrap();
        assert_eq!(rate.apply_to(max), Err(MoneyError::Overflow));
    }

    #[test]
    fn test_display() {
        assert_eq!(Rate::new(dec!(12.50)).unwrap().to_string(), "12.5%");
    }
}
