//! Money Value Object
//!
//! Non-negative monetary amount. Commission math runs at full precision
//! and settles to cents through [`Money::rounded`].

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::Add;

/// Decimal places money settles to.
pub const MONEY_SCALE: u32 = 2;

/// Money value object
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    /// Create a new money value
    pub fn new(amount: Decimal) -> Result<Self, MoneyError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(MoneyError::NegativeAmount);
        }
        Ok(Self(amount))
    }

    /// Create money from cents
    pub fn from_cents(cents: u64) -> Self {
        Self(Decimal::from(cents) / Decimal::ONE_HUNDRED)
    }

    /// Create zero money
    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    /// Get the amount
    pub fn amount(&self) -> Decimal {
        self.0
    }

    /// Round half away from zero to cents
    pub fn rounded(&self) -> Money {
        Money(self.0.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero))
    }

    /// Multiply by a non-negative factor
    pub fn multiply(&self, factor: Decimal) -> Result<Money, MoneyError> {
        Money::new(self.0.checked_mul(factor).ok_or(MoneyError::Overflow)?)
    }

    /// Check if zero
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

/// Saturates at `Decimal::MAX`
impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl TryFrom<Decimal> for Money {
    type Error = MoneyError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Money::new(value)
    }
}

impl From<Money> for Decimal {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoneyError {
    #[error("Amount cannot be negative")]
    NegativeAmount,
    #[error("Amount is out of range")]
    Overflow,
}
