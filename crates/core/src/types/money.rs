//! Amounts in minor currency units.
//!
//! Printful quotes retail prices as decimal strings in the major unit
//! (`"19.99"`), Stripe expects integers in the minor unit (`1999`). The
//! conversion uses exact decimal arithmetic so `"19.99"` is always `1999`.

use core::fmt;
use core::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a major-unit price.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    /// The input is not a decimal number.
    #[error("invalid decimal amount: {0:?}")]
    Invalid(String),
    /// The amount is below zero.
    #[error("amount cannot be negative: {0}")]
    Negative(String),
    /// The amount does not fit in minor units.
    #[error("amount out of range: {0}")]
    OutOfRange(String),
}

/// A non-negative amount in minor currency units (cents for USD).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MinorUnits(u64);

impl MinorUnits {
    /// Zero.
    pub const ZERO: Self = Self(0);

    /// Create an amount from minor units.
    #[must_use]
    pub const fn new(amount: u64) -> Self {
        Self(amount)
    }

    /// Get the amount in minor units.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Convert a decimal major-unit string (e.g. `"19.99"`) to minor units.
    ///
    /// The value is scaled by 100 exactly; sub-cent fractions round half away
    /// from zero (`"0.005"` becomes `1`).
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not a decimal, is negative, or
    /// overflows `u64` minor units.
    pub fn from_major_str(s: &str) -> Result<Self, MoneyError> {
        let trimmed = s.trim();
        let major =
            Decimal::from_str(trimmed).map_err(|_| MoneyError::Invalid(trimmed.to_owned()))?;

        if major.is_sign_negative() && !major.is_zero() {
            return Err(MoneyError::Negative(trimmed.to_owned()));
        }

        major
            .checked_mul(Decimal::ONE_HUNDRED)
            .map(|minor| minor.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
            .and_then(|minor| minor.to_u64())
            .map(Self)
            .ok_or_else(|| MoneyError::OutOfRange(trimmed.to_owned()))
    }

    /// Multiply a unit price by a quantity, `None` on overflow.
    #[must_use]
    pub fn checked_mul(self, quantity: u32) -> Option<Self> {
        self.0.checked_mul(u64::from(quantity)).map(Self)
    }

    /// Add two amounts, `None` on overflow.
    #[must_use]
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }
}

impl fmt::Display for MinorUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for MinorUnits {
    fn from(amount: u64) -> Self {
        Self(amount)
    }
}
