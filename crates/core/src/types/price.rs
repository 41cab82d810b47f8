//! Type-safe price representation using decimal arithmetic.
//!
//! Marketstall sells in a single currency, so a price is just a decimal
//! amount in major units (dollars). Payment gateways want integer minor
//! units (cents); see [`Price::to_minor_units`].

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, Mul};

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Errors converting a price for the payment gateway.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// Prices sent to the gateway must not be negative.
    #[error("price cannot be negative: {0}")]
    Negative(Decimal),
    /// The minor-unit amount does not fit in an `i64`.
    #[error("price out of range: {0}")]
    OutOfRange(Decimal),
}

/// A monetary amount in the store currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// The zero amount.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a price from a decimal amount in major units.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create a price from whole cents, e.g. `from_cents(1999)` is `$19.99`.
    #[must_use]
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, 2))
    }

    /// The decimal amount in major units.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Convert to integer minor units (cents), rounding half away from zero.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Negative` for negative amounts and
    /// `PriceError::OutOfRange` if the result overflows `i64`.
    pub fn to_minor_units(&self) -> Result<i64, PriceError> {
        if self.0.is_sign_negative() && !self.0.is_zero() {
            return Err(PriceError::Negative(self.0));
        }

        let cents = self
            .0
            .checked_mul(Decimal::ONE_HUNDRED)
            .ok_or(PriceError::OutOfRange(self.0))?
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);

        cents.to_i64().ok_or(PriceError::OutOfRange(self.0))
    }
}

impl From<Decimal> for Price {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Mul<u32> for Price {
    type Output = Self;

    fn mul(self, quantity: u32) -> Self::Output {
        Self(self.0 * Decimal::from(quantity))
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.0)
    }
}
