//! Monetary amounts.

use core::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Non-negative monetary amount with a fixed scale of two decimal places.
///
/// Serialized as a decimal string (`"19.99"`); accepts strings or numbers on
/// input.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    /// Number of fractional digits every amount is normalised to.
    pub const SCALE: u32 = 2;

    pub fn zero() -> Self {
        Self(Decimal::new(0, Self::SCALE))
    }

    /// Build from an integer number of cents.
    pub fn from_cents(cents: i64) -> Result<Self, DomainError> {
        Self::new(Decimal::new(cents, Self::SCALE))
    }

    /// Amounts with more than two significant fractional digits are rejected
    /// rather than rounded.
    pub fn new(value: Decimal) -> Result<Self, DomainError> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(DomainError::validation("amount must not be negative"));
        }
        if value.normalize().scale() > Self::SCALE {
            return Err(DomainError::validation(format!(
                "amount {value} has more than {} decimal places",
                Self::SCALE
            )));
        }
        // Drop the sign of `-0`.
        let mut value = if value.is_zero() { Decimal::ZERO } else { value };
        value.rescale(Self::SCALE);
        Ok(Self(value))
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl TryFrom<Decimal> for Money {
    type Error = DomainError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Money> for Decimal {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl FromStr for Money {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s.trim())
            .map_err(|e| DomainError::validation(format!("amount: {e}")))?;
        Self::new(value)
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}
