//! Amount - Non-negative fixed-point decimal for monetary values
//!
//! All monetary values in cardgate carry four fractional digits and are
//! non-negative. Both properties are enforced at the type level: the
//! constructor rejects negative values and normalizes the scale, rounding
//! half-up when the input carries more precision.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Number of fractional digits carried by every amount.
pub const SCALE: u32 = 4;

/// Errors that can occur when working with amounts
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("Amount cannot be negative: {0}")]
    NegativeAmount(Decimal),

    #[error("Invalid amount: {0}")]
    Invalid(String),

    #[error("Amount overflow")]
    Overflow,
}

/// A non-negative monetary amount with four fractional digits.
///
/// # Invariant
/// The inner value is always >= 0 and scaled to four decimals. Enforced by
/// the constructor.
///
/// # Example
/// ```
/// use cardgate_core::Amount;
/// use rust_decimal::Decimal;
///
/// let amount = Amount::new(Decimal::new(125_50, 2)).unwrap();
/// assert_eq!(amount.to_string(), "125.5000");
///
/// let negative = Amount::new(Decimal::new(-1, 0));
/// assert!(negative.is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    /// Zero amount constant
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a new Amount from a Decimal.
    ///
    /// Rounds half-up to four fractional digits. Returns an error if the
    /// value is negative.
    pub fn new(value: Decimal) -> Result<Self, AmountError> {
        if value < Decimal::ZERO {
            return Err(AmountError::NegativeAmount(value));
        }
        Ok(Self(round_to_scale(value)))
    }

    /// Create an Amount without validation.
    ///
    /// The caller MUST ensure the value is non-negative and already at the
    /// canonical scale. Use only for trusted sources (e.g. rows read back
    /// from validated storage).
    #[inline]
    pub const fn new_unchecked(value: Decimal) -> Self {
        Self(value)
    }

    /// Get the inner Decimal value
    #[inline]
    pub const fn value(&self) -> Decimal {
        self.0
    }

    /// Check if the amount is zero
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Checked addition - `None` on overflow
    pub fn checked_add(&self, other: &Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    /// Checked subtraction - `None` if the result would be negative
    pub fn checked_sub(&self, other: &Amount) -> Option<Amount> {
        let result = self.0.checked_sub(other.0)?;
        if result < Decimal::ZERO {
            None
        } else {
            Some(Amount(result))
        }
    }

    /// Subtraction clamped at zero.
    ///
    /// Used for counter reversal, where spent amounts must never go
    /// negative even when the reversed amount exceeds what was recorded.
    pub fn saturating_sub(&self, other: &Amount) -> Amount {
        self.checked_sub(other).unwrap_or(Amount::ZERO)
    }

    /// Multiply by a rate, rounding half-up to four fractional digits.
    ///
    /// Used for FX conversion and channel limit scaling. Returns an error
    /// on overflow or a negative rate.
    pub fn apply_rate(&self, rate: Decimal) -> Result<Amount, AmountError> {
        if rate < Decimal::ZERO {
            return Err(AmountError::NegativeAmount(rate));
        }
        let product = self.0.checked_mul(rate).ok_or(AmountError::Overflow)?;
        Ok(Amount(round_to_scale(product)))
    }

    /// True when the amount is an exact multiple of the given unit.
    pub fn is_multiple_of(&self, unit: Decimal) -> bool {
        if unit.is_zero() {
            return false;
        }
        (self.0 % unit).is_zero()
    }
}

fn round_to_scale(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(SCALE, RoundingStrategy::MidpointAwayFromZero)
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}", self.0)
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = AmountError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl Default for Amount {
    fn default() -> Self {
        Self::ZERO
    }
}

impl std::str::FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: Decimal = s.parse().map_err(|_| AmountError::Invalid(s.to_string()))?;
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_amount_positive() {
        let amount = Amount::new(dec!(100)).unwrap();
        assert_eq!(amount.value(), dec!(100.0000));
    }

    #[test]
    fn test_amount_negative_rejected() {
        let result = Amount::new(dec!(-100));
        assert!(matches!(result, Err(AmountError::NegativeAmount(_))));
    }

    #[test]
    fn test_amount_rounds_half_up_to_four_decimals() {
        let amount = Amount::new(dec!(1.00005)).unwrap();
        assert_eq!(amount.value(), dec!(1.0001));

        let amount = Amount::new(dec!(1.00004)).unwrap();
        assert_eq!(amount.value(), dec!(1.0000));
    }

    #[test]
    fn test_checked_sub_prevents_negative() {
        let a = Amount::new(dec!(50)).unwrap();
        let b = Amount::new(dec!(100)).unwrap();
        assert!(a.checked_sub(&b).is_none());
    }

    #[test]
    fn test_saturating_sub_clamps_at_zero() {
        let a = Amount::new(dec!(50)).unwrap();
        let b = Amount::new(dec!(100)).unwrap();
        assert_eq!(a.saturating_sub(&b), Amount::ZERO);
        assert_eq!(b.saturating_sub(&a).value(), dec!(50.0000));
    }

    #[test]
    fn test_apply_rate_rounds_half_up() {
        let amount = Amount::new(dec!(100)).unwrap();
        let converted = amount.apply_rate(dec!(0.85)).unwrap();
        assert_eq!(converted.value(), dec!(85.0000));

        // 33.3333... rounds at the fourth decimal
        let amount = Amount::new(dec!(100)).unwrap();
        let converted = amount.apply_rate(dec!(0.333333)).unwrap();
        assert_eq!(converted.value(), dec!(33.3333));
    }

    #[test]
    fn test_is_multiple_of() {
        let amount = Amount::new(dec!(500)).unwrap();
        assert!(amount.is_multiple_of(dec!(100)));

        let amount = Amount::new(dec!(550)).unwrap();
        assert!(!amount.is_multiple_of(dec!(100)));
    }

    #[test]
    fn test_display_carries_four_decimals() {
        let amount = Amount::new(dec!(125.5)).unwrap();
        assert_eq!(amount.to_string(), "125.5000");
    }

    #[test]
    fn test_serde_roundtrip() {
        let amount = Amount::new(dec!(123.45)).unwrap();
        let json = serde_json::to_string(&amount).unwrap();
        let parsed: Amount = serde_json::from_str(&json).unwrap();
        assert_eq!(amount, parsed);
    }

    #[test]
    fn test_parse_from_str() {
        let amount: Amount = "125.5000".parse().unwrap();
        assert_eq!(amount.value(), dec!(125.5000));
        assert!("-1".parse::<Amount>().is_err());
    }
}
