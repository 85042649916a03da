//! Money amounts using decimal arithmetic.
//!
//! The shop trades in a single currency, so `Money` is just a decimal amount
//! rounded to cents. The backend may send prices either as JSON numbers or
//! strings; both deserialize.

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, Sub};

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// A non-negative amount of money in the shop currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Zero.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create an amount, rounded half-up to cents.
    #[must_use]
    pub fn new(amount: Decimal) -> Self {
        Self(amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
    }

    /// Create an amount from a whole number of cents.
    #[must_use]
    pub const fn from_cents(cents: i64) -> Self {
        let decimal = Decimal::try_new(cents, 2);
        let amount = match &decimal {
            Ok(d) => *d,
            Err(_) => panic!("scale 2 is within Decimal's maximum precision"),
        };
        core::mem::forget(decimal);
        Self(amount)
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Price of `quantity` units.
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        Self::new(self.0 * Decimal::from(quantity))
    }

    /// Apply a percentage discount (clamped to 0..=100).
    #[must_use]
    pub fn discounted(self, percent: u8) -> Self {
        let percent = Decimal::from(percent.min(100));
        Self::new(self.0 * (Decimal::ONE_HUNDRED - percent) / Decimal::ONE_HUNDRED)
    }

    /// Divide evenly, returning zero for a zero divisor.
    #[must_use]
    pub fn average_over(self, count: usize) -> Self {
        if count == 0 {
            return Self::ZERO;
        }
        Self::new(self.0 / Decimal::from(count))
    }

    /// Whether the amount is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Lossy conversion for chart scaling.
    #[must_use]
    pub fn to_f64(&self) -> f64 {
        use rust_decimal::prelude::ToPrimitive;
        self.0.to_f64().unwrap_or(0.0)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Self;

    /// Saturates at zero.
    fn sub(self, rhs: Self) -> Self {
        Self((self.0 - rhs.0).max(Decimal::ZERO))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Self> for Money {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.0)
    }
}

impl std::str::FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches('$');
        Decimal::from_str_exact(trimmed).map(Self::new)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_always_two_decimals() {
        assert_eq!(Money::from_cents(1999).to_string(), "$19.99");
        assert_eq!(Money::from_cents(500).to_string(), "$5.00");
        assert_eq!(Money::ZERO.to_string(), "$0.00");
    }

    #[test]
    fn test_discount_rounds_half_up() {
        // 25% off 19.99 = 14.9925 -> 14.99
        assert_eq!(Money::from_cents(1999).discounted(25), Money::from_cents(1499));
        // 50% off 0.05 = 0.025 -> 0.03
        assert_eq!(Money::from_cents(5).discounted(50), Money::from_cents(3));
        assert_eq!(Money::from_cents(1000).discounted(150), Money::ZERO);
        assert_eq!(Money::from_cents(1000).discounted(0), Money::from_cents(1000));
    }

    #[test]
    fn test_times_and_sum() {
        let lines = [Money::from_cents(1250).times(2), Money::from_cents(99).times(3)];
        assert_eq!(lines.iter().sum::<Money>(), Money::from_cents(2797));
    }

    #[test]
    fn test_sub_saturates() {
        assert_eq!(Money::from_cents(100) - Money::from_cents(250), Money::ZERO);
    }

    #[test]
    fn test_average_over_zero_count() {
        assert_eq!(Money::from_cents(1000).average_over(0), Money::ZERO);
        assert_eq!(Money::from_cents(1000).average_over(3), Money::from_cents(333));
    }

    #[test]
    fn test_parse_accepts_dollar_sign() {
        assert_eq!("$12.5".parse::<Money>().unwrap(), Money::from_cents(1250));
        assert!("twelve".parse::<Money>().is_err());
    }

    #[test]
    fn test_deserialize_number_or_string() {
        let from_number: Money = serde_json::from_str("49.9").unwrap();
        let from_string: Money = serde_json::from_str("\"49.90\"").unwrap();
        assert_eq!(from_number, from_string);
    }
}
