//! # Money
//!
//! Amounts are whole cents in an `i64`. Line totals and order totals are
//! integer products and sums, so an order total always equals the sum of
//! its lines exactly; summing `f64` prices does not (`0.1 + 0.2 != 0.3`).
//!
//! Decimal amounts only exist at the HTTP boundary, where
//! [`Money::from_major_units`] converts them once and rejects anything with
//! more than two fractional digits.
//!
//! ## Usage
//! ```rust
//! use pharmatrade_core::money::Money;
//!
//! let price = Money::from_cents(1099); // 10.99
//! let line = price.checked_mul_quantity(3).unwrap();
//! assert_eq!(line.cents(), 3297);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Mul;
use ts_rs::TS;

/// An amount in cents. Signed to match SQLite INTEGER; catalog validation
/// keeps prices non-negative.
///
/// ## Flow Through an Order
/// ```text
/// Product.price_cents ──► locked read ──► PricedLine.unit_price
///                                              │
///                                              ▼
///                         OrderLine.unit_price_cents (frozen copy)
///                                              │
///                                              ▼
///                         Order.total_cents = Σ line totals
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use pharmatrade_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Converts a decimal amount in major units (e.g. `12.5`) to Money.
    ///
    /// Returns `None` for non-finite values, values with more than two
    /// fractional digits, and values outside the i64 cent range.
    ///
    /// ## Example
    /// ```rust
    /// use pharmatrade_core::money::Money;
    ///
    /// assert_eq!(Money::from_major_units(12.5).unwrap().cents(), 1250);
    /// assert_eq!(Money::from_major_units(0.1 + 0.2).unwrap().cents(), 30);
    /// assert!(Money::from_major_units(1.005).is_none());
    /// assert!(Money::from_major_units(f64::NAN).is_none());
    /// ```
    pub fn from_major_units(amount: f64) -> Option<Self> {
        if !amount.is_finite() {
            return None;
        }

        let scaled = amount * 100.0;
        let rounded = scaled.round();

        // Tolerance absorbs binary representation noise (0.1 + 0.2), not
        // real sub-cent precision.
        if (scaled - rounded).abs() > 1e-6 {
            return None;
        }

        if rounded >= i64::MAX as f64 || rounded <= i64::MIN as f64 {
            return None;
        }

        Some(Money(rounded as i64))
    }

    /// Returns the value in cents (smallest currency unit).
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the value in major units, for JSON display only.
    #[inline]
    pub fn as_major_units(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Always 0-99.
    #[inline]
    const fn minor(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Multiplies money by a quantity, `None` on overflow.
    ///
    /// ## Example
    /// ```rust
    /// use pharmatrade_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(299);
    /// assert_eq!(unit_price.checked_mul_quantity(3).unwrap().cents(), 897);
    /// assert!(Money::from_cents(i64::MAX).checked_mul_quantity(2).is_none());
    /// ```
    #[inline]
    pub const fn checked_mul_quantity(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Adds two amounts, `None` on overflow.
    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }
}

/// Shows money as `12.50`. Currency symbols are a frontend concern.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor())
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
