//! # Money Module
//!
//! Provides the `Money` type for every total the engine persists.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ROUND-TRIP REQUIREMENT                                                 │
//! │                                                                         │
//! │  Order totals are stored, then recomputed from stored lines on every   │
//! │  retry / audit. Floats drift:                                           │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌                                  │
//! │                                                                         │
//! │  Integer minor units never drift:                                      │
//! │    recompute(lines) == stored grand_total  ✅                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use rentline_core::money::Money;
//! use rentline_core::types::Rate;
//!
//! let subtotal = Money::from_cents(100_000);           // 1000.00
//! let tax = subtotal.apply_rate(Rate::from_bps(1800)); // 18%
//! assert_eq!(tax.cents(), 18_000);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::types::Rate;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit.
///
/// ## Where Money Flows
/// ```text
/// Product.price ──► OrderLine.unit_price (snapshot) ──► subtotal
///                                                          │
///      tax = subtotal × rate ◄─────────────────────────────┤
///      discount = coupon(subtotal) ◄───────────────────────┤
///      late_fee = overdue periods × unit_price × multiplier │
///                                                          ▼
///                                                    grand_total ──► Invoice.amount
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ```rust
    /// use rentline_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Applies a basis-point rate, rounding half away from zero.
    ///
    /// ## Implementation
    /// Integer math in i128: `(amount × bps ± 5000) / 10000`.
    /// The ±5000 term is half a unit, so 0.5 cents rounds away from zero.
    ///
    /// ```rust
    /// use rentline_core::money::Money;
    /// use rentline_core::types::Rate;
    ///
    /// // 10.00 × 8.25% = 0.825 → 0.83
    /// let tax = Money::from_cents(1000).apply_rate(Rate::from_bps(825));
    /// assert_eq!(tax.cents(), 83);
    /// ```
    pub fn apply_rate(&self, rate: Rate) -> Money {
        let product = self.0 as i128 * rate.bps() as i128;
        let half = if product < 0 { -5000 } else { 5000 };
        Money::from_cents(((product + half) / 10000) as i64)
    }

    /// Restricts the value to `[min, max]`.
    ///
    /// Used for discounts, which may never go below zero nor exceed the
    /// subtotal they are taken from.
    pub fn clamp_between(self, min: Money, max: Money) -> Money {
        if max < min {
            return min;
        }
        Money(self.0.clamp(min.0, max.0))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Debug-style display, e.g. `1000.50`. Currency formatting is the UI's job.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(Money::default(), Money::zero());
        assert!(Money::zero().is_zero());
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(1099)), "10.99");
        assert_eq!(format!("{}", Money::from_cents(500)), "5.00");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-5.50");
    }

    #[test]
    fn test_arithmetic_and_sum() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3).cents(), 3000);

        let total: Money = vec![a, b, b].into_iter().sum();
        assert_eq!(total.cents(), 2000);
    }

    #[test]
    fn test_apply_rate_rounds_half_up() {
        // 10.00 at 8.25% = 0.825 → 0.83
        let tax = Money::from_cents(1000).apply_rate(Rate::from_bps(825));
        assert_eq!(tax.cents(), 83);

        // 1000.00 at 18% = 180.00 exactly
        let tax = Money::from_cents(100_000).apply_rate(Rate::from_bps(1800));
        assert_eq!(tax.cents(), 18_000);
    }

    #[test]
    fn test_apply_rate_above_one() {
        // 1.5x multiplier on 5.00
        let fee = Money::from_cents(500).apply_rate(Rate::from_bps(15_000));
        assert_eq!(fee.cents(), 750);
    }

    #[test]
    fn test_clamp_between() {
        let subtotal = Money::from_cents(1000);
        assert_eq!(Money::from_cents(1500).clamp_between(Money::zero(), subtotal), subtotal);
        assert_eq!(Money::from_cents(-10).clamp_between(Money::zero(), subtotal), Money::zero());
        assert_eq!(Money::from_cents(250).clamp_between(Money::zero(), subtotal).cents(), 250);
    }
}
