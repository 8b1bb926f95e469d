//! # Pricing Engine
//!
//! Pure functions from line data and configuration to order totals.
//!
//! ## Formulas
//! ```text
//! subtotal    = Σ line.unit_price × line.quantity
//! tax         = subtotal × tax_rate                        (half-up to cent)
//! discount    = fixed | subtotal × percent,   clamped to [0, subtotal]
//! late_fee    = Σ ceil(overdue / unit) × line.unit_price × multiplier
//! grand_total = subtotal + tax − discount + shipping + late_fee
//! ```
//!
//! Same inputs, same outputs: a retried request recomputes identical totals,
//! and `Totals::compute` over a stored order equals the stored totals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{AppliedDiscount, DiscountKind, DurationUnit, OrderLine, Rate};

// =============================================================================
// Totals
// =============================================================================

/// The monetary breakdown persisted on every order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Totals {
    pub subtotal: Money,
    pub tax: Money,
    pub discount: Money,
    pub shipping: Money,
    pub late_fee: Money,
    pub grand_total: Money,
}

impl Totals {
    /// Computes the full breakdown.
    ///
    /// `shipping` and `late_fee` are inputs: shipping is fixed at quotation
    /// time and the late fee is fixed at return time.
    pub fn compute(
        lines: &[OrderLine],
        tax_rate: Rate,
        discount: Option<&AppliedDiscount>,
        shipping: Money,
        late_fee: Money,
    ) -> Totals {
        let subtotal = subtotal(lines);
        let tax = tax(subtotal, tax_rate);
        let discount = discount_amount(subtotal, discount);
        Totals {
            subtotal,
            tax,
            discount,
            shipping,
            late_fee,
            grand_total: grand_total(subtotal, tax, discount, shipping, late_fee),
        }
    }
}

// =============================================================================
// Components
// =============================================================================

/// `Σ unit_price × quantity`.
pub fn subtotal(lines: &[OrderLine]) -> Money {
    lines.iter().map(OrderLine::line_total).sum()
}

/// `subtotal × rate`, rounded half-up to the cent.
#[inline]
pub fn tax(subtotal: Money, rate: Rate) -> Money {
    subtotal.apply_rate(rate)
}

/// The discount a coupon grants on `subtotal`, clamped to `[0, subtotal]`.
pub fn discount_amount(subtotal: Money, discount: Option<&AppliedDiscount>) -> Money {
    let Some(discount) = discount else {
        return Money::zero();
    };

    let raw = match discount.kind {
        DiscountKind::Fixed => Money::from_cents(discount.value),
        DiscountKind::Percent => {
            let bps = u32::try_from(discount.value.max(0)).unwrap_or(u32::MAX);
            subtotal.apply_rate(Rate::from_bps(bps))
        }
    };

    raw.clamp_between(Money::zero(), subtotal.max(Money::zero()))
}

/// Number of whole (rounded up) duration units between `ends_at` and
/// `returned_at`. Zero when returned on time or early.
pub fn overdue_periods(
    ends_at: DateTime<Utc>,
    returned_at: DateTime<Utc>,
    unit: DurationUnit,
) -> i64 {
    let overdue_ms = (returned_at - ends_at).num_milliseconds();
    if overdue_ms <= 0 {
        return 0;
    }
    let unit_ms = unit.length().num_milliseconds();
    (overdue_ms + unit_ms - 1) / unit_ms
}

/// Late fee for one returned line:
/// `overdue_periods × unit_price × multiplier`.
pub fn line_late_fee(line: &OrderLine, returned_at: DateTime<Utc>, multiplier: Rate) -> Money {
    let periods = overdue_periods(line.ends_at, returned_at, line.duration_unit);
    (line.unit_price * periods).apply_rate(multiplier)
}

/// Late fee for a set of lines returned together.
pub fn late_fee(lines: &[OrderLine], returned_at: DateTime<Utc>, multiplier: Rate) -> Money {
    lines
        .iter()
        .map(|line| line_late_fee(line, returned_at, multiplier))
        .sum()
}

#[inline]
pub fn grand_total(
    subtotal: Money,
    tax: Money,
    discount: Money,
    shipping: Money,
    late_fee: Money,
) -> Money {
    subtotal + tax - discount + shipping + late_fee
}

// =============================================================================
// Unit Tests
// =============================================================================
