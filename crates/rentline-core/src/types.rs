//! # Domain Types
//!
//! Core domain types used throughout the rental engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Order      │   │    Invoice      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id / vendor_id │   │  id / number    │   │  id / number    │       │
//! │  │  stock (cap)    │   │  status         │   │  order_id (1:1) │       │
//! │  │  price / unit   │   │  lines ─┐       │   │  amount/status  │       │
//! │  └─────────────────┘   │  totals │       │   └─────────────────┘       │
//! │                        └─────────┼───────┘                              │
//! │                                  ▼                                      │
//! │                        ┌─────────────────┐   ┌─────────────────────┐   │
//! │                        │   OrderLine     │──►│ ReservationInterval │   │
//! │                        │  qty, window    │1:1│  level: provisional │   │
//! │                        │  unit_price     │   │   committed, active │   │
//! │                        └─────────────────┘   │   released          │   │
//! │                                              └─────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every status-like field is a closed enum persisted through `sqlx::Type`,
//! so a misspelled status string cannot silently filter rows away.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::Money;
use crate::pricing::Totals;

// =============================================================================
// Rate
// =============================================================================

/// A rate in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// - tax: 1800 bps = 18%
/// - coupon: 1000 bps = 10% off
/// - late-fee multiplier: 10000 bps = 1.0x
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Rate(u32);

impl Rate {
    /// 100% / 1.0x.
    pub const ONE: Rate = Rate(10_000);

    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        Rate(bps)
    }

    /// Creates a rate from a whole percentage (10 → 10%).
    #[inline]
    pub const fn from_percent(pct: u32) -> Self {
        Rate(pct * 100)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Rate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for Rate {
    fn default() -> Self {
        Rate::zero()
    }
}

// =============================================================================
// Duration Unit
// =============================================================================

/// The period a product's price is quoted per.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DurationUnit {
    Hour,
    Day,
    Week,
    /// Fixed 30 days.
    Month,
    /// Fixed 365 days.
    Year,
}

impl DurationUnit {
    /// Length of one billing period.
    pub fn length(&self) -> Duration {
        match self {
            DurationUnit::Hour => Duration::hours(1),
            DurationUnit::Day => Duration::days(1),
            DurationUnit::Week => Duration::weeks(1),
            DurationUnit::Month => Duration::days(30),
            DurationUnit::Year => Duration::days(365),
        }
    }
}

impl Default for DurationUnit {
    fn default() -> Self {
        DurationUnit::Day
    }
}

// =============================================================================
// Product
// =============================================================================

/// A rentable product as seen by the reservation engine.
///
/// Owned by the catalog collaborator. `stock` is the capacity ceiling; the
/// engine only ever reads it. What is currently reserved is computed from
/// reservation intervals, never stored here.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    pub id: String,
    pub vendor_id: String,
    pub name: String,
    /// Total units owned (>= 0).
    pub stock: i64,
    /// Price per `duration_unit`.
    pub price: Money,
    pub duration_unit: DurationUnit,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Commitment Level
// =============================================================================

/// Lifecycle stage of a reservation interval.
///
/// ```text
///  provisional ──confirm──► committed ──pickup──► active
///       │                       │                    │
///       └──cancel──┐    cancel──┘            return──┘
///                  ▼            ▼                    ▼
///                           released
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CommitmentLevel {
    /// Held by a quotation; does not count against capacity.
    Provisional,
    /// Confirmed sales order; counts against capacity.
    Committed,
    /// Physically picked up; counts against capacity.
    Active,
    /// Returned or cancelled; kept for audit only.
    Released,
}

impl CommitmentLevel {
    /// Only committed and active intervals consume stock.
    #[inline]
    pub const fn counts_against_capacity(&self) -> bool {
        matches!(self, CommitmentLevel::Committed | CommitmentLevel::Active)
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            CommitmentLevel::Provisional => "provisional",
            CommitmentLevel::Committed => "committed",
            CommitmentLevel::Active => "active",
            CommitmentLevel::Released => "released",
        }
    }
}

impl fmt::Display for CommitmentLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Reservation Interval
// =============================================================================

/// A time-bounded claim on `quantity` units of a product.
///
/// The window is half-open: `[starts_at, ends_at)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReservationInterval {
    pub id: String,
    pub order_id: String,
    pub order_line_id: String,
    pub product_id: String,
    pub quantity: i64,
    #[ts(as = "String")]
    pub starts_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub ends_at: DateTime<Utc>,
    pub level: CommitmentLevel,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl ReservationInterval {
    /// Half-open overlap test against `[start, end)`.
    #[inline]
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.starts_at < end && start < self.ends_at
    }
}

// =============================================================================
// Order Status
// =============================================================================

/// The status of a rental order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Quotation,
    QuotationSent,
    /// Confirmed; reservations committed.
    SalesOrder,
    Paid,
    PickedUp,
    Returned,
    Cancelled,
}

impl OrderStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Quotation => "quotation",
            OrderStatus::QuotationSent => "quotation_sent",
            OrderStatus::SalesOrder => "sales_order",
            OrderStatus::Paid => "paid",
            OrderStatus::PickedUp => "picked_up",
            OrderStatus::Returned => "returned",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Quotation stages: lines and coupons may still change.
    #[inline]
    pub const fn is_quotation(&self) -> bool {
        matches!(self, OrderStatus::Quotation | OrderStatus::QuotationSent)
    }

    /// Payment has been recorded.
    #[inline]
    pub const fn is_paid(&self) -> bool {
        matches!(
            self,
            OrderStatus::Paid | OrderStatus::PickedUp | OrderStatus::Returned
        )
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Quotation
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Order Line
// =============================================================================

/// An optional variant choice on a line (size, colour, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct VariantSelection {
    pub name: String,
    pub value: String,
}

/// A line of a rental order.
///
/// Uses the snapshot pattern: product name, unit price and duration unit are
/// frozen at add-time so later catalog edits never reprice an order.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderLine {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    /// Product name at add-time (frozen).
    pub product_name: String,
    pub quantity: i64,
    /// Product price per duration unit at add-time (frozen).
    pub unit_price: Money,
    /// Duration unit at add-time (frozen); late fees are counted in it.
    pub duration_unit: DurationUnit,
    #[ts(as = "String")]
    pub starts_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub ends_at: DateTime<Utc>,
    pub variants: Vec<VariantSelection>,
    /// Display order within the order.
    pub position: i64,
    /// The interval this line owns.
    pub reservation: ReservationInterval,
}

impl OrderLine {
    /// `unit_price × quantity`.
    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price * self.quantity
    }
}

// =============================================================================
// Discounts & Coupons
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    /// `value` is basis points of the subtotal.
    Percent,
    /// `value` is an amount in cents.
    Fixed,
}

/// A coupon definition supplied by the catalog collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Coupon {
    /// Stored upper-case.
    pub code: String,
    pub kind: DiscountKind,
    pub value: i64,
    pub is_active: bool,
}

impl Coupon {
    /// The descriptor stored on an order once the coupon is applied.
    pub fn to_discount(&self) -> AppliedDiscount {
        AppliedDiscount {
            code: self.code.clone(),
            kind: self.kind,
            value: self.value,
        }
    }
}

/// The discount an order carries.
///
/// Stored on the order itself (not by reference to the coupon table) so
/// totals can be recomputed from the order alone, even if the coupon is
/// later edited or deactivated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AppliedDiscount {
    pub code: String,
    pub kind: DiscountKind,
    pub value: i64,
}

// =============================================================================
// Order
// =============================================================================

/// A rental order, from quotation to return.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Order {
    pub id: String,
    /// Human readable, e.g. `RO-20260601-0001`.
    pub number: String,
    pub customer_id: String,
    /// All lines belong to products of this vendor.
    pub vendor_id: String,
    pub status: OrderStatus,
    pub lines: Vec<OrderLine>,
    /// Tax rate snapshotted from configuration at quotation time.
    pub tax_rate: Rate,
    pub discount: Option<AppliedDiscount>,
    pub totals: Totals,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub confirmed_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub paid_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub picked_up_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub returned_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Order {
    pub fn line(&self, line_id: &str) -> Option<&OrderLine> {
        self.lines.iter().find(|l| l.id == line_id)
    }

    /// Reservation intervals of every line, in line order.
    pub fn reservations(&self) -> impl Iterator<Item = &ReservationInterval> {
        self.lines.iter().map(|l| &l.reservation)
    }
}

// =============================================================================
// Invoice
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Unpaid,
    /// Terminal.
    Paid,
    /// Terminal and irreversible.
    Void,
}

impl InvoiceStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Unpaid => "unpaid",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Void => "void",
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a customer settled an invoice. Recorded only; capture happens elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    BankTransfer,
    Online,
}

impl PaymentMethod {
    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Online => "online",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Billing record of a confirmed order. At most one per order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Invoice {
    pub id: String,
    pub number: String,
    pub order_id: String,
    /// Order grand total at creation time.
    pub amount: Money,
    pub status: InvoiceStatus,
    #[ts(as = "Option<String>")]
    pub payment_date: Option<DateTime<Utc>>,
    pub payment_method: Option<PaymentMethod>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
