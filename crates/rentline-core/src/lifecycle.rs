//! # Lifecycle State Machines
//!
//! Transition tables for orders, reservation intervals and invoices. Every
//! table is a single exhaustive `match`; adding a status or event without
//! deciding its transitions is a compile error.
//!
//! ## Order
//! ```text
//!               send              confirm             pay
//!  quotation ────────► quotation_sent ────► sales_order ────► paid
//!      │ └─────────────── confirm ──────────►  │               │ pickup
//!      │                                       │               ▼
//!      │ cancel        cancel                  │ cancel    picked_up
//!      ▼                 ▼                     ▼               │ return
//!  cancelled ◄───────────┴─────────────────────┘               ▼
//!                                                          returned
//! ```
//!
//! Anything not drawn is `InvalidTransition`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, CoreResult};
use crate::types::{CommitmentLevel, InvoiceStatus, OrderStatus};

// =============================================================================
// Order Events
// =============================================================================

/// Something that happens to an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderEvent {
    Send,
    Confirm,
    Pay,
    Pickup,
    Return,
    Cancel,
    /// Add or remove a quotation line.
    EditLines,
    /// Apply a (new) coupon code.
    ApplyCoupon,
}

impl OrderEvent {
    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderEvent::Send => "send",
            OrderEvent::Confirm => "confirm",
            OrderEvent::Pay => "pay",
            OrderEvent::Pickup => "pickup",
            OrderEvent::Return => "return",
            OrderEvent::Cancel => "cancel",
            OrderEvent::EditLines => "edit lines",
            OrderEvent::ApplyCoupon => "apply coupon",
        }
    }
}

impl fmt::Display for OrderEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl OrderStatus {
    /// The status after `event`, or `InvalidTransition`.
    pub fn apply(self, event: OrderEvent) -> CoreResult<OrderStatus> {
        use OrderEvent as E;
        use OrderStatus as S;

        let next = match (self, event) {
            (S::Quotation, E::Send) => S::QuotationSent,
            (S::Quotation | S::QuotationSent, E::Confirm) => S::SalesOrder,
            (S::SalesOrder, E::Pay) => S::Paid,
            (S::Paid, E::Pickup) => S::PickedUp,
            (S::PickedUp, E::Return) => S::Returned,
            (S::Quotation | S::QuotationSent | S::SalesOrder, E::Cancel) => S::Cancelled,
            (S::Quotation | S::QuotationSent, E::EditLines | E::ApplyCoupon) => self,

            (
                S::Quotation
                | S::QuotationSent
                | S::SalesOrder
                | S::Paid
                | S::PickedUp
                | S::Returned
                | S::Cancelled,
                _,
            ) => return Err(CoreError::invalid_transition("Order", self, event.as_str())),
        };

        Ok(next)
    }
}

impl CommitmentLevel {
    /// The level a line's interval moves to when its order sees `event`.
    ///
    /// Events that leave capacity untouched (send, pay, edits) are rejected
    /// here: callers only invoke this for events that move reservations.
    pub fn apply(self, event: OrderEvent) -> CoreResult<CommitmentLevel> {
        use CommitmentLevel as L;
        use OrderEvent as E;

        let next = match (self, event) {
            (L::Provisional, E::Confirm) => L::Committed,
            (L::Committed, E::Pickup) => L::Active,
            (L::Active, E::Return) => L::Released,
            (L::Provisional | L::Committed | L::Active, E::Cancel) => L::Released,

            (L::Provisional | L::Committed | L::Active | L::Released, _) => {
                return Err(CoreError::invalid_transition(
                    "Reservation",
                    self,
                    event.as_str(),
                ))
            }
        };

        Ok(next)
    }
}

// =============================================================================
// Invoice Events
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceEvent {
    Pay,
    Void,
}

impl InvoiceEvent {
    pub const fn as_str(&self) -> &'static str {
        match self {
            InvoiceEvent::Pay => "pay",
            InvoiceEvent::Void => "void",
        }
    }
}

impl InvoiceStatus {
    /// ```text
    /// unpaid ──pay──► paid   (terminal)
    ///    └────void──► void   (terminal, irreversible)
    /// ```
    pub fn apply(self, event: InvoiceEvent) -> CoreResult<InvoiceStatus> {
        match (self, event) {
            (InvoiceStatus::Unpaid, InvoiceEvent::Pay) => Ok(InvoiceStatus::Paid),
            (InvoiceStatus::Unpaid, InvoiceEvent::Void) => Ok(InvoiceStatus::Void),
            (InvoiceStatus::Paid | InvoiceStatus::Void, _) => Err(CoreError::invalid_transition(
                "Invoice",
                self,
                event.as_str(),
            )),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
