//! # Authorization Policy
//!
//! Who may do what to an order. The identity collaborator authenticates and
//! hands the engine an [`Actor`]; this module only answers yes or no.
//!
//! ```text
//! ┌──────────────────────────┬──────────────────────────────────────────┐
//! │ Operation                │ Allowed (admin is always allowed)        │
//! ├──────────────────────────┼──────────────────────────────────────────┤
//! │ check_availability       │ anyone                                   │
//! │ create_quotation         │ any customer (becomes owner)             │
//! │ add/remove line, coupon, │ owning customer                          │
//! │ pay                      │                                          │
//! │ send, confirm, pickup,   │ owning vendor                            │
//! │ return, invoices         │                                          │
//! │ cancel, reads            │ owning customer or owning vendor         │
//! └──────────────────────────┴──────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};

// =============================================================================
// Actor
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    Vendor,
    Admin,
}

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Actor {
    pub id: String,
    pub role: Role,
}

impl Actor {
    pub fn customer(id: impl Into<String>) -> Self {
        Actor {
            id: id.into(),
            role: Role::Customer,
        }
    }

    pub fn vendor(id: impl Into<String>) -> Self {
        Actor {
            id: id.into(),
            role: Role::Vendor,
        }
    }

    pub fn admin(id: impl Into<String>) -> Self {
        Actor {
            id: id.into(),
            role: Role::Admin,
        }
    }
}

// =============================================================================
// Operations
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CheckAvailability,
    CreateQuotation,
    AddLine,
    RemoveLine,
    ApplyCoupon,
    Send,
    Confirm,
    Pay,
    Pickup,
    ReturnItems,
    Cancel,
    CreateInvoice,
    VoidInvoice,
    ViewOrder,
    ViewInvoice,
    ListOrders,
}

impl Operation {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Operation::CheckAvailability => "check availability",
            Operation::CreateQuotation => "create a quotation",
            Operation::AddLine => "add a line",
            Operation::RemoveLine => "remove a line",
            Operation::ApplyCoupon => "apply a coupon",
            Operation::Send => "send the quotation",
            Operation::Confirm => "confirm the order",
            Operation::Pay => "pay the order",
            Operation::Pickup => "record pickup",
            Operation::ReturnItems => "record return",
            Operation::Cancel => "cancel the order",
            Operation::CreateInvoice => "create an invoice",
            Operation::VoidInvoice => "void the invoice",
            Operation::ViewOrder => "view the order",
            Operation::ViewInvoice => "view the invoice",
            Operation::ListOrders => "list orders",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The parties of the order an operation targets.
///
/// `None` for operations that do not target an existing order
/// (availability, creating a quotation).
#[derive(Debug, Clone, Copy)]
pub struct Ownership<'a> {
    pub customer_id: &'a str,
    pub vendor_id: &'a str,
}

// =============================================================================
// Policy
// =============================================================================

/// Returns `Unauthorized` unless `actor` may perform `op` on the order
/// described by `owner`.
pub fn authorize(actor: &Actor, op: Operation, owner: Option<Ownership<'_>>) -> CoreResult<()> {
    if permitted(actor, op, owner) {
        Ok(())
    } else {
        Err(CoreError::Unauthorized {
            actor_id: actor.id.clone(),
            operation: op.as_str().to_string(),
        })
    }
}

fn permitted(actor: &Actor, op: Operation, owner: Option<Ownership<'_>>) -> bool {
    if actor.role == Role::Admin {
        return true;
    }

    let owning_customer =
        actor.role == Role::Customer && owner.is_some_and(|o| o.customer_id == actor.id);
    let owning_vendor =
        actor.role == Role::Vendor && owner.is_some_and(|o| o.vendor_id == actor.id);

    match op {
        Operation::CheckAvailability => true,
        Operation::CreateQuotation => actor.role == Role::Customer,
        Operation::AddLine | Operation::RemoveLine | Operation::ApplyCoupon | Operation::Pay => {
            owning_customer
        }
        Operation::Send
        | Operation::Confirm
        | Operation::Pickup
        | Operation::ReturnItems
        | Operation::CreateInvoice
        | Operation::VoidInvoice => owning_vendor,
        Operation::Cancel | Operation::ViewOrder | Operation::ViewInvoice => {
            owning_customer || owning_vendor
        }
        // Customers list their own orders; the owner is the listed customer.
        Operation::ListOrders => owning_customer,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
