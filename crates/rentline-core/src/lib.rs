//! # rentline-core: Pure Rental Logic
//!
//! The capacity arithmetic, pricing and state machines of the rental engine,
//! as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Rentline Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              rentline-engine (RentalEngine)                     │   │
//! │  │   check_availability, create_quotation, confirm, pay, return   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ rentline-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌────────────┐ ┌───────────┐ ┌───────────┐ ┌────────────┐   │   │
//! │  │   │availability│ │  pricing  │ │ lifecycle │ │    auth    │   │   │
//! │  │   │ peak demand│ │  Totals   │ │  Order /  │ │  Actor /   │   │   │
//! │  │   │ plan_commit│ │ late fees │ │  Invoice  │ │ Operation  │   │   │
//! │  │   └────────────┘ └───────────┘ └───────────┘ └────────────┘   │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 rentline-db (Database Layer)                    │   │
//! │  │        SQLite, migrations, Interval Store, repositories         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Order, ReservationInterval, Invoice)
//! - [`money`] - Integer money and basis-point arithmetic
//! - [`availability`] - Peak-demand capacity math and commit planning
//! - [`pricing`] - Subtotal, tax, discount, late fee, grand total
//! - [`lifecycle`] - Order, reservation and invoice transition tables
//! - [`auth`] - Actor roles and the permission table
//! - [`validation`] - Input checks run before any transaction
//! - [`clock`] - Injectable time source
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use rentline_core::availability::{peak_demand, available_units, Claim};
//! use chrono::{TimeZone, Utc};
//!
//! let june = |d| Utc.with_ymd_and_hms(2026, 6, d, 0, 0, 0).unwrap();
//! let claims = [Claim { starts_at: june(1), ends_at: june(5), quantity: 3 }];
//!
//! let reserved = peak_demand(&claims, june(3), june(7));
//! assert_eq!(available_units(5, reserved), 2);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod auth;
pub mod availability;
pub mod clock;
pub mod error;
pub mod lifecycle;
pub mod money;
pub mod pricing;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use auth::{authorize, Actor, Operation, Ownership, Role};
pub use availability::Availability;
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{CoreError, CoreResult, StockShortfall, ValidationError};
pub use lifecycle::{InvoiceEvent, OrderEvent};
pub use money::Money;
pub use pricing::Totals;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines on a single order.
pub const MAX_LINES_PER_ORDER: usize = 100;

/// Maximum quantity on a single line.
///
/// Catches typos (1000 instead of 10) before they reach the capacity guard.
pub const MAX_LINE_QUANTITY: i64 = 999;

/// Maximum shipping charge on a single order, in cents (1,000,000.00).
///
/// Keeps every stored total far from `i64` overflow.
pub const MAX_SHIPPING_CENTS: i64 = 100_000_000;
