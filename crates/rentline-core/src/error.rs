//! # Error Types
//!
//! Domain-specific error types for rentline-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  rentline-core errors (this file)                                      │
//! │  ├── CoreError        - Business rule rejections                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  rentline-db errors                                                    │
//! │  └── DbError          - Storage failures (+ Domain(CoreError))         │
//! │                                                                         │
//! │  rentline-engine errors                                                │
//! │  └── EngineError      - What callers see; TransientStore is retryable  │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → EngineError → Caller    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Business rejections are results for the caller to act on. They are never
//! retried by the engine.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

// =============================================================================
// Stock Shortfall
// =============================================================================

/// One line that failed the capacity guard at confirm time.
///
/// The caller gets one of these per failing line so the customer can adjust
/// quantity or dates instead of receiving an opaque failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockShortfall {
    pub line_id: String,
    pub product_id: String,
    pub requested: i64,
    pub available: i64,
}

impl StockShortfall {
    /// Units missing to satisfy the line.
    #[inline]
    pub fn deficit(&self) -> i64 {
        (self.requested - self.available).max(0)
    }
}

fn describe_shortfalls(shortfalls: &[StockShortfall]) -> String {
    shortfalls
        .iter()
        .map(|s| {
            format!(
                "line {} ({}): requested {}, available {}",
                s.line_id, s.product_id, s.requested, s.available
            )
        })
        .collect::<Vec<_>>()
        .join("; ")
}

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// Malformed or past reservation window.
    ///
    /// ## When This Occurs
    /// - `ends_at <= starts_at`
    /// - `starts_at` before the engine clock's "now"
    #[error("Invalid range: {reason}")]
    InvalidRange { reason: String },

    /// Capacity guard failure at confirm.
    #[error("Insufficient stock: {}", describe_shortfalls(.shortfalls))]
    InsufficientStock { shortfalls: Vec<StockShortfall> },

    /// Illegal state change. The status is never coerced.
    #[error("{entity} cannot '{event}' while {from}")]
    InvalidTransition {
        entity: String,
        from: String,
        event: String,
    },

    /// An invoice already exists for the order.
    #[error("Order {order_id} already has an invoice")]
    DuplicateInvoice { order_id: String },

    /// Actor not permitted for the requested operation.
    #[error("Actor {actor_id} is not allowed to {operation}")]
    Unauthorized { actor_id: String, operation: String },

    /// Unknown or inactive coupon code.
    #[error("Coupon not found: {0}")]
    CouponNotFound(String),

    /// Product is not rentable (inactive in the catalog).
    #[error("Product {0} is not available for rent")]
    ProductInactive(String),

    /// Lines of one order must all belong to a single vendor.
    #[error("Order lines span multiple vendors ({first} and {second})")]
    MixedVendors { first: String, second: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    pub fn invalid_range(reason: impl Into<String>) -> Self {
        CoreError::InvalidRange {
            reason: reason.into(),
        }
    }

    pub fn invalid_transition(
        entity: impl Into<String>,
        from: impl ToString,
        event: impl Into<String>,
    ) -> Self {
        CoreError::InvalidTransition {
            entity: entity.into(),
            from: from.to_string(),
            event: event.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors, raised before any business logic runs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
