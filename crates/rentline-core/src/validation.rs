//! # Validation Module
//!
//! Input validation for engine operations.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Caller (UI / API)                                            │
//! │  └── Format checks, immediate feedback                                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Quantities, windows, codes, rates                                 │
//! │  └── Runs before any transaction is opened                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (quantity > 0), CHECK (ends_at > starts_at)                 │
//! │  └── UNIQUE (invoices.order_id)                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::{MAX_LINES_PER_ORDER, MAX_LINE_QUANTITY, MAX_SHIPPING_CENTS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Windows
// =============================================================================

/// Validates a requested reservation window.
///
/// ## Rules
/// - `ends_at` strictly after `starts_at`
/// - `starts_at` not before `now`
///
/// ## Flow
/// ```text
/// check_availability / create_quotation / add_line
///      │
///      ▼
/// validate_window(start, end, clock.now()) ← THIS FUNCTION
///      │
///      ├── end <= start?  → InvalidRange
///      ├── start < now?   → InvalidRange
///      └── OK
/// ```
pub fn validate_window(
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> CoreResult<()> {
    if ends_at <= starts_at {
        return Err(CoreError::invalid_range(format!(
            "end {} must be after start {}",
            ends_at.to_rfc3339(),
            starts_at.to_rfc3339()
        )));
    }

    if starts_at < now {
        return Err(CoreError::invalid_range(format!(
            "start {} is in the past",
            starts_at.to_rfc3339()
        )));
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a requested quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_LINE_QUANTITY
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Shipping may be zero, never negative, and at most MAX_SHIPPING_CENTS.
pub fn validate_shipping_cents(cents: i64) -> ValidationResult<()> {
    if !(0..=MAX_SHIPPING_CENTS).contains(&cents) {
        return Err(ValidationError::OutOfRange {
            field: "shipping".to_string(),
            min: 0,
            max: MAX_SHIPPING_CENTS,
        });
    }

    Ok(())
}

/// Validates a configured rate in basis points against an upper bound.
///
/// Tax rates are capped at 10000 (100%); late-fee multipliers may exceed
/// 1.0x so callers pass their own ceiling.
pub fn validate_rate_bps(field: &str, bps: u32, max: u32) -> ValidationResult<()> {
    if bps > max {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: max as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates the number of lines on an order.
///
/// ## Rules
/// - At least one line
/// - At most MAX_LINES_PER_ORDER
pub fn validate_line_count(count: usize) -> ValidationResult<()> {
    if count == 0 {
        return Err(ValidationError::Required {
            field: "lines".to_string(),
        });
    }

    if count > MAX_LINES_PER_ORDER {
        return Err(ValidationError::OutOfRange {
            field: "lines".to_string(),
            min: 1,
            max: MAX_LINES_PER_ORDER as i64,
        });
    }

    Ok(())
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates and normalises a coupon code.
///
/// ## Rules
/// - Not empty after trimming
/// - At most 32 characters
/// - Letters, digits, hyphens, underscores
///
/// ## Returns
/// The upper-cased code, which is how coupons are stored.
///
/// ```rust
/// use rentline_core::validation::normalize_coupon_code;
///
/// assert_eq!(normalize_coupon_code(" welcome10 ").unwrap(), "WELCOME10");
/// assert!(normalize_coupon_code("").is_err());
/// ```
pub fn normalize_coupon_code(code: &str) -> ValidationResult<String> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "coupon code".to_string(),
        });
    }

    if code.len() > 32 {
        return Err(ValidationError::TooLong {
            field: "coupon code".to_string(),
            max: 32,
        });
    }

    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "coupon code".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(code.to_ascii_uppercase())
}

// =============================================================================
// Unit Tests
// =============================================================================
