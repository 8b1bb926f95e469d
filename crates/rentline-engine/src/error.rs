//! # Engine Error Types
//!
//! What callers of [`RentalEngine`](crate::RentalEngine) see.
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Engine Error Categories                           │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │    Business     │  │     Lookup      │  │        Store            │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  Domain(..)     │  │  NotFound       │  │  TransientStore (retry) │ │
//! │  │  never retried  │  │                 │  │  Store (permanent)      │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐                                                   │
//! │  │  Configuration  │                                                   │
//! │  │  Config         │                                                   │
//! │  └─────────────────┘                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use rentline_core::{CoreError, StockShortfall};
use rentline_db::DbError;
use thiserror::Error;

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Every failure an engine operation can report.
#[derive(Debug, Error)]
pub enum EngineError {
    // =========================================================================
    // Business Errors
    // =========================================================================
    /// A business rule rejected the request. Nothing was written.
    #[error(transparent)]
    Domain(#[from] CoreError),

    // =========================================================================
    // Lookup Errors
    // =========================================================================
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    // =========================================================================
    // Store Errors
    // =========================================================================
    /// Lock contention or timeout. The attempt rolled back and may be
    /// repeated.
    #[error("Store temporarily unavailable: {0}")]
    TransientStore(String),

    /// Any other storage failure.
    #[error("Store error: {0}")]
    Store(DbError),

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl EngineError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        EngineError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Returns true if the failed operation may succeed when run again.
    ///
    /// Only store contention qualifies. Business rejections, lookups and
    /// permanent store failures are final.
    pub fn is_transient(&self) -> bool {
        matches!(self, EngineError::TransientStore(_))
    }

    /// The per-line shortfalls of a rejected confirm, if this is one.
    pub fn shortfalls(&self) -> Option<&[StockShortfall]> {
        match self {
            EngineError::Domain(CoreError::InsufficientStock { shortfalls }) => Some(shortfalls),
            _ => None,
        }
    }
}

/// Convert storage errors to engine errors.
///
/// ## Error Mapping
/// ```text
/// DbError::Busy                                  → TransientStore
/// DbError::Domain(e)                             → Domain(e)
/// DbError::NotFound                              → NotFound
/// DbError::UniqueViolation("invoices.order_id")  → Domain(DuplicateInvoice)
/// anything else                                  → Store
/// ```
impl From<DbError> for EngineError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Busy(msg) => EngineError::TransientStore(msg),
            DbError::Domain(e) => EngineError::Domain(e),
            DbError::NotFound { entity, id } => EngineError::NotFound { entity, id },
            DbError::UniqueViolation { field, value } if field == "invoices.order_id" => {
                EngineError::Domain(CoreError::DuplicateInvoice { order_id: value })
            }
            other => EngineError::Store(other),
        }
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::Config(err.to_string())
    }
}

impl From<toml::de::Error> for EngineError {
    fn from(err: toml::de::Error) -> Self {
        EngineError::Config(err.to_string())
    }
}
