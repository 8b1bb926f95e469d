//! # Database Errors
//!
//! ## Propagation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)          CoreError (raised mid-transaction) │
//! │       │                                     │                           │
//! │       ▼                                     ▼                           │
//! │  DbError (this module) ◄──────────── DbError::Domain                   │
//! │       │   Busy = lock contention / pool timeout                         │
//! │       ▼                                                                 │
//! │  EngineError (rentline-engine) ← Busy becomes TransientStore (retried)  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use rentline_core::CoreError;
use thiserror::Error;

/// What went wrong talking to SQLite.
///
/// Only [`DbError::Busy`] is worth retrying; the engine keys its backoff on
/// it. [`DbError::Domain`] carries a business rejection raised while a
/// transaction was open, so `?` rolls the transaction back and the caller
/// still sees the original `CoreError`.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// `field` is `<table>.<column>` as SQLite reports it, e.g.
    /// `invoices.order_id` for a second invoice on one order.
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// A line or interval pointing at a missing product or order.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// SQLITE_BUSY / SQLITE_LOCKED after `busy_timeout`, or no pooled
    /// connection within `acquire_timeout`.
    #[error("Database busy: {0}")]
    Busy(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error(transparent)]
    Domain(#[from] CoreError),

    /// Rows that don't decode into domain types.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, DbError::Busy(_))
    }
}

/// Primary result codes SQLITE_BUSY (5) and SQLITE_LOCKED (6), including
/// their extended forms such as SQLITE_BUSY_SNAPSHOT (517).
fn is_lock_contention(code: Option<&str>) -> bool {
    code.and_then(|c| c.parse::<i32>().ok())
        .is_some_and(|c| matches!(c & 0xff, 5 | 6))
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        use sqlx::error::ErrorKind;

        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message().to_string();
                match db_err.kind() {
                    // "UNIQUE constraint failed: invoices.order_id"
                    ErrorKind::UniqueViolation => {
                        let field = msg
                            .rsplit(": ")
                            .next()
                            .unwrap_or("unknown")
                            .to_string();
                        DbError::duplicate(field, "unknown")
                    }
                    ErrorKind::ForeignKeyViolation => DbError::ForeignKeyViolation { message: msg },
                    _ if is_lock_contention(db_err.code().as_deref()) => DbError::Busy(msg),
                    _ => DbError::QueryFailed(msg),
                }
            }

            sqlx::Error::PoolTimedOut => DbError::Busy("connection pool timed out".to_string()),
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool is closed".to_string()),
            other => DbError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::Internal(format!("JSON column: {err}"))
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;
