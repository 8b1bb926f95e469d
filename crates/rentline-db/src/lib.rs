//! # rentline-db: Database Layer for Rentline
//!
//! SQLite storage for the rental engine: the catalog view, coupons, the
//! Interval Store, orders and invoices.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Rentline Data Flow                               │
//! │                                                                         │
//! │  RentalEngine::confirm(order_id)                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   rentline-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐   ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories  │   │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │                │   │  (embedded)  │  │   │
//! │  │   │               │    │ Product/Coupon │   │              │  │   │
//! │  │   │ SqlitePool    │◄───│ Reservation    │   │ 001_initial  │  │   │
//! │  │   │ begin() → Tx  │    │ Order/Invoice  │   │ _schema.sql  │  │   │
//! │  │   └───────────────┘    └────────────────┘   └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite (WAL)                                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool, configuration, transactions
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rentline_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/rentline.db")).await?;
//! let product = db.products().get_by_id(&product_id).await?;
//! let claims = db.reservations().capacity_claims(&product_id, start, end, None).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig, Tx};

// Repository re-exports for convenience
pub use repository::coupon::CouponRepository;
pub use repository::invoice::InvoiceRepository;
pub use repository::order::{generate_id, OrderRepository};
pub use repository::product::ProductRepository;
pub use repository::reservation::ReservationRepository;
