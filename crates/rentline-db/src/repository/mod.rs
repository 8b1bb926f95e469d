//! # Repository Module
//!
//! Database repository implementations for the rental engine.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Two Ways In                                          │
//! │                                                                         │
//! │  Pooled reads (previews, lookups)                                      │
//! │       db.orders().get(id)                                              │
//! │       db.reservations().capacity_claims(product, start, end, None)     │
//! │                                                                         │
//! │  Transactional writes (confirm, pay, cancel, ...)                      │
//! │       let mut tx = db.begin().await?;                                  │
//! │       OrderRepository::lock(&mut tx, id)                               │
//! │       ReservationRepository::fetch_capacity_claims(&mut tx, ...)       │
//! │       ReservationRepository::set_level(&mut tx, ...)                   │
//! │       tx.commit()                                                      │
//! │                                                                         │
//! │  Every pooled method delegates to the connection-level one, so a       │
//! │  query has exactly one SQL definition.                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Catalog reads
//! - [`CouponRepository`](coupon::CouponRepository) - Coupon lookups
//! - [`ReservationRepository`](reservation::ReservationRepository) - Interval Store
//! - [`OrderRepository`](order::OrderRepository) - Orders and lines
//! - [`InvoiceRepository`](invoice::InvoiceRepository) - Invoices

pub mod coupon;
pub mod invoice;
pub mod order;
pub mod product;
pub mod reservation;
