//! # rentline-engine: Order Lifecycle Manager
//!
//! Turns rental quotations into confirmed, paid, picked-up and returned
//! orders without ever overbooking a product.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Rental Engine Architecture                       │
//! │                                                                         │
//! │  Caller (UI / API) ── &Actor ──┐                                        │
//! │                                ▼                                        │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                      RentalEngine (THIS CRATE)                   │  │
//! │  │                                                                  │  │
//! │  │  check_availability   create_quotation   confirm   pay   ...     │  │
//! │  │         │                     │              │                   │  │
//! │  │   authorize ──► validate ──► retrying(transaction) ──► notify    │  │
//! │  └─────────┬─────────────────────┬──────────────────────────┬───────┘  │
//! │            │                     │                          │          │
//! │            ▼                     ▼                          ▼          │
//! │  ┌──────────────────┐  ┌──────────────────┐  ┌────────────────────┐   │
//! │  │  rentline-core   │  │   rentline-db    │  │     Notifier       │   │
//! │  │                  │  │                  │  │                    │   │
//! │  │ peak demand      │  │ Interval Store   │  │ quotation_sent     │   │
//! │  │ plan_commit      │  │ orders/invoices  │  │ order_paid         │   │
//! │  │ Totals, late fee │  │ write-lock txns  │  │ (spawned, logged)  │   │
//! │  │ state machines   │  │                  │  │                    │   │
//! │  └──────────────────┘  └──────────────────┘  └────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`engine`] - `RentalEngine` construction and shared plumbing
//! - [`availability`] - Read-only capacity previews
//! - [`lifecycle`] - Quotation → sales order → paid → picked up → returned
//! - [`invoice`] - Invoice issue and void
//! - [`config`] - Pricing, database and retry configuration
//! - [`retry`] - Backoff for transient store failures
//! - [`notify`] - Notification hooks
//! - [`telemetry`] - Tracing subscriber setup
//! - [`error`] - Engine error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rentline_engine::{CreateQuotation, EngineConfig, LineRequest, RentalEngine};
//! use rentline_core::{Actor, PaymentMethod};
//!
//! let engine = RentalEngine::connect(EngineConfig::load_or_default(None)).await?;
//! let customer = Actor::customer("cust-42");
//! let vendor = Actor::vendor("acme");
//!
//! let order = engine
//!     .create_quotation(&customer, CreateQuotation {
//!         lines: vec![LineRequest::new(&tent_id, 2, start, end)],
//!         shipping: None,
//!     })
//!     .await?;
//!
//! engine.confirm(&vendor, &order.id).await?;
//! let receipt = engine.pay(&customer, &order.id, PaymentMethod::Card).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod availability;
pub mod config;
pub mod engine;
pub mod error;
pub mod invoice;
pub mod lifecycle;
pub mod notify;
pub mod retry;
pub mod telemetry;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{DatabaseSettings, EngineConfig, PricingSettings, RetrySettings};
pub use engine::RentalEngine;
pub use error::{EngineError, EngineResult};
pub use lifecycle::{CreateQuotation, LineRequest, PaymentReceipt, ReturnReceipt};
pub use notify::{LogNotifier, Notifier};
pub use telemetry::init_tracing;
