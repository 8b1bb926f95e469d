//! # Availability Preview
//!
//! Read-only capacity answers for UI previews and pre-checks.
//!
//! ```text
//! check_availability(product, qty, [start, end))
//!      │
//!      ├── validate window against clock.now()
//!      ├── products.get_by_id          ──► stock S      (pool, no lock)
//!      ├── reservations.capacity_claims ──► committed + active overlaps
//!      └── Availability::compute       ──► max(0, S − peak demand)
//! ```
//!
//! Nothing here takes the write lock; a preview may be stale by the time the
//! customer confirms. Confirm re-checks inside its transaction.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::engine::{found, RentalEngine};
use crate::error::EngineResult;
use rentline_core::availability::counted_claims;
use rentline_core::validation::{validate_quantity, validate_window};
use rentline_core::{authorize, Actor, Availability, CoreError, CoreResult, Operation};

/// Checks a requested claim before it is priced or stored.
///
/// Non-positive quantities and malformed or past windows are `InvalidRange`.
pub(crate) fn validate_claim(
    quantity: i64,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> CoreResult<()> {
    if quantity <= 0 {
        return Err(CoreError::invalid_range(format!(
            "quantity must be positive, got {quantity}"
        )));
    }
    validate_quantity(quantity)?;
    validate_window(starts_at, ends_at, now)
}

impl RentalEngine {
    /// Units of `product_id` free for the whole of `[starts_at, ends_at)`.
    pub async fn check_availability(
        &self,
        actor: &Actor,
        product_id: &str,
        quantity: i64,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> EngineResult<Availability> {
        self.availability(actor, product_id, quantity, starts_at, ends_at, None)
            .await
    }

    /// Like [`check_availability`](Self::check_availability), ignoring the
    /// reservations of `exclude_order`. Used to preview an edit to an order
    /// that already holds capacity.
    pub async fn check_availability_excluding(
        &self,
        actor: &Actor,
        product_id: &str,
        quantity: i64,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
        exclude_order: &str,
    ) -> EngineResult<Availability> {
        self.availability(
            actor,
            product_id,
            quantity,
            starts_at,
            ends_at,
            Some(exclude_order),
        )
        .await
    }

    async fn availability(
        &self,
        actor: &Actor,
        product_id: &str,
        quantity: i64,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
        exclude_order: Option<&str>,
    ) -> EngineResult<Availability> {
        authorize(actor, Operation::CheckAvailability, None)?;
        validate_claim(quantity, starts_at, ends_at, self.clock.now())?;

        let product = found(
            self.db.products().get_by_id(product_id).await?,
            "Product",
            product_id,
        )?;

        let intervals = self
            .db
            .reservations()
            .capacity_claims(product_id, starts_at, ends_at, exclude_order)
            .await?;
        let claims = counted_claims(&intervals);

        let availability =
            Availability::compute(product_id, product.stock, &claims, quantity, starts_at, ends_at);

        debug!(
            product_id = %product_id,
            stock = availability.stock,
            reserved = availability.reserved,
            available = availability.available_units,
            requested = quantity,
            "Availability computed"
        );

        Ok(availability)
    }
}
