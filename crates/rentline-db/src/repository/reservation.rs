//! # Interval Store
//!
//! Durable record of reservation intervals. Pure data access: deciding
//! whether a claim fits is `rentline_core::availability`'s job.
//!
//! ## Overlap Query
//! ```text
//!   requested           [start ─────────────── end)
//!   stored      [s ─────────── e)                      s < end AND start < e  ✓
//!   stored                              [s ────────────── e)                  ✓
//!   stored  [s ── e)                                   e == start            ✗
//!
//!   served by idx_reservation_intervals_capacity
//!   (product_id, starts_at, ends_at, level)
//! ```
//!
//! Only committed and active rows are returned by the capacity queries:
//! provisional and released rows never consume stock.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use rentline_core::{CommitmentLevel, ReservationInterval};

const SELECT_INTERVAL: &str = r#"
    SELECT id, order_id, order_line_id, product_id, quantity,
           starts_at, ends_at, level, created_at, updated_at
    FROM reservation_intervals
"#;

#[derive(Debug, sqlx::FromRow)]
struct IntervalRow {
    id: String,
    order_id: String,
    order_line_id: String,
    product_id: String,
    quantity: i64,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    level: CommitmentLevel,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<IntervalRow> for ReservationInterval {
    fn from(row: IntervalRow) -> Self {
        ReservationInterval {
            id: row.id,
            order_id: row.order_id,
            order_line_id: row.order_line_id,
            product_id: row.product_id,
            quantity: row.quantity,
            starts_at: row.starts_at,
            ends_at: row.ends_at,
            level: row.level,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Repository over `reservation_intervals`.
#[derive(Debug, Clone)]
pub struct ReservationRepository {
    pool: SqlitePool,
}

impl ReservationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReservationRepository { pool }
    }

    /// Committed and active intervals of `product_id` overlapping
    /// `[start, end)`, optionally ignoring one order's own intervals.
    ///
    /// Runs on the pool: an availability preview never blocks writers.
    pub async fn capacity_claims(
        &self,
        product_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude_order: Option<&str>,
    ) -> DbResult<Vec<ReservationInterval>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_capacity_claims(&mut conn, product_id, start, end, exclude_order).await
    }

    /// Every interval of an order, any level.
    pub async fn list_for_order(&self, order_id: &str) -> DbResult<Vec<ReservationInterval>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_for_order(&mut conn, order_id).await
    }

    // =========================================================================
    // Connection-level operations (usable inside a transaction)
    // =========================================================================

    /// See [`ReservationRepository::capacity_claims`].
    pub async fn fetch_capacity_claims(
        conn: &mut SqliteConnection,
        product_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude_order: Option<&str>,
    ) -> DbResult<Vec<ReservationInterval>> {
        debug!(
            product_id = %product_id,
            start = %start,
            end = %end,
            exclude_order = ?exclude_order,
            "Fetching overlapping reservations"
        );

        let rows: Vec<IntervalRow> = sqlx::query_as(&format!(
            r#"{SELECT_INTERVAL}
            WHERE product_id = ?1
              AND starts_at < ?3
              AND ?2 < ends_at
              AND level IN ('committed', 'active')
              AND (?4 IS NULL OR order_id <> ?4)
            ORDER BY starts_at
            "#
        ))
        .bind(product_id)
        .bind(start)
        .bind(end)
        .bind(exclude_order)
        .fetch_all(&mut *conn)
        .await?;

        Ok(rows.into_iter().map(ReservationInterval::from).collect())
    }

    pub async fn fetch_for_order(
        conn: &mut SqliteConnection,
        order_id: &str,
    ) -> DbResult<Vec<ReservationInterval>> {
        let rows: Vec<IntervalRow> = sqlx::query_as(&format!(
            "{SELECT_INTERVAL} WHERE order_id = ?1 ORDER BY created_at, id"
        ))
        .bind(order_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(rows.into_iter().map(ReservationInterval::from).collect())
    }

    /// Inserts an interval. The owning order line must already exist.
    pub async fn insert(conn: &mut SqliteConnection, interval: &ReservationInterval) -> DbResult<()> {
        debug!(
            id = %interval.id,
            order_line_id = %interval.order_line_id,
            level = %interval.level,
            "Inserting reservation interval"
        );

        sqlx::query(
            r#"
            INSERT INTO reservation_intervals (
                id, order_id, order_line_id, product_id, quantity,
                starts_at, ends_at, level, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&interval.id)
        .bind(&interval.order_id)
        .bind(&interval.order_line_id)
        .bind(&interval.product_id)
        .bind(interval.quantity)
        .bind(interval.starts_at)
        .bind(interval.ends_at)
        .bind(interval.level)
        .bind(interval.created_at)
        .bind(interval.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Moves one interval to `level`.
    ///
    /// The transition's legality is decided by the caller through
    /// `CommitmentLevel::apply`; this only persists it.
    pub async fn set_level(
        conn: &mut SqliteConnection,
        id: &str,
        level: CommitmentLevel,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        debug!(id = %id, level = %level, "Updating reservation level");

        let result = sqlx::query(
            r#"
            UPDATE reservation_intervals
            SET level = ?2, updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(level)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("ReservationInterval", id));
        }

        Ok(())
    }
}
