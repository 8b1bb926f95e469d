//! # Coupon Repository
//!
//! Coupon definitions owned by the catalog collaborator. Codes are stored
//! upper-case; lookups expect an already normalised code.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use rentline_core::{Coupon, DiscountKind};

#[derive(Debug, sqlx::FromRow)]
struct CouponRow {
    code: String,
    kind: DiscountKind,
    value: i64,
    is_active: bool,
}

impl From<CouponRow> for Coupon {
    fn from(row: CouponRow) -> Self {
        Coupon {
            code: row.code,
            kind: row.kind,
            value: row.value,
            is_active: row.is_active,
        }
    }
}

/// Repository for coupon database operations.
#[derive(Debug, Clone)]
pub struct CouponRepository {
    pool: SqlitePool,
}

impl CouponRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CouponRepository { pool }
    }

    /// Gets an active coupon by (normalised) code.
    pub async fn get_active(&self, code: &str) -> DbResult<Option<Coupon>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_active(&mut conn, code).await
    }

    /// Gets an active coupon on an existing connection or transaction.
    pub async fn fetch_active(conn: &mut SqliteConnection, code: &str) -> DbResult<Option<Coupon>> {
        debug!(code = %code, "Fetching coupon");

        let row: Option<CouponRow> = sqlx::query_as(
            r#"
            SELECT code, kind, value, is_active
            FROM coupons
            WHERE code = ?1 AND is_active = 1
            "#,
        )
        .bind(code)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(row.map(Coupon::from))
    }

    /// Inserts a coupon, or replaces the definition of an existing code.
    pub async fn upsert(&self, coupon: &Coupon) -> DbResult<()> {
        debug!(code = %coupon.code, "Upserting coupon");

        sqlx::query(
            r#"
            INSERT INTO coupons (code, kind, value, is_active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT (code) DO UPDATE SET
                kind = excluded.kind,
                value = excluded.value,
                is_active = excluded.is_active
            "#,
        )
        .bind(coupon.code.to_ascii_uppercase())
        .bind(coupon.kind)
        .bind(coupon.value)
        .bind(coupon.is_active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
