//! # Order Repository
//!
//! Orders, their lines and the interval each line owns.
//!
//! ## Write Transactions
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  let mut tx = db.begin().await?;                                       │
//! │                                                                         │
//! │  1. OrderRepository::lock(&mut tx, id)   UPDATE orders SET version+1   │
//! │     └── takes the SQLite write lock; a concurrent writer waits here    │
//! │  2. OrderRepository::load(&mut tx, id)   reads see committed state     │
//! │  3. capacity reads, checks, level/status updates                       │
//! │  4. tx.commit()                          or drop → rollback            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Creating an order needs no lock: its first statement is the insert.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::reservation::ReservationRepository;
use rentline_core::{
    AppliedDiscount, CommitmentLevel, DiscountKind, DurationUnit, Money, Order, OrderLine,
    OrderStatus, Rate, ReservationInterval, Totals, VariantSelection,
};

/// Prefix of order numbers: `RO-YYYYMMDD-NNNN`.
pub const ORDER_NUMBER_PREFIX: &str = "RO";

// =============================================================================
// Rows
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: String,
    number: String,
    customer_id: String,
    vendor_id: String,
    status: OrderStatus,
    tax_rate_bps: i64,
    discount_code: Option<String>,
    discount_kind: Option<DiscountKind>,
    discount_value: Option<i64>,
    subtotal_cents: i64,
    tax_cents: i64,
    discount_cents: i64,
    shipping_cents: i64,
    late_fee_cents: i64,
    grand_total_cents: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    confirmed_at: Option<DateTime<Utc>>,
    paid_at: Option<DateTime<Utc>>,
    picked_up_at: Option<DateTime<Utc>>,
    returned_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
}

impl OrderRow {
    fn into_order(self, lines: Vec<OrderLine>) -> DbResult<Order> {
        let tax_rate_bps = u32::try_from(self.tax_rate_bps).map_err(|_| {
            DbError::Internal(format!(
                "order {} has tax rate {} bps",
                self.id, self.tax_rate_bps
            ))
        })?;

        let discount = match (self.discount_code, self.discount_kind, self.discount_value) {
            (Some(code), Some(kind), Some(value)) => Some(AppliedDiscount { code, kind, value }),
            _ => None,
        };

        Ok(Order {
            id: self.id,
            number: self.number,
            customer_id: self.customer_id,
            vendor_id: self.vendor_id,
            status: self.status,
            lines,
            tax_rate: Rate::from_bps(tax_rate_bps),
            discount,
            totals: Totals {
                subtotal: Money::from_cents(self.subtotal_cents),
                tax: Money::from_cents(self.tax_cents),
                discount: Money::from_cents(self.discount_cents),
                shipping: Money::from_cents(self.shipping_cents),
                late_fee: Money::from_cents(self.late_fee_cents),
                grand_total: Money::from_cents(self.grand_total_cents),
            },
            created_at: self.created_at,
            updated_at: self.updated_at,
            confirmed_at: self.confirmed_at,
            paid_at: self.paid_at,
            picked_up_at: self.picked_up_at,
            returned_at: self.returned_at,
            cancelled_at: self.cancelled_at,
        })
    }
}

/// An order line joined with the interval it owns.
#[derive(Debug, sqlx::FromRow)]
struct LineRow {
    id: String,
    order_id: String,
    product_id: String,
    product_name: String,
    quantity: i64,
    unit_price_cents: i64,
    duration_unit: DurationUnit,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    variants: String,
    position: i64,
    reservation_id: String,
    reserved_quantity: i64,
    reserved_starts_at: DateTime<Utc>,
    reserved_ends_at: DateTime<Utc>,
    level: CommitmentLevel,
    reserved_created_at: DateTime<Utc>,
    reserved_updated_at: DateTime<Utc>,
}

impl TryFrom<LineRow> for OrderLine {
    type Error = DbError;

    fn try_from(row: LineRow) -> DbResult<Self> {
        let variants: Vec<VariantSelection> = serde_json::from_str(&row.variants)?;

        Ok(OrderLine {
            reservation: ReservationInterval {
                id: row.reservation_id,
                order_id: row.order_id.clone(),
                order_line_id: row.id.clone(),
                product_id: row.product_id.clone(),
                quantity: row.reserved_quantity,
                starts_at: row.reserved_starts_at,
                ends_at: row.reserved_ends_at,
                level: row.level,
                created_at: row.reserved_created_at,
                updated_at: row.reserved_updated_at,
            },
            id: row.id,
            order_id: row.order_id,
            product_id: row.product_id,
            product_name: row.product_name,
            quantity: row.quantity,
            unit_price: Money::from_cents(row.unit_price_cents),
            duration_unit: row.duration_unit,
            starts_at: row.starts_at,
            ends_at: row.ends_at,
            variants,
            position: row.position,
        })
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for orders and order lines.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Gets an order with its lines.
    pub async fn get(&self, id: &str) -> DbResult<Option<Order>> {
        let mut conn = self.pool.acquire().await?;
        Self::load(&mut conn, id).await
    }

    /// A customer's orders, newest first.
    pub async fn list_for_customer(&self, customer_id: &str) -> DbResult<Vec<Order>> {
        debug!(customer_id = %customer_id, "Listing customer orders");

        let mut conn = self.pool.acquire().await?;
        let ids: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT id FROM orders
            WHERE customer_id = ?1
            ORDER BY created_at DESC, number DESC
            "#,
        )
        .bind(customer_id)
        .fetch_all(&mut *conn)
        .await?;

        let mut orders = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(order) = Self::load(&mut conn, &id).await? {
                orders.push(order);
            }
        }
        Ok(orders)
    }

    // =========================================================================
    // Connection-level operations (usable inside a transaction)
    // =========================================================================

    /// Takes the write lock on behalf of order `id`.
    ///
    /// Must be the first statement of a write transaction on an existing
    /// order. Fails with `NotFound` when the order does not exist.
    pub async fn lock(conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE orders SET version = version + 1 WHERE id = ?1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order", id));
        }

        Ok(())
    }

    /// Takes the write lock on behalf of the order an invoice belongs to.
    /// Returns the order id.
    pub async fn lock_by_invoice(conn: &mut SqliteConnection, invoice_id: &str) -> DbResult<String> {
        let order_id: Option<String> = sqlx::query_scalar(
            r#"
            UPDATE orders SET version = version + 1
            WHERE id = (SELECT order_id FROM invoices WHERE id = ?1)
            RETURNING id
            "#,
        )
        .bind(invoice_id)
        .fetch_optional(&mut *conn)
        .await?;

        order_id.ok_or_else(|| DbError::not_found("Invoice", invoice_id))
    }

    /// Loads an order with its lines (in position order).
    pub async fn load(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Order>> {
        debug!(id = %id, "Loading order");

        let row: Option<OrderRow> = sqlx::query_as(
            r#"
            SELECT id, number, customer_id, vendor_id, status, tax_rate_bps,
                   discount_code, discount_kind, discount_value,
                   subtotal_cents, tax_cents, discount_cents, shipping_cents,
                   late_fee_cents, grand_total_cents,
                   created_at, updated_at, confirmed_at, paid_at,
                   picked_up_at, returned_at, cancelled_at
            FROM orders
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let line_rows: Vec<LineRow> = sqlx::query_as(
            r#"
            SELECT l.id, l.order_id, l.product_id, l.product_name, l.quantity,
                   l.unit_price_cents, l.duration_unit, l.starts_at, l.ends_at,
                   l.variants, l.position,
                   r.id         AS reservation_id,
                   r.quantity   AS reserved_quantity,
                   r.starts_at  AS reserved_starts_at,
                   r.ends_at    AS reserved_ends_at,
                   r.level,
                   r.created_at AS reserved_created_at,
                   r.updated_at AS reserved_updated_at
            FROM order_lines l
            JOIN reservation_intervals r ON r.order_line_id = l.id
            WHERE l.order_id = ?1
            ORDER BY l.position, l.id
            "#,
        )
        .bind(id)
        .fetch_all(&mut *conn)
        .await?;

        let lines = line_rows
            .into_iter()
            .map(OrderLine::try_from)
            .collect::<DbResult<Vec<_>>>()?;

        row.into_order(lines).map(Some)
    }

    /// Inserts a new order with its lines and their intervals.
    ///
    /// The order number is allocated by the insert itself
    /// (`RO-<created_at date>-<next sequence>`) and written back into
    /// `order.number`.
    pub async fn insert(conn: &mut SqliteConnection, order: &mut Order) -> DbResult<()> {
        let prefix = number_prefix(ORDER_NUMBER_PREFIX, order.created_at);
        let discount = order.discount.as_ref();

        let number: String = sqlx::query_scalar(
            r#"
            INSERT INTO orders (
                id, number, customer_id, vendor_id, status, tax_rate_bps,
                discount_code, discount_kind, discount_value,
                subtotal_cents, tax_cents, discount_cents, shipping_cents,
                late_fee_cents, grand_total_cents,
                created_at, updated_at, confirmed_at, paid_at,
                picked_up_at, returned_at, cancelled_at
            ) VALUES (
                ?1,
                ?2 || printf('%04d', (
                    SELECT COALESCE(MAX(CAST(substr(number, length(?2) + 1) AS INTEGER)), 0) + 1
                    FROM orders WHERE number LIKE ?2 || '%'
                )),
                ?3, ?4, ?5, ?6,
                ?7, ?8, ?9,
                ?10, ?11, ?12, ?13,
                ?14, ?15,
                ?16, ?17, ?18, ?19,
                ?20, ?21, ?22
            )
            RETURNING number
            "#,
        )
        .bind(&order.id)
        .bind(&prefix)
        .bind(&order.customer_id)
        .bind(&order.vendor_id)
        .bind(order.status)
        .bind(i64::from(order.tax_rate.bps()))
        .bind(discount.map(|d| d.code.as_str()))
        .bind(discount.map(|d| d.kind))
        .bind(discount.map(|d| d.value))
        .bind(order.totals.subtotal.cents())
        .bind(order.totals.tax.cents())
        .bind(order.totals.discount.cents())
        .bind(order.totals.shipping.cents())
        .bind(order.totals.late_fee.cents())
        .bind(order.totals.grand_total.cents())
        .bind(order.created_at)
        .bind(order.updated_at)
        .bind(order.confirmed_at)
        .bind(order.paid_at)
        .bind(order.picked_up_at)
        .bind(order.returned_at)
        .bind(order.cancelled_at)
        .fetch_one(&mut *conn)
        .await?;

        debug!(id = %order.id, number = %number, lines = order.lines.len(), "Inserted order");
        order.number = number;

        for line in &order.lines {
            Self::insert_line(conn, line).await?;
        }

        Ok(())
    }

    /// Persists status, discount, totals and timestamps.
    pub async fn update(conn: &mut SqliteConnection, order: &Order) -> DbResult<()> {
        debug!(id = %order.id, status = %order.status, "Updating order");

        let discount = order.discount.as_ref();
        let result = sqlx::query(
            r#"
            UPDATE orders SET
                status = ?2,
                discount_code = ?3,
                discount_kind = ?4,
                discount_value = ?5,
                subtotal_cents = ?6,
                tax_cents = ?7,
                discount_cents = ?8,
                shipping_cents = ?9,
                late_fee_cents = ?10,
                grand_total_cents = ?11,
                updated_at = ?12,
                confirmed_at = ?13,
                paid_at = ?14,
                picked_up_at = ?15,
                returned_at = ?16,
                cancelled_at = ?17
            WHERE id = ?1
            "#,
        )
        .bind(&order.id)
        .bind(order.status)
        .bind(discount.map(|d| d.code.as_str()))
        .bind(discount.map(|d| d.kind))
        .bind(discount.map(|d| d.value))
        .bind(order.totals.subtotal.cents())
        .bind(order.totals.tax.cents())
        .bind(order.totals.discount.cents())
        .bind(order.totals.shipping.cents())
        .bind(order.totals.late_fee.cents())
        .bind(order.totals.grand_total.cents())
        .bind(order.updated_at)
        .bind(order.confirmed_at)
        .bind(order.paid_at)
        .bind(order.picked_up_at)
        .bind(order.returned_at)
        .bind(order.cancelled_at)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order", &order.id));
        }

        Ok(())
    }

    /// Inserts a line and the interval it owns.
    pub async fn insert_line(conn: &mut SqliteConnection, line: &OrderLine) -> DbResult<()> {
        debug!(
            order_id = %line.order_id,
            line_id = %line.id,
            product_id = %line.product_id,
            quantity = line.quantity,
            "Inserting order line"
        );

        let variants = serde_json::to_string(&line.variants)?;

        sqlx::query(
            r#"
            INSERT INTO order_lines (
                id, order_id, product_id, product_name, quantity,
                unit_price_cents, duration_unit, starts_at, ends_at,
                variants, position, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&line.id)
        .bind(&line.order_id)
        .bind(&line.product_id)
        .bind(&line.product_name)
        .bind(line.quantity)
        .bind(line.unit_price.cents())
        .bind(line.duration_unit)
        .bind(line.starts_at)
        .bind(line.ends_at)
        .bind(variants)
        .bind(line.position)
        .bind(line.reservation.created_at)
        .execute(&mut *conn)
        .await?;

        ReservationRepository::insert(conn, &line.reservation).await
    }

    /// Deletes a line; its interval goes with it (cascade).
    pub async fn delete_line(conn: &mut SqliteConnection, order_id: &str, line_id: &str) -> DbResult<()> {
        debug!(order_id = %order_id, line_id = %line_id, "Deleting order line");

        let result = sqlx::query("DELETE FROM order_lines WHERE id = ?1 AND order_id = ?2")
            .bind(line_id)
            .bind(order_id)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("OrderLine", line_id));
        }

        Ok(())
    }
}

/// `<kind>-YYYYMMDD-`; the sequence is appended by the insert.
pub(crate) fn number_prefix(kind: &str, at: DateTime<Utc>) -> String {
    format!("{}-{}-", kind, at.format("%Y%m%d"))
}

/// Helper to generate a new order / line / interval ID.
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::fixtures::{june, product, quotation, test_db};

    #[tokio::test]
    async fn test_insert_and_load_roundtrip() {
        let db = test_db().await;
        let p = product("vendor-1", "Projector", 5, 500);
        db.products().insert(&p).await.unwrap();

        let mut order = quotation(&p, 2, june(1), june(5));
        order.lines[0].variants = vec![VariantSelection {
            name: "lens".into(),
            value: "wide".into(),
        }];
        order.discount = Some(AppliedDiscount {
            code: "WELCOME10".into(),
            kind: DiscountKind::Percent,
            value: 1000,
        });

        let mut conn = db.pool().acquire().await.unwrap();
        OrderRepository::insert(&mut conn, &mut order).await.unwrap();
        drop(conn);

        assert_eq!(order.number, "RO-20260601-0001");

        let loaded = db.orders().get(&order.id).await.unwrap().unwrap();
        assert_eq!(loaded.number, order.number);
        assert_eq!(loaded.status, OrderStatus::Quotation);
        assert_eq!(loaded.discount, order.discount);
        assert_eq!(loaded.totals, order.totals);
        assert_eq!(loaded.lines.len(), 1);
        assert_eq!(loaded.lines[0].variants, order.lines[0].variants);
        assert_eq!(loaded.lines[0].reservation, order.lines[0].reservation);
    }

    #[tokio::test]
    async fn test_order_numbers_are_sequential_per_day() {
        let db = test_db().await;
        let p = product("vendor-1", "Projector", 5, 500);
        db.products().insert(&p).await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        let mut first = quotation(&p, 1, june(1), june(2));
        let mut second = quotation(&p, 1, june(1), june(2));
        OrderRepository::insert(&mut conn, &mut first).await.unwrap();
        OrderRepository::insert(&mut conn, &mut second).await.unwrap();

        assert_eq!(first.number, "RO-20260601-0001");
        assert_eq!(second.number, "RO-20260601-0002");
    }

    #[tokio::test]
    async fn test_lock_unknown_order_is_not_found() {
        let db = test_db().await;
        let mut tx = db.begin().await.unwrap();
        let err = OrderRepository::lock(&mut tx, "missing").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_update_and_delete_line() {
        let db = test_db().await;
        let p = product("vendor-1", "Projector", 5, 500);
        db.products().insert(&p).await.unwrap();

        let mut order = quotation(&p, 1, june(1), june(2));
        let mut tx = db.begin().await.unwrap();
        OrderRepository::insert(&mut tx, &mut order).await.unwrap();

        order.status = OrderStatus::QuotationSent;
        OrderRepository::lock(&mut tx, &order.id).await.unwrap();
        OrderRepository::update(&mut tx, &order).await.unwrap();
        let line_id = order.lines[0].id.clone();
        OrderRepository::delete_line(&mut tx, &order.id, &line_id).await.unwrap();
        tx.commit().await.unwrap();

        let loaded = db.orders().get(&order.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, OrderStatus::QuotationSent);
        assert!(loaded.lines.is_empty());
        assert!(db.reservations().list_for_order(&order.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dropped_transaction_rolls_back() {
        let db = test_db().await;
        let p = product("vendor-1", "Projector", 5, 500);
        db.products().insert(&p).await.unwrap();

        let mut order = quotation(&p, 1, june(1), june(2));
        {
            let mut tx = db.begin().await.unwrap();
            OrderRepository::insert(&mut tx, &mut order).await.unwrap();
        }

        assert!(db.orders().get(&order.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_for_customer() {
        let db = test_db().await;
        let p = product("vendor-1", "Projector", 5, 500);
        db.products().insert(&p).await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        let mut mine = quotation(&p, 1, june(1), june(2));
        let mut theirs = quotation(&p, 1, june(1), june(2));
        theirs.customer_id = "someone-else".into();
        OrderRepository::insert(&mut conn, &mut mine).await.unwrap();
        OrderRepository::insert(&mut conn, &mut theirs).await.unwrap();
        drop(conn);

        let listed = db.orders().list_for_customer(&mine.customer_id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, mine.id);
    }
}
