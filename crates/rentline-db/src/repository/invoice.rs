//! # Invoice Repository
//!
//! At most one invoice per order, enforced by `UNIQUE (order_id)`. A
//! second insert for the same order fails with
//! `UniqueViolation { field: "invoices.order_id", .. }`.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::order::number_prefix;
use rentline_core::{Invoice, InvoiceStatus, Money, PaymentMethod};

/// Prefix of invoice numbers: `INV-YYYYMMDD-NNNN`.
pub const INVOICE_NUMBER_PREFIX: &str = "INV";

const SELECT_INVOICE: &str = r#"
    SELECT id, number, order_id, amount_cents, status, payment_date,
           payment_method, created_at, updated_at
    FROM invoices
"#;

#[derive(Debug, sqlx::FromRow)]
struct InvoiceRow {
    id: String,
    number: String,
    order_id: String,
    amount_cents: i64,
    status: InvoiceStatus,
    payment_date: Option<DateTime<Utc>>,
    payment_method: Option<PaymentMethod>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<InvoiceRow> for Invoice {
    fn from(row: InvoiceRow) -> Self {
        Invoice {
            id: row.id,
            number: row.number,
            order_id: row.order_id,
            amount: Money::from_cents(row.amount_cents),
            status: row.status,
            payment_date: row.payment_date,
            payment_method: row.payment_method,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Repository for invoice database operations.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Invoice>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch(&mut conn, id).await
    }

    pub async fn get_for_order(&self, order_id: &str) -> DbResult<Option<Invoice>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_for_order(&mut conn, order_id).await
    }

    // =========================================================================
    // Connection-level operations (usable inside a transaction)
    // =========================================================================

    pub async fn fetch(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Invoice>> {
        debug!(id = %id, "Fetching invoice");

        let row: Option<InvoiceRow> = sqlx::query_as(&format!("{SELECT_INVOICE} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(row.map(Invoice::from))
    }

    pub async fn fetch_for_order(
        conn: &mut SqliteConnection,
        order_id: &str,
    ) -> DbResult<Option<Invoice>> {
        debug!(order_id = %order_id, "Fetching invoice for order");

        let row: Option<InvoiceRow> =
            sqlx::query_as(&format!("{SELECT_INVOICE} WHERE order_id = ?1"))
                .bind(order_id)
                .fetch_optional(&mut *conn)
                .await?;

        Ok(row.map(Invoice::from))
    }

    /// Inserts an invoice, allocating `INV-<created_at date>-<sequence>` and
    /// writing it back into `invoice.number`.
    pub async fn insert(conn: &mut SqliteConnection, invoice: &mut Invoice) -> DbResult<()> {
        let prefix = number_prefix(INVOICE_NUMBER_PREFIX, invoice.created_at);

        let number: String = sqlx::query_scalar(
            r#"
            INSERT INTO invoices (
                id, number, order_id, amount_cents, status,
                payment_date, payment_method, created_at, updated_at
            ) VALUES (
                ?1,
                ?2 || printf('%04d', (
                    SELECT COALESCE(MAX(CAST(substr(number, length(?2) + 1) AS INTEGER)), 0) + 1
                    FROM invoices WHERE number LIKE ?2 || '%'
                )),
                ?3, ?4, ?5, ?6, ?7, ?8, ?9
            )
            RETURNING number
            "#,
        )
        .bind(&invoice.id)
        .bind(&prefix)
        .bind(&invoice.order_id)
        .bind(invoice.amount.cents())
        .bind(invoice.status)
        .bind(invoice.payment_date)
        .bind(invoice.payment_method)
        .bind(invoice.created_at)
        .bind(invoice.updated_at)
        .fetch_one(&mut *conn)
        .await?;

        debug!(id = %invoice.id, number = %number, order_id = %invoice.order_id, "Inserted invoice");
        invoice.number = number;
        Ok(())
    }

    /// Persists status and payment fields.
    pub async fn update(conn: &mut SqliteConnection, invoice: &Invoice) -> DbResult<()> {
        debug!(id = %invoice.id, status = %invoice.status, "Updating invoice");

        let result = sqlx::query(
            r#"
            UPDATE invoices SET
                status = ?2,
                payment_date = ?3,
                payment_method = ?4,
                updated_at = ?5
            WHERE id = ?1
            "#,
        )
        .bind(&invoice.id)
        .bind(invoice.status)
        .bind(invoice.payment_date)
        .bind(invoice.payment_method)
        .bind(invoice.updated_at)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Invoice", &invoice.id));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::fixtures::{june, product, quotation, test_db};
    use crate::repository::order::{generate_id, OrderRepository};

    fn unpaid(order_id: &str) -> Invoice {
        Invoice {
            id: generate_id(),
            number: String::new(),
            order_id: order_id.to_string(),
            amount: Money::from_cents(1180),
            status: InvoiceStatus::Unpaid,
            payment_date: None,
            payment_method: None,
            created_at: june(2),
            updated_at: june(2),
        }
    }

    #[tokio::test]
    async fn test_one_invoice_per_order() {
        let db = test_db().await;
        let p = product("vendor-1", "Projector", 5, 500);
        db.products().insert(&p).await.unwrap();
        let mut order = quotation(&p, 1, june(3), june(4));

        let mut conn = db.pool().acquire().await.unwrap();
        OrderRepository::insert(&mut conn, &mut order).await.unwrap();

        let mut first = unpaid(&order.id);
        InvoiceRepository::insert(&mut conn, &mut first).await.unwrap();
        assert_eq!(first.number, "INV-20260602-0001");

        let mut second = unpaid(&order.id);
        let err = InvoiceRepository::insert(&mut conn, &mut second).await.unwrap_err();
        match err {
            DbError::UniqueViolation { field, .. } => assert_eq!(field, "invoices.order_id"),
            other => panic!("expected unique violation, got {other:?}"),
        }
        drop(conn);

        let found = db.invoices().get_for_order(&order.id).await.unwrap().unwrap();
        assert_eq!(found.id, first.id);
    }

    #[tokio::test]
    async fn test_update_records_payment() {
        let db = test_db().await;
        let p = product("vendor-1", "Projector", 5, 500);
        db.products().insert(&p).await.unwrap();
        let mut order = quotation(&p, 1, june(3), june(4));

        let mut conn = db.pool().acquire().await.unwrap();
        OrderRepository::insert(&mut conn, &mut order).await.unwrap();
        let mut invoice = unpaid(&order.id);
        InvoiceRepository::insert(&mut conn, &mut invoice).await.unwrap();

        invoice.status = InvoiceStatus::Paid;
        invoice.payment_date = Some(june(3));
        invoice.payment_method = Some(PaymentMethod::BankTransfer);
        InvoiceRepository::update(&mut conn, &invoice).await.unwrap();
        drop(conn);

        let loaded = db.invoices().get(&invoice.id).await.unwrap().unwrap();
        assert_eq!(loaded, invoice);
    }
}
