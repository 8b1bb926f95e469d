//! # Product Repository
//!
//! Read access to the catalog collaborator's products.
//!
//! The reservation flow never writes here: `stock` is the capacity ceiling
//! and what is reserved is computed from the Interval Store. `insert` exists
//! for seeding and tests.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use rentline_core::{DurationUnit, Money, Product};

const SELECT_PRODUCT: &str = r#"
    SELECT id, vendor_id, name, stock, price_cents, duration_unit,
           is_active, created_at, updated_at
    FROM products
"#;

/// Row shape of `products`.
#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: String,
    vendor_id: String,
    name: String,
    stock: i64,
    price_cents: i64,
    duration_unit: DurationUnit,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            vendor_id: row.vendor_id,
            name: row.name,
            stock: row.stock,
            price: Money::from_cents(row.price_cents),
            duration_unit: row.duration_unit,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let product = db.products().get_by_id("uuid-here").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by ID (active or not).
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch(&mut conn, id).await
    }

    /// Gets a product by ID on an existing connection or transaction.
    pub async fn fetch(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Product>> {
        debug!(id = %id, "Fetching product");

        let row: Option<ProductRow> = sqlx::query_as(&format!("{SELECT_PRODUCT} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(row.map(Product::from))
    }

    /// Lists a vendor's active products, by name.
    pub async fn list_by_vendor(&self, vendor_id: &str) -> DbResult<Vec<Product>> {
        debug!(vendor_id = %vendor_id, "Listing vendor products");

        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "{SELECT_PRODUCT} WHERE vendor_id = ?1 AND is_active = 1 ORDER BY name"
        ))
        .bind(vendor_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Inserts a product.
    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, vendor_id, name, stock, price_cents, duration_unit,
                is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&product.id)
        .bind(&product.vendor_id)
        .bind(&product.name)
        .bind(product.stock)
        .bind(product.price.cents())
        .bind(product.duration_unit)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Counts active products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Helper to generate a new product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}
