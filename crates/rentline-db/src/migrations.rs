//! # Schema Migrations
//!
//! The SQL under `migrations/sqlite/` is compiled into the binary, so a fresh
//! file or `:memory:` database is usable right after [`Database::new`].
//!
//! | File | Creates |
//! |---|---|
//! | `001_initial_schema.sql` | products, coupons, orders, order_lines, reservation_intervals, invoices |
//!
//! Applied files are recorded in `_sqlx_migrations` and must never be edited;
//! schema changes go in a new `NNN_description.sql`.
//!
//! [`Database::new`]: crate::Database::new

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies every pending migration. A no-op on an up-to-date database.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    MIGRATOR.run(pool).await?;
    debug!(embedded = MIGRATOR.migrations.len(), "Schema up to date");
    Ok(())
}

/// `(embedded, applied)` migration counts.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success")
        .fetch_one(pool)
        .await?;

    Ok((MIGRATOR.migrations.len(), applied as usize))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_fresh_database_is_fully_migrated() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let (embedded, applied) = migration_status(db.pool()).await.unwrap();
        assert_eq!(embedded, applied);

        // Re-running is harmless.
        run_migrations(db.pool()).await.unwrap();
        assert_eq!(migration_status(db.pool()).await.unwrap(), (embedded, applied));
    }

    #[tokio::test]
    async fn test_reservation_index_exists() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let indexes: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'index' AND tbl_name = 'reservation_intervals'",
        )
        .fetch_all(db.pool())
        .await
        .unwrap();

        assert!(!indexes.is_empty());
    }
}
