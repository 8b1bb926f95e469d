//! # Pool and Transactions
//!
//! One `SqlitePool` per process. Reads go straight to the pool; every state
//! change runs inside a [`Tx`] opened by [`Database::begin`].
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Who Waits For Whom                               │
//! │                                                                         │
//! │   availability preview ──┐                                              │
//! │   get_order / invoices ──┼──► pool connection ──► WAL snapshot read    │
//! │                          │    (never waits for a writer)               │
//! │                                                                         │
//! │   confirm ──┐                                                           │
//! │   pay ──────┼──► begin() ──► UPDATE orders SET version = version + 1    │
//! │   cancel ───┘                    │                                      │
//! │                                  ├── lock free: holds the write lock   │
//! │                                  └── lock held: waits busy_timeout,    │
//! │                                      then DbError::Busy (retryable)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `:memory:` databases get exactly one connection that is never recycled,
//! since the database disappears with it.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::coupon::CouponRepository;
use crate::repository::invoice::InvoiceRepository;
use crate::repository::order::OrderRepository;
use crate::repository::product::ProductRepository;
use crate::repository::reservation::ReservationRepository;

/// A write transaction. Dropping it without `commit()` rolls it back.
pub type Tx = Transaction<'static, Sqlite>;

const IN_MEMORY: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// Where the database lives and how long callers queue for it.
///
/// ```rust,ignore
/// let config = DbConfig::new("/var/lib/rentline/rentline.db")
///     .max_connections(8)
///     .busy_timeout(Duration::from_secs(2));
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// SQLite file, or `:memory:`.
    pub database_path: PathBuf,

    pub max_connections: u32,

    /// How long a writer queues on the SQLite write lock.
    pub busy_timeout: Duration,

    /// How long a caller queues for a pooled connection.
    /// Both timeouts surface as `DbError::Busy`.
    pub acquire_timeout: Duration,
}

impl DbConfig {
    /// A file database, created on first connect.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            busy_timeout: Duration::from_secs(5),
            acquire_timeout: Duration::from_secs(30),
        }
    }

    /// A private in-memory database, used by tests.
    ///
    /// Never acquire a second connection while holding a `Tx`: with a single
    /// connection that waits forever.
    pub fn in_memory() -> Self {
        DbConfig {
            max_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            ..DbConfig::new(IN_MEMORY)
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == IN_MEMORY
    }

    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        let options = if self.is_in_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
        } else {
            SqliteConnectOptions::new()
                .filename(&self.database_path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
        };

        Ok(options
            .synchronous(SqliteSynchronous::Normal)
            // order → lines → intervals cascade
            .foreign_keys(true)
            .busy_timeout(self.busy_timeout))
    }

    fn pool_options(&self) -> SqlitePoolOptions {
        let options = SqlitePoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(self.acquire_timeout);

        if self.is_in_memory() {
            options.min_connections(1).idle_timeout(None).max_lifetime(None)
        } else {
            options
        }
    }
}

// =============================================================================
// Database
// =============================================================================

/// Shared handle over the pool. Clones share it.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connects and brings the schema up to date.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        debug!(
            path = %config.database_path.display(),
            max_connections = config.max_connections,
            busy_timeout_ms = config.busy_timeout.as_millis() as u64,
            "Opening database"
        );

        let pool = config
            .pool_options()
            .connect_with(config.connect_options()?)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        migrations::run_migrations(&pool).await?;

        info!(path = %config.database_path.display(), "Database ready");
        Ok(Database { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Opens a write transaction on a dedicated pooled connection.
    ///
    /// The caller's first statement must be a write (see
    /// [`OrderRepository::lock`]) so the write lock is held before any
    /// capacity read.
    pub async fn begin(&self) -> DbResult<Tx> {
        Ok(self.pool.begin().await?)
    }

    /// Catalog reads, plus `insert` for seeding.
    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone())
    }

    pub fn coupons(&self) -> CouponRepository {
        CouponRepository::new(self.pool.clone())
    }

    /// The Interval Store.
    pub fn reservations(&self) -> ReservationRepository {
        ReservationRepository::new(self.pool.clone())
    }

    pub fn orders(&self) -> OrderRepository {
        OrderRepository::new(self.pool.clone())
    }

    pub fn invoices(&self) -> InvoiceRepository {
        InvoiceRepository::new(self.pool.clone())
    }

    /// Waits for checked-out connections and closes the pool.
    pub async fn close(&self) {
        self.pool.close().await;
        debug!("Database closed");
    }
}
