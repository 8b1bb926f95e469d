//! # Rental Engine
//!
//! The handle every caller holds. Operations are spread over
//! [`availability`](crate::availability), [`lifecycle`](crate::lifecycle) and
//! [`invoice`](crate::invoice); this module owns construction and the
//! plumbing they share.

use std::sync::Arc;
use tracing::info;

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::notify::{LogNotifier, Notifier};
use crate::retry::with_retry;
use rentline_core::{Clock, SystemClock};
use rentline_db::Database;

/// Order Lifecycle Manager.
///
/// Cheap to clone; clones share the pool, clock and notifier.
#[derive(Clone)]
pub struct RentalEngine {
    pub(crate) db: Database,
    pub(crate) config: Arc<EngineConfig>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) notifier: Arc<dyn Notifier>,
}

impl std::fmt::Debug for RentalEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RentalEngine")
            .field("db", &self.db)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RentalEngine {
    /// Creates an engine over an open database with the system clock and
    /// the logging notifier.
    pub fn new(db: Database, config: EngineConfig) -> Self {
        RentalEngine {
            db,
            config: Arc::new(config),
            clock: Arc::new(SystemClock),
            notifier: Arc::new(LogNotifier),
        }
    }

    /// Validates `config`, opens its database and runs migrations.
    pub async fn connect(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        let db = Database::new(config.database.to_db_config()).await?;
        info!(
            path = %config.database.path.display(),
            tax_rate_bps = config.pricing.tax_rate_bps,
            "Rental engine ready"
        );
        Ok(Self::new(db, config))
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // =========================================================================
    // Shared plumbing
    // =========================================================================

    /// Runs one transactional attempt under the configured retry policy.
    pub(crate) async fn retrying<T, F, Fut>(&self, operation: &str, attempt: F) -> EngineResult<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = EngineResult<T>>,
    {
        with_retry(&self.config.retry, operation, attempt).await
    }
}

/// `Option` to `NotFound`.
pub(crate) fn found<T>(value: Option<T>, entity: &str, id: &str) -> EngineResult<T> {
    value.ok_or_else(|| EngineError::not_found(entity, id))
}
