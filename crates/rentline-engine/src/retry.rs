//! # Transient Failure Retry
//!
//! Re-runs a transactional operation when the store reports contention.
//!
//! ```text
//! attempt 1 ──► TransientStore ──► sleep ~initial ──► attempt 2 ──► ...
//!     │                                                   │
//!     ├── Ok / business error ──► returned as is          └── max_attempts reached
//!     │                                                        ──► last error
//! ```
//!
//! Each attempt is a whole transaction that rolled back on failure, so
//! nothing needs undoing between attempts.

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use std::future::Future;
use tracing::warn;

use crate::config::RetrySettings;
use crate::error::EngineResult;

fn create_backoff(settings: &RetrySettings) -> ExponentialBackoff {
    ExponentialBackoff {
        initial_interval: settings.initial_backoff(),
        max_interval: settings.max_backoff(),
        multiplier: 2.0,
        // Bounded by attempt count instead
        max_elapsed_time: None,
        ..Default::default()
    }
}

/// Runs `attempt` until it succeeds, fails permanently, or
/// `settings.max_attempts` attempts have been made.
pub async fn with_retry<T, F, Fut>(
    settings: &RetrySettings,
    operation: &str,
    mut attempt: F,
) -> EngineResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = EngineResult<T>>,
{
    let max_attempts = settings.max_attempts.max(1);
    let mut backoff = create_backoff(settings);
    let mut tried = 0u32;

    loop {
        tried += 1;
        match attempt().await {
            Err(e) if e.is_transient() && tried < max_attempts => {
                let delay = backoff.next_backoff().unwrap_or(settings.max_backoff());
                warn!(
                    operation,
                    attempt = tried,
                    max_attempts,
                    ?delay,
                    error = %e,
                    "Transient store failure, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            result => return result,
        }
    }
}
