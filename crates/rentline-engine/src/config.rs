//! # Engine Configuration
//!
//! Pricing parameters, database location and retry policy.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     RENTLINE_TAX_RATE_BPS=1800                                         │
//! │     RENTLINE_DB_PATH=/var/lib/rentline/rentline.db                     │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/rentline/rentline.toml (Linux)                           │
//! │     ~/Library/Application Support/com.rentline.rentline/rentline.toml  │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     18% tax, 1.0× late fee, no shipping, 3 attempts                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # rentline.toml
//! [pricing]
//! tax_rate_bps = 1800             # 18.00%
//! late_fee_multiplier_bps = 10000 # 1.0 × unit price per overdue period
//! default_shipping_cents = 0
//!
//! [database]
//! path = "rentline.db"
//! max_connections = 5
//! busy_timeout_ms = 5000
//!
//! [retry]
//! max_attempts = 3
//! initial_backoff_ms = 50
//! max_backoff_ms = 1000
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{EngineError, EngineResult};
use rentline_core::validation::validate_shipping_cents;
use rentline_core::{Money, Rate};
use rentline_db::DbConfig;

/// Tax rates above 100% are rejected.
const MAX_TAX_RATE_BPS: u32 = 10_000;

/// Late fees above 10× the unit price per period are rejected.
const MAX_LATE_FEE_MULTIPLIER_BPS: u32 = 100_000;

// =============================================================================
// Pricing Settings
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingSettings {
    /// Tax rate in basis points, snapshotted onto each new quotation.
    #[serde(default = "default_tax_rate_bps")]
    pub tax_rate_bps: u32,

    /// Late fee per overdue period, as a multiple of the line's unit price.
    #[serde(default = "default_late_fee_multiplier_bps")]
    pub late_fee_multiplier_bps: u32,

    /// Shipping applied when a quotation does not name one.
    #[serde(default)]
    pub default_shipping_cents: i64,
}

fn default_tax_rate_bps() -> u32 {
    1800
}

fn default_late_fee_multiplier_bps() -> u32 {
    10_000
}

impl Default for PricingSettings {
    fn default() -> Self {
        PricingSettings {
            tax_rate_bps: default_tax_rate_bps(),
            late_fee_multiplier_bps: default_late_fee_multiplier_bps(),
            default_shipping_cents: 0,
        }
    }
}

impl PricingSettings {
    pub fn tax_rate(&self) -> Rate {
        Rate::from_bps(self.tax_rate_bps)
    }

    pub fn late_fee_multiplier(&self) -> Rate {
        Rate::from_bps(self.late_fee_multiplier_bps)
    }

    pub fn default_shipping(&self) -> Money {
        Money::from_cents(self.default_shipping_cents)
    }
}

// =============================================================================
// Database Settings
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file, or `:memory:`.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// How long a statement waits on a locked database before failing busy.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("rentline.db")
}

fn default_max_connections() -> u32 {
    5
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl DatabaseSettings {
    /// Builds the pool configuration for these settings.
    pub fn to_db_config(&self) -> DbConfig {
        if self.path.as_os_str() == ":memory:" {
            return DbConfig::in_memory();
        }
        DbConfig::new(&self.path)
            .max_connections(self.max_connections)
            .busy_timeout(Duration::from_millis(self.busy_timeout_ms))
    }
}

// =============================================================================
// Retry Settings
// =============================================================================

/// Bounded exponential backoff for transient store failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Total attempts including the first. 1 disables retries.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}
fn default_initial_backoff_ms() -> u64 {
    50
}
fn default_max_backoff_ms() -> u64 {
    1000
}

impl Default for RetrySettings {
    fn default() -> Self {
        RetrySettings {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl RetrySettings {
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

// =============================================================================
// Main Engine Configuration
// =============================================================================

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub pricing: PricingSettings,

    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub retry: RetrySettings,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults with an in-memory database. Used by tests and demos.
    pub fn in_memory() -> Self {
        EngineConfig {
            database: DatabaseSettings {
                path: PathBuf::from(":memory:"),
                max_connections: 1,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (rentline.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> EngineResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading engine config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = Self::from_toml(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load engine config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Parses a TOML document. Missing sections and keys take defaults.
    pub fn from_toml(contents: &str) -> EngineResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.pricing.tax_rate_bps > MAX_TAX_RATE_BPS {
            return Err(EngineError::Config(format!(
                "tax_rate_bps must be at most {MAX_TAX_RATE_BPS}, got {}",
                self.pricing.tax_rate_bps
            )));
        }

        if self.pricing.late_fee_multiplier_bps > MAX_LATE_FEE_MULTIPLIER_BPS {
            return Err(EngineError::Config(format!(
                "late_fee_multiplier_bps must be at most {MAX_LATE_FEE_MULTIPLIER_BPS}, got {}",
                self.pricing.late_fee_multiplier_bps
            )));
        }

        validate_shipping_cents(self.pricing.default_shipping_cents)
            .map_err(|e| EngineError::Config(e.to_string()))?;

        if self.database.path.as_os_str().is_empty() {
            return Err(EngineError::Config("database.path must not be empty".into()));
        }

        if self.database.max_connections == 0 {
            return Err(EngineError::Config(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if self.retry.max_attempts == 0 {
            return Err(EngineError::Config(
                "retry.max_attempts must be greater than 0".into(),
            ));
        }

        if self.retry.initial_backoff_ms > self.retry.max_backoff_ms {
            return Err(EngineError::Config(format!(
                "retry.initial_backoff_ms ({}) exceeds retry.max_backoff_ms ({})",
                self.retry.initial_backoff_ms, self.retry.max_backoff_ms
            )));
        }

        Ok(())
    }

    /// Applies `RENTLINE_*` environment variable overrides.
    ///
    /// Unparseable values are logged and ignored.
    fn apply_env_overrides(&mut self) {
        if let Some(bps) = env_parse::<u32>("RENTLINE_TAX_RATE_BPS") {
            debug!(tax_rate_bps = bps, "Overriding tax rate from environment");
            self.pricing.tax_rate_bps = bps;
        }

        if let Some(bps) = env_parse::<u32>("RENTLINE_LATE_FEE_MULTIPLIER_BPS") {
            self.pricing.late_fee_multiplier_bps = bps;
        }

        if let Some(cents) = env_parse::<i64>("RENTLINE_DEFAULT_SHIPPING_CENTS") {
            self.pricing.default_shipping_cents = cents;
        }

        if let Ok(path) = std::env::var("RENTLINE_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(max) = env_parse::<u32>("RENTLINE_DB_MAX_CONNECTIONS") {
            self.database.max_connections = max;
        }

        if let Some(attempts) = env_parse::<u32>("RENTLINE_RETRY_MAX_ATTEMPTS") {
            self.retry.max_attempts = attempts;
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "rentline", "rentline")
            .map(|dirs| dirs.config_dir().join("rentline.toml"))
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "Ignoring unparseable environment override");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.pricing.tax_rate(), Rate::from_percent(18));
        assert_eq!(config.pricing.late_fee_multiplier(), Rate::ONE);
        assert_eq!(config.pricing.default_shipping(), Money::zero());
        assert_eq!(config.retry.max_attempts, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml(
            r#"
            [pricing]
            tax_rate_bps = 500

            [retry]
            max_attempts = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.pricing.tax_rate_bps, 500);
        assert_eq!(config.pricing.late_fee_multiplier_bps, 10_000);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.initial_backoff_ms, 50);
        assert_eq!(config.database.path, PathBuf::from("rentline.db"));
    }

    #[test]
    fn test_config_validation() {
        let mut config = EngineConfig::default();

        config.pricing.tax_rate_bps = 10_001;
        assert!(matches!(config.validate(), Err(EngineError::Config(_))));
        config.pricing.tax_rate_bps = 1800;

        config.pricing.default_shipping_cents = -1;
        assert!(config.validate().is_err());
        config.pricing.default_shipping_cents = 0;

        config.retry.max_attempts = 0;
        assert!(config.validate().is_err());
        config.retry.max_attempts = 3;

        config.retry.initial_backoff_ms = 5000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[pricing]\ndefault_shipping_cents = 250").unwrap();

        let config = EngineConfig::load(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(config.pricing.default_shipping(), Money::from_cents(250));
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[pricing\ntax_rate_bps = ").unwrap();

        let err = EngineConfig::load(Some(file.path().to_path_buf())).unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
        assert_eq!(
            EngineConfig::load_or_default(Some(file.path().to_path_buf())),
            EngineConfig::default()
        );
    }

    #[test]
    fn test_in_memory_database_settings() {
        let config = EngineConfig::in_memory();
        assert!(config.database.to_db_config().is_in_memory());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_serialization() {
        let toml_str = toml::to_string_pretty(&EngineConfig::default()).unwrap();
        assert!(toml_str.contains("[pricing]"));
        assert!(toml_str.contains("[database]"));
        assert!(toml_str.contains("[retry]"));
    }
}
