//! Configuration management for the telemetry client.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Ingestion endpoint used when nothing is persisted or overridden.
pub const DEFAULT_API_BASE: &str = "http://localhost:8000";

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Name of the synthetic event that opens an implicit session.
pub const DEFAULT_IMPLICIT_START_EVENT: &str = "session_start";

/// Client configuration, stored as JSON at `~/.hutch/config.json`.
///
/// Every field has a default so partial files are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Fallback ingestion base URL.
    pub default_api_base: String,
    /// Value of the client-identifier header sent with every batch.
    pub client_id: String,
    /// Period of the background delivery ticker.
    pub background_interval_ms: u64,
    /// Retry delay after the first failure; restored after any success.
    pub backoff_base_ms: u64,
    /// Ceiling for the doubling retry delay.
    pub backoff_max_ms: u64,
    /// Extra delivery attempts scheduled after an immediate flush.
    pub flush_delays_ms: Vec<u64>,
    /// Upper bound on a single delivery attempt.
    pub request_timeout_ms: u64,
    /// Event name synthesized at the start of an implicit session.
    pub implicit_start_event: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            default_api_base: DEFAULT_API_BASE.to_string(),
            client_id: format!("rust@{}", env!("CARGO_PKG_VERSION")),
            background_interval_ms: 3_000,
            backoff_base_ms: 1_000,
            backoff_max_ms: 30_000,
            flush_delays_ms: vec![500, 1_500],
            request_timeout_ms: 30_000,
            implicit_start_event: DEFAULT_IMPLICIT_START_EVENT.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from `paths.config_file()`, falling back to
    /// defaults when the file is absent, then apply env overrides.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    fn load_from_env(&mut self) {
        if let Ok(log_level) = std::env::var("HUTCH_LOG_LEVEL") {
            if !log_level.trim().is_empty() {
                self.log_level = log_level.trim().to_string();
            }
        }
    }

    /// Reject values the delivery pump cannot run with.
    pub fn validate(&self) -> CoreResult<()> {
        if self.backoff_base_ms == 0 {
            return Err(CoreError::Invalid {
                field: "backoff_base_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.backoff_max_ms < self.backoff_base_ms {
            return Err(CoreError::Invalid {
                field: "backoff_max_ms",
                reason: format!("must be at least backoff_base_ms ({})", self.backoff_base_ms),
            });
        }
        if self.background_interval_ms == 0 {
            return Err(CoreError::Invalid {
                field: "background_interval_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.request_timeout_ms == 0 {
            return Err(CoreError::Invalid {
                field: "request_timeout_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.implicit_start_event.trim().is_empty() {
            return Err(CoreError::Invalid {
                field: "implicit_start_event",
                reason: "must not be empty".to_string(),
            });
        }
        self.default_api_base_url()?;
        Ok(())
    }

    /// Parsed fallback ingestion URL.
    pub fn default_api_base_url(&self) -> CoreResult<Url> {
        Url::parse(&self.default_api_base).map_err(CoreError::from)
    }

    pub fn background_interval(&self) -> Duration {
        Duration::from_millis(self.background_interval_ms)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    pub fn backoff_max(&self) -> Duration {
        Duration::from_millis(self.backoff_max_ms)
    }

    pub fn flush_delays(&self) -> Vec<Duration> {
        self.flush_delays_ms
            .iter()
            .copied()
            .map(Duration::from_millis)
            .collect()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
