//! # Observability
//!
//! Centralized logging layer for the Hutch telemetry client.
//!
//! ## Design Philosophy
//!
//! Crates are **log producers**. The binary calls
//! `observability::init_with_config()` once at startup and every crate uses
//! standard `tracing` macros throughout its code. They have
//! zero knowledge of where logs go or who reads them.
//!
//! ## Output
//!
//! Structured JSONL is appended to a single file, by default
//! `~/.hutch/logs/telemetry.jsonl`:
//!
//! - `tail -f ~/.hutch/logs/telemetry.jsonl | jq` for pretty JSON
//! - `lnav ~/.hutch/logs/telemetry.jsonl` for interactive exploration
//!
//! A compact human-readable stderr layer can be enabled alongside the file.
//!
//! ## Usage
//!
//! ```rust,ignore
//! observability::init_with_config(observability::LogConfig {
//!     service_name: "hutch".into(),
//!     default_level: "debug".into(),
//!     also_stderr: true,
//!     ..Default::default()
//! });
//! ```

mod file;
mod json_layer;

pub use file::{default_log_path, CentralLogWriter, WriterFactory};
pub use json_layer::{JsonLayer, LogEntry};

use std::io;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Name of the service (e.g., "hutch", "hutch-demo").
    /// Included in every log line for filtering.
    pub service_name: String,

    /// Default log level filter (e.g., "debug", "info", "warn").
    /// Can be overridden by `RUST_LOG` environment variable.
    pub default_level: String,

    /// Optional custom log file path.
    /// Defaults to `~/.hutch/logs/telemetry.jsonl`.
    pub log_path: Option<PathBuf>,

    /// Also emit logs to stderr for immediate feedback.
    pub also_stderr: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".into(),
            default_level: "info".into(),
            log_path: None,
            also_stderr: false,
        }
    }
}

/// Initialize the observability layer with custom configuration.
///
/// If the log file cannot be opened the file layer is skipped and a
/// warning is emitted on the remaining layers. Logging must never stop
/// the host application from starting.
///
/// Calling this twice is harmless: the second global subscriber install
/// is ignored.
pub fn init_with_config(config: LogConfig) {
    let log_path = config.log_path.clone().or_else(default_log_path);

    let mut open_error = None;
    let json_layer = match &log_path {
        Some(path) => match CentralLogWriter::new(path) {
            Ok(writer) => Some(JsonLayer::new(
                config.service_name.clone(),
                WriterFactory::new(writer),
            )),
            Err(e) => {
                open_error = Some(e);
                None
            }
        },
        None => None,
    };

    let stderr_layer = config.also_stderr.then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_file(false)
            .with_line_number(false)
            .compact()
            .with_writer(io::stderr)
    });

    let result = tracing_subscriber::registry()
        .with(json_layer.map(|l| l.with_filter(env_filter(&config.default_level))))
        .with(stderr_layer.map(|l| l.with_filter(env_filter(&config.default_level))))
        .try_init();

    if result.is_err() {
        return;
    }

    match (open_error, log_path) {
        (Some(e), Some(path)) => tracing::warn!(
            log_path = %path.display(),
            error = %e,
            "failed to open log file, file logging disabled"
        ),
        (None, Some(path)) => {
            tracing::debug!(log_path = %path.display(), "observability initialized")
        }
        _ => {}
    }
}

/// Build an env filter from `RUST_LOG`, falling back to the given level.
fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Re-export tracing macros for convenience.
/// Crates can use `observability::info!()` or `tracing::info!()`.
pub use tracing::{debug, error, info, instrument, trace, warn};

/// Re-export Level for advanced filtering.
pub use tracing::Level;
