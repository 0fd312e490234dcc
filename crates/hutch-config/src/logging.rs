//! Logging initialization for the telemetry client.
//!
//! Thin wrapper over the observability crate so binaries only need a level
//! and a log path.

use std::path::PathBuf;

/// Initialize logging for a Hutch binary.
///
/// - JSONL to `log_path` (or observability's default location)
/// - compact stderr output
/// - `RUST_LOG` overrides `level`
pub fn init_logging(level: &str, log_path: Option<PathBuf>) {
    observability::init_with_config(observability::LogConfig {
        service_name: "hutch".into(),
        default_level: parse_level(level).as_str().to_ascii_lowercase(),
        log_path,
        also_stderr: true,
        ..Default::default()
    });
}

/// Parse a log level string into a tracing Level.
///
/// Unknown strings fall back to INFO.
pub fn parse_level(level: &str) -> tracing::Level {
    match level.trim().to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" | "warning" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}
