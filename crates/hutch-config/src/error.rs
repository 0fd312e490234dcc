//! Configuration error types.

use thiserror::Error;

/// Error type for configuration loading and filesystem layout.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A configuration value failed validation.
    #[error("Invalid config value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Endpoint URL could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Config file is not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No home directory to anchor `~/.hutch`.
    #[error("Could not determine home directory")]
    HomeDirNotFound,
}

/// Result type alias using CoreError.
pub type CoreResult<T> = Result<T, CoreError>;
