//! Outbox error types.

use std::time::Duration;
use thiserror::Error;

/// Outbox error type.
///
/// None of these reach callers of `track`, `begin_session` or `flush_now`;
/// the facade logs them.
#[derive(Error, Debug)]
pub enum OutboxError {
    /// Persistence adapter error
    #[error("Storage error: {0}")]
    Storage(#[from] hutch_storage::StorageError),

    /// Network-level fault (connect, DNS, TLS, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Endpoint answered with a non-success status
    #[error("Delivery rejected with HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Attempt exceeded the pump's request timeout
    #[error("Delivery timed out after {0:?}")]
    Timeout(Duration),

    /// Acknowledgment body was not valid JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Endpoint base URL could not be parsed
    #[error("Invalid endpoint URL {url:?}: {reason}")]
    InvalidEndpoint { url: String, reason: String },
}

/// Result type alias using OutboxError.
pub type OutboxResult<T> = Result<T, OutboxError>;
