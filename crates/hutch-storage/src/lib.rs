//! Persistence adapter for the Hutch telemetry client.
//!
//! This crate provides durable key/value storage backends:
//! - **FileStore**: one file per key in a state directory, atomic replace
//! - **MemoryStore**: process-local map, for tests and ephemeral runs

mod file;
mod keys;
mod memory;
mod traits;

pub use file::FileStore;
pub use keys::StorageKeys;
pub use memory::MemoryStore;
pub use traits::KeyValueStore;

use thiserror::Error;

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Key contains characters that cannot be mapped to a file name.
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    /// Stored bytes are not valid UTF-8.
    #[error("Encoding error for key {key}: {reason}")]
    Encoding { key: String, reason: String },

    /// Backend cannot be reached at all.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
