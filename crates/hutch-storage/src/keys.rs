//! Storage key constants.

/// Keys under which the client persists its state.
///
/// Each concern lives under its own key so a fault writing one cannot
/// corrupt another.
pub struct StorageKeys;

impl StorageKeys {
    /// Per-installation user identifier (opaque string).
    pub const USER_ID: &'static str = "mh_user_id";

    /// Undelivered batches (JSON array, FIFO order).
    pub const OUTBOX: &'static str = "mh_outbox";

    /// Persisted ingestion base URL.
    pub const API_BASE: &'static str = "mh_api_base";

    pub const ALL: [&'static str; 3] = [Self::USER_ID, Self::OUTBOX, Self::API_BASE];
}
