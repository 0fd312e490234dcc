//! Per-installation user identity.

use hutch_storage::{KeyValueStore, StorageKeys};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{info, warn};

/// Resolves the stable user id, creating it on first access.
///
/// Once an id has been read from or written to storage it is cached for the
/// life of the process. If storage is unusable every call returns a fresh
/// ephemeral id; batches from such a process cannot be linked to one user.
#[derive(Clone)]
pub struct IdentityStore {
    store: Arc<dyn KeyValueStore>,
    cached: Arc<Mutex<Option<String>>>,
}

impl IdentityStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            cached: Arc::new(Mutex::new(None)),
        }
    }

    /// The persisted user id, generated and persisted if absent.
    pub fn user_id(&self) -> String {
        let mut cached = self.cached.lock();
        if let Some(id) = cached.as_ref() {
            return id.clone();
        }

        match self.store.get(StorageKeys::USER_ID) {
            Ok(Some(id)) if !id.trim().is_empty() => {
                *cached = Some(id.clone());
                id
            }
            Ok(_) => {
                let id = uuid::Uuid::new_v4().to_string();
                match self.store.set(StorageKeys::USER_ID, &id) {
                    Ok(()) => {
                        info!(user_id = %id, "Generated installation user id");
                        *cached = Some(id.clone());
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to persist user id, using ephemeral id");
                    }
                }
                id
            }
            Err(e) => {
                warn!(error = %e, "User id storage unavailable, using ephemeral id");
                uuid::Uuid::new_v4().to_string()
            }
        }
    }
}
