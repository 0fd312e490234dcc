//! Ingestion endpoint resolution.

use crate::{OutboxError, OutboxResult};
use hutch_storage::{KeyValueStore, StorageKeys};
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

/// Resolves the ingestion base URL.
///
/// Precedence: explicit runtime override, then the persisted value, then the
/// configured default. Resolution happens on every call so a `set` is picked
/// up by the next delivery attempt.
#[derive(Clone)]
pub struct ApiBase {
    store: Arc<dyn KeyValueStore>,
    override_url: Option<String>,
    default_url: String,
}

impl ApiBase {
    pub fn new(store: Arc<dyn KeyValueStore>, default_url: impl Into<String>) -> Self {
        Self {
            store,
            override_url: None,
            default_url: default_url.into(),
        }
    }

    /// Apply a runtime override (launch argument or env). Blank is ignored.
    pub fn with_override(mut self, override_url: Option<String>) -> Self {
        self.override_url = override_url
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());
        self
    }

    /// The base URL the next delivery attempt will use, without a trailing `/`.
    pub fn resolve(&self) -> String {
        let url = match &self.override_url {
            Some(url) => url.clone(),
            None => self.persisted().unwrap_or_else(|| self.default_url.clone()),
        };
        url.trim_end_matches('/').to_string()
    }

    /// The persisted base URL, if any. Read faults are treated as absent.
    pub fn persisted(&self) -> Option<String> {
        match self.store.get(StorageKeys::API_BASE) {
            Ok(value) => value
                .map(|url| url.trim().to_string())
                .filter(|url| !url.is_empty()),
            Err(e) => {
                warn!(error = %e, "Failed to read persisted API base");
                None
            }
        }
    }

    pub fn override_url(&self) -> Option<&str> {
        self.override_url.as_deref()
    }

    /// Persist a new base URL. A blank value clears the persisted URL so the
    /// default applies again.
    pub fn set(&self, url: &str) -> OutboxResult<()> {
        let url = url.trim();
        if url.is_empty() {
            self.store.delete(StorageKeys::API_BASE)?;
            info!("Cleared persisted API base");
            return Ok(());
        }

        let parsed = Url::parse(url).map_err(|e| OutboxError::InvalidEndpoint {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(OutboxError::InvalidEndpoint {
                url: url.to_string(),
                reason: format!("unsupported scheme {}", parsed.scheme()),
            });
        }

        self.store.set(StorageKeys::API_BASE, url)?;
        info!(api_base = %url, "Persisted API base");
        Ok(())
    }
}
