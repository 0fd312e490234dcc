//! Telemetry facade tying capture, identity, endpoint and delivery together.

use crate::{
    ApiBase, BackgroundHandle, Capture, CaptureConfig, DeliveryPump, DeliveryTransport,
    DrainReport, HttpTransport, IdentityStore, Outbox, OutboxResult, Props, PumpConfig,
    PumpStatus,
};
use hutch_config::Config;
use hutch_storage::KeyValueStore;
use std::sync::Arc;
use tracing::info;

/// One telemetry client instance.
///
/// Owns the outbox and the pump; nothing is process-global, so several
/// instances over different stores can coexist (tests rely on this).
pub struct Telemetry {
    outbox: Arc<Outbox>,
    identity: IdentityStore,
    capture: Capture,
    pump: DeliveryPump,
    api_base: ApiBase,
}

impl Telemetry {
    /// Create a client over `store` delivering through `transport`.
    ///
    /// The persisted outbox is restored immediately. `api_override` takes
    /// precedence over any persisted or configured base URL.
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        transport: Arc<dyn DeliveryTransport>,
        config: &Config,
        api_override: Option<String>,
    ) -> Self {
        let outbox = Arc::new(Outbox::load(store.clone()));
        let identity = IdentityStore::new(store.clone());
        let api_base =
            ApiBase::new(store, config.default_api_base.clone()).with_override(api_override);
        let capture = Capture::new(
            outbox.clone(),
            identity.clone(),
            CaptureConfig::from(config),
        );
        let pump = DeliveryPump::new(
            outbox.clone(),
            transport,
            api_base.clone(),
            PumpConfig::from(config),
        );

        info!(
            api_base = %api_base.resolve(),
            queued_batches = outbox.len(),
            "Telemetry initialized"
        );

        Self {
            outbox,
            identity,
            capture,
            pump,
            api_base,
        }
    }

    /// Create a client delivering over HTTP.
    pub fn with_http(
        store: Arc<dyn KeyValueStore>,
        config: &Config,
        api_override: Option<String>,
    ) -> OutboxResult<Self> {
        let transport = Arc::new(HttpTransport::new(config.client_id.clone())?);
        Ok(Self::new(store, transport, config, api_override))
    }

    /// Start a new session batch. Never resumes an existing one.
    pub fn begin_session(&self, session_id: &str) {
        self.capture.begin_session(session_id);
    }

    /// Make `session_id` the active session without queuing a batch.
    pub fn resume_session(&self, session_id: &str) {
        self.capture.resume_session(session_id);
    }

    pub fn active_session(&self) -> Option<String> {
        self.capture.active_session()
    }

    /// Record an event in the active session, starting one if needed.
    pub fn track(&self, name: &str, props: Props) {
        self.capture.track(name, props);
    }

    /// Schedule an immediate delivery attempt plus the configured follow-ups.
    pub fn flush_now(&self) {
        self.pump.flush_now();
    }

    /// Deliver everything currently deliverable, stopping at the first failure.
    pub async fn drain(&self) -> DrainReport {
        self.pump.drain().await
    }

    pub fn start_background(&self) -> BackgroundHandle {
        self.pump.start_background()
    }

    pub fn status(&self) -> PumpStatus {
        self.pump.status()
    }

    pub fn user_id(&self) -> String {
        self.identity.user_id()
    }

    /// The base URL the next delivery attempt will use.
    pub fn api_base(&self) -> String {
        self.api_base.resolve()
    }

    /// Persist a new base URL; blank resets to the configured default.
    pub fn set_api_base(&self, url: &str) -> OutboxResult<()> {
        self.api_base.set(url)
    }

    pub fn outbox(&self) -> &Arc<Outbox> {
        &self.outbox
    }

    pub fn pump(&self) -> &DeliveryPump {
        &self.pump
    }
}
