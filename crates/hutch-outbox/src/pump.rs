//! Delivery pump: single-flight delivery of the outbox head with backoff.

use crate::{ApiBase, DeliveryTransport, Outbox, OutboxError};
use hutch_config::Config;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Pause between attempts while `drain` waits for another attempt to finish.
const DRAIN_BUSY_POLL: Duration = Duration::from_millis(50);

/// Pump timing configuration.
///
/// Retry delay follows `base * 2^failures`, capped at `backoff_max`. For the
/// defaults: 2s after the first failure, then 4s, 8s, 16s, 30s, 30s, ...
#[derive(Debug, Clone)]
pub struct PumpConfig {
    /// Delay restored after any success.
    pub backoff_base: Duration,
    /// Ceiling for the doubling delay.
    pub backoff_max: Duration,
    /// Upper bound on one transport call; exceeding it is a failure.
    pub request_timeout: Duration,
    /// Extra attempts scheduled after an immediate flush.
    pub flush_delays: Vec<Duration>,
    /// Period of the background ticker.
    pub background_interval: Duration,
}

impl Default for PumpConfig {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for PumpConfig {
    fn from(config: &Config) -> Self {
        Self {
            backoff_base: config.backoff_base(),
            backoff_max: config.backoff_max(),
            request_timeout: config.request_timeout(),
            flush_delays: config.flush_delays(),
            background_interval: config.background_interval(),
        }
    }
}

/// What caused a pump invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Periodic ticker. Honors the backoff window.
    Background,
    /// Explicit flush. Skips the backoff window but not the in-flight guard.
    Flush,
}

/// Result of one pump invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PumpOutcome {
    /// Head batch acknowledged; `events` were removed from the outbox.
    Delivered { events: usize },
    /// Attempt failed; the next background attempt waits `backoff`.
    Failed { backoff: Duration },
    /// Another attempt is in flight; nothing was done.
    Busy,
    /// Background trigger arrived inside the backoff window.
    BackingOff,
    /// No deliverable batch.
    Empty,
}

/// Snapshot of pump and queue state for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PumpStatus {
    pub in_flight: bool,
    pub backoff: Duration,
    pub consecutive_failures: u32,
    pub queued_batches: usize,
    pub queued_events: usize,
}

/// Summary of a [`DeliveryPump::drain`] run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub delivered_batches: usize,
    pub delivered_events: usize,
    pub failed: bool,
}

#[derive(Debug)]
struct DeliveryState {
    in_flight: bool,
    backoff: Duration,
    retry_at: Option<Instant>,
    consecutive_failures: u32,
}

struct PumpInner {
    outbox: Arc<Outbox>,
    transport: Arc<dyn DeliveryTransport>,
    api_base: ApiBase,
    config: PumpConfig,
    state: Mutex<DeliveryState>,
}

/// Clears the in-flight flag even if the attempt future is dropped.
struct InFlightGuard<'a> {
    state: &'a Mutex<DeliveryState>,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.state.lock().in_flight = false;
    }
}

/// Single-flight scheduler over the outbox head.
///
/// Cloning is cheap and shares state; every trigger source goes through the
/// same in-flight flag, so at most one transport call is ever outstanding.
#[derive(Clone)]
pub struct DeliveryPump {
    inner: Arc<PumpInner>,
}

impl DeliveryPump {
    pub fn new(
        outbox: Arc<Outbox>,
        transport: Arc<dyn DeliveryTransport>,
        api_base: ApiBase,
        config: PumpConfig,
    ) -> Self {
        let state = DeliveryState {
            in_flight: false,
            backoff: config.backoff_base,
            retry_at: None,
            consecutive_failures: 0,
        };
        Self {
            inner: Arc::new(PumpInner {
                outbox,
                transport,
                api_base,
                config,
                state: Mutex::new(state),
            }),
        }
    }

    /// Attempt delivery of the head batch once.
    pub async fn pump(&self, trigger: Trigger) -> PumpOutcome {
        let inner = &self.inner;

        let batch = {
            let mut state = inner.state.lock();
            if state.in_flight {
                return PumpOutcome::Busy;
            }
            if trigger == Trigger::Background {
                if let Some(retry_at) = state.retry_at {
                    if Instant::now() < retry_at {
                        return PumpOutcome::BackingOff;
                    }
                }
            }
            let Some(batch) = inner.outbox.deliverable_head() else {
                return PumpOutcome::Empty;
            };
            state.in_flight = true;
            batch
        };
        let _guard = InFlightGuard {
            state: &inner.state,
        };

        let endpoint = inner.api_base.resolve();
        let timeout = inner.config.request_timeout;
        let result = match tokio::time::timeout(
            timeout,
            inner.transport.send_batch(&endpoint, &batch),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(OutboxError::Timeout(timeout)),
        };

        match result {
            Ok(_ack) => {
                let events = inner.outbox.acknowledge_head(&batch);
                let mut state = inner.state.lock();
                state.backoff = inner.config.backoff_base;
                state.retry_at = None;
                state.consecutive_failures = 0;
                info!(
                    session_id = %batch.session_id,
                    events = events,
                    remaining_batches = inner.outbox.len(),
                    "Batch delivered"
                );
                PumpOutcome::Delivered { events }
            }
            Err(e) => {
                let mut state = inner.state.lock();
                state.backoff = (state.backoff * 2).min(inner.config.backoff_max);
                state.retry_at = Some(Instant::now() + state.backoff);
                state.consecutive_failures += 1;
                warn!(
                    session_id = %batch.session_id,
                    endpoint = %endpoint,
                    failures = state.consecutive_failures,
                    backoff_ms = state.backoff.as_millis() as u64,
                    error = %e,
                    "Batch delivery failed, retrying later"
                );
                PumpOutcome::Failed {
                    backoff: state.backoff,
                }
            }
        }
    }

    /// Attempt delivery now and again after each configured flush delay,
    /// without waiting for any of it.
    ///
    /// Outside a tokio runtime this logs and does nothing.
    pub fn flush_now(&self) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!("flush_now called outside a tokio runtime, skipping");
            return;
        };

        let pump = self.clone();
        handle.spawn(async move {
            pump.pump(Trigger::Flush).await;
        });

        for delay in self.inner.config.flush_delays.iter().copied() {
            let pump = self.clone();
            handle.spawn(async move {
                tokio::time::sleep(delay).await;
                pump.pump(Trigger::Flush).await;
            });
        }
        debug!("Flush scheduled");
    }

    /// Spawn the fixed-period background ticker. The first tick fires one
    /// period after start.
    pub fn start_background(&self) -> BackgroundHandle {
        let pump = self.clone();
        let period = self.inner.config.background_interval;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                pump.pump(Trigger::Background).await;
            }
        });

        info!(interval_ms = period.as_millis() as u64, "Background delivery started");
        BackgroundHandle {
            handle: Some(handle),
        }
    }

    /// Deliver until nothing deliverable remains or an attempt fails.
    pub async fn drain(&self) -> DrainReport {
        let mut report = DrainReport::default();
        loop {
            match self.pump(Trigger::Flush).await {
                PumpOutcome::Delivered { events } => {
                    report.delivered_batches += 1;
                    report.delivered_events += events;
                }
                PumpOutcome::Failed { .. } => {
                    report.failed = true;
                    break;
                }
                PumpOutcome::Busy => tokio::time::sleep(DRAIN_BUSY_POLL).await,
                PumpOutcome::BackingOff | PumpOutcome::Empty => break,
            }
        }
        report
    }

    pub fn status(&self) -> PumpStatus {
        let (in_flight, backoff, consecutive_failures) = {
            let state = self.inner.state.lock();
            (state.in_flight, state.backoff, state.consecutive_failures)
        };
        PumpStatus {
            in_flight,
            backoff,
            consecutive_failures,
            queued_batches: self.inner.outbox.len(),
            queued_events: self.inner.outbox.event_count(),
        }
    }

    /// Current retry delay.
    pub fn backoff(&self) -> Duration {
        self.inner.state.lock().backoff
    }

    pub fn outbox(&self) -> &Arc<Outbox> {
        &self.inner.outbox
    }
}

/// Owns the background ticker task. Dropping it stops the ticker.
pub struct BackgroundHandle {
    handle: Option<JoinHandle<()>>,
}

impl BackgroundHandle {
    /// Stop the ticker. An attempt already in flight is cancelled; its batch
    /// stays queued.
    pub fn shutdown(mut self) {
        self.abort();
    }

    fn abort(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            debug!("Background delivery stopped");
        }
    }
}

impl Drop for BackgroundHandle {
    fn drop(&mut self) {
        self.abort();
    }
}
