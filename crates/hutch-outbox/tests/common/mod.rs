//! Shared harness for delivery integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use hutch_config::Config;
use hutch_outbox::{Batch, DeliveryTransport, OutboxError, OutboxResult, Telemetry};
use hutch_storage::{KeyValueStore, MemoryStore};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// How the scripted transport answers one send.
#[derive(Debug, Clone)]
pub enum Response {
    /// Acknowledge immediately.
    Ack,
    /// Fail immediately with a 503.
    Fail,
    /// Wait, then acknowledge.
    DelayThenAck(Duration),
    /// Wait, then fail.
    DelayThenFail(Duration),
    /// Never answer.
    NeverRespond,
}

/// Transport that answers from a script and records what it was sent.
///
/// Once the script runs out every send gets `default_response`.
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Response>>,
    default_response: Mutex<Response>,
    sent: Mutex<Vec<(String, Batch)>>,
    calls: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Self::with_script(Vec::new())
    }

    pub fn with_script(script: Vec<Response>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            default_response: Mutex::new(Response::Ack),
            sent: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        })
    }

    pub fn set_default(&self, response: Response) {
        *self.default_response.lock() = response;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of sends observed in progress at once.
    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    /// Batches that reached the transport, in call order.
    pub fn sent(&self) -> Vec<Batch> {
        self.sent.lock().iter().map(|(_, b)| b.clone()).collect()
    }

    pub fn endpoints(&self) -> Vec<String> {
        self.sent.lock().iter().map(|(e, _)| e.clone()).collect()
    }

    fn next_response(&self) -> Response {
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.default_response.lock().clone())
    }
}

struct ActiveGuard<'a>(&'a AtomicUsize);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

fn unavailable() -> OutboxError {
    OutboxError::Status {
        status: 503,
        body: "unavailable".to_string(),
    }
}

#[async_trait]
impl DeliveryTransport for ScriptedTransport {
    async fn send_batch(&self, endpoint: &str, batch: &Batch) -> OutboxResult<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now_active, Ordering::SeqCst);
        let _guard = ActiveGuard(&self.active);

        self.sent
            .lock()
            .push((endpoint.to_string(), batch.clone()));

        match self.next_response() {
            Response::Ack => Ok(json!({ "saved": batch.events.len() })),
            Response::Fail => Err(unavailable()),
            Response::DelayThenAck(delay) => {
                tokio::time::sleep(delay).await;
                Ok(json!({ "saved": batch.events.len() }))
            }
            Response::DelayThenFail(delay) => {
                tokio::time::sleep(delay).await;
                Err(unavailable())
            }
            Response::NeverRespond => {
                std::future::pending::<()>().await;
                Err(unavailable())
            }
        }
    }
}

/// Config with the stock timings and a short request timeout.
pub fn test_config() -> Config {
    Config {
        request_timeout_ms: 5_000,
        ..Config::default()
    }
}

/// Telemetry over a fresh memory store.
pub fn telemetry(transport: Arc<ScriptedTransport>) -> (Arc<MemoryStore>, Telemetry) {
    let store = Arc::new(MemoryStore::new());
    let telemetry = telemetry_over(store.clone(), transport);
    (store, telemetry)
}

/// Telemetry over an existing store, standing in for a process (re)start.
pub fn telemetry_over(
    store: Arc<dyn KeyValueStore>,
    transport: Arc<ScriptedTransport>,
) -> Telemetry {
    Telemetry::new(store, transport, &test_config(), None)
}

/// Event names of a batch, in order.
pub fn names(batch: &Batch) -> Vec<String> {
    batch.events.iter().map(|e| e.name.clone()).collect()
}
