//! Session and event capture.

use crate::{AppendOutcome, Batch, Event, IdentityStore, Outbox, Props};
use chrono::{Duration as ChronoDuration, Utc};
use hutch_config::{Config, DEFAULT_IMPLICIT_START_EVENT};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

/// Capture configuration.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Name of the event synthesized at the start of an implicit session.
    pub implicit_start_event: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            implicit_start_event: DEFAULT_IMPLICIT_START_EVENT.to_string(),
        }
    }
}

impl From<&Config> for CaptureConfig {
    fn from(config: &Config) -> Self {
        Self {
            implicit_start_event: config.implicit_start_event.clone(),
        }
    }
}

/// Appends sessions and events to the outbox.
///
/// The active session is tracked as an explicit handle (its id), not as
/// "the last batch in the queue", so delivering a batch mid-session does not
/// start a new session: the next event opens a continuation batch with the
/// same session id instead.
pub struct Capture {
    outbox: Arc<Outbox>,
    identity: IdentityStore,
    config: CaptureConfig,
    active: Mutex<Option<String>>,
}

impl Capture {
    pub fn new(outbox: Arc<Outbox>, identity: IdentityStore, config: CaptureConfig) -> Self {
        Self {
            outbox,
            identity,
            config,
            active: Mutex::new(None),
        }
    }

    /// Start a new session: a fresh batch at the tail of the outbox.
    ///
    /// Never resumes; calling twice with the same id creates two batches.
    pub fn begin_session(&self, session_id: &str) {
        let mut active = self.active.lock();
        self.open_batch(&mut active, session_id);
    }

    fn open_batch(&self, active: &mut Option<String>, session_id: &str) {
        let user_id = self.identity.user_id();
        self.outbox.push_batch(Batch::new(session_id, user_id));
        *active = Some(session_id.to_string());
        info!(session_id = %session_id, "Session started");
    }

    /// Point the active handle at an existing session without creating a
    /// batch. The next `track` appends to that session's latest batch, or
    /// opens a continuation batch if none is queued.
    pub fn resume_session(&self, session_id: &str) {
        *self.active.lock() = Some(session_id.to_string());
        debug!(session_id = %session_id, "Session resumed");
    }

    /// Id of the active session, if any.
    pub fn active_session(&self) -> Option<String> {
        self.active.lock().clone()
    }

    /// Record one event in the active session.
    ///
    /// With no active session an implicit one is started, and its first
    /// event is a synthetic session-start stamped just before this one.
    pub fn track(&self, name: &str, props: Props) {
        let now = Utc::now();
        let mut active = self.active.lock();

        let (session_id, events) = match active.clone() {
            Some(session_id) => (session_id, vec![Event::at(name, now, props)]),
            None => {
                let session_id = uuid::Uuid::new_v4().to_string();
                self.open_batch(&mut active, &session_id);
                let start = Event::at(
                    self.config.implicit_start_event.as_str(),
                    now - ChronoDuration::milliseconds(1),
                    Props::new(),
                );
                (session_id, vec![start, Event::at(name, now, props)])
            }
        };

        let outcome = self
            .outbox
            .append_events(&session_id, events, || self.identity.user_id());
        if outcome == AppendOutcome::Continued {
            debug!(session_id = %session_id, "Opened continuation batch");
        }
    }
}
