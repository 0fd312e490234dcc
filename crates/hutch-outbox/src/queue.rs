//! Durable outbox queue of session batches.

use crate::Batch;
use crate::Event;
use hutch_storage::{KeyValueStore, StorageKeys};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Result of appending an event for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// Appended to the session's most recent batch.
    Appended,
    /// The session had no batch left in the queue, so a continuation batch
    /// was opened for it.
    Continued,
}

/// Ordered FIFO of undelivered batches.
///
/// The whole queue is the unit of persistence: every mutation re-encodes it
/// and writes it under [`StorageKeys::OUTBOX`] before the lock is released.
/// Write faults are logged and swallowed; the in-memory queue stays
/// authoritative until the next successful write.
pub struct Outbox {
    store: Arc<dyn KeyValueStore>,
    batches: Mutex<Vec<Batch>>,
}

impl Outbox {
    /// Load the queue persisted in `store`.
    ///
    /// A missing, unreadable or malformed value yields an empty queue.
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let batches = match store.get(StorageKeys::OUTBOX) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<Batch>>(&raw) {
                Ok(batches) => batches,
                Err(e) => {
                    warn!(error = %e, "Persisted outbox is malformed, starting empty");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "Failed to read persisted outbox, starting empty");
                Vec::new()
            }
        };

        if !batches.is_empty() {
            info!(
                batches = batches.len(),
                events = batches.iter().map(Batch::len).sum::<usize>(),
                "Restored outbox"
            );
        }

        Self {
            store,
            batches: Mutex::new(batches),
        }
    }

    /// Run `f` against the queue, then persist the result.
    fn mutate<R>(&self, f: impl FnOnce(&mut Vec<Batch>) -> R) -> R {
        let mut batches = self.batches.lock();
        let result = f(&mut batches);
        self.persist(&batches);
        result
    }

    fn persist(&self, batches: &[Batch]) {
        let encoded = match serde_json::to_string(batches) {
            Ok(encoded) => encoded,
            Err(e) => {
                error!(error = %e, "Failed to encode outbox");
                return;
            }
        };
        if let Err(e) = self.store.set(StorageKeys::OUTBOX, &encoded) {
            warn!(error = %e, batches = batches.len(), "Failed to persist outbox");
        }
    }

    /// Append a new (usually empty) batch at the tail.
    pub fn push_batch(&self, batch: Batch) {
        debug!(session_id = %batch.session_id, "Queued batch");
        self.mutate(|batches| batches.push(batch));
    }

    /// Append events to the most recent batch for `session_id`.
    ///
    /// If no batch for the session remains, a continuation batch is pushed
    /// with the user id from `user_id`.
    pub fn append_events(
        &self,
        session_id: &str,
        events: Vec<Event>,
        user_id: impl FnOnce() -> String,
    ) -> AppendOutcome {
        self.mutate(|batches| {
            match batches.iter().rposition(|b| b.session_id == session_id) {
                Some(index) => {
                    batches[index].events.extend(events);
                    AppendOutcome::Appended
                }
                None => {
                    let mut batch = Batch::new(session_id, user_id());
                    batch.events = events;
                    batches.push(batch);
                    AppendOutcome::Continued
                }
            }
        })
    }

    /// Clone of the head batch that should be delivered next.
    ///
    /// Empty head batches that have a successor are dropped first: nothing
    /// can be lost by removing them and the server rejects empty batches. An
    /// empty batch that is the only one queued is kept (its session is still
    /// filling) and `None` is returned.
    pub fn deliverable_head(&self) -> Option<Batch> {
        let mut batches = self.batches.lock();

        let mut pruned = 0;
        while batches.len() > 1 && batches[0].is_empty() {
            let batch = batches.remove(0);
            debug!(session_id = %batch.session_id, "Pruned empty batch");
            pruned += 1;
        }
        if pruned > 0 {
            self.persist(&batches);
        }

        batches.first().filter(|b| !b.is_empty()).cloned()
    }

    /// Remove what was delivered from the head batch.
    ///
    /// `sent` is the snapshot that went over the wire. Only its events are
    /// drained; events appended while it was in flight stay queued. Returns
    /// the number of events removed.
    pub fn acknowledge_head(&self, sent: &Batch) -> usize {
        self.mutate(|batches| {
            let Some(head) = batches.first_mut() else {
                error!(session_id = %sent.session_id, "Acknowledged batch missing from outbox");
                return 0;
            };

            let same_batch = head.session_id == sent.session_id
                && head.events.len() >= sent.events.len()
                && head.events[..sent.events.len()] == sent.events[..];
            if !same_batch {
                error!(
                    session_id = %sent.session_id,
                    head_session_id = %head.session_id,
                    "Outbox head changed while in flight, keeping it"
                );
                return 0;
            }

            if head.events.len() == sent.events.len() {
                batches.remove(0);
            } else {
                head.events.drain(..sent.events.len());
                debug!(
                    session_id = %sent.session_id,
                    remaining = head.events.len(),
                    "Head batch grew while in flight"
                );
            }
            sent.events.len()
        })
    }

    /// Clone of the whole queue in FIFO order.
    pub fn snapshot(&self) -> Vec<Batch> {
        self.batches.lock().clone()
    }

    /// Number of queued batches.
    pub fn len(&self) -> usize {
        self.batches.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.lock().is_empty()
    }

    /// Number of queued events across all batches.
    pub fn event_count(&self) -> usize {
        self.batches.lock().iter().map(Batch::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::props;
    use crate::test_support::FlakyStore;
    use hutch_storage::MemoryStore;
    use serde_json::json;

    fn event(name: &str) -> Event {
        Event::new(name, props(json!({})))
    }

    fn user() -> String {
        "user-1".to_string()
    }

    fn persisted(store: &dyn KeyValueStore) -> Vec<Batch> {
        let raw = store.get(StorageKeys::OUTBOX).unwrap().unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    #[test]
    fn test_outbox_starts_empty() {
        let outbox = Outbox::load(Arc::new(MemoryStore::new()));
        assert!(outbox.is_empty());
        assert_eq!(outbox.event_count(), 0);
        assert!(outbox.deliverable_head().is_none());
    }

    #[test]
    fn test_every_mutation_is_persisted() {
        let store = Arc::new(MemoryStore::new());
        let outbox = Outbox::load(store.clone());

        outbox.push_batch(Batch::new("s1", "user-1"));
        assert_eq!(persisted(store.as_ref()), outbox.snapshot());

        outbox.append_events("s1", vec![event("a")], user);
        assert_eq!(persisted(store.as_ref()), outbox.snapshot());
        assert_eq!(persisted(store.as_ref())[0].events.len(), 1);
    }

    #[test]
    fn test_append_targets_latest_batch_of_session() {
        let outbox = Outbox::load(Arc::new(MemoryStore::new()));
        outbox.push_batch(Batch::new("s1", "user-1"));
        outbox.push_batch(Batch::new("s2", "user-1"));

        assert_eq!(
            outbox.append_events("s1", vec![event("a")], user),
            AppendOutcome::Appended
        );

        let batches = outbox.snapshot();
        assert_eq!(batches[0].events.len(), 1);
        assert!(batches[1].events.is_empty());
    }

    #[test]
    fn test_append_opens_continuation_when_session_gone() {
        let outbox = Outbox::load(Arc::new(MemoryStore::new()));

        assert_eq!(
            outbox.append_events("s1", vec![event("a")], user),
            AppendOutcome::Continued
        );

        let batches = outbox.snapshot();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].session_id, "s1");
        assert_eq!(batches[0].user_id, "user-1");
        assert_eq!(batches[0].events[0].name, "a");
    }

    #[test]
    fn test_deliverable_head_prunes_empty_batches_with_successor() {
        let store = Arc::new(MemoryStore::new());
        let outbox = Outbox::load(store.clone());
        outbox.push_batch(Batch::new("s1", "user-1"));
        outbox.push_batch(Batch::new("s2", "user-1"));
        outbox.append_events("s2", vec![event("a")], user);

        let head = outbox.deliverable_head().unwrap();
        assert_eq!(head.session_id, "s2");
        assert_eq!(outbox.len(), 1);
        assert_eq!(persisted(store.as_ref()).len(), 1);
    }

    #[test]
    fn test_lone_empty_batch_is_kept() {
        let outbox = Outbox::load(Arc::new(MemoryStore::new()));
        outbox.push_batch(Batch::new("s1", "user-1"));

        assert!(outbox.deliverable_head().is_none());
        assert_eq!(outbox.len(), 1);
    }

    #[test]
    fn test_acknowledge_removes_delivered_head() {
        let outbox = Outbox::load(Arc::new(MemoryStore::new()));
        outbox.append_events("s1", vec![event("a"), event("b")], user);
        outbox.append_events("s2", vec![event("c")], user);

        let head = outbox.deliverable_head().unwrap();
        assert_eq!(outbox.acknowledge_head(&head), 2);

        let batches = outbox.snapshot();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].session_id, "s2");
    }

    #[test]
    fn test_acknowledge_keeps_events_appended_in_flight() {
        let outbox = Outbox::load(Arc::new(MemoryStore::new()));
        outbox.append_events("s1", vec![event("a")], user);

        let sent = outbox.deliverable_head().unwrap();
        outbox.append_events("s1", vec![event("late")], user);

        assert_eq!(outbox.acknowledge_head(&sent), 1);
        let batches = outbox.snapshot();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].events.len(), 1);
        assert_eq!(batches[0].events[0].name, "late");
    }

    #[test]
    fn test_acknowledge_mismatch_keeps_queue() {
        let outbox = Outbox::load(Arc::new(MemoryStore::new()));
        outbox.append_events("s1", vec![event("a")], user);

        let mut stranger = Batch::new("other", "user-1");
        stranger.events.push(event("a"));

        assert_eq!(outbox.acknowledge_head(&stranger), 0);
        assert_eq!(outbox.len(), 1);
        assert_eq!(outbox.event_count(), 1);
    }

    #[test]
    fn test_load_roundtrip() {
        let store = Arc::new(MemoryStore::new());
        let outbox = Outbox::load(store.clone());
        outbox.append_events(
            "s1",
            vec![Event::new("jump", props(json!({ "height": 12, "tags": ["a", "b"] })))],
            user,
        );
        outbox.append_events("s2", vec![event("x")], user);
        let before = outbox.snapshot();

        let reloaded = Outbox::load(store);
        assert_eq!(reloaded.snapshot(), before);
    }

    #[test]
    fn test_malformed_persisted_outbox_starts_empty() {
        let store = Arc::new(MemoryStore::new());
        store.set(StorageKeys::OUTBOX, "{ definitely not a queue").unwrap();

        let outbox = Outbox::load(store);
        assert!(outbox.is_empty());
    }

    #[test]
    fn test_unreadable_outbox_starts_empty() {
        let store = Arc::new(FlakyStore::new());
        store.fail_reads(true);

        let outbox = Outbox::load(store);
        assert!(outbox.is_empty());
    }

    #[test]
    fn test_write_fault_keeps_memory_authoritative() {
        let store = Arc::new(FlakyStore::new());
        let outbox = Outbox::load(store.clone());
        outbox.append_events("s1", vec![event("a")], user);

        store.fail_writes(true);
        outbox.append_events("s1", vec![event("b")], user);
        assert_eq!(outbox.event_count(), 2);

        // The next successful write carries the whole queue.
        store.fail_writes(false);
        outbox.append_events("s1", vec![event("c")], user);
        assert_eq!(persisted(store.as_ref())[0].events.len(), 3);
    }
}
