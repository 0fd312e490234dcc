//! Event and batch types.
//!
//! These are both the persisted outbox shape and the delivery wire shape:
//! `{ session_id, user_id, events: [{ name, ts, props }] }`.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Event properties: any JSON object.
pub type Props = Map<String, Value>;

/// Convert a JSON value into event properties.
///
/// Objects pass through, `null` becomes empty, and any other value is
/// wrapped as `{ "value": ... }`.
pub fn props(value: Value) -> Props {
    match value {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other);
            map
        }
    }
}

/// ISO-8601 UTC timestamp with millisecond precision, e.g.
/// `2025-01-15T10:30:00.123Z`.
pub fn format_ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// A single captured event. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub name: String,
    pub ts: String,
    #[serde(default)]
    pub props: Props,
}

impl Event {
    /// Event stamped with the current time.
    pub fn new(name: impl Into<String>, props: Props) -> Self {
        Self::at(name, Utc::now(), props)
    }

    pub fn at(name: impl Into<String>, at: DateTime<Utc>, props: Props) -> Self {
        Self {
            name: name.into(),
            ts: format_ts(at),
            props,
        }
    }
}

/// One session's events grouped for transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub session_id: String,
    pub user_id: String,
    #[serde(default)]
    pub events: Vec<Event>,
}

impl Batch {
    pub fn new(session_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            user_id: user_id.into(),
            events: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }
}
