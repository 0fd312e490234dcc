//! Outbox pattern implementation for reliable telemetry delivery.
//!
//! This crate provides:
//! - Outbox: ordered queue of per-session batches, persisted on every mutation
//! - Capture: session and event capture with implicit sessions
//! - DeliveryTransport / HttpTransport: one POST per batch
//! - DeliveryPump: single-flight delivery with exponential backoff
//! - Telemetry: the facade host applications call into
//!
//! ```rust,ignore
//! let telemetry = Telemetry::with_http(store, &config, None)?;
//! let _background = telemetry.start_background();
//!
//! telemetry.begin_session("s1");
//! telemetry.track("jump", props(json!({ "height": 12 })));
//! telemetry.flush_now();
//! ```

mod capture;
mod endpoint;
mod error;
mod identity;
mod model;
mod pump;
mod queue;
mod telemetry;
mod transport;

#[cfg(test)]
mod test_support;

pub use capture::{Capture, CaptureConfig};
pub use endpoint::ApiBase;
pub use error::{OutboxError, OutboxResult};
pub use identity::IdentityStore;
pub use model::{format_ts, props, Batch, Event, Props};
pub use pump::{BackgroundHandle, DeliveryPump, DrainReport, PumpConfig, PumpOutcome, PumpStatus, Trigger};
pub use queue::{AppendOutcome, Outbox};
pub use telemetry::Telemetry;
pub use transport::{events_url, DeliveryTransport, HttpTransport, CLIENT_HEADER};
