//! Delivery transport: one network exchange per batch.

use crate::{Batch, OutboxError, OutboxResult};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

/// Header carrying the client identifier.
pub const CLIENT_HEADER: &str = "X-MagnosHutch-Client";

/// `{endpoint}/events`, tolerating a trailing slash on the endpoint.
pub fn events_url(endpoint: &str) -> String {
    format!("{}/events", endpoint.trim_end_matches('/'))
}

/// Sends a single batch to the ingestion endpoint.
///
/// Any error is a delivery failure; there is no partial success. Timeouts
/// are applied by the caller.
#[async_trait]
pub trait DeliveryTransport: Send + Sync {
    /// Deliver `batch` and return the parsed acknowledgment body.
    async fn send_batch(&self, endpoint: &str, batch: &Batch) -> OutboxResult<Value>;
}

/// HTTP transport: `POST {endpoint}/events` with the batch as JSON.
///
/// A 2xx answer must carry a JSON acknowledgment; a body that does not parse
/// is a failure and the batch is retried. An empty body counts as success.
pub struct HttpTransport {
    client: Client,
    client_id: String,
}

impl HttpTransport {
    /// Create a transport with a default HTTP client and no request timeout.
    pub fn new(client_id: impl Into<String>) -> OutboxResult<Self> {
        let client = Client::builder().build()?;
        Ok(Self::with_client(client, client_id))
    }

    pub fn with_client(client: Client, client_id: impl Into<String>) -> Self {
        Self {
            client,
            client_id: client_id.into(),
        }
    }
}

#[async_trait]
impl DeliveryTransport for HttpTransport {
    async fn send_batch(&self, endpoint: &str, batch: &Batch) -> OutboxResult<Value> {
        let url = events_url(endpoint);

        debug!(
            url = %url,
            session_id = %batch.session_id,
            events = batch.events.len(),
            "Sending batch"
        );

        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .header(CLIENT_HEADER, &self.client_id)
            .json(batch)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OutboxError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.bytes().await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&body)?)
    }
}
