//! Outcome reporting for the request logger.
//!
//! Sinks are fire-and-forget: `report` must return immediately and must
//! never fail the pipeline. Anything slow (network delivery) happens on a
//! detached task.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;
use url::Url;

type HmacSha256 = Hmac<Sha256>;

/// One completed (or failed) pipeline execution.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestEvent {
    pub request_id: String,
    pub method: String,
    pub path: String,
    pub status: u16,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

pub trait ObservabilitySink: Send + Sync {
    fn report(&self, event: RequestEvent);
}

/// Emits each event as a structured `tracing` record.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ObservabilitySink for TracingSink {
    fn report(&self, event: RequestEvent) {
        match event.status {
            500.. => tracing::error!(
                request_id = %event.request_id,
                method = %event.method,
                path = %event.path,
                status = event.status,
                duration_ms = event.duration_ms,
                error = event.error.as_deref().unwrap_or(""),
                "Request failed"
            ),
            400..=499 => tracing::warn!(
                request_id = %event.request_id,
                method = %event.method,
                path = %event.path,
                status = event.status,
                duration_ms = event.duration_ms,
                "Request rejected"
            ),
            _ => tracing::info!(
                request_id = %event.request_id,
                method = %event.method,
                path = %event.path,
                status = event.status,
                duration_ms = event.duration_ms,
                "Request completed"
            ),
        }
    }
}

/// Forwards every event to each inner sink.
#[derive(Clone, Default)]
pub struct CompositeSink {
    sinks: Vec<Arc<dyn ObservabilitySink>>,
}

impl CompositeSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn ObservabilitySink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl ObservabilitySink for CompositeSink {
    fn report(&self, event: RequestEvent) {
        for sink in &self.sinks {
            sink.report(event.clone());
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("invalid webhook URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

/// POSTs each event as signed JSON to an external collector.
///
/// # Headers Sent
///
/// - `Content-Type: application/json`
/// - `X-Webhook-Signature: sha256=<hex>` (HMAC-SHA256 of the body)
/// - `X-Request-Id: <request id>`
///
/// Delivery runs on a spawned task with a 5 second timeout. Failures are
/// logged and dropped.
#[derive(Debug, Clone)]
pub struct WebhookSink {
    client: reqwest::Client,
    url: Url,
    secret: String,
}

impl WebhookSink {
    pub fn new(url: &str, secret: impl Into<String>) -> Result<Self, SinkError> {
        let url = validate_webhook_url(url)?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()?;

        Ok(Self {
            client,
            url,
            secret: secret.into(),
        })
    }
}

impl ObservabilitySink for WebhookSink {
    fn report(&self, event: RequestEvent) {
        let payload = match serde_json::to_string(&event) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize request event");
                return;
            }
        };

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("No async runtime available; dropping request event");
            return;
        };

        let signature = generate_signature(&self.secret, &payload);
        let request = self
            .client
            .post(self.url.clone())
            .header("Content-Type", "application/json")
            .header("X-Webhook-Signature", signature)
            .header("X-Request-Id", event.request_id)
            .body(payload);

        runtime.spawn(async move {
            match request.send().await {
                Ok(response) if !response.status().is_success() => {
                    tracing::warn!(status = %response.status(), "Observability webhook rejected event");
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "Observability webhook delivery failed"),
            }
        });
    }
}

/// `sha256=<hex>` HMAC of `payload` keyed by `secret`.
pub fn generate_signature(secret: &str, payload: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC key length is valid");
    mac.update(payload.as_bytes());
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

/// HTTPS only, with plain HTTP allowed for local collectors.
fn validate_webhook_url(raw: &str) -> Result<Url, SinkError> {
    if raw.len() > 2048 {
        return Err(SinkError::InvalidUrl(
            "URL exceeds 2048 characters".to_string(),
        ));
    }

    let parsed =
        Url::parse(raw).map_err(|_| SinkError::InvalidUrl("Invalid URL format".to_string()))?;

    match parsed.scheme() {
        "https" => Ok(parsed),
        "http" if matches!(parsed.host_str(), Some("localhost" | "127.0.0.1" | "0.0.0.0")) => {
            Ok(parsed)
        }
        "http" => Err(SinkError::InvalidUrl(
            "HTTP is only allowed for localhost. Use HTTPS for production.".to_string(),
        )),
        _ => Err(SinkError::InvalidUrl(
            "URL must use HTTP or HTTPS".to_string(),
        )),
    }
}
