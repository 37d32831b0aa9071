//! Request outcome logging.
//!
//! Wraps the rest of the chain: timing starts before delegation, and the
//! outcome is reported after it returns, whether it succeeded or failed.
//! Failures are passed back up unchanged.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::PipelineError;
use crate::pipeline::{Handler, Next, Request, Response};
use crate::services::observability::{ObservabilitySink, RequestEvent};

pub struct RequestLogger {
    sink: Arc<dyn ObservabilitySink>,
}

impl RequestLogger {
    pub fn new(sink: Arc<dyn ObservabilitySink>) -> Self {
        Self { sink }
    }
}

#[async_trait]
impl Handler for RequestLogger {
    fn name(&self) -> &'static str {
        "logger"
    }

    async fn execute(&self, request: Request, next: Next<'_>) -> Result<Response, PipelineError> {
        let request_id = request.id().to_string();
        let method = request.method().to_string();
        let path = request.path().to_string();
        let start = Instant::now();

        let result = next.run(request).await;

        let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        let (status, error) = match &result {
            Ok(response) => (response.status().as_u16(), None),
            Err(err) => (500, Some(err.to_string())),
        };

        self.sink.report(RequestEvent {
            request_id,
            method,
            path,
            status,
            duration_ms,
            error,
            timestamp: Utc::now(),
        });

        result
    }
}
