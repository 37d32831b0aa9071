//! Body validation against per-route schemas.
//!
//! Routes without a declared schema pass straight through. Declared routes
//! collect every field error and reject with a single 400.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{AppError, PipelineError};
use crate::pipeline::{Handler, Next, Request, Response};
use crate::routing::RouteRegistry;

pub struct Validator {
    routes: Arc<RouteRegistry>,
}

impl Validator {
    pub fn new(routes: Arc<RouteRegistry>) -> Self {
        Self { routes }
    }
}

#[async_trait]
impl Handler for Validator {
    fn name(&self) -> &'static str {
        "validator"
    }

    async fn execute(&self, request: Request, next: Next<'_>) -> Result<Response, PipelineError> {
        let schema = self
            .routes
            .lookup(request.method(), request.path())
            .and_then(|metadata| metadata.schema.as_ref());

        let Some(schema) = schema else {
            return next.run(request).await;
        };

        let errors = schema.validate(request.body());
        if !errors.is_empty() {
            tracing::debug!(
                request_id = %request.id(),
                failures = errors.len(),
                "Request body failed validation"
            );
            return Ok(AppError::Validation(errors).into());
        }

        next.run(request).await
    }
}
