//! Role-based authorization per route.
//!
//! - No required roles declared → delegate
//! - Roles declared, no identity attached → 401
//! - Identity role not in the declared set → 403
//!
//! Membership is exact; there is no role hierarchy.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{AppError, PipelineError};
use crate::pipeline::{Handler, Next, Request, Response};
use crate::routing::RouteRegistry;

pub struct Authorizer {
    routes: Arc<RouteRegistry>,
}

impl Authorizer {
    pub fn new(routes: Arc<RouteRegistry>) -> Self {
        Self { routes }
    }
}

#[async_trait]
impl Handler for Authorizer {
    fn name(&self) -> &'static str {
        "authorizer"
    }

    async fn execute(&self, request: Request, next: Next<'_>) -> Result<Response, PipelineError> {
        let required = self
            .routes
            .lookup(request.method(), request.path())
            .and_then(|metadata| metadata.required_roles.as_deref())
            .filter(|roles| !roles.is_empty());

        let Some(required) = required else {
            return next.run(request).await;
        };

        let allowed = request
            .identity()
            .map(|identity| required.contains(&identity.role));

        match allowed {
            None => {
                tracing::debug!(request_id = %request.id(), "Route requires an identity");
                Ok(AppError::AuthenticationRequired.into())
            }
            Some(false) => {
                tracing::warn!(
                    request_id = %request.id(),
                    user_id = request.identity().map(|i| i.id.as_str()).unwrap_or_default(),
                    "Role not permitted on route"
                );
                Ok(AppError::Forbidden.into())
            }
            Some(true) => next.run(request).await,
        }
    }
}
