//! Terminal route lookup and pipeline dispatch.
//!
//! The router is the outermost dispatch layer:
//! - no matching `METHOD:pattern` → 404 before any handler runs
//! - matched → path params attached, pipeline executed with the terminal
//! - pipeline fault → logged, then converted to a generic 500

use std::sync::Arc;

use axum::http::Method;

use crate::error::AppError;
use crate::pipeline::{Pipeline, Request, Response, RouteHandler};
use crate::routing::matcher::RouteTable;

pub struct Router {
    routes: RouteTable<Arc<dyn RouteHandler>>,
    pipeline: Pipeline,
}

impl Router {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            routes: RouteTable::new(),
            pipeline,
        }
    }

    pub fn route<H: RouteHandler + 'static>(mut self, method: Method, pattern: &str, handler: H) -> Self {
        self.routes.insert(method, pattern, Arc::new(handler));
        self
    }

    /// Whether any terminal is registered for `method` + `path`.
    pub fn recognizes(&self, method: &Method, path: &str) -> bool {
        self.routes.lookup(method, path).is_some()
    }

    /// Run one request to completion. Always yields a response.
    pub async fn dispatch(&self, request: Request) -> Response {
        let Some(found) = self.routes.lookup(request.method(), request.path()) else {
            tracing::debug!(
                request_id = %request.id(),
                method = %request.method(),
                path = %request.path(),
                "No route matched"
            );
            return AppError::RouteNotFound.into();
        };

        let route = found.key.to_string();
        let terminal = Arc::clone(found.value);
        let request_id = request.id().to_string();
        let request = request.with_params(found.params);

        match self.pipeline.execute(request, terminal.as_ref()).await {
            Ok(response) => response,
            Err(err) => {
                tracing::error!(
                    request_id = %request_id,
                    route = %route,
                    error = %err,
                    "Unhandled pipeline failure"
                );
                err.into()
            }
        }
    }
}
