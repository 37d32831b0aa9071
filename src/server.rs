//! HTTP surface.
//!
//! Translates axum requests into pipeline [`Request`]s and pipeline
//! [`Response`]s back into HTTP. Every path except `/health` goes through
//! the pipeline router. Unknown routes get their 404 before the body is read.

use std::sync::Arc;

use axum::{
    body::to_bytes,
    extract::State,
    http::{HeaderName, HeaderValue},
    response::IntoResponse,
    routing::get,
};
use serde_json::Value;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::db::DbPool;
use crate::error::AppError;
use crate::handlers;
use crate::middleware::WindowStore;
use crate::pipeline::{Request, Response};
use crate::routing::Router;

/// Largest request body read into the pipeline.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

#[derive(Clone)]
pub struct AppState {
    pub router: Arc<Router>,
    /// `None` when no database is configured.
    pub pool: Option<DbPool>,
    pub windows: Arc<WindowStore>,
}

/// Build the axum application.
pub fn app(state: AppState) -> axum::Router {
    axum::Router::new()
        .route("/health", get(handlers::health::health_check))
        .fallback(dispatch)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn dispatch(State(state): State<AppState>, request: axum::extract::Request) -> axum::response::Response {
    let (parts, body) = request.into_parts();

    let request_id = parts
        .headers
        .get(&REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_owned)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let response = if !state.router.recognizes(&parts.method, parts.uri.path()) {
        tracing::debug!(
            request_id = %request_id,
            method = %parts.method,
            path = %parts.uri.path(),
            "No route matched"
        );
        Response::from(AppError::RouteNotFound)
    } else {
        match read_json_body(body).await {
            Ok(body) => {
                let request = Request::new(parts.method, parts.uri.path())
                    .with_id(request_id.clone())
                    .with_headers(parts.headers)
                    .with_body(body);
                state.router.dispatch(request).await
            }
            Err(rejection) => {
                tracing::debug!(request_id = %request_id, "Rejected unreadable request body");
                rejection.into()
            }
        }
    };

    let mut response = response.into_response();
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Empty bodies become `null`; anything else must be JSON.
async fn read_json_body(body: axum::body::Body) -> Result<Value, AppError> {
    let bytes = to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|_| AppError::InvalidRequest("Request body is unreadable or too large".to_string()))?;

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }

    serde_json::from_slice(&bytes)
        .map_err(|e| AppError::InvalidRequest(format!("Request body is not valid JSON: {e}")))
}
