//! Health check endpoint for service monitoring.
//!
//! Served outside the pipeline: no token, no rate limit.

use axum::{Json, extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db;
use crate::server::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall service status: `healthy` or `degraded`
    pub status: &'static str,

    /// `connected`, `unreachable`, or `not_configured`
    pub database: &'static str,

    /// Clients currently tracked by the rate limiter
    pub rate_limited_clients: usize,

    pub timestamp: DateTime<Utc>,
}

/// Health check handler.
///
/// # Response (200 OK)
///
/// ```json
/// {
///   "status": "healthy",
///   "database": "not_configured",
///   "rate_limited_clients": 4,
///   "timestamp": "2025-12-21T19:00:00Z"
/// }
/// ```
///
/// Returns 503 with `"status": "degraded"` when a configured database
/// cannot be reached.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database = match &state.pool {
        None => "not_configured",
        Some(pool) => match db::ping(pool).await {
            Ok(()) => "connected",
            Err(e) => {
                tracing::warn!(error = %e, "Health check database ping failed");
                "unreachable"
            }
        },
    };

    let (status_code, status) = if database == "unreachable" {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    } else {
        (StatusCode::OK, "healthy")
    };

    (
        status_code,
        Json(HealthResponse {
            status,
            database,
            rate_limited_clients: state.windows.len(),
            timestamp: Utc::now(),
        }),
    )
}
