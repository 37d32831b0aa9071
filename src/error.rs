//! Error types and their JSON response bodies.
//!
//! Two channels exist:
//!
//! - [`AppError`]: deliberate client rejections (401, 403, 429, 400, 404).
//!   These become ordinary [`Response`] values and flow back through the
//!   chain like any other result.
//! - [`PipelineError`]: faults. These travel through the `Err` side of the
//!   chain and are turned into a generic 500 by the dispatch layer.

use axum::http::{HeaderValue, StatusCode, header};
use serde_json::json;

use crate::pipeline::Response;
use crate::schema::FieldError;

/// Client rejection produced intentionally by a handler.
///
/// # Response Format
///
/// ```json
/// {
///   "error": {
///     "code": "error_type",
///     "message": "Human-readable error message",
///     "details": [ { "field": "email", "message": "email is required" } ]
///   }
/// }
/// ```
///
/// `details` is only present for validation failures.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// `authorization` header absent or not `Bearer <token>`.
    #[error("Missing or malformed authorization header")]
    MissingCredentials,

    /// Token could not be verified. Never carries verifier detail.
    #[error("Invalid token")]
    InvalidToken,

    /// Route requires roles but no identity is attached.
    #[error("Authentication required")]
    AuthenticationRequired,

    /// Identity attached but its role is not allowed on this route.
    #[error("Insufficient permissions")]
    Forbidden,

    /// Client exceeded its sliding window. Returns 429 with `Retry-After`.
    #[error("Rate limit exceeded")]
    RateLimited { retry_after_secs: u64 },

    /// One or more body fields failed their schema rules.
    #[error("Request body failed validation")]
    Validation(Vec<FieldError>),

    /// No route registered for method + path.
    #[error("Route not found")]
    RouteNotFound,

    #[error("User not found")]
    UserNotFound,

    /// Request body or parameters are invalid.
    #[error("Invalid request")]
    InvalidRequest(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MissingCredentials
            | AppError::InvalidToken
            | AppError::AuthenticationRequired => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Validation(_) | AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::RouteNotFound | AppError::UserNotFound => StatusCode::NOT_FOUND,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::MissingCredentials => "missing_credentials",
            AppError::InvalidToken => "invalid_token",
            AppError::AuthenticationRequired => "authentication_required",
            AppError::Forbidden => "forbidden",
            AppError::RateLimited { .. } => "rate_limited",
            AppError::Validation(_) => "validation_failed",
            AppError::RouteNotFound => "not_found",
            AppError::UserNotFound => "user_not_found",
            AppError::InvalidRequest(_) => "invalid_request",
        }
    }
}

impl From<AppError> for Response {
    fn from(err: AppError) -> Self {
        let status = err.status();
        let code = err.code();

        match err {
            AppError::RateLimited { retry_after_secs } => {
                Response::new(status, error_body(code, "Rate limit exceeded"))
                    .with_header(header::RETRY_AFTER, HeaderValue::from(retry_after_secs))
            }
            AppError::Validation(details) => Response::new(
                status,
                json!({
                    "error": {
                        "code": code,
                        "message": "Request body failed validation",
                        "details": details,
                    }
                }),
            ),
            AppError::InvalidRequest(message) => Response::new(status, error_body(code, &message)),
            other => Response::new(status, error_body(code, &other.to_string())),
        }
    }
}

/// Fault raised through the chain's `Err` channel.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A continuation was invoked more than once.
    #[error("continuation held by `{handler}` was invoked more than once")]
    InvalidChainState { handler: &'static str },

    /// Any failure from handler internals or a terminal handler.
    #[error(transparent)]
    Unhandled(#[from] anyhow::Error),
}

/// Generic 500. Internal detail is logged by the caller, never returned.
impl From<PipelineError> for Response {
    fn from(_: PipelineError) -> Self {
        Response::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            error_body("internal_error", "An internal error occurred"),
        )
    }
}

fn error_body(code: &str, message: &str) -> serde_json::Value {
    json!({
        "error": {
            "code": code,
            "message": message
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limited_sets_retry_after() {
        let response = Response::from(AppError::RateLimited { retry_after_secs: 60 });

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.header("retry-after"), Some("60"));
        assert_eq!(response.body()["error"]["code"], "rate_limited");
    }

    #[test]
    fn test_validation_includes_details() {
        let response = Response::from(AppError::Validation(vec![FieldError {
            field: "email".into(),
            message: "email is required".into(),
        }]));

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.body()["error"]["details"][0]["field"], "email");
    }

    #[test]
    fn test_unhandled_hides_internal_detail() {
        let err = PipelineError::from(anyhow::anyhow!("password=hunter2 leaked"));
        let response = Response::from(err);

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = response.body().to_string();
        assert!(!body.contains("hunter2"));
        assert_eq!(response.body()["error"]["code"], "internal_error");
    }

    #[test]
    fn test_every_rejection_has_error_field() {
        let errors = [
            AppError::MissingCredentials,
            AppError::InvalidToken,
            AppError::AuthenticationRequired,
            AppError::Forbidden,
            AppError::RouteNotFound,
            AppError::InvalidRequest("bad".into()),
        ];
        for err in errors {
            let status = err.status();
            let response = Response::from(err);
            assert_eq!(response.status(), status);
            assert!(response.body()["error"]["code"].is_string());
        }
    }
}
