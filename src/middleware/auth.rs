//! Bearer token authentication.
//!
//! This handler runs ahead of anything that needs an identity to:
//! 1. Extract the token from the `authorization` header
//! 2. Resolve it to an [`Identity`] through a [`TokenVerifier`]
//! 3. Attach the identity to the request context
//! 4. Reject unauthenticated requests with HTTP 401
//!
//! [`Identity`]: crate::models::identity::Identity

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{AppError, PipelineError};
use crate::pipeline::{Handler, Next, Request, Response};
use crate::services::token_service::{TokenVerifier, VerifyError};

/// Verification calls longer than this count as failures.
pub const DEFAULT_VERIFY_TIMEOUT: Duration = Duration::from_secs(2);

pub struct Authenticator {
    verifier: Arc<dyn TokenVerifier>,
    timeout: Duration,
}

impl Authenticator {
    pub fn new(verifier: Arc<dyn TokenVerifier>) -> Self {
        Self {
            verifier,
            timeout: DEFAULT_VERIFY_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Token from an `authorization: Bearer <token>` header.
///
/// Returns `None` when the header is absent, not visible ASCII, missing the
/// `Bearer ` prefix, or carries an empty token.
pub fn bearer_token(request: &Request) -> Option<&str> {
    request
        .header("authorization")?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[async_trait]
impl Handler for Authenticator {
    fn name(&self) -> &'static str {
        "authenticator"
    }

    async fn execute(&self, mut request: Request, next: Next<'_>) -> Result<Response, PipelineError> {
        let Some(token) = bearer_token(&request).map(str::to_owned) else {
            tracing::debug!(request_id = %request.id(), "Missing or malformed authorization header");
            return Ok(AppError::MissingCredentials.into());
        };

        let identity = match tokio::time::timeout(self.timeout, self.verifier.verify(&token)).await {
            Ok(Ok(identity)) => identity,
            Ok(Err(VerifyError::Backend(e))) => {
                tracing::error!(request_id = %request.id(), error = %e, "Token verification backend failed");
                return Ok(AppError::InvalidToken.into());
            }
            Ok(Err(e)) => {
                tracing::debug!(request_id = %request.id(), reason = %e, "Token rejected");
                return Ok(AppError::InvalidToken.into());
            }
            Err(_) => {
                tracing::warn!(
                    request_id = %request.id(),
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Token verification timed out"
                );
                return Ok(AppError::InvalidToken.into());
            }
        };

        request.attach_identity(identity);
        next.run(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::http::{Method, StatusCode};

    use crate::middleware::test_support::spy_terminal;
    use crate::models::identity::{Identity, Role};
    use crate::pipeline::Pipeline;
    use crate::services::token_service::StaticTokenVerifier;

    fn verifier() -> Arc<dyn TokenVerifier> {
        Arc::new(StaticTokenVerifier::new().with_token(
            "good-token",
            Identity {
                id: "u-1".into(),
                email: "a@b.com".into(),
                role: Role::User,
            },
        ))
    }

    struct SlowVerifier;

    #[async_trait]
    impl TokenVerifier for SlowVerifier {
        async fn verify(&self, _token: &str) -> Result<Identity, VerifyError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Err(VerifyError::InvalidToken)
        }
    }

    async fn run(authenticator: Authenticator, request: Request) -> (Response, usize) {
        let calls = Arc::new(AtomicUsize::new(0));
        let terminal = spy_terminal(Arc::clone(&calls));
        let response = Pipeline::new()
            .with(authenticator)
            .execute(request, &terminal)
            .await
            .unwrap();
        (response, calls.load(Ordering::SeqCst))
    }

    #[tokio::test]
    async fn test_missing_or_malformed_header_never_delegates() {
        let headers = [None, Some("good-token"), Some("Basic good-token"), Some("Bearer "), Some("bearer good-token")];

        for header in headers {
            let mut request = Request::new(Method::GET, "/users");
            if let Some(value) = header {
                request = request.with_header("authorization", value);
            }

            let (response, calls) = run(Authenticator::new(verifier()), request).await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "header {header:?}");
            assert_eq!(response.body()["error"]["code"], "missing_credentials");
            assert_eq!(calls, 0, "header {header:?}");
        }
    }

    #[tokio::test]
    async fn test_unknown_token_is_generic_401() {
        let request = Request::new(Method::GET, "/users").with_header("authorization", "Bearer nope");
        let (response, calls) = run(Authenticator::new(verifier()), request).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.body()["error"]["message"], "Invalid token");
        assert_eq!(calls, 0);
    }

    #[tokio::test]
    async fn test_valid_token_attaches_identity() {
        let request = Request::new(Method::GET, "/users").with_header("authorization", "Bearer good-token");
        let (response, calls) = run(Authenticator::new(verifier()), request).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body()["identity"], "u-1");
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_verification_timeout_is_401() {
        let authenticator = Authenticator::new(Arc::new(SlowVerifier)).with_timeout(Duration::from_millis(20));
        let request = Request::new(Method::GET, "/users").with_header("authorization", "Bearer slow");
        let (response, calls) = run(authenticator, request).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.body()["error"]["code"], "invalid_token");
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_bearer_token_extraction() {
        let request = Request::new(Method::GET, "/").with_header("authorization", "Bearer  abc ");
        assert_eq!(bearer_token(&request), Some("abc"));
    }
}
