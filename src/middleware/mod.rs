//! Pipeline handlers.
//!
//! Each handler runs before the route handler and can:
//! - Short-circuit with a rejection (401, 403, 429, 400)
//! - Enrich the request context (attach an identity)
//! - Observe the response on its way back out (logging)
//!
//! Typical registration order:
//!
//! ```text
//! RequestLogger → RateLimiter → Authenticator → Validator → Authorizer → route
//! ```
//!
//! With the rate limiter ahead of the authenticator, clients are keyed by
//! forwarding header rather than identity.

/// Bearer token authentication
pub mod auth;
/// Route role checks
pub mod authorize;
/// Request outcome reporting
pub mod logger;
/// Sliding-window rate limiting
pub mod rate_limit;
/// Body schema validation
pub mod validate;

pub use auth::Authenticator;
pub use authorize::Authorizer;
pub use logger::RequestLogger;
pub use rate_limit::{RateLimitConfig, RateLimiter, WindowStore};
pub use validate::Validator;
