//! Data models shared by handlers and services.

/// API key record for token verification
pub mod api_key;
/// Authenticated identity and roles
pub mod identity;
/// Demo user records
pub mod user;
