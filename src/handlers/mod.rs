//! Route handlers.
//!
//! `users` holds the terminal handlers reached through the pipeline;
//! `health` is a plain axum handler served beside it.

/// Liveness endpoint
pub mod health;
/// User endpoints
pub mod users;
