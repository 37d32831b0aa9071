//! Request pipeline service.
//!
//! An ordered chain of handlers (logging, rate limiting, authentication,
//! validation, authorization) in front of a small user API, served over
//! HTTP with axum.
//!
//! # Modules
//!
//! - [`pipeline`]: handler chain, request and response types
//! - [`middleware`]: the concrete pipeline handlers
//! - [`routing`]: route patterns, metadata registry, dispatch
//! - [`services`]: token verification, outcome sinks, user store
//! - [`app`] / [`server`]: assembly and the HTTP surface

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod pipeline;
pub mod routing;
pub mod schema;
pub mod server;
pub mod services;
