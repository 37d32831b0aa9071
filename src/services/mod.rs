//! Collaborators the pipeline calls into.
//!
//! Token verification, outcome reporting, and the user store sit behind
//! small interfaces so tests can swap them for in-memory versions.

pub mod observability;
pub mod token_service;
pub mod user_service;
