//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound Request (method, path)
//!     → router.rs (terminal handler lookup, 404 on no match)
//!     → pipeline executes handlers; validator and authorizer consult
//!       registry.rs for the same method + path
//!     → matched terminal handler produces the Response
//! ```
//!
//! Tables are built at startup and never mutated afterwards.

pub mod matcher;
pub mod registry;
pub mod router;

pub use matcher::{RouteKey, RoutePattern, RouteTable};
pub use registry::{RouteMetadata, RouteRegistry};
pub use router::Router;
