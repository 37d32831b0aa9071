//! Request pipeline core.
//!
//! An ordered chain of [`Handler`]s that each inspect, reject, or enrich a
//! [`Request`] before it reaches a terminal [`RouteHandler`].

pub mod chain;
pub mod request;
pub mod response;

pub use chain::{Handler, Next, Pipeline, RouteHandler};
pub use request::Request;
pub use response::Response;
