//! Inbound request as seen by pipeline handlers.
//!
//! A `Request` carries the immutable core of an inbound call (id, method,
//! path, headers, JSON body) plus a mutable context bag. Handlers enrich
//! the context the same way axum middleware enriches request extensions:
//! the authenticator inserts an [`Identity`], later handlers read it back.

use std::collections::HashMap;

use axum::http::{Extensions, HeaderMap, HeaderName, HeaderValue, Method};
use serde_json::Value;
use uuid::Uuid;

use crate::models::identity::Identity;

/// A single inbound call flowing through the pipeline.
///
/// Created by the dispatch layer once per call and moved through the chain,
/// so no two executions ever share one.
#[derive(Debug, Clone)]
pub struct Request {
    id: String,
    method: Method,
    path: String,
    headers: HeaderMap,
    body: Value,
    params: HashMap<String, String>,
    context: Extensions,
}

impl Request {
    /// Create a request with a fresh UUID v4 identifier and an empty body.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: Value::Null,
            params: HashMap::new(),
            context: Extensions::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Add a single header. Names or values that are not valid HTTP are ignored.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::try_from(name),
            HeaderValue::try_from(value),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    /// Attach the path parameters captured by the route pattern.
    pub(crate) fn with_params(mut self, params: HashMap<String, String>) -> Self {
        self.params = params;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Header value as a string, if present and visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    /// Path parameter captured by a `{name}` segment of the matched route.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn context(&self) -> &Extensions {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut Extensions {
        &mut self.context
    }

    /// Identity attached by the authenticator, if it ran and succeeded.
    pub fn identity(&self) -> Option<&Identity> {
        self.context.get::<Identity>()
    }

    pub fn attach_identity(&mut self, identity: Identity) {
        self.context.insert(identity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::identity::Role;

    #[test]
    fn test_headers_are_case_insensitive() {
        let request = Request::new(Method::GET, "/users").with_header("X-Forwarded-For", "10.0.0.1");
        assert_eq!(request.header("x-forwarded-for"), Some("10.0.0.1"));
    }

    #[test]
    fn test_invalid_header_is_ignored() {
        let request = Request::new(Method::GET, "/").with_header("bad header", "value");
        assert!(request.headers().is_empty());
    }

    #[test]
    fn test_identity_round_trips_through_context() {
        let mut request = Request::new(Method::GET, "/users");
        assert!(request.identity().is_none());

        request.attach_identity(Identity {
            id: "u-1".into(),
            email: "a@b.com".into(),
            role: Role::User,
        });
        assert_eq!(request.identity().map(|i| i.id.as_str()), Some("u-1"));
    }

    #[test]
    fn test_clone_keeps_id() {
        let request = Request::new(Method::GET, "/").with_id("req-1");
        assert_eq!(request.clone().id(), "req-1");
    }
}
