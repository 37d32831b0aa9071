//! Per-route metadata consumed by the validator and authorizer.
//!
//! A route with no entry carries no constraint: the validator skips
//! schema checks and the authorizer requires no role. Both fail open.

use axum::http::Method;

use crate::models::identity::Role;
use crate::routing::matcher::RouteTable;
use crate::schema::Schema;

/// Constraints declared for one `METHOD:pattern` key.
#[derive(Debug, Clone, Default)]
pub struct RouteMetadata {
    pub schema: Option<Schema>,
    pub required_roles: Option<Vec<Role>>,
}

impl RouteMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn roles(mut self, roles: impl IntoIterator<Item = Role>) -> Self {
        self.required_roles = Some(roles.into_iter().collect());
        self
    }
}

/// Read-only metadata table, shared by `Arc` after construction.
#[derive(Debug, Default)]
pub struct RouteRegistry {
    table: RouteTable<RouteMetadata>,
}

impl RouteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(mut self, method: Method, pattern: &str, metadata: RouteMetadata) -> Self {
        self.table.insert(method, pattern, metadata);
        self
    }

    pub fn lookup(&self, method: &Method, path: &str) -> Option<&RouteMetadata> {
        self.table.lookup(method, path).map(|found| found.value)
    }
}
