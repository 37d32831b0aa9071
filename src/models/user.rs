//! User records served by the demo user routes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u64>,

    /// Identity id of whoever created the record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,

    pub created_at: DateTime<Utc>,
}

/// Request body for `POST /users`.
///
/// ```json
/// { "email": "a@b.com", "name": "Al", "age": 25 }
/// ```
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub age: Option<u64>,
}
