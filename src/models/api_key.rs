//! API key record backing bearer token verification.
//!
//! Keys are stored as SHA-256 hashes. A bearer token is hashed on arrival
//! and matched against `key_hash`; the plaintext never reaches the database.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Row from the `api_keys` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ApiKey {
    pub id: Uuid,

    /// SHA-256 of the bearer token, 64 hex characters.
    pub key_hash: String,

    /// Identity fields handed to the pipeline on a successful match.
    pub user_id: String,
    pub email: String,
    pub role: String,

    pub created_at: DateTime<Utc>,

    /// Keys past this instant verify as expired. `None` never expires.
    pub expires_at: Option<DateTime<Utc>>,

    /// Inactive keys are rejected; revocation without deleting the row.
    pub is_active: bool,
}

impl ApiKey {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}
