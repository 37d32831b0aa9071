//! Bearer token verification.
//!
//! The authenticator never interprets tokens itself; it asks a
//! [`TokenVerifier`] to turn one into an [`Identity`]. Two verifiers ship:
//!
//! - [`StaticTokenVerifier`]: in-memory table, loaded from `AUTH_TOKENS`
//! - [`ApiKeyVerifier`]: PostgreSQL `api_keys` table of SHA-256 key hashes

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sha2::{Digest, Sha256};

use crate::db::DbPool;
use crate::models::api_key::ApiKey;
use crate::models::identity::{Identity, Role, UnknownRole};

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("token not recognised")]
    InvalidToken,

    #[error("token expired")]
    Expired,

    #[error(transparent)]
    UnknownRole(#[from] UnknownRole),

    #[error("verification backend failed: {0}")]
    Backend(#[from] sqlx::Error),
}

#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Identity, VerifyError>;
}

/// Malformed `AUTH_TOKENS` entry.
#[derive(Debug, thiserror::Error)]
#[error("invalid token entry `{0}`: expected token:id:email:role")]
pub struct TokenSpecError(String);

/// Fixed token → identity table.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenVerifier {
    tokens: HashMap<String, Identity>,
}

impl StaticTokenVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: impl Into<String>, identity: Identity) -> Self {
        self.tokens.insert(token.into(), identity);
        self
    }

    /// Parse `token:id:email:role` entries separated by commas.
    ///
    /// ```text
    /// AUTH_TOKENS=s3cret:u-1:alice@example.com:admin,t0ken:u-2:bob@example.com:user
    /// ```
    pub fn from_spec(spec: &str) -> Result<Self, TokenSpecError> {
        let mut verifier = Self::new();

        for entry in spec.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let parts: Vec<&str> = entry.split(':').map(str::trim).collect();
            let [token, id, email, role] = parts.as_slice() else {
                return Err(TokenSpecError(entry.to_string()));
            };
            if token.is_empty() || id.is_empty() {
                return Err(TokenSpecError(entry.to_string()));
            }
            let role: Role = role.parse().map_err(|_| TokenSpecError(entry.to_string()))?;

            verifier.tokens.insert(
                token.to_string(),
                Identity {
                    id: id.to_string(),
                    email: email.to_string(),
                    role,
                },
            );
        }

        Ok(verifier)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[async_trait]
impl TokenVerifier for StaticTokenVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, VerifyError> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or(VerifyError::InvalidToken)
    }
}

/// Verifies tokens against hashed API keys in PostgreSQL.
///
/// # Flow
///
/// 1. Hash the bearer token with SHA-256
/// 2. Look up an active `api_keys` row with that hash
/// 3. Reject if `expires_at` has passed
/// 4. Build an [`Identity`] from the row's user fields
#[derive(Debug, Clone)]
pub struct ApiKeyVerifier {
    pool: DbPool,
}

impl ApiKeyVerifier {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenVerifier for ApiKeyVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, VerifyError> {
        let key_hash = hash_token(token);

        let record = sqlx::query_as::<_, ApiKey>(
            "SELECT id, key_hash, user_id, email, role, created_at, expires_at, is_active
             FROM api_keys
             WHERE key_hash = $1 AND is_active = true",
        )
        .bind(&key_hash)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(VerifyError::InvalidToken)?;

        if record.is_expired_at(Utc::now()) {
            return Err(VerifyError::Expired);
        }

        Ok(Identity {
            role: record.role.parse()?,
            id: record.user_id,
            email: record.email,
        })
    }
}

/// SHA-256 of the token as lowercase hex.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_token_is_sha256_hex() {
        assert_eq!(
            hash_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_from_spec_parses_entries() {
        let verifier =
            StaticTokenVerifier::from_spec("a1:u-1:alice@example.com:admin, b2:u-2:bob@example.com:user,")
                .unwrap();
        assert_eq!(verifier.len(), 2);
    }

    #[test]
    fn test_from_spec_rejects_bad_entries() {
        assert!(StaticTokenVerifier::from_spec("only:three:parts").is_err());
        assert!(StaticTokenVerifier::from_spec("t:u:e@x.com:superuser").is_err());
        assert!(StaticTokenVerifier::from_spec(":u:e@x.com:user").is_err());
    }

    #[test]
    fn test_empty_spec_is_empty_table() {
        assert!(StaticTokenVerifier::from_spec("").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_static_verifier() {
        let verifier = StaticTokenVerifier::from_spec("good:u-1:a@b.com:user").unwrap();

        let identity = verifier.verify("good").await.unwrap();
        assert_eq!(identity.id, "u-1");
        assert_eq!(identity.role, Role::User);

        assert!(matches!(
            verifier.verify("bad").await,
            Err(VerifyError::InvalidToken)
        ));
    }
}
