//! PostgreSQL pool for the API key verifier.
//!
//! The database is optional. Without `DATABASE_URL` the service verifies
//! tokens from the static `AUTH_TOKENS` table and never opens a pool.

use std::time::Duration;

use sqlx::{Pool, Postgres};

pub type DbPool = Pool<Postgres>;

/// Create the connection pool.
///
/// Token verification sits on the request path, so connection acquisition
/// is capped well below the authenticator's own deadline.
///
/// # Errors
///
/// Returns an error if the URL is invalid or the server is unreachable.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(1))
        .connect(database_url)
        .await
}

/// Apply migrations from `migrations/` (the `api_keys` table).
///
/// Applied migrations are tracked in `_sqlx_migrations`, so each runs once.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// Cheap connectivity probe for the health endpoint.
pub async fn ping(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await.map(|_| ())
}
