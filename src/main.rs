//! Request Pipeline Service - Main Application Entry Point
//!
//! Serves a small user API behind an ordered handler chain: request logging,
//! per-client rate limiting, bearer token authentication, body validation,
//! and role-based authorization.
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Connect to PostgreSQL and run migrations, if `DATABASE_URL` is set
//! 3. Choose a token verifier (API keys in the database, or `AUTH_TOKENS`)
//! 4. Assemble observability sinks, the pipeline, and the router
//! 5. Spawn the rate limit window sweeper
//! 6. Start server on configured port

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use request_pipeline::app::{self, Components, PipelineSettings};
use request_pipeline::config::Config;
use request_pipeline::db;
use request_pipeline::middleware::WindowStore;
use request_pipeline::server::{self, AppState};
use request_pipeline::services::observability::{
    CompositeSink, ObservabilitySink, TracingSink, WebhookSink,
};
use request_pipeline::services::token_service::{
    ApiKeyVerifier, StaticTokenVerifier, TokenVerifier,
};
use request_pipeline::services::user_service::UserStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Reads RUST_LOG (defaults to "info")
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env()?;
    tracing::info!("Configuration loaded");

    let pool = match &config.database_url {
        Some(url) => {
            let pool = db::create_pool(url).await?;
            tracing::info!("Database pool created");
            db::run_migrations(&pool).await?;
            tracing::info!("Database migrations complete");
            Some(pool)
        }
        None => None,
    };

    let verifier: Arc<dyn TokenVerifier> = match &pool {
        Some(pool) => {
            tracing::info!("Verifying bearer tokens against stored API keys");
            Arc::new(ApiKeyVerifier::new(pool.clone()))
        }
        None => {
            let tokens = StaticTokenVerifier::from_spec(config.auth_tokens.as_deref().unwrap_or(""))
                .context("invalid AUTH_TOKENS")?;
            if tokens.is_empty() {
                tracing::warn!("No DATABASE_URL or AUTH_TOKENS configured; every pipeline request will get 401");
            } else {
                tracing::info!(tokens = tokens.len(), "Verifying bearer tokens against static table");
            }
            Arc::new(tokens)
        }
    };

    let mut sinks = CompositeSink::new().with(Arc::new(TracingSink));
    if let Some(url) = &config.observability_webhook_url {
        let webhook = WebhookSink::new(url, config.observability_webhook_secret.clone())
            .context("invalid OBSERVABILITY_WEBHOOK_URL")?;
        sinks = sinks.with(Arc::new(webhook));
        tracing::info!("Observability webhook enabled");
    }
    let sink: Arc<dyn ObservabilitySink> = Arc::new(sinks);

    let settings = PipelineSettings::from_config(&config).context("invalid FORWARDED_HEADER")?;
    let windows = Arc::new(WindowStore::new());
    let components = Components {
        verifier,
        sink,
        windows: Arc::clone(&windows),
        users: Arc::new(UserStore::new()),
    };
    let router = app::build_router(&settings, &components);
    tracing::info!(
        max_requests = settings.rate_limit.max_requests,
        window_ms = settings.rate_limit.window.as_millis() as u64,
        "Pipeline assembled"
    );

    tokio::spawn(app::sweep_windows(
        Arc::clone(&windows),
        settings.rate_limit.window,
        config.sweep_interval(),
    ));

    let state = AppState {
        router: Arc::new(router),
        pool,
        windows,
    };

    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, server::app(state)).await?;

    Ok(())
}
