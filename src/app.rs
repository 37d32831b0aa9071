//! Application assembly.
//!
//! Wires the route table, its metadata, and the handler chain:
//!
//! ```text
//! RequestLogger → RateLimiter → Authenticator → Validator → Authorizer → users::*
//! ```
//!
//! | Route               | Body schema           | Roles                  |
//! |---------------------|-----------------------|------------------------|
//! | `POST /users`       | email, name, age      | user, admin            |
//! | `GET /users`        | none                  | user, moderator, admin |
//! | `GET /users/{id}`   | none                  | user, moderator, admin |
//! | `DELETE /users/{id}`| none                  | admin                  |

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::header::InvalidHeaderName;
use axum::http::{HeaderName, Method};

use crate::config::Config;
use crate::handlers::users;
use crate::middleware::auth::DEFAULT_VERIFY_TIMEOUT;
use crate::middleware::{
    Authenticator, Authorizer, RateLimitConfig, RateLimiter, RequestLogger, Validator, WindowStore,
};
use crate::models::identity::Role;
use crate::pipeline::{Pipeline, Request};
use crate::routing::{RouteMetadata, RouteRegistry, Router};
use crate::schema::{FieldRule, FieldType, Schema};
use crate::services::observability::ObservabilitySink;
use crate::services::token_service::TokenVerifier;
use crate::services::user_service::UserStore;

/// Tunables for the handler chain.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub rate_limit: RateLimitConfig,
    pub forwarded_header: HeaderName,
    pub verify_timeout: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            rate_limit: RateLimitConfig {
                window: Duration::from_secs(60),
                max_requests: 100,
            },
            forwarded_header: HeaderName::from_static("x-forwarded-for"),
            verify_timeout: DEFAULT_VERIFY_TIMEOUT,
        }
    }
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Result<Self, InvalidHeaderName> {
        Ok(Self {
            rate_limit: config.rate_limit(),
            forwarded_header: config.forwarded_header()?,
            verify_timeout: config.token_verify_timeout(),
        })
    }
}

/// Shared collaborators. The window store is also handed to the sweeper.
#[derive(Clone)]
pub struct Components {
    pub verifier: Arc<dyn TokenVerifier>,
    pub sink: Arc<dyn ObservabilitySink>,
    pub windows: Arc<WindowStore>,
    pub users: Arc<UserStore>,
}

/// Validation and authorization metadata for every user route.
pub fn route_registry() -> RouteRegistry {
    let create_user = Schema::new()
        .field("email", FieldRule::new().required().kind(FieldType::Email))
        .field(
            "name",
            FieldRule::new().required().kind(FieldType::String).min_length(2),
        )
        .field("age", FieldRule::new().kind(FieldType::Integer).min(0.0));

    let readers = [Role::User, Role::Moderator, Role::Admin];

    RouteRegistry::new()
        .declare(
            Method::POST,
            "/users",
            RouteMetadata::new()
                .schema(create_user)
                .roles([Role::User, Role::Admin]),
        )
        .declare(Method::GET, "/users", RouteMetadata::new().roles(readers))
        .declare(Method::GET, "/users/{id}", RouteMetadata::new().roles(readers))
        .declare(
            Method::DELETE,
            "/users/{id}",
            RouteMetadata::new().roles([Role::Admin]),
        )
}

pub fn build_pipeline(
    settings: &PipelineSettings,
    components: &Components,
    routes: Arc<RouteRegistry>,
) -> Pipeline {
    Pipeline::new()
        .with(RequestLogger::new(Arc::clone(&components.sink)))
        .with(
            RateLimiter::new(settings.rate_limit, Arc::clone(&components.windows))
                .with_forwarded_header(settings.forwarded_header.clone()),
        )
        .with(
            Authenticator::new(Arc::clone(&components.verifier))
                .with_timeout(settings.verify_timeout),
        )
        .with(Validator::new(Arc::clone(&routes)))
        .with(Authorizer::new(routes))
}

pub fn build_router(settings: &PipelineSettings, components: &Components) -> Router {
    let routes = Arc::new(route_registry());
    let pipeline = build_pipeline(settings, components, routes);

    let create = Arc::clone(&components.users);
    let list = Arc::clone(&components.users);
    let get = Arc::clone(&components.users);
    let delete = Arc::clone(&components.users);

    Router::new(pipeline)
        .route(Method::POST, "/users", move |request: Request| {
            users::create_user(Arc::clone(&create), request)
        })
        .route(Method::GET, "/users", move |request: Request| {
            users::list_users(Arc::clone(&list), request)
        })
        .route(Method::GET, "/users/{id}", move |request: Request| {
            users::get_user(Arc::clone(&get), request)
        })
        .route(Method::DELETE, "/users/{id}", move |request: Request| {
            users::delete_user(Arc::clone(&delete), request)
        })
}

/// Periodically evict clients whose windows have emptied. Runs until the
/// task is dropped.
pub async fn sweep_windows(store: Arc<WindowStore>, window: Duration, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let evicted = store.sweep(window, Instant::now());
        if evicted > 0 {
            tracing::debug!(evicted, tracked = store.len(), "Swept idle rate limit windows");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::services::observability::TracingSink;
    use crate::services::token_service::StaticTokenVerifier;

    fn components() -> Components {
        Components {
            verifier: Arc::new(StaticTokenVerifier::new()),
            sink: Arc::new(TracingSink),
            windows: Arc::new(WindowStore::new()),
            users: Arc::new(UserStore::new()),
        }
    }

    #[test]
    fn test_pipeline_order() {
        let pipeline = build_pipeline(
            &PipelineSettings::default(),
            &components(),
            Arc::new(route_registry()),
        );

        assert_eq!(
            pipeline.handler_names(),
            vec!["logger", "rate_limiter", "authenticator", "validator", "authorizer"]
        );
    }

    #[test]
    fn test_registry_roles() {
        let registry = route_registry();

        let delete = registry.lookup(&Method::DELETE, "/users/123").unwrap();
        assert_eq!(delete.required_roles.as_deref(), Some(&[Role::Admin][..]));

        let create = registry.lookup(&Method::POST, "/users").unwrap();
        assert!(create.schema.is_some());
        assert!(!create.required_roles.as_ref().unwrap().contains(&Role::Moderator));

        assert!(registry.lookup(&Method::PATCH, "/users/123").is_none());
    }

    #[tokio::test]
    async fn test_sweeper_evicts_idle_clients() {
        let store = Arc::new(WindowStore::new());
        let config = RateLimitConfig {
            window: Duration::from_millis(50),
            max_requests: 5,
        };
        store.check("idle", &config, Instant::now());
        assert_eq!(store.len(), 1);

        let sweeper = tokio::spawn(sweep_windows(
            Arc::clone(&store),
            config.window,
            Duration::from_millis(20),
        ));

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(store.is_empty());

        sweeper.abort();
    }
}
