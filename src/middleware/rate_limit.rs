//! Sliding-window rate limiting per client.
//!
//! # Algorithm
//!
//! Each client owns a queue of request instants. On every request:
//! 1. Drop instants at or before `now - window`
//! 2. If the queue still holds `max_requests` entries, reject (nothing recorded)
//! 3. Otherwise record `now` and delegate
//!
//! Steps 1-3 run under the client's map entry lock, so two concurrent
//! requests from one client cannot both pass on a stale count. The lock is
//! released before the rest of the chain runs.
//!
//! # Client identity
//!
//! Attached identity id, else the first entry of the forwarding header,
//! else `"unknown"`.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::http::HeaderName;
use dashmap::DashMap;

use crate::error::{AppError, PipelineError};
use crate::pipeline::{Handler, Next, Request, Response};

pub const UNKNOWN_CLIENT: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub window: Duration,
    pub max_requests: usize,
}

impl RateLimitConfig {
    /// `Retry-After` value: the window in whole seconds, rounded up, at least 1.
    pub fn retry_after_secs(&self) -> u64 {
        let secs = self.window.as_secs() + u64::from(self.window.subsec_nanos() > 0);
        secs.max(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Admitted { remaining: usize },
    Rejected,
}

/// Per-client request windows. Shared between the limiter and the
/// eviction sweeper; never global.
#[derive(Debug, Default)]
pub struct WindowStore {
    windows: DashMap<String, VecDeque<Instant>>,
}

impl WindowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomic read-prune-decide-append for one client.
    pub fn check(&self, client: &str, config: &RateLimitConfig, now: Instant) -> Decision {
        let mut window = self.windows.entry(client.to_string()).or_default();
        prune(&mut window, config.window, now);

        if window.len() >= config.max_requests {
            return Decision::Rejected;
        }

        window.push_back(now);
        Decision::Admitted {
            remaining: config.max_requests - window.len(),
        }
    }

    /// Prune every window and drop clients left with none. Returns how
    /// many clients were evicted.
    pub fn sweep(&self, window: Duration, now: Instant) -> usize {
        let before = self.windows.len();
        self.windows.retain(|_, requests| {
            prune(requests, window, now);
            !requests.is_empty()
        });
        before.saturating_sub(self.windows.len())
    }

    /// Requests currently recorded for `client`, without pruning.
    pub fn recorded(&self, client: &str) -> usize {
        self.windows.get(client).map_or(0, |w| w.len())
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

fn prune(requests: &mut VecDeque<Instant>, window: Duration, now: Instant) {
    let Some(cutoff) = now.checked_sub(window) else {
        return;
    };
    while requests.front().is_some_and(|&at| at <= cutoff) {
        requests.pop_front();
    }
}

pub struct RateLimiter {
    config: RateLimitConfig,
    store: Arc<WindowStore>,
    forwarded_header: HeaderName,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig, store: Arc<WindowStore>) -> Self {
        Self {
            config,
            store,
            forwarded_header: HeaderName::from_static("x-forwarded-for"),
        }
    }

    pub fn with_forwarded_header(mut self, header: HeaderName) -> Self {
        self.forwarded_header = header;
        self
    }

    pub fn client_key(&self, request: &Request) -> String {
        if let Some(identity) = request.identity() {
            return identity.id.clone();
        }

        request
            .header(self.forwarded_header.as_str())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|client| !client.is_empty())
            .unwrap_or(UNKNOWN_CLIENT)
            .to_string()
    }
}

#[async_trait]
impl Handler for RateLimiter {
    fn name(&self) -> &'static str {
        "rate_limiter"
    }

    async fn execute(&self, request: Request, next: Next<'_>) -> Result<Response, PipelineError> {
        let client = self.client_key(&request);

        match self.store.check(&client, &self.config, Instant::now()) {
            Decision::Admitted { remaining } => {
                tracing::trace!(client = %client, remaining, "Rate limit check passed");
                next.run(request).await
            }
            Decision::Rejected => {
                tracing::warn!(request_id = %request.id(), client = %client, "Rate limit exceeded");
                Ok(AppError::RateLimited {
                    retry_after_secs: self.config.retry_after_secs(),
                }
                .into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::http::{Method, StatusCode};

    use crate::middleware::test_support::spy_terminal;
    use crate::models::identity::{Identity, Role};
    use crate::pipeline::Pipeline;

    fn config(max_requests: usize) -> RateLimitConfig {
        RateLimitConfig {
            window: Duration::from_secs(60),
            max_requests,
        }
    }

    #[test]
    fn test_window_admits_up_to_max() {
        let store = WindowStore::new();
        let config = config(3);
        let t0 = Instant::now();

        for i in 0..3 {
            let at = t0 + Duration::from_millis(i * 10);
            assert!(matches!(store.check("c", &config, at), Decision::Admitted { .. }));
        }
        assert_eq!(store.check("c", &config, t0 + Duration::from_secs(1)), Decision::Rejected);
        // Rejections are not recorded.
        assert_eq!(store.recorded("c"), 3);
    }

    #[test]
    fn test_window_slides() {
        let store = WindowStore::new();
        let config = config(2);
        let t0 = Instant::now();

        store.check("c", &config, t0);
        store.check("c", &config, t0 + Duration::from_secs(30));
        assert_eq!(store.check("c", &config, t0 + Duration::from_secs(59)), Decision::Rejected);

        // First request has aged out; second is still inside the window.
        assert_eq!(
            store.check("c", &config, t0 + Duration::from_secs(60)),
            Decision::Admitted { remaining: 0 }
        );
        assert_eq!(store.recorded("c"), 2);
    }

    #[test]
    fn test_clients_are_independent() {
        let store = WindowStore::new();
        let config = config(1);
        let now = Instant::now();

        assert!(matches!(store.check("a", &config, now), Decision::Admitted { .. }));
        assert!(matches!(store.check("b", &config, now), Decision::Admitted { .. }));
        assert_eq!(store.check("a", &config, now), Decision::Rejected);
    }

    #[test]
    fn test_sweep_evicts_idle_clients() {
        let store = WindowStore::new();
        let config = config(5);
        let t0 = Instant::now();

        store.check("old", &config, t0);
        store.check("fresh", &config, t0 + Duration::from_secs(50));

        let evicted = store.sweep(config.window, t0 + Duration::from_secs(70));
        assert_eq!(evicted, 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.recorded("fresh"), 1);
        assert_eq!(store.recorded("old"), 0);
    }

    #[test]
    fn test_retry_after_rounds_up() {
        assert_eq!(config(1).retry_after_secs(), 60);
        let short = RateLimitConfig {
            window: Duration::from_millis(1500),
            max_requests: 1,
        };
        assert_eq!(short.retry_after_secs(), 2);
        let tiny = RateLimitConfig {
            window: Duration::from_millis(10),
            max_requests: 1,
        };
        assert_eq!(tiny.retry_after_secs(), 1);
    }

    #[test]
    fn test_client_key_resolution() {
        let limiter = RateLimiter::new(config(1), Arc::new(WindowStore::new()));

        let anonymous = Request::new(Method::GET, "/");
        assert_eq!(limiter.client_key(&anonymous), UNKNOWN_CLIENT);

        let forwarded = Request::new(Method::GET, "/").with_header("x-forwarded-for", " 10.0.0.7 , 172.16.0.1");
        assert_eq!(limiter.client_key(&forwarded), "10.0.0.7");

        let mut identified = forwarded.clone();
        identified.attach_identity(Identity {
            id: "u-9".into(),
            email: "x@y.com".into(),
            role: Role::User,
        });
        assert_eq!(limiter.client_key(&identified), "u-9");
    }

    #[test]
    fn test_custom_forwarded_header() {
        let limiter = RateLimiter::new(config(1), Arc::new(WindowStore::new()))
            .with_forwarded_header(HeaderName::from_static("x-real-ip"));

        let request = Request::new(Method::GET, "/")
            .with_header("x-real-ip", "192.168.1.4")
            .with_header("x-forwarded-for", "10.0.0.1");
        assert_eq!(limiter.client_key(&request), "192.168.1.4");
    }

    #[tokio::test]
    async fn test_rejection_sets_retry_after_and_skips_next() {
        let calls = Arc::new(AtomicUsize::new(0));
        let terminal = spy_terminal(Arc::clone(&calls));
        let pipeline = Pipeline::new().with(RateLimiter::new(config(2), Arc::new(WindowStore::new())));

        let mut statuses = Vec::new();
        for _ in 0..3 {
            let request = Request::new(Method::GET, "/").with_header("x-forwarded-for", "10.0.0.1");
            let response = pipeline.execute(request, &terminal).await.unwrap();
            statuses.push(response.status());
            if response.status() == StatusCode::TOO_MANY_REQUESTS {
                assert_eq!(response.header("retry-after"), Some("60"));
            }
        }

        assert_eq!(statuses, vec![StatusCode::OK, StatusCode::OK, StatusCode::TOO_MANY_REQUESTS]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_requests_respect_bound() {
        let config = config(10);

        for round in 0..20 {
            let store = Arc::new(WindowStore::new());
            let start = Arc::new(tokio::sync::Barrier::new(100));
            let now = Instant::now();

            let mut tasks = Vec::new();
            for _ in 0..100 {
                let store = Arc::clone(&store);
                let start = Arc::clone(&start);
                tasks.push(tokio::spawn(async move {
                    start.wait().await;
                    matches!(store.check("shared", &config, now), Decision::Admitted { .. })
                }));
            }

            let mut admitted = 0;
            for task in tasks {
                if task.await.unwrap() {
                    admitted += 1;
                }
            }
            assert_eq!(admitted, 10, "round {round}");
            assert_eq!(store.recorded("shared"), 10, "round {round}");
        }
    }

    #[test]
    fn test_concurrent_threads_respect_bound() {
        let store = Arc::new(WindowStore::new());
        let config = config(25);
        let now = Instant::now();
        let start = Arc::new(std::sync::Barrier::new(16));

        let threads: Vec<_> = (0..16)
            .map(|_| {
                let store = Arc::clone(&store);
                let start = Arc::clone(&start);
                std::thread::spawn(move || {
                    start.wait();
                    (0..10)
                        .filter(|_| matches!(store.check("shared", &config, now), Decision::Admitted { .. }))
                        .count()
                })
            })
            .collect();

        let admitted: usize = threads.into_iter().map(|t| t.join().unwrap()).sum();
        assert_eq!(admitted, 25);
        assert_eq!(store.recorded("shared"), 25);
    }
}
