//! Per-client request rate limiting
//!
//! Each client key (the peer IP) gets one fixed window per [`LimitRule`].
//! A request is admitted only when every rule still has budget; a rejected
//! request consumes nothing. Clients whose windows have all expired are
//! evicted at most once per shortest rule window.

use crate::config::LimitRule;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Key used when the peer address is not available
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Outcome of a rate-limit check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    Limited {
        /// The exhausted rule
        rule: LimitRule,
        /// Time until that rule's window resets
        retry_after: Duration,
    },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed)
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

#[derive(Debug, Default)]
struct ClientWindows {
    clients: HashMap<String, Vec<Window>>,
    last_sweep: Option<Instant>,
}

/// Fixed-window rate limiter keyed by client
pub struct RateLimiter {
    rules: Vec<LimitRule>,
    state: Mutex<ClientWindows>,
}

impl RateLimiter {
    pub fn new(rules: Vec<LimitRule>) -> Self {
        Self {
            rules,
            state: Mutex::new(ClientWindows::default()),
        }
    }

    /// Number of clients currently holding window state
    pub async fn tracked_clients(&self) -> usize {
        self.state.lock().await.clients.len()
    }

    fn is_expired(&self, windows: &[Window], now: Instant) -> bool {
        self.rules.iter().zip(windows).all(|(rule, window)| {
            now.saturating_duration_since(window.started) >= Duration::from_secs(rule.window_secs)
        })
    }

    /// Drop clients whose every window has expired, once per shortest window
    fn sweep(&self, state: &mut ClientWindows, now: Instant) {
        let interval = self
            .rules
            .iter()
            .map(|r| Duration::from_secs(r.window_secs))
            .min()
            .unwrap_or_default();
        let due = state
            .last_sweep
            .map_or(true, |last| now.saturating_duration_since(last) >= interval);
        if !due {
            return;
        }

        let before = state.clients.len();
        state.clients.retain(|_, windows| !self.is_expired(windows, now));
        state.last_sweep = Some(now);
        let evicted = before - state.clients.len();
        if evicted > 0 {
            tracing::debug!(evicted, remaining = state.clients.len(), "Evicted idle rate-limit clients");
        }
    }

    pub fn rules(&self) -> &[LimitRule] {
        &self.rules
    }

    pub async fn check(&self, key: &str) -> RateDecision {
        self.check_at(key, Instant::now()).await
    }

    /// Check and record one request from `key` at `now`
    pub async fn check_at(&self, key: &str, now: Instant) -> RateDecision {
        if self.rules.is_empty() {
            return RateDecision::Allowed;
        }

        let mut state = self.state.lock().await;
        self.sweep(&mut state, now);
        let entry = state.clients.entry(key.to_string()).or_insert_with(|| {
            vec![
                Window {
                    started: now,
                    count: 0,
                };
                self.rules.len()
            ]
        });

        for (rule, window) in self.rules.iter().zip(entry.iter_mut()) {
            let span = Duration::from_secs(rule.window_secs);
            if now.saturating_duration_since(window.started) >= span {
                window.started = now;
                window.count = 0;
            }
        }

        for (rule, window) in self.rules.iter().zip(entry.iter()) {
            if window.count >= rule.max {
                let span = Duration::from_secs(rule.window_secs);
                let elapsed = now.saturating_duration_since(window.started);
                return RateDecision::Limited {
                    rule: *rule,
                    retry_after: span.saturating_sub(elapsed),
                };
            }
        }

        for window in entry.iter_mut() {
            window.count += 1;
        }
        RateDecision::Allowed
    }
}

/// Client key for a request: the peer IP when known
pub fn client_key(req: &Request) -> String {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// Axum middleware enforcing `limiter`; use with `middleware::from_fn_with_state`.
pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    req: Request,
    next: Next,
) -> Response {
    let key = client_key(&req);
    match limiter.check(&key).await {
        RateDecision::Allowed => next.run(req).await,
        RateDecision::Limited { rule, retry_after } => {
            tracing::warn!(
                client = %key,
                path = %req.uri().path(),
                limit = %rule,
                "Rate limit exceeded"
            );
            let retry_secs = retry_after.as_secs().max(1);
            (
                StatusCode::TOO_MANY_REQUESTS,
                [(header::RETRY_AFTER, retry_secs.to_string())],
                Json(serde_json::json!({
                    "status": "error",
                    "message": format!("Rate limit exceeded: {}", rule),
                })),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http;
    use axum::{middleware, routing::get, Router};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_allows_up_to_max() {
        let limiter = RateLimiter::new(vec![LimitRule::new(3, 60)]);
        let now = Instant::now();
        for _ in 0..3 {
            assert!(limiter.check_at("a", now).await.is_allowed());
        }
        let decision = limiter.check_at("a", now).await;
        assert!(matches!(
            decision,
            RateDecision::Limited { rule, retry_after }
                if rule == LimitRule::new(3, 60) && retry_after == Duration::from_secs(60)
        ));
    }

    #[tokio::test]
    async fn test_window_resets() {
        let limiter = RateLimiter::new(vec![LimitRule::new(1, 60)]);
        let now = Instant::now();
        assert!(limiter.check_at("a", now).await.is_allowed());
        assert!(!limiter.check_at("a", now + Duration::from_secs(30)).await.is_allowed());
        assert!(limiter.check_at("a", now + Duration::from_secs(60)).await.is_allowed());
    }

    #[tokio::test]
    async fn test_clients_are_independent() {
        let limiter = RateLimiter::new(vec![LimitRule::new(1, 60)]);
        let now = Instant::now();
        assert!(limiter.check_at("10.0.0.1", now).await.is_allowed());
        assert!(limiter.check_at("10.0.0.2", now).await.is_allowed());
        assert!(!limiter.check_at("10.0.0.1", now).await.is_allowed());
    }

    #[tokio::test]
    async fn test_tightest_rule_wins_and_rejection_is_free() {
        let limiter = RateLimiter::new(vec![LimitRule::new(200, 86_400), LimitRule::new(2, 3600)]);
        let now = Instant::now();
        assert!(limiter.check_at("a", now).await.is_allowed());
        assert!(limiter.check_at("a", now).await.is_allowed());

        let decision = limiter.check_at("a", now).await;
        assert!(matches!(decision, RateDecision::Limited { rule, .. } if rule.max == 2));

        // The day window only counted the two admitted requests.
        let later = now + Duration::from_secs(3600);
        assert!(limiter.check_at("a", later).await.is_allowed());
        assert!(limiter.check_at("a", later).await.is_allowed());
        assert!(!limiter.check_at("a", later).await.is_allowed());
    }

    #[tokio::test]
    async fn test_idle_clients_are_evicted() {
        let limiter = RateLimiter::new(vec![LimitRule::new(200, 86_400), LimitRule::new(50, 3600)]);
        let now = Instant::now();
        for i in 0..10_000 {
            assert!(limiter.check_at(&format!("10.0.{}.{}", i / 256, i % 256), now).await.is_allowed());
        }
        assert_eq!(limiter.tracked_clients().await, 10_000);

        let week_later = now + Duration::from_secs(7 * 86_400);
        assert!(limiter.check_at("192.0.2.1", week_later).await.is_allowed());
        assert_eq!(limiter.tracked_clients().await, 1);
    }

    #[tokio::test]
    async fn test_active_clients_survive_sweep() {
        let limiter = RateLimiter::new(vec![LimitRule::new(1, 60), LimitRule::new(2, 3600)]);
        let now = Instant::now();
        assert!(limiter.check_at("idle", now).await.is_allowed());
        assert!(limiter.check_at("busy", now).await.is_allowed());

        // The minute window has expired but the hour window has not.
        let later = now + Duration::from_secs(120);
        assert!(limiter.check_at("busy", later).await.is_allowed());
        assert_eq!(limiter.tracked_clients().await, 2);
        assert!(!limiter.check_at("busy", later + Duration::from_secs(60)).await.is_allowed());
    }

    #[tokio::test]
    async fn test_no_rules_always_allows() {
        let limiter = RateLimiter::new(Vec::new());
        for _ in 0..100 {
            assert!(limiter.check("a").await.is_allowed());
        }
    }

    #[tokio::test]
    async fn test_middleware_returns_429() {
        let limiter = Arc::new(RateLimiter::new(vec![LimitRule::new(2, 60)]));
        let app = Router::new()
            .route("/ping", get(|| async { "pong" }))
            .layer(middleware::from_fn_with_state(limiter, rate_limit));

        for _ in 0..2 {
            let resp = app
                .clone()
                .oneshot(http::Request::builder().uri("/ping").body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::OK);
        }

        let resp = app
            .oneshot(http::Request::builder().uri("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(resp.headers().contains_key(header::RETRY_AFTER));

        let body = axum::body::to_bytes(resp.into_body(), 1024 * 64).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["message"], "Rate limit exceeded: 2 per minute");
    }

    #[test]
    fn test_client_key_from_connect_info() {
        let mut req: Request = http::Request::builder().uri("/").body(Body::empty()).unwrap();
        assert_eq!(client_key(&req), UNKNOWN_CLIENT);

        let addr: SocketAddr = "192.0.2.7:41000".parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(addr));
        assert_eq!(client_key(&req), "192.0.2.7");
    }
}
