//! Fixed-window, per-client request limits.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use dashmap::DashMap;
use log::*;
use serde_json::json;

static RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("ratelimit-limit");
static RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("ratelimit-remaining");
static RATELIMIT_RESET: HeaderName = HeaderName::from_static("ratelimit-reset");

/// Windows are swept once the table grows past this many clients.
const SWEEP_THRESHOLD: usize = 1024;

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    hits: u32,
}

/// Result of counting one request against a limit.
#[derive(Debug, PartialEq)]
pub(crate) struct Decision {
    pub allowed: bool,
    pub remaining: u32,
    /// Seconds until the client's window starts over.
    pub reset_secs: u64,
}

/// Allows `max` requests per client within each `window`.
pub struct RateLimiter {
    max: u32,
    window: Duration,
    message: &'static str,
    clients: DashMap<String, Window>,
}

impl RateLimiter {
    pub fn new(max: u32, window: Duration, message: &'static str) -> Self {
        Self {
            max,
            window,
            message,
            clients: DashMap::new(),
        }
    }

    /// OAuth endpoints: 5 requests per 15 minutes.
    pub fn auth() -> Self {
        Self::new(
            5,
            Duration::from_secs(15 * 60),
            "Too many authentication attempts, please try again after 15 minutes.",
        )
    }

    /// Issue search: 30 requests per minute.
    pub fn search() -> Self {
        Self::new(
            30,
            Duration::from_secs(60),
            "Too many search requests, please try again after 1 minute.",
        )
    }

    /// Every `/api` route: 100 requests per 15 minutes.
    pub fn api() -> Self {
        Self::new(
            100,
            Duration::from_secs(15 * 60),
            "Too many requests from this IP, please try again after 15 minutes.",
        )
    }

    pub(crate) fn check(&self, client: &str) -> Decision {
        self.check_at(client, Instant::now())
    }

    fn check_at(&self, client: &str, now: Instant) -> Decision {
        if self.clients.len() > SWEEP_THRESHOLD {
            self.clients
                .retain(|_, window| now.duration_since(window.started) < self.window);
        }

        let mut window = self.clients.entry(client.to_string()).or_insert(Window {
            started: now,
            hits: 0,
        });
        if now.duration_since(window.started) >= self.window {
            *window = Window {
                started: now,
                hits: 0,
            };
        }
        window.hits = window.hits.saturating_add(1);

        let elapsed = now.duration_since(window.started);
        let reset = self.window.saturating_sub(elapsed);
        Decision {
            allowed: window.hits <= self.max,
            remaining: self.max.saturating_sub(window.hits),
            reset_secs: reset.as_secs() + u64::from(reset.subsec_nanos() > 0),
        }
    }

    fn set_headers(&self, headers: &mut HeaderMap, decision: &Decision) {
        headers.insert(RATELIMIT_LIMIT.clone(), HeaderValue::from(self.max));
        headers.insert(
            RATELIMIT_REMAINING.clone(),
            HeaderValue::from(decision.remaining),
        );
        headers.insert(
            RATELIMIT_RESET.clone(),
            HeaderValue::from(decision.reset_secs),
        );
    }
}

/// The three limits applied to the router.
#[derive(Clone)]
pub struct RateLimits {
    pub auth: Arc<RateLimiter>,
    pub search: Arc<RateLimiter>,
    pub api: Arc<RateLimiter>,
}

impl RateLimits {
    pub fn new() -> Self {
        Self {
            auth: Arc::new(RateLimiter::auth()),
            search: Arc::new(RateLimiter::search()),
            api: Arc::new(RateLimiter::api()),
        }
    }
}

impl Default for RateLimits {
    fn default() -> Self {
        Self::new()
    }
}

/// Identify the client by peer IP address. Requests served without connection
/// info all share one bucket.
fn client_key(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Middleware counting each request against `limiter` and rejecting it with
/// 429 Too Many Requests once the client's window is used up.
pub async fn enforce(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let client = client_key(&request);
    let decision = limiter.check(&client);

    let mut response = if decision.allowed {
        next.run(request).await
    } else {
        info!("Rate limit exceeded for {client} on {}", request.uri().path());
        (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "error": limiter.message })),
        )
            .into_response()
    };

    limiter.set_headers(response.headers_mut(), &decision);
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows_up_to_max_within_window() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60), "slow down");
        let now = Instant::now();

        assert!(limiter.check_at("a", now).allowed);
        let second = limiter.check_at("a", now);
        assert!(second.allowed);
        assert_eq!(second.remaining, 0);

        let third = limiter.check_at("a", now);
        assert!(!third.allowed);
        assert_eq!(third.reset_secs, 60);
    }

    #[test]
    fn test_clients_are_counted_separately() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60), "slow down");
        let now = Instant::now();

        assert!(limiter.check_at("a", now).allowed);
        assert!(limiter.check_at("b", now).allowed);
        assert!(!limiter.check_at("a", now).allowed);
    }

    #[test]
    fn test_window_starts_over_after_it_elapses() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60), "slow down");
        let now = Instant::now();

        assert!(limiter.check_at("a", now).allowed);
        assert!(!limiter.check_at("a", now + Duration::from_secs(59)).allowed);

        let later = limiter.check_at("a", now + Duration::from_secs(60));
        assert!(later.allowed);
        assert_eq!(later.remaining, 0);
    }

    #[test]
    fn test_reset_counts_down() {
        let limiter = RateLimiter::new(10, Duration::from_secs(60), "slow down");
        let now = Instant::now();

        limiter.check_at("a", now);
        let decision = limiter.check_at("a", now + Duration::from_millis(20_500));
        assert_eq!(decision.reset_secs, 40);
        assert_eq!(decision.remaining, 8);
    }
}
