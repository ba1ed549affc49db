//! API middleware — request logging and rate limiting.
//!
//! Chat and theme-generation requests fan out to paid LLM APIs, so the
//! hub caps each caller rather than relaying unbounded traffic.

use axum::{
    body::Body,
    extract::Request,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::info;

const MAX_REQUESTS_PER_WINDOW: usize = 60;
const WINDOW_SECS: u64 = 60;

/// Sliding-window rate limiter keyed by caller.
#[derive(Clone)]
pub struct RateLimiter {
    hits: Arc<Mutex<HashMap<String, Vec<Instant>>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window_secs: u64) -> Self {
        Self {
            hits: Arc::new(Mutex::new(HashMap::new())),
            max_requests,
            window: Duration::from_secs(window_secs),
        }
    }

    /// Record a hit for `key` and say whether it is still within budget.
    async fn allow(&self, key: &str) -> bool {
        let mut hits = self.hits.lock().await;
        let now = Instant::now();

        let entry = hits.entry(key.to_string()).or_default();
        entry.retain(|t| now.duration_since(*t) < self.window);

        if entry.len() >= self.max_requests {
            false
        } else {
            entry.push(now);
            true
        }
    }
}

/// Rate limiting middleware.
pub async fn rate_limit_middleware(
    headers: HeaderMap,
    request: Request<Body>,
    next: Next,
) -> Response {
    let key = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    static LIMITER: std::sync::OnceLock<RateLimiter> = std::sync::OnceLock::new();
    let limiter =
        LIMITER.get_or_init(|| RateLimiter::new(MAX_REQUESTS_PER_WINDOW, WINDOW_SECS));

    if !limiter.allow(&key).await {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            axum::Json(serde_json::json!({
                "error": format!(
                    "Rate limit exceeded. Max {} requests per minute.",
                    MAX_REQUESTS_PER_WINDOW
                )
            })),
        )
            .into_response();
    }

    next.run(request).await
}

/// Request logging middleware.
pub async fn logging_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    info!(
        %method,
        %uri,
        status = response.status().as_u16(),
        elapsed_ms = format!("{:.1}", start.elapsed().as_secs_f64() * 1000.0),
        "request"
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rate_limiter_blocks_after_the_cap() {
        let limiter = RateLimiter::new(3, 60);
        for _ in 0..3 {
            assert!(limiter.allow("client").await);
        }
        assert!(!limiter.allow("client").await);
        // Other clients are unaffected.
        assert!(limiter.allow("other").await);
    }
}
