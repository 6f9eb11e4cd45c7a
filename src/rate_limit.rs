use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::Mutex;

/// Per-key sliding-window rate limiter for the token-issuing endpoints.
/// Windows are pruned on access; idle keys are dropped wholesale once a
/// minute.
#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<Mutex<Windows>>,
    max_requests: usize,
    window: Duration,
}

struct Windows {
    by_key: HashMap<String, VecDeque<Instant>>,
    last_sweep: Instant,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Windows {
                by_key: HashMap::new(),
                last_sweep: Instant::now(),
            })),
            max_requests,
            window,
        }
    }

    async fn allow(&self, key: &str) -> bool {
        let mut inner = self.inner.lock().await;
        let now = Instant::now();

        if now.duration_since(inner.last_sweep) > Duration::from_secs(60) {
            let window = self.window;
            inner.by_key.retain(|_, hits| {
                hits.back().is_some_and(|t| now.duration_since(*t) < window)
            });
            inner.last_sweep = now;
        }

        let hits = inner.by_key.entry(key.to_string()).or_default();
        while hits
            .front()
            .is_some_and(|t| now.duration_since(*t) >= self.window)
        {
            hits.pop_front();
        }

        if hits.len() >= self.max_requests {
            return false;
        }
        hits.push_back(now);
        true
    }
}

/// Keys on the client IP, preferring proxy headers over a global bucket.
pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiter>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let key = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|s| s.trim().to_string())
        .or_else(|| {
            req.headers()
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string())
        })
        .unwrap_or_else(|| "global".to_string());

    if !limiter.allow(&key).await {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            axum::Json(serde_json::json!({
                "error": "rate_limited",
                "message": "Too many requests. Please try again later."
            })),
        )
            .into_response();
    }

    next.run(req).await
}
