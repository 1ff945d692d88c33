//! Per-client rate limiting

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::{
    collections::HashMap,
    net::{IpAddr, SocketAddr},
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;

use crate::error::ApiError;

/// Token bucket for one client
#[derive(Debug, Clone)]
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn full(capacity: f64, now: Instant) -> Self {
        Self {
            tokens: capacity,
            last_update: now,
        }
    }

    fn try_consume(&mut self, refill_per_second: f64, capacity: f64, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.last_update).as_secs_f64();
        self.tokens = (self.tokens + elapsed * refill_per_second).min(capacity);
        self.last_update = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Shared limiter; buckets are keyed by client address
#[derive(Clone)]
pub struct RateLimiter {
    buckets: Arc<Mutex<HashMap<String, TokenBucket>>>,
    refill_per_second: f64,
    capacity: f64,
}

impl RateLimiter {
    /// `requests_per_second` sustained, bursts up to twice that
    pub fn new(requests_per_second: u32) -> Self {
        let rps = requests_per_second.max(1) as f64;
        Self {
            buckets: Arc::new(Mutex::new(HashMap::new())),
            refill_per_second: rps,
            capacity: rps * 2.0,
        }
    }

    pub async fn check(&self, client: &str) -> bool {
        let now = Instant::now();
        let mut buckets = self.buckets.lock().await;

        buckets
            .entry(client.to_string())
            .or_insert_with(|| TokenBucket::full(self.capacity, now))
            .try_consume(self.refill_per_second, self.capacity, now)
    }

    /// Drop buckets idle for longer than `max_idle`; returns how many were removed
    pub async fn cleanup(&self, max_idle: Duration) -> usize {
        let now = Instant::now();
        let mut buckets = self.buckets.lock().await;
        let before = buckets.len();

        buckets.retain(|_, bucket| now.saturating_duration_since(bucket.last_update) < max_idle);

        before - buckets.len()
    }

    /// Periodically prune idle buckets so the map does not grow without bound
    pub fn spawn_cleanup(&self, every: Duration) -> tokio::task::JoinHandle<()> {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                let removed = limiter.cleanup(every).await;
                if removed > 0 {
                    tracing::debug!(removed, "Pruned idle rate limit buckets");
                }
            }
        })
    }
}

/// Rejects with 429 once a client's bucket is empty.
///
/// Clients are keyed by proxy headers, then by the peer address when the
/// server was started with connect info.
pub async fn rate_limit(
    State(limiter): State<RateLimiter>,
    request: Request,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    let client = client_key(request.headers(), peer);

    if !limiter.check(&client).await {
        tracing::warn!(client = %client, "Rate limit exceeded");
        return ApiError::TooManyRequests.into_response();
    }

    next.run(request).await
}

fn client_key(headers: &HeaderMap, peer: Option<IpAddr>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .or_else(|| headers.get("x-real-ip").and_then(|h| h.to_str().ok()))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| peer.map(|ip| ip.to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}
