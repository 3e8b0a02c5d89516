//! Rate limiting middleware for the API
//!
//! Fixed window per client IP, with exempt paths and IPs.

use axum::{
    Json,
    extract::{ConnectInfo, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::{
    collections::HashMap,
    net::{IpAddr, SocketAddr},
    sync::Arc,
    time::Instant,
};
use tokio::sync::Mutex;

use crate::config::RateLimitConfig;

/// Request count within the current window of one IP
struct Window {
    started: Instant,
    count: u32,
}

/// Rate limiter with per-IP tracking
pub struct RateLimiter {
    windows: Mutex<HashMap<IpAddr, Window>>,
    config: RateLimitConfig,
}

impl RateLimiter {
    /// Create a new rate limiter from configuration
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            config,
        }
    }

    fn is_path_exempt(&self, path: &str) -> bool {
        self.config
            .exempt_paths
            .iter()
            .any(|exempt| path == exempt || path.starts_with(exempt.as_str()))
    }

    /// Count a request; returns the seconds to wait when over the limit
    pub async fn check(&self, path: &str, addr: SocketAddr) -> Option<u64> {
        self.check_at(path, addr.ip(), Instant::now()).await
    }

    pub(crate) async fn check_at(&self, path: &str, ip: IpAddr, now: Instant) -> Option<u64> {
        if self.is_path_exempt(path) || self.config.exempt_ips.contains(&ip) {
            return None;
        }

        let mut windows = self.windows.lock().await;
        // Drop windows that ended so idle clients do not accumulate
        if windows.len() > 1024 {
            let length = self.config.window;
            windows.retain(|_, w| now.duration_since(w.started) < length);
        }

        let window = windows.entry(ip).or_insert(Window {
            started: now,
            count: 0,
        });
        let elapsed = now.duration_since(window.started);
        if elapsed >= self.config.window {
            window.started = now;
            window.count = 0;
        }

        if window.count < self.config.max_requests {
            window.count += 1;
            None
        } else {
            let remaining = self.config.window.saturating_sub(elapsed);
            Some(remaining.as_secs_f64().ceil().max(1.0) as u64)
        }
    }
}

/// Rate limiting middleware function
pub async fn rate_limit_middleware(
    axum::extract::State(limiter): axum::extract::State<Arc<RateLimiter>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    req: Request,
    next: axum::middleware::Next,
) -> Response {
    match limiter.check(req.uri().path(), addr).await {
        None => next.run(req).await,
        Some(retry_after) => {
            tracing::debug!(client = %addr.ip(), path = %req.uri().path(), "rate limited");
            let error = json!({
                "error": {
                    "code": "rate_limited",
                    "message": "Too many requests",
                    "details": {
                        "retry_after_seconds": retry_after
                    }
                }
            });
            (StatusCode::TOO_MANY_REQUESTS, Json(error)).into_response()
        }
    }
}
