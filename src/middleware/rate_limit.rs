//! Rate limiting middleware
//!
//! Fixed-window counting per (client IP, route label). Runs before any auth
//! or proxy work, the cheapest possible rejection point. Window and max are
//! per-route; sensitive routes (invite creation) get the smallest limits.

use std::{
    collections::HashMap,
    net::{IpAddr, SocketAddr},
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::HeaderValue,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::WindowLimit;
use crate::utils::AppError;

/// One counting window for a (client, route) key
#[derive(Debug, Clone, Copy)]
struct Window {
    started_at: Instant,
    count: u32,
    length: Duration,
}

/// Outcome of a limiter check
enum Decision {
    Allowed,
    Limited { retry_after: Duration },
}

/// Shared fixed-window rate limiter.
///
/// One map serves every route; the route label is part of the key so the
/// same client gets independent budgets per route.
#[derive(Clone, Default)]
pub struct RateLimiter {
    windows: Arc<RwLock<HashMap<(IpAddr, &'static str), Window>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    async fn check(&self, ip: IpAddr, label: &'static str, limit: WindowLimit) -> Decision {
        let length = Duration::from_secs(limit.window_secs);
        let now = Instant::now();
        let mut windows = self.windows.write().await;

        let window = windows.entry((ip, label)).or_insert(Window {
            started_at: now,
            count: 0,
            length,
        });

        // Window boundary: the counter resets, it never slides
        if now.duration_since(window.started_at) >= length {
            window.started_at = now;
            window.count = 0;
        }
        window.count += 1;

        if window.count > limit.max {
            let retry_after = length.saturating_sub(now.duration_since(window.started_at));
            Decision::Limited { retry_after }
        } else {
            Decision::Allowed
        }
    }

    /// Remove entries whose window ended more than one full window ago
    pub async fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut windows = self.windows.write().await;
        let before = windows.len();
        windows.retain(|_, window| {
            now.duration_since(window.started_at) < window.length * 2
        });
        let removed = before - windows.len();
        if removed > 0 {
            debug!(removed, "Rate limiter sweep");
        }
        removed
    }

    pub async fn tracked_keys(&self) -> usize {
        self.windows.read().await.len()
    }

    /// Spawn the periodic sweep task bounding the map's memory
    pub fn spawn_sweeper(&self, interval_secs: u64) -> tokio::task::JoinHandle<()> {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
            loop {
                interval.tick().await;
                limiter.sweep().await;
            }
        })
    }
}

/// Per-route limiter state handed to the middleware layer
#[derive(Clone)]
pub struct RouteLimit {
    pub limiter: RateLimiter,
    pub label: &'static str,
    pub limit: WindowLimit,
}

impl RouteLimit {
    pub fn new(limiter: RateLimiter, label: &'static str, limit: WindowLimit) -> Self {
        Self {
            limiter,
            label,
            limit,
        }
    }
}

/// Rate limiting middleware for axum
pub async fn rate_limit_middleware(
    State(route): State<RouteLimit>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let ip = addr.ip();
    match route.limiter.check(ip, route.label, route.limit).await {
        Decision::Allowed => next.run(request).await,
        Decision::Limited { retry_after } => {
            warn!(%ip, route = route.label, "Rate limit exceeded");
            let mut response = AppError::RateLimited.into_response();
            let secs = retry_after.as_secs().max(1);
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert("Retry-After", value);
            }
            response
        }
    }
}
