//! Per-client fixed-window request quota.
//!
//! Signup/login are throttled separately with `tower_governor` (see
//! `api::build_router`); this limiter guards `/weather` and follows
//! fixed-window semantics: a client gets `quota` requests, then waits until
//! its window (started by its first request) runs out and the count resets.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use dashmap::DashMap;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed { remaining: u32 },
    Limited { retry_after: Duration },
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

pub struct FixedWindowLimiter {
    quota: u32,
    window: Duration,
    windows: DashMap<IpAddr, Window>,
}

impl FixedWindowLimiter {
    pub fn new(quota: u32, window: Duration) -> Self {
        Self {
            quota,
            window,
            windows: DashMap::new(),
        }
    }

    pub fn check(&self, key: IpAddr) -> Decision {
        self.check_at(key, Instant::now())
    }

    /// Counts one request from `key` at `now`.
    ///
    /// The entry guard is held for the whole read-modify-write, so
    /// concurrent requests from one client cannot overshoot the quota.
    fn check_at(&self, key: IpAddr, now: Instant) -> Decision {
        let mut entry = self.windows.entry(key).or_insert(Window {
            started: now,
            count: 0,
        });

        let elapsed = now.saturating_duration_since(entry.started);
        if elapsed >= self.window {
            entry.started = now;
            entry.count = 0;
        }

        if entry.count >= self.quota {
            let retry_after = self
                .window
                .saturating_sub(now.saturating_duration_since(entry.started));
            return Decision::Limited { retry_after };
        }

        entry.count += 1;
        Decision::Allowed {
            remaining: self.quota - entry.count,
        }
    }

    /// Drops windows that have run out; called periodically from `main`.
    pub fn purge_expired(&self) {
        let window = self.window;
        self.windows.retain(|_, w| w.started.elapsed() < window);
    }

    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }
}

fn client_ip(req: &Request<Body>) -> IpAddr {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

fn retry_after_secs(d: Duration) -> u64 {
    let secs = d.as_secs() + u64::from(d.subsec_nanos() > 0);
    secs.max(1)
}

pub async fn limit_weather(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let ip = client_ip(&req);

    match state.weather_limiter.check(ip) {
        Decision::Allowed { remaining } => {
            tracing::debug!("Weather request from {ip} allowed ({remaining} left in window)");
            Ok(next.run(req).await)
        }
        Decision::Limited { retry_after } => {
            tracing::warn!("Rate limit exceeded for {ip}");
            Err(AppError::RateLimitExceeded {
                retry_after: retry_after_secs(retry_after),
            })
        }
    }
}
