use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Mutex, OnceLock};

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::header::RETRY_AFTER;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::response::json_error;

const LIMIT_HEADER: HeaderName = HeaderName::from_static("ratelimit-limit");
const REMAINING_HEADER: HeaderName = HeaderName::from_static("ratelimit-remaining");
const RESET_HEADER: HeaderName = HeaderName::from_static("ratelimit-reset");
const FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

const API_WINDOW_MS: u64 = 900_000;
const API_MAX_HITS: u64 = 500;
const AUTH_WINDOW_MS: u64 = 300_000;
const AUTH_MAX_HITS: u64 = 30;

// Idle peers are dropped once the table grows past this.
const PURGE_AT: usize = 1024;

const LIMIT_MESSAGE: &str = "Too many requests, please try again later";

static API_LIMITER: OnceLock<FixedWindowLimiter> = OnceLock::new();
static AUTH_LIMITER: OnceLock<FixedWindowLimiter> = OnceLock::new();

/// General limit over everything under `/api`.
pub async fn api_rate_limit_middleware(req: Request<Body>, next: Next) -> Response {
    let path = req.uri().path();
    if !(path == "/api" || path.starts_with("/api/")) || exempt(&req) {
        return next.run(req).await;
    }

    let limiter = API_LIMITER.get_or_init(|| {
        FixedWindowLimiter::new(
            env_override("RATE_LIMIT_WINDOW_MS").unwrap_or(API_WINDOW_MS),
            env_override("RATE_LIMIT_MAX").unwrap_or(API_MAX_HITS),
        )
    });
    throttle(limiter, req, next).await
}

/// Tighter limit over the credential endpoints.
pub async fn auth_rate_limit_middleware(req: Request<Body>, next: Next) -> Response {
    if !req.uri().path().starts_with("/api/auth") || exempt(&req) {
        return next.run(req).await;
    }

    let limiter =
        AUTH_LIMITER.get_or_init(|| FixedWindowLimiter::new(AUTH_WINDOW_MS, AUTH_MAX_HITS));
    throttle(limiter, req, next).await
}

async fn throttle(limiter: &FixedWindowLimiter, req: Request<Body>, next: Next) -> Response {
    let ip = client_ip(&req).unwrap_or(IpAddr::from([0, 0, 0, 0]));
    let verdict = limiter.hit(ip);

    let mut response = if verdict.allowed {
        next.run(req).await
    } else {
        json_error(StatusCode::TOO_MANY_REQUESTS, LIMIT_MESSAGE).into_response()
    };
    stamp_headers(response.headers_mut(), &verdict);
    response
}

fn stamp_headers(headers: &mut HeaderMap, verdict: &Verdict) {
    if let Ok(value) = HeaderValue::from_str(&verdict.limit.to_string()) {
        headers.insert(LIMIT_HEADER, value);
    }
    if let Ok(value) = HeaderValue::from_str(&verdict.remaining.to_string()) {
        headers.insert(REMAINING_HEADER, value);
    }
    if let Ok(value) = HeaderValue::from_str(&verdict.reset_secs.to_string()) {
        headers.insert(RESET_HEADER, value.clone());
        if verdict.remaining == 0 {
            headers.insert(RETRY_AFTER, value);
        }
    }
}

fn exempt(req: &Request<Body>) -> bool {
    if std::env::var("NODE_ENV").is_ok_and(|v| v == "test") {
        return true;
    }
    client_ip(req).is_some_and(|ip| ip.is_loopback())
}

/// First hop of `x-forwarded-for` when TRUST_PROXY is on, otherwise the
/// socket peer address.
fn client_ip(req: &Request<Body>) -> Option<IpAddr> {
    if proxy_trusted() {
        let forwarded = req
            .headers()
            .get(&FORWARDED_FOR)
            .and_then(|raw| raw.to_str().ok())
            .and_then(|raw| raw.split(',').next())
            .and_then(|hop| hop.trim().parse().ok());
        if forwarded.is_some() {
            return forwarded;
        }
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
}

fn proxy_trusted() -> bool {
    std::env::var("TRUST_PROXY")
        .map(|raw| {
            let normalized = raw.trim().to_ascii_lowercase();
            !normalized.is_empty() && normalized != "0" && normalized != "false"
        })
        .unwrap_or(false)
}

fn env_override(key: &str) -> Option<u64> {
    std::env::var(key).ok()?.trim().parse().ok()
}

#[derive(Debug, Clone, Copy)]
struct Verdict {
    allowed: bool,
    limit: u64,
    remaining: u64,
    reset_secs: u64,
}

#[derive(Debug, Clone, Copy)]
struct Window {
    opened_ms: u64,
    hits: u64,
}

/// Per-IP fixed-window counter. The critical section never awaits, so a
/// plain mutex is enough.
#[derive(Debug)]
struct FixedWindowLimiter {
    window_ms: u64,
    max_hits: u64,
    windows: Mutex<HashMap<IpAddr, Window>>,
}

impl FixedWindowLimiter {
    fn new(window_ms: u64, max_hits: u64) -> Self {
        Self {
            window_ms,
            max_hits,
            windows: Mutex::new(HashMap::new()),
        }
    }

    fn hit(&self, ip: IpAddr) -> Verdict {
        let now = epoch_ms();
        let mut windows = self
            .windows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if windows.len() > PURGE_AT {
            let window_ms = self.window_ms;
            windows.retain(|_, w| now.saturating_sub(w.opened_ms) < window_ms);
        }

        let window = windows.entry(ip).or_insert(Window {
            opened_ms: now,
            hits: 0,
        });
        if now.saturating_sub(window.opened_ms) >= self.window_ms {
            window.opened_ms = now;
            window.hits = 0;
        }
        window.hits += 1;

        let allowed = window.hits <= self.max_hits;
        let elapsed = now.saturating_sub(window.opened_ms);
        Verdict {
            allowed,
            limit: self.max_hits,
            remaining: if allowed {
                self.max_hits - window.hits
            } else {
                0
            },
            reset_secs: self.window_ms.saturating_sub(elapsed).div_ceil(1000),
        }
    }
}

fn epoch_ms() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn denies_after_budget_spent() {
        let limiter = FixedWindowLimiter::new(60_000, 3);
        let ip = IpAddr::from([10, 0, 0, 1]);

        for _ in 0..3 {
            assert!(limiter.hit(ip).allowed);
        }
        let verdict = limiter.hit(ip);
        assert!(!verdict.allowed);
        assert_eq!(verdict.remaining, 0);
    }

    #[test]
    fn remaining_counts_down() {
        let limiter = FixedWindowLimiter::new(60_000, 5);
        let ip = IpAddr::from([10, 0, 0, 2]);

        assert_eq!(limiter.hit(ip).remaining, 4);
        assert_eq!(limiter.hit(ip).remaining, 3);
    }

    #[test]
    fn peers_are_tracked_separately() {
        let limiter = FixedWindowLimiter::new(60_000, 1);

        assert!(limiter.hit(IpAddr::from([10, 0, 0, 3])).allowed);
        assert!(limiter.hit(IpAddr::from([10, 0, 0, 4])).allowed);
        assert!(!limiter.hit(IpAddr::from([10, 0, 0, 3])).allowed);
    }
}
