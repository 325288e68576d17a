//! Per-IP limit on contact submissions.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderMap;

use crate::store::TtlStore;

const KEY_PREFIX: &str = "contact";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { remaining: u64 },
    Limited { retry_after: Duration },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed { .. })
    }
}

/// Message shown to a limited client, rounded up to whole minutes.
pub fn retry_message(retry_after: Duration) -> String {
    let minutes = retry_after.as_secs().div_ceil(60).max(1);
    let unit = if minutes == 1 { "minute" } else { "minutes" };
    format!("Too many requests. Please try again in {minutes} {unit}.")
}

/// Client address: first hop of `x-forwarded-for`, then `x-real-ip`, then
/// the socket peer.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    if let Some(first) = header("x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return first.to_string();
    }
    if let Some(real) = header("x-real-ip") {
        return real.to_string();
    }
    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn TtlStore>,
    limit: u64,
    window: Duration,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn TtlStore>, limit: u64, window: Duration) -> Self {
        Self {
            store,
            limit,
            window,
        }
    }

    /// Count this request against `ip` and decide whether it may proceed.
    pub async fn check(&self, ip: &str) -> RateDecision {
        let key = format!("{KEY_PREFIX}:{ip}");
        let counter = self.store.increment(&key, self.window).await;

        if counter.count > self.limit {
            tracing::warn!(ip = %ip, count = counter.count, "contact rate limit exceeded");
            RateDecision::Limited {
                retry_after: counter.resets_in,
            }
        } else {
            RateDecision::Allowed {
                remaining: self.limit - counter.count,
            }
        }
    }
}
