use std::{
    net::{IpAddr, SocketAddr},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use {
    axum::http::HeaderMap,
    dashmap::DashMap,
};

const SWEEP_EVERY_CHECKS: u64 = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThrottleScope {
    Post,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ThrottleKey {
    ip: IpAddr,
    scope: ThrottleScope,
}

/// Requests counted in the window that opened at `opened`.
#[derive(Debug, Clone, Copy)]
struct WindowState {
    opened: Instant,
    used: usize,
}

impl WindowState {
    fn admit(&mut self, limit: RateLimit, now: Instant) -> ThrottleDecision {
        let age = now.saturating_duration_since(self.opened);
        if age >= limit.window {
            *self = WindowState { opened: now, used: 0 };
        } else if self.used >= limit.max_requests {
            return ThrottleDecision::Denied {
                retry_after: limit.window - age,
            };
        }
        self.used += 1;
        ThrottleDecision::Allowed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub max_requests: usize,
    pub window: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleLimits {
    pub post: RateLimit,
    pub delete: RateLimit,
}

impl ThrottleLimits {
    fn get(&self, scope: ThrottleScope) -> RateLimit {
        match scope {
            ThrottleScope::Post => self.post,
            ThrottleScope::Delete => self.delete,
        }
    }
}

impl Default for ThrottleLimits {
    fn default() -> Self {
        Self {
            post: RateLimit {
                max_requests: 5,
                window: Duration::from_secs(60),
            },
            delete: RateLimit {
                max_requests: 10,
                window: Duration::from_secs(60),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleDecision {
    Allowed,
    Denied { retry_after: Duration },
}

/// Fixed-window request counters keyed by submitter and route.
///
/// Clones share the same counters.
#[derive(Clone)]
pub struct RequestThrottle {
    limits: ThrottleLimits,
    windows: Arc<DashMap<ThrottleKey, WindowState>>,
    checks: Arc<AtomicU64>,
}

impl RequestThrottle {
    #[must_use]
    pub fn new(limits: ThrottleLimits) -> Self {
        Self {
            limits,
            windows: Arc::default(),
            checks: Arc::default(),
        }
    }

    pub fn check(&self, ip: IpAddr, scope: ThrottleScope) -> ThrottleDecision {
        self.check_at(ip, scope, Instant::now())
    }

    pub fn check_at(&self, ip: IpAddr, scope: ThrottleScope, now: Instant) -> ThrottleDecision {
        let limit = self.limits.get(scope);
        let decision = if limit.max_requests == 0 {
            ThrottleDecision::Denied {
                retry_after: limit.window.max(Duration::from_secs(1)),
            }
        } else {
            self.windows
                .entry(ThrottleKey { ip, scope })
                .or_insert(WindowState { opened: now, used: 0 })
                .admit(limit, now)
        };

        if (self.checks.fetch_add(1, Ordering::Relaxed) + 1).is_multiple_of(SWEEP_EVERY_CHECKS) {
            self.sweep(now);
        }
        decision
    }

    // An expired window is reset on its next use, so dropping it loses nothing.
    fn sweep(&self, now: Instant) {
        self.windows.retain(|key, window| {
            now.saturating_duration_since(window.opened) < self.limits.get(key.scope).window
        });
    }

    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.windows.len()
    }
}

/// The submitter identifier: the peer address, or the forwarded client when
/// running behind a trusted proxy.
pub fn resolve_client_ip(headers: &HeaderMap, addr: SocketAddr, behind_proxy: bool) -> IpAddr {
    if behind_proxy {
        if let Some(ip) = extract_forwarded_ip(headers) {
            return ip;
        }
    }
    addr.ip()
}

fn extract_forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    let xff = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok());
    if let Some(ip) = xff.and_then(|xff| {
        xff.split(',')
            .find_map(|candidate| parse_ip(candidate.trim()))
    }) {
        return Some(ip);
    }

    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .and_then(|xri| parse_ip(xri.trim()))
}

fn parse_ip(value: &str) -> Option<IpAddr> {
    if value.is_empty() {
        return None;
    }
    if let Ok(ip) = value.parse::<IpAddr>() {
        return Some(ip);
    }
    value.parse::<SocketAddr>().ok().map(|addr| addr.ip())
}
