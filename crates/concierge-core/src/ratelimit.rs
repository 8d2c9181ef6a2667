//! Per-client request throttle.
//!
//! A fixed rolling window per key: the first request in a window starts it,
//! and once the count in the current window reaches the ceiling, further
//! requests are rejected until the window expires. Counters live in a
//! `DashMap`, so concurrent requests for the same key cannot lose updates
//! (the entry guard serializes increments per key). Nothing persists across
//! process restarts.

use std::time::{Duration, Instant};

use dashmap::DashMap;

use concierge_types::config::RateLimitConfig;

struct Window {
    started: Instant,
    count: u32,
}

/// Fixed-window per-key rate limiter.
pub struct RateLimiter {
    windows: DashMap<String, Window>,
    max_requests: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            windows: DashMap::new(),
            max_requests,
            window,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.max_requests, Duration::from_secs(config.window_secs))
    }

    /// Record one request for `key` and report whether it is allowed.
    ///
    /// Exactly `max_requests` calls succeed per window; the next call is
    /// rejected until the window rolls over.
    pub fn allow(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut entry = self
            .windows
            .entry(key.to_string())
            .or_insert_with(|| Window { started: now, count: 0 });

        if now.duration_since(entry.started) >= self.window {
            entry.started = now;
            entry.count = 0;
        }

        if entry.count < self.max_requests {
            entry.count += 1;
            true
        } else {
            false
        }
    }

    /// Drop windows that have expired, so idle keys do not accumulate.
    pub fn sweep(&self) {
        let window = self.window;
        self.windows.retain(|_, w| w.started.elapsed() < window);
    }

    /// Number of keys currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }
}
