//! Per-connection rate limiting
//!
//! Fixed-window message counter, independent per connection. Denial is fatal
//! for the connection; excess messages are never queued or delayed.

use dashmap::DashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    reset_at: Instant,
}

/// Fixed-window rate limiter keyed by connection id
pub struct RateLimiter {
    windows: DashMap<String, Window>,
    max_per_window: u32,
    window: Duration,
}

impl RateLimiter {
    /// Create a limiter allowing `max_per_window` messages per `window`
    #[must_use]
    pub fn new(max_per_window: u32, window: Duration) -> Self {
        Self {
            windows: DashMap::new(),
            max_per_window,
            window,
        }
    }

    /// Count one message for the connection; returns whether it is allowed
    pub fn check(&self, connection_id: &str) -> bool {
        self.check_at(connection_id, Instant::now())
    }

    /// Count one message at an explicit instant
    pub fn check_at(&self, connection_id: &str, now: Instant) -> bool {
        let mut entry = self
            .windows
            .entry(connection_id.to_string())
            .or_insert(Window {
                count: 0,
                reset_at: now + self.window,
            });

        if now > entry.reset_at {
            entry.count = 1;
            entry.reset_at = now + self.window;
            return true;
        }

        entry.count += 1;
        entry.count <= self.max_per_window
    }

    /// Drop state for a closed connection
    pub fn forget(&self, connection_id: &str) {
        self.windows.remove(connection_id);
    }

    /// Number of connections with live window state
    pub fn tracked(&self) -> usize {
        self.windows.len()
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("max_per_window", &self.max_per_window)
            .field("window", &self.window)
            .field("tracked", &self.windows.len())
            .finish()
    }
}
