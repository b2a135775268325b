use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Sliding-window admission control, one log per user. Every user-initiated
/// entry point asks here first; a rejection must not reach any other
/// component.
pub struct RateLimiter {
    max_calls: usize,
    window: Duration,
    calls: DashMap<i64, Vec<Instant>>,
}

impl RateLimiter {
    pub fn new(max_calls: usize, window: Duration) -> Self {
        Self {
            max_calls,
            window,
            calls: DashMap::new(),
        }
    }

    pub fn admit(&self, user_id: i64) -> bool {
        self.admit_at(user_id, Instant::now())
    }

    fn admit_at(&self, user_id: i64, now: Instant) -> bool {
        let mut log = self.calls.entry(user_id).or_default();
        log.retain(|t| now.duration_since(*t) < self.window);
        if log.len() < self.max_calls {
            log.push(now);
            true
        } else {
            false
        }
    }
}
