//! Idle recentering timer.

use std::time::{Duration, Instant};

/// Fires once per `timeout` of continuous face absence.
#[derive(Debug, Clone)]
pub struct IdleRecenter {
    timeout: Duration,
    last_seen: Instant,
}

impl IdleRecenter {
    pub fn new(timeout: Duration, now: Instant) -> Self {
        Self {
            timeout,
            last_seen: now,
        }
    }

    pub fn mark_seen(&mut self, now: Instant) {
        self.last_seen = now;
    }

    /// True when more than `timeout` has passed since the last face (or the
    /// last firing). Firing restarts the timer.
    pub fn poll(&mut self, now: Instant) -> bool {
        if now.saturating_duration_since(self.last_seen) > self.timeout {
            self.last_seen = now;
            true
        } else {
            false
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}
