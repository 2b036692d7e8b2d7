//! Bounded polling.

use std::time::Duration;

use tokio::time::Instant;

/// A deadline plus a poll interval. Each wait on the live page gets its own
/// `Poller`, so every wait has a caller-visible timeout outcome.
#[derive(Debug, Clone, Copy)]
pub struct Poller {
    deadline: Instant,
    interval: Duration,
    timeout: Duration,
}

impl Poller {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self {
            deadline: Instant::now() + timeout,
            interval,
            timeout,
        }
    }

    /// Sleep one interval (clipped to the deadline). Returns `false` once the
    /// deadline has passed and the caller should stop polling.
    pub async fn tick(&mut self) -> bool {
        let now = Instant::now();
        if now >= self.deadline {
            return false;
        }
        let remaining = self.deadline - now;
        tokio::time::sleep(self.interval.min(remaining)).await;
        true
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}
