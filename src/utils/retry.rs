//! Bounded retry with exponential backoff.
//!
//! Every retry loop in the crawler is driven by a [`RetryPolicy`]: a maximum
//! number of attempts plus a capped, growing delay between them. There are no
//! unbounded "until it works" loops.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Attempt budget and backoff schedule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,

    /// Delay after the first failure, in milliseconds
    pub initial_delay_ms: u64,

    /// Ceiling for any single delay, in milliseconds
    pub max_delay_ms: u64,

    /// Growth factor applied per failed attempt
    pub multiplier: f64,
}

/// A retry policy as written in a config table. Unset keys fall back to
/// whatever base policy the table is applied to.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RetryOverrides {
    pub max_attempts: Option<u32>,
    pub initial_delay_ms: Option<u64>,
    pub max_delay_ms: Option<u64>,
    pub multiplier: Option<f64>,
}

impl RetryOverrides {
    pub fn apply_to(self, base: RetryPolicy) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.unwrap_or(base.max_attempts),
            initial_delay_ms: self.initial_delay_ms.unwrap_or(base.initial_delay_ms),
            max_delay_ms: self.max_delay_ms.unwrap_or(base.max_delay_ms),
            multiplier: self.multiplier.unwrap_or(base.multiplier),
        }
    }
}

impl RetryPolicy {
    /// Create a policy with the default doubling backoff.
    pub fn new(max_attempts: u32, initial_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_attempts,
            initial_delay_ms,
            max_delay_ms,
            multiplier: defaults::multiplier(),
        }
    }

    /// Delay to sleep after the given failed attempt (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31) as i32;
        let millis = self.initial_delay_ms as f64 * self.multiplier.max(1.0).powi(exponent);
        Duration::from_millis(millis.min(self.max_delay_ms as f64) as u64)
    }

    /// Whether another attempt is allowed after `attempt` attempts.
    pub fn allows_another(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// policy runs out of attempts. Returns the last error together with the
/// number of attempts made.
pub async fn retry_async<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut op: F,
) -> std::result::Result<T, (AppError, u32)>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && policy.allows_another(attempt) => {
                let delay = policy.delay_for(attempt);
                log::warn!(
                    "{} failed (attempt {}/{}): {}. Retrying in {:?}",
                    label,
                    attempt,
                    policy.max_attempts,
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err((e, attempt)),
        }
    }
}

mod defaults {
    pub fn multiplier() -> f64 {
        2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_grows_and_is_capped() {
        let policy = RetryPolicy::new(10, 100, 1_000);
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(400));
        assert_eq!(policy.delay_for(5), Duration::from_millis(1_000));
        assert_eq!(policy.delay_for(40), Duration::from_millis(1_000));
    }

    #[test]
    fn overrides_replace_only_set_keys() {
        let overrides: RetryOverrides = toml::from_str("max_attempts = 7").unwrap();
        let policy = overrides.apply_to(RetryPolicy::new(5, 2_000, 30_000));
        assert_eq!(policy, RetryPolicy::new(7, 2_000, 30_000));
    }

    #[test]
    fn attempt_budget() {
        let policy = RetryPolicy::new(3, 0, 0);
        assert!(policy.allows_another(1));
        assert!(policy.allows_another(2));
        assert!(!policy.allows_another(3));
    }

    #[tokio::test]
    async fn retries_transient_errors_until_success() {
        let policy = RetryPolicy::new(5, 1, 1);
        let result = retry_async(&policy, "flaky", |attempt| async move {
            if attempt < 3 {
                Err(AppError::browser("not yet"))
            } else {
                Ok(attempt)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 3);
    }

    #[tokio::test]
    async fn gives_up_after_budget() {
        let policy = RetryPolicy::new(2, 1, 1);
        let result: std::result::Result<(), _> =
            retry_async(&policy, "always", |_| async { Err(AppError::browser("down")) }).await;
        let (error, attempts) = result.unwrap_err();
        assert_eq!(attempts, 2);
        assert!(matches!(error, AppError::Browser(_)));
    }

    #[tokio::test]
    async fn fatal_error_stops_immediately() {
        let policy = RetryPolicy::new(5, 1, 1);
        let result: std::result::Result<(), _> = retry_async(&policy, "fatal", |_| async {
            Err(AppError::config("bad"))
        })
        .await;
        assert_eq!(result.unwrap_err().1, 1);
    }
}
