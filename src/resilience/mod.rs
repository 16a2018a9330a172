//! Retry policy for GitHub API requests.
//!
//! The executor re-runs one logical request. It keeps no state between
//! calls, and its only suspension point is the wait between attempts, which
//! never runs past the request budget.

use crate::errors::{ErrorClass, GitHubError, GitHubResult};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;

/// Computes the wait before the next attempt.
pub trait Backoff: Send + Sync + fmt::Debug {
    /// Delay after the given failed attempt (1-based).
    fn delay(&self, attempt: u32) -> Duration;
}

/// Constant delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedBackoff {
    interval: Duration,
}

impl FixedBackoff {
    /// Creates a fixed backoff.
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Backoff for FixedBackoff {
    fn delay(&self, _attempt: u32) -> Duration {
        self.interval
    }
}

/// Exponential backoff with jitter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialBackoff {
    initial: Duration,
    max: Duration,
    multiplier: f64,
    jitter: f64,
}

impl ExponentialBackoff {
    /// Creates an exponential backoff.
    pub fn new(initial: Duration, max: Duration, multiplier: f64, jitter: f64) -> Self {
        Self {
            initial,
            max,
            multiplier,
            jitter: jitter.clamp(0.0, 1.0),
        }
    }
}

impl Backoff for ExponentialBackoff {
    fn delay(&self, attempt: u32) -> Duration {
        let base = self.initial.as_millis() as f64
            * self.multiplier.powi(attempt.saturating_sub(1) as i32);
        let capped = base.min(self.max.as_millis() as f64);

        let jitter_range = capped * self.jitter;
        let jitter_value = rand_jitter() * jitter_range * 2.0 - jitter_range;
        let final_delay = (capped + jitter_value).max(0.0);

        Duration::from_millis(final_delay as u64)
    }
}

/// Pseudo-random value in `0.0..=1.0` from the clock.
fn rand_jitter() -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    (nanos as f64) / 1_000_000_000.0
}

/// Which failures are retried, how often, and how long to wait.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    retry_on: HashSet<ErrorClass>,
    backoff: Arc<dyn Backoff>,
}

impl RetryPolicy {
    /// Creates a policy. `max_attempts` counts the first attempt and is
    /// raised to at least 1.
    pub fn new(max_attempts: u32, retry_on: HashSet<ErrorClass>, backoff: Arc<dyn Backoff>) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            retry_on,
            backoff,
        }
    }

    /// Retries server errors only, with a fixed interval.
    pub fn server_errors(max_attempts: u32, interval: Duration) -> Self {
        Self::new(
            max_attempts,
            [ErrorClass::Server].into_iter().collect(),
            Arc::new(FixedBackoff::new(interval)),
        )
    }

    /// Total attempts allowed.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Retryable error families.
    pub fn retry_on(&self) -> &HashSet<ErrorClass> {
        &self.retry_on
    }

    /// Returns true if the error's family is retryable.
    pub fn is_retryable(&self, error: &GitHubError) -> bool {
        self.retry_on.contains(&error.class())
    }

    /// Wait before the attempt after `attempt`, honouring `Retry-After`.
    pub fn delay_for(&self, attempt: u32, error: &GitHubError) -> Duration {
        match error.retry_after() {
            Some(seconds) => Duration::from_secs(seconds),
            None => self.backoff.delay(attempt),
        }
    }
}

/// A retry that is about to happen.
#[derive(Debug)]
pub struct RetryEvent<'a> {
    /// Attempt that just failed (1-based).
    pub attempt: u32,
    /// Wait before the next attempt.
    pub delay: Duration,
    /// Error from the failed attempt.
    pub error: &'a GitHubError,
}

/// Runs an operation under a [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    policy: RetryPolicy,
    budget: Option<Duration>,
}

impl RetryExecutor {
    /// Creates an executor without a time budget.
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            budget: None,
        }
    }

    /// Bounds the whole operation, waits included.
    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = Some(budget);
        self
    }

    /// Gets the policy.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Executes an operation with retry logic.
    pub async fn execute<F, Fut, T>(&self, operation: F) -> GitHubResult<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = GitHubResult<T>>,
    {
        self.execute_observed(operation, |_| {}).await
    }

    /// Executes an operation, calling `on_retry` before every wait.
    pub async fn execute_observed<F, Fut, T, O>(&self, mut operation: F, on_retry: O) -> GitHubResult<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = GitHubResult<T>>,
        O: Fn(&RetryEvent<'_>),
    {
        let started = Instant::now();
        let mut attempt = 0;

        loop {
            attempt += 1;
            let error = match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => e,
            };

            if !self.policy.is_retryable(&error) || attempt >= self.policy.max_attempts {
                return Err(error);
            }

            let delay = self.policy.delay_for(attempt, &error);
            if let Some(budget) = self.budget {
                if started.elapsed() + delay > budget {
                    tracing::debug!(
                        attempt = attempt,
                        delay_ms = delay.as_millis() as u64,
                        budget_ms = budget.as_millis() as u64,
                        "Retry would exceed request budget"
                    );
                    return Err(error);
                }
            }

            on_retry(&RetryEvent {
                attempt,
                delay,
                error: &error,
            });
            tracing::debug!(
                attempt = attempt,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Retrying after error"
            );

            sleep(delay).await;
        }
    }
}
