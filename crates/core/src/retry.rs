//! Retry policy: exponential backoff over the job's own `max_retries`.
//!
//! The policy is pure; the executor feeds it the failing attempt number,
//! the job's retry budget, and the current instant, and acts on the
//! returned decision. Cancellation never reaches this code because a retry
//! is only scheduled for a job that is still `running`.

use std::time::Duration;

use crate::types::Timestamp;

/// Default backoff base delay applied after the first failed attempt.
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 30_000;

/// Cap on the doubling exponent so the delay factor cannot overflow.
/// `2^16 * base` is far beyond any useful retry horizon.
const MAX_BACKOFF_EXPONENT: u32 = 16;

/// Outcome of consulting the policy after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Schedule another attempt at `next_run_at`.
    Retry { next_run_at: Timestamp },
    /// The retry budget is spent; the job fails terminally.
    Exhausted,
}

/// Exponential backoff policy with a configurable base delay.
///
/// A job with `max_retries = N` executes at most `N + 1` times: the first
/// attempt plus `N` retries. The delay after the `n`-th failed attempt is
/// `base_delay * 2^(n-1)`, i.e. the first retry waits one base delay, the
/// second two, the third four, and so on.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(base_delay: Duration) -> Self {
        Self { base_delay }
    }

    /// Decide what happens after a failed attempt.
    ///
    /// `attempt` is the 1-based number of the attempt that just failed
    /// (the job's `attempts` value at execution time). Retries are granted
    /// while `attempt <= max_retries`, which is exactly "completed attempts
    /// so far < max_retries".
    pub fn decide(&self, attempt: i32, max_retries: i32, now: Timestamp) -> RetryDecision {
        let attempt = attempt.max(1);
        if attempt <= max_retries {
            RetryDecision::Retry {
                next_run_at: now + self.backoff_delay((attempt - 1) as u32),
            }
        } else {
            RetryDecision::Exhausted
        }
    }

    /// Delay before the next attempt, given how many attempts have already
    /// completed. Saturating so absurd inputs degrade to a huge delay
    /// instead of wrapping.
    pub fn backoff_delay(&self, completed_attempts: u32) -> chrono::Duration {
        let factor = 1u64 << completed_attempts.min(MAX_BACKOFF_EXPONENT);
        let delay_ms = (self.base_delay.as_millis() as u64).saturating_mul(factor);
        chrono::Duration::milliseconds(delay_ms.min(i64::MAX as u64) as i64)
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_RETRY_BASE_DELAY_MS))
    }
}
