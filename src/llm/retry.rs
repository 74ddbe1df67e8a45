//! Retry policy for rate-limited and overloaded completion calls.
//!
//! Only HTTP 429 and 529 are retried. A numeric `retry-after` header (seconds)
//! wins over the computed backoff; otherwise the delay starts at the base and
//! doubles per attempt.

use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};
use tracing::debug;

pub const MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_BASE_SECS: u64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; total attempts are `max_retries + 1`.
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: MAX_RETRIES, base_delay: Duration::from_secs(DEFAULT_RETRY_BASE_SECS) }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (0-based).
    #[must_use]
    pub fn delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        retry_after.unwrap_or_else(|| self.base_delay.saturating_mul(2u32.saturating_pow(attempt)))
    }

    /// Whether another attempt is allowed after `attempt` retries have been spent.
    #[must_use]
    pub fn allows(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }
}

/// Parse a `retry-after` header given in whole or fractional seconds.
///
/// HTTP-date values, negatives, and values too large for a `Duration` are
/// ignored and fall back to backoff.
#[must_use]
pub fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let raw = headers.get(RETRY_AFTER)?.to_str().ok()?;
    let secs = raw.trim().parse::<f64>().ok()?;
    match Duration::try_from_secs_f64(secs) {
        Ok(delay) => Some(delay),
        Err(e) => {
            debug!(raw, error = %e, "llm: unusable retry-after; using backoff");
            None
        }
    }
}

#[cfg(test)]
#[path = "retry_test.rs"]
mod tests;
