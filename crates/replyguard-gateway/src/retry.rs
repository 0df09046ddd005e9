//! Retry with deterministic exponential back-off.
//!
//! Rate-limit-like failures and other transient failures follow the same
//! schedule; the distinction only changes the log line. `Permanent` and
//! `Validation` failures are returned on the first occurrence.

use std::future::Future;
use std::time::Duration;

use replyguard_core::ExternalError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(3),
            backoff_factor: 2.0,
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_retries: u32, base_delay: Duration, backoff_factor: f64) -> Self {
        Self {
            max_retries,
            base_delay,
            backoff_factor,
        }
    }

    /// No retries at all.
    #[must_use]
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO, 1.0)
    }

    /// Delay before retry number `attempt` (1-based):
    /// `base_delay × backoff_factor^(attempt−1)`, capped at one hour.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        const MAX_DELAY: Duration = Duration::from_secs(3_600);
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let secs = self.base_delay.as_secs_f64() * self.backoff_factor.powi(exponent);
        if !secs.is_finite() || secs >= MAX_DELAY.as_secs_f64() {
            return MAX_DELAY;
        }
        Duration::from_secs_f64(secs.max(0.0))
    }
}

/// Run `operation`, retrying retryable failures up to `policy.max_retries`
/// times. With `max_retries = 3` an always-failing call runs 4 times and the
/// final error is returned.
///
/// # Errors
///
/// Returns the last [`ExternalError`] once retries are exhausted, or the first
/// non-retryable one.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    operation_name: &str,
    mut operation: F,
) -> Result<T, ExternalError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ExternalError>>,
{
    let mut attempt = 0u32;
    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !err.kind.is_retryable() {
            tracing::warn!(
                operation = operation_name,
                kind = %err.kind,
                error = %err,
                "non-retryable error; giving up"
            );
            return Err(err);
        }

        if attempt >= policy.max_retries {
            tracing::error!(
                operation = operation_name,
                attempts = attempt + 1,
                error = %err,
                "retries exhausted"
            );
            return Err(err);
        }

        attempt += 1;
        let delay = policy.delay_for(attempt);
        let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        if err.is_rate_limit() {
            tracing::warn!(
                operation = operation_name,
                attempt,
                max_retries = policy.max_retries,
                delay_ms,
                error = %err,
                "rate limited; retrying after back-off"
            );
        } else {
            tracing::warn!(
                operation = operation_name,
                attempt,
                max_retries = policy.max_retries,
                delay_ms,
                error = %err,
                "call failed; retrying after back-off"
            );
        }
        tokio::time::sleep(delay).await;
    }
}
