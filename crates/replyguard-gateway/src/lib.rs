//! Rate-limited, retrying gateway for every call that leaves the process.
//!
//! A [`Gateway`] owns the per-key throttle registry and is shared by the
//! monitor loops and the approval path through an `Arc`. [`Gateway::call`]
//! composes the two policies throttle-outside-retry: each individual attempt,
//! retries included, first passes through the throttle.

pub mod retry;
pub mod throttle;

use std::future::Future;
use std::time::Duration;

use replyguard_core::ExternalError;

pub use retry::{with_retry, RetryPolicy};
pub use throttle::ThrottleRegistry;

/// Throttle key for reading the source platform.
pub const SOURCE_KEY: &str = "reddit_comments";
/// Throttle key for posting to the source platform.
pub const POSTER_KEY: &str = "reddit_post";
/// Throttle key for classifier and drafter calls.
pub const LLM_KEY: &str = "llm";
/// Throttle key for notifier calls.
pub const NOTIFY_KEY: &str = "notify";

/// How one class of external call is throttled, retried and bounded.
#[derive(Debug, Clone, PartialEq)]
pub struct CallPolicy {
    pub throttle_key: String,
    pub min_interval: Duration,
    pub retry: RetryPolicy,
    /// Upper bound on a single attempt. Attempts that exceed it fail as transient.
    pub attempt_timeout: Option<Duration>,
}

impl CallPolicy {
    #[must_use]
    pub fn new(throttle_key: impl Into<String>, min_interval: Duration, retry: RetryPolicy) -> Self {
        Self {
            throttle_key: throttle_key.into(),
            min_interval,
            retry,
            attempt_timeout: None,
        }
    }

    #[must_use]
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = Some(timeout);
        self
    }
}

#[derive(Debug, Default)]
pub struct Gateway {
    throttle: ThrottleRegistry,
}

impl Gateway {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// See [`ThrottleRegistry::throttle`].
    pub async fn throttle(&self, key: &str, min_interval: Duration) -> Duration {
        self.throttle.throttle(key, min_interval).await
    }

    /// Run `operation` under `policy`.
    ///
    /// # Errors
    ///
    /// Returns the final [`ExternalError`] after the retry policy is exhausted.
    pub async fn call<T, F, Fut>(
        &self,
        policy: &CallPolicy,
        operation_name: &str,
        mut operation: F,
    ) -> Result<T, ExternalError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ExternalError>>,
    {
        let registry = &self.throttle;
        let key = policy.throttle_key.as_str();
        let min_interval = policy.min_interval;
        let attempt_timeout = policy.attempt_timeout;

        with_retry(&policy.retry, operation_name, || {
            let attempt = operation();
            async move {
                registry.throttle(key, min_interval).await;
                match attempt_timeout {
                    Some(limit) => tokio::time::timeout(limit, attempt).await.map_err(|_| {
                        ExternalError::transient(
                            "gateway",
                            format!("{operation_name} timed out after {}ms", limit.as_millis()),
                        )
                    })?,
                    None => attempt.await,
                }
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use replyguard_core::ErrorKind;
    use tokio::time::Instant;

    use super::*;

    fn policy(min_interval: Duration, max_retries: u32) -> CallPolicy {
        CallPolicy::new(
            SOURCE_KEY,
            min_interval,
            RetryPolicy::new(max_retries, Duration::ZERO, 2.0),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn every_retry_attempt_passes_through_the_throttle() {
        let gateway = Gateway::new();
        let calls = Arc::new(AtomicU32::new(0));
        let start = Instant::now();

        let c = Arc::clone(&calls);
        let result = gateway
            .call(&policy(Duration::from_secs(2), 3), "fetch", || {
                let c = Arc::clone(&c);
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(ExternalError::transient("reddit", "boom"))
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        // Four throttled attempts: the first is free, the next three wait 2s each.
        assert!(start.elapsed() >= Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn throttle_is_shared_across_calls_with_the_same_key() {
        let gateway = Gateway::new();
        let start = Instant::now();
        for _ in 0..3 {
            gateway
                .call(&policy(Duration::from_secs(2), 0), "fetch", || async {
                    Ok::<_, ExternalError>(())
                })
                .await
                .unwrap();
        }
        assert!(start.elapsed() >= Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_attempts_time_out_as_transient() {
        let gateway = Gateway::new();
        let policy =
            policy(Duration::ZERO, 1).with_attempt_timeout(Duration::from_millis(100));
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = gateway
            .call(&policy, "classify", || {
                let c = Arc::clone(&c);
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_secs(10)).await;
                    Ok::<_, ExternalError>(())
                }
            })
            .await;
        let err = result.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Transient);
        assert!(err.message.contains("timed out"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
