use std::time::Duration;

use replyguard_core::AppConfig;
use replyguard_gateway::{CallPolicy, RetryPolicy, LLM_KEY, NOTIFY_KEY, POSTER_KEY, SOURCE_KEY};

/// Gateway policies for every class of external call the engine makes.
#[derive(Debug, Clone, PartialEq)]
pub struct CallPolicies {
    pub source: CallPolicy,
    pub llm: CallPolicy,
    pub notify: CallPolicy,
    pub post: CallPolicy,
}

impl CallPolicies {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        let retry = RetryPolicy::new(
            config.max_retries,
            Duration::from_millis(config.retry_base_delay_ms),
            config.retry_backoff_factor,
        );
        let timeout = Duration::from_secs(config.request_timeout_secs);
        let source_interval = Duration::from_millis(config.source_min_interval_ms);

        Self {
            source: CallPolicy::new(SOURCE_KEY, source_interval, retry)
                .with_attempt_timeout(timeout),
            llm: CallPolicy::new(
                LLM_KEY,
                Duration::from_millis(config.llm_min_interval_ms),
                retry,
            )
            .with_attempt_timeout(timeout),
            notify: CallPolicy::new(NOTIFY_KEY, Duration::ZERO, retry)
                .with_attempt_timeout(timeout),
            post: CallPolicy::new(POSTER_KEY, source_interval, retry)
                .with_attempt_timeout(timeout),
        }
    }

    /// No throttling, no retries, no timeouts.
    #[must_use]
    pub fn immediate() -> Self {
        let policy = |key: &str| CallPolicy::new(key, Duration::ZERO, RetryPolicy::none());
        Self {
            source: policy(SOURCE_KEY),
            llm: policy(LLM_KEY),
            notify: policy(NOTIFY_KEY),
            post: policy(POSTER_KEY),
        }
    }
}

/// Tuning for the monitor loops.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorSettings {
    pub fetch_limit: usize,
    /// Initial watermark is this far in the past.
    pub lookback: Duration,
    /// Pause after a cycle in which every source failed.
    pub error_backoff: Duration,
    /// Bound on joining a stopped loop.
    pub stop_timeout: Duration,
    /// Granularity of the cancellable interval sleep.
    pub sleep_step: Duration,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            fetch_limit: 50,
            lookback: Duration::from_secs(86_400),
            error_backoff: Duration::from_secs(5),
            stop_timeout: Duration::from_secs(5),
            sleep_step: Duration::from_secs(1),
        }
    }
}

impl MonitorSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            fetch_limit: config.fetch_limit,
            lookback: Duration::from_secs(config.lookback_secs),
            ..Self::default()
        }
    }
}
