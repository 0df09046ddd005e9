use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Per-key record of the last granted call slot.
///
/// Callers reserve a slot under the lock and sleep outside it, so concurrent
/// callers on one key are spaced by `min_interval` without serializing on the
/// mutex for the whole wait.
#[derive(Debug, Default)]
pub struct ThrottleRegistry {
    last_calls: Mutex<HashMap<String, Instant>>,
}

impl ThrottleRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until `min_interval` has elapsed since the last call recorded for
    /// `key`, then record this call. Returns how long the caller waited.
    pub async fn throttle(&self, key: &str, min_interval: Duration) -> Duration {
        let now = Instant::now();
        let slot = {
            let mut last_calls = self.last_calls.lock().await;
            let slot = match last_calls.get(key) {
                Some(last) => (*last + min_interval).max(now),
                None => now,
            };
            last_calls.insert(key.to_string(), slot);
            slot
        };

        let wait = slot.saturating_duration_since(now);
        if !wait.is_zero() {
            tracing::debug!(
                key,
                wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                "throttling call"
            );
            tokio::time::sleep_until(slot).await;
        }
        wait
    }

    /// Time of the last recorded call for `key`, if any.
    pub async fn last_call(&self, key: &str) -> Option<Instant> {
        self.last_calls.lock().await.get(key).copied()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn first_call_does_not_wait() {
        let registry = ThrottleRegistry::new();
        let waited = registry.throttle("reddit", Duration::from_secs(2)).await;
        assert!(waited.is_zero());
        assert!(registry.last_call("reddit").await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn consecutive_calls_are_spaced() {
        let registry = ThrottleRegistry::new();
        let start = Instant::now();
        registry.throttle("reddit", Duration::from_secs(2)).await;
        registry.throttle("reddit", Duration::from_secs(2)).await;
        registry.throttle("reddit", Duration::from_secs(2)).await;
        assert!(start.elapsed() >= Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn no_wait_once_interval_has_passed() {
        let registry = ThrottleRegistry::new();
        registry.throttle("reddit", Duration::from_secs(2)).await;
        tokio::time::sleep(Duration::from_secs(3)).await;
        let waited = registry.throttle("reddit", Duration::from_secs(2)).await;
        assert!(waited.is_zero());
    }

    #[tokio::test(start_paused = true)]
    async fn keys_are_independent() {
        let registry = ThrottleRegistry::new();
        let start = Instant::now();
        registry.throttle("reddit", Duration::from_secs(5)).await;
        registry.throttle("llm", Duration::from_secs(5)).await;
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_are_spaced() {
        let registry = Arc::new(ThrottleRegistry::new());
        let mut handles = Vec::new();
        for _ in 0..3 {
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(async move {
                registry.throttle("reddit", Duration::from_secs(1)).await;
                Instant::now()
            }));
        }

        let mut times = Vec::new();
        for handle in handles {
            times.push(handle.await.unwrap());
        }
        times.sort();
        for pair in times.windows(2) {
            assert!(pair[1].duration_since(pair[0]) >= Duration::from_secs(1));
        }
    }
}
