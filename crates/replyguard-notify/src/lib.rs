//! Operator alerts for negative mentions awaiting approval.

mod error;
mod log;
mod payload;
mod webhook;

use std::sync::Arc;
use std::time::Duration;

use replyguard_core::{AppConfig, Notifier};

pub use error::NotifyError;
pub use log::LogNotifier;
pub use payload::NegativeMentionAlert;
pub use webhook::WebhookNotifier;

/// Webhook notifier when `REPLYGUARD_NOTIFY_WEBHOOK_URL` is set, log notifier otherwise.
///
/// # Errors
///
/// Returns [`NotifyError`] if the configured webhook URL is unusable.
pub fn notifier_from_config(config: &AppConfig) -> Result<Arc<dyn Notifier>, NotifyError> {
    match config.notify_webhook_url.as_deref() {
        Some(url) => {
            tracing::debug!("webhook notifications enabled");
            let timeout = Duration::from_secs(config.request_timeout_secs);
            Ok(Arc::new(WebhookNotifier::new(url, timeout)?))
        }
        None => {
            tracing::debug!("webhook notifications disabled (REPLYGUARD_NOTIFY_WEBHOOK_URL not set)");
            Ok(Arc::new(LogNotifier))
        }
    }
}
