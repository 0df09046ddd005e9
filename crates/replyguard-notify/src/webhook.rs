use std::time::Duration;

use async_trait::async_trait;
use replyguard_core::{AnalysisResult, ExternalError, Item, Notifier};

use crate::error::NotifyError;
use crate::payload::NegativeMentionAlert;

/// Posts each alert as JSON to a webhook (Slack workflow, Zapier, an
/// internal mailer, ...).
pub struct WebhookNotifier {
    webhook_url: String,
    client: reqwest::Client,
}

impl WebhookNotifier {
    /// # Errors
    ///
    /// Returns [`NotifyError::InvalidUrl`] for a non-http(s) URL or
    /// [`NotifyError::Http`] if the HTTP client cannot be built.
    pub fn new(webhook_url: &str, timeout: Duration) -> Result<Self, NotifyError> {
        let url = webhook_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(NotifyError::InvalidUrl(url.to_string()));
        }
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            webhook_url: url.to_string(),
            client,
        })
    }

    async fn send(&self, alert: &NegativeMentionAlert<'_>) -> Result<(), NotifyError> {
        tracing::debug!(
            channel = "webhook",
            natural_id = alert.natural_id,
            "sending notification"
        );

        let response = self.client.post(&self.webhook_url).json(alert).send().await?;

        if response.status().is_success() {
            tracing::debug!(channel = "webhook", "notification sent");
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                channel = "webhook",
                status = %status,
                body = %body,
                "webhook request failed"
            );
            Err(NotifyError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(
        &self,
        recipient: &str,
        item: &Item,
        analysis: &AnalysisResult,
        draft: &str,
    ) -> Result<(), ExternalError> {
        if recipient.trim().is_empty() {
            return Err(NotifyError::EmptyRecipient.into());
        }
        let alert = NegativeMentionAlert::new(recipient, item, analysis, draft);
        Ok(self.send(&alert).await?)
    }
}
