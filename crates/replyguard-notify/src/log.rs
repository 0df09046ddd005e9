use async_trait::async_trait;
use replyguard_core::{AnalysisResult, ExternalError, Item, Notifier};

use crate::error::NotifyError;

/// Writes alerts to the log. Used when no webhook is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
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
        tracing::info!(
            recipient,
            natural_id = %item.natural_id,
            subreddit = %item.source,
            author = %item.author,
            confidence = analysis.confidence,
            permalink = %item.permalink,
            draft_chars = draft.len(),
            "negative mention awaiting approval"
        );
        Ok(())
    }
}
