//! JSON body posted to the alert webhook.

use chrono::{DateTime, Utc};
use replyguard_core::{AnalysisResult, AspectResult, Item};
use serde::Serialize;

#[allow(clippy::trivially_copy_pass_by_ref)]
fn no_aspects(aspects: &&[AspectResult]) -> bool {
    aspects.is_empty()
}

#[derive(Debug, Serialize)]
pub struct NegativeMentionAlert<'a> {
    pub event: &'static str,
    pub recipient: &'a str,
    pub natural_id: &'a str,
    pub source: &'a str,
    pub author: &'a str,
    pub body: &'a str,
    pub permalink: &'a str,
    pub created_at: DateTime<Utc>,
    pub sentiment: &'static str,
    pub confidence: f64,
    pub explanation: &'a str,
    #[serde(skip_serializing_if = "no_aspects")]
    pub aspects: &'a [AspectResult],
    pub draft_response: &'a str,
    /// Short human-readable line for chat integrations that only render text.
    pub summary: String,
}

impl<'a> NegativeMentionAlert<'a> {
    #[must_use]
    pub fn new(
        recipient: &'a str,
        item: &'a Item,
        analysis: &'a AnalysisResult,
        draft: &'a str,
    ) -> Self {
        let summary = format!(
            "Negative mention in r/{} by u/{} ({:.0}% confidence): {}",
            item.source,
            item.author,
            analysis.confidence * 100.0,
            item.permalink
        );
        Self {
            event: "negative_mention",
            recipient,
            natural_id: item.natural_id.as_str(),
            source: &item.source,
            author: &item.author,
            body: &item.body,
            permalink: &item.permalink,
            created_at: item.created_at,
            sentiment: analysis.sentiment.as_str(),
            confidence: analysis.confidence,
            explanation: &analysis.explanation,
            aspects: &analysis.aspects,
            draft_response: draft,
            summary,
        }
    }
}
