use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AnalysisResult, AspectResult, CoreError, Item, NaturalId, Sentiment};

/// Review status of a processed item.
///
/// Transitions are monotone: `new`/`pending_approval` may move forward,
/// `approved` and `rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentStatus {
    New,
    PendingApproval,
    Approved,
    Rejected,
}

impl CommentStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CommentStatus::New => "new",
            CommentStatus::PendingApproval => "pending_approval",
            CommentStatus::Approved => "approved",
            CommentStatus::Rejected => "rejected",
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, CommentStatus::Approved | CommentStatus::Rejected)
    }

    fn rank(self) -> u8 {
        match self {
            CommentStatus::New => 0,
            CommentStatus::PendingApproval => 1,
            CommentStatus::Approved | CommentStatus::Rejected => 2,
        }
    }

    /// Whether moving from `self` to `next` respects monotonicity.
    /// Re-asserting the current status is allowed.
    #[must_use]
    pub fn can_transition_to(self, next: CommentStatus) -> bool {
        self == next || (!self.is_terminal() && next.rank() > self.rank())
    }
}

impl std::fmt::Display for CommentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CommentStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(CommentStatus::New),
            "pending_approval" => Ok(CommentStatus::PendingApproval),
            "approved" => Ok(CommentStatus::Approved),
            "rejected" => Ok(CommentStatus::Rejected),
            other => Err(CoreError::InvalidStatus(other.to_string())),
        }
    }
}

/// Outcome of posting the approved reply. Tracked apart from
/// [`CommentStatus`] so a failed post never reverts an approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    NotAttempted,
    Posted,
    Failed,
}

impl PostStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PostStatus::NotAttempted => "not_attempted",
            PostStatus::Posted => "posted",
            PostStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for PostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PostStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_attempted" => Ok(PostStatus::NotAttempted),
            "posted" => Ok(PostStatus::Posted),
            "failed" => Ok(PostStatus::Failed),
            other => Err(CoreError::InvalidPostStatus(other.to_string())),
        }
    }
}

/// Input for [`crate::RecordStore::upsert`].
#[derive(Debug, Clone)]
pub struct NewComment {
    pub item: Item,
    pub tracked_term: String,
    pub analysis: AnalysisResult,
    pub draft_response: Option<String>,
    pub status: CommentStatus,
}

/// Permanent row describing an item's full processing outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentRecord {
    pub id: Uuid,
    pub natural_id: NaturalId,
    pub source: String,
    pub author: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub permalink: String,
    pub tracked_term: String,
    pub sentiment: Sentiment,
    pub confidence: f64,
    pub explanation: String,
    #[serde(default)]
    pub aspects: Vec<AspectResult>,
    pub draft_response: Option<String>,
    pub final_response: Option<String>,
    pub status: CommentStatus,
    pub email_sent: bool,
    pub email_recipient: Option<String>,
    pub post_status: PostStatus,
    pub post_error: Option<String>,
    pub inserted_at: DateTime<Utc>,
}

impl CommentRecord {
    /// Build a fresh record from an upsert request.
    #[must_use]
    pub fn from_new(comment: &NewComment, inserted_at: DateTime<Utc>) -> Self {
        let item = &comment.item;
        Self {
            id: Uuid::new_v4(),
            natural_id: item.natural_id.clone(),
            source: item.source.clone(),
            author: item.author.clone(),
            body: item.body.clone(),
            created_at: item.created_at,
            permalink: item.permalink.clone(),
            tracked_term: comment.tracked_term.clone(),
            sentiment: comment.analysis.sentiment,
            confidence: comment.analysis.confidence,
            explanation: comment.analysis.explanation.clone(),
            aspects: comment.analysis.aspects.clone(),
            draft_response: comment.draft_response.clone(),
            final_response: None,
            status: comment.status,
            email_sent: false,
            email_recipient: None,
            post_status: PostStatus::NotAttempted,
            post_error: None,
            inserted_at,
        }
    }

    /// Overwrite the mutable fields from a repeated upsert, never regressing
    /// a terminal status.
    pub fn merge_upsert(&mut self, comment: &NewComment) {
        self.tracked_term.clone_from(&comment.tracked_term);
        self.sentiment = comment.analysis.sentiment;
        self.confidence = comment.analysis.confidence;
        self.explanation.clone_from(&comment.analysis.explanation);
        self.aspects.clone_from(&comment.analysis.aspects);
        self.draft_response.clone_from(&comment.draft_response);
        if self.status.can_transition_to(comment.status) {
            self.status = comment.status;
        }
    }
}

/// Bounded listing filters over stored records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordFilter {
    Status(CommentStatus),
    Sentiment(Sentiment),
    Term(String),
    /// Approved records whose reply could not be posted.
    FailedPosts,
    Recent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_transitions_are_allowed() {
        assert!(CommentStatus::New.can_transition_to(CommentStatus::PendingApproval));
        assert!(CommentStatus::PendingApproval.can_transition_to(CommentStatus::Approved));
        assert!(CommentStatus::PendingApproval.can_transition_to(CommentStatus::Rejected));
    }

    #[test]
    fn terminal_statuses_do_not_move() {
        assert!(!CommentStatus::Rejected.can_transition_to(CommentStatus::Approved));
        assert!(!CommentStatus::Approved.can_transition_to(CommentStatus::PendingApproval));
        assert!(CommentStatus::Approved.can_transition_to(CommentStatus::Approved));
    }

    #[test]
    fn backward_transitions_are_refused() {
        assert!(!CommentStatus::PendingApproval.can_transition_to(CommentStatus::New));
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            CommentStatus::New,
            CommentStatus::PendingApproval,
            CommentStatus::Approved,
            CommentStatus::Rejected,
        ] {
            assert_eq!(status.as_str().parse::<CommentStatus>().unwrap(), status);
        }
        assert!("done".parse::<CommentStatus>().is_err());
    }

    #[test]
    fn merge_upsert_keeps_terminal_status() {
        let item = Item {
            natural_id: NaturalId::parse("abc").unwrap(),
            source: "s".to_string(),
            author: "a".to_string(),
            body: "b".to_string(),
            created_at: Utc::now(),
            permalink: "p".to_string(),
        };
        let new = NewComment {
            item,
            tracked_term: "acme".to_string(),
            analysis: AnalysisResult::new(Sentiment::Negative, 0.8, "bad"),
            draft_response: Some("sorry".to_string()),
            status: CommentStatus::PendingApproval,
        };
        let mut record = CommentRecord::from_new(&new, Utc::now());
        record.status = CommentStatus::Rejected;
        record.merge_upsert(&new);
        assert_eq!(record.status, CommentStatus::Rejected);
        assert_eq!(record.draft_response.as_deref(), Some("sorry"));
    }
}
