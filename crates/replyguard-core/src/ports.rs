//! Contracts the engine consumes. Implementations live in the adapter crates
//! (`replyguard-reddit`, `replyguard-analysis`, `replyguard-notify`,
//! `replyguard-db`) and in the engine's in-memory stores.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    AnalysisResult, AspectResult, CommentRecord, CommentStatus, ExternalError, Item, NaturalId,
    NewComment, PostStatus, RecordFilter, Sentiment, StoreError, WorkflowState,
};

/// Search window accepted by [`SourceReader::search`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeWindow {
    Hour,
    Day,
    Week,
    Month,
    Year,
    All,
}

impl TimeWindow {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TimeWindow::Hour => "hour",
            TimeWindow::Day => "day",
            TimeWindow::Week => "week",
            TimeWindow::Month => "month",
            TimeWindow::Year => "year",
            TimeWindow::All => "all",
        }
    }
}

#[async_trait]
pub trait SourceReader: Send + Sync {
    /// Items in `source` created strictly after `since`, newest first, at most `limit`.
    async fn fetch_recent(
        &self,
        source: &str,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Item>, ExternalError>;

    async fn search(
        &self,
        query: &str,
        source: &str,
        window: TimeWindow,
        limit: usize,
    ) -> Result<Vec<Item>, ExternalError>;
}

#[async_trait]
pub trait Classifier: Send + Sync {
    async fn analyze(&self, text: &str) -> Result<AnalysisResult, ExternalError>;

    async fn analyze_aspect(&self, text: &str, aspect: &str)
        -> Result<AspectResult, ExternalError>;
}

#[async_trait]
pub trait ResponseDrafter: Send + Sync {
    async fn draft(&self, item: &Item) -> Result<String, ExternalError>;
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(
        &self,
        recipient: &str,
        item: &Item,
        analysis: &AnalysisResult,
        draft: &str,
    ) -> Result<(), ExternalError>;
}

#[async_trait]
pub trait Poster: Send + Sync {
    async fn post_reply(&self, natural_id: &NaturalId, text: &str) -> Result<(), ExternalError>;
}

/// Durable, idempotent store of processed items.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn exists(&self, natural_id: &NaturalId) -> Result<bool, StoreError>;

    /// Insert, or update the mutable fields of the existing row.
    async fn upsert(&self, comment: &NewComment) -> Result<CommentRecord, StoreError>;

    async fn get(&self, natural_id: &NaturalId) -> Result<Option<CommentRecord>, StoreError>;

    async fn update_status(
        &self,
        natural_id: &NaturalId,
        status: CommentStatus,
    ) -> Result<bool, StoreError>;

    async fn update_approval(
        &self,
        natural_id: &NaturalId,
        approved: bool,
        final_response: Option<&str>,
    ) -> Result<bool, StoreError>;

    async fn mark_email_sent(
        &self,
        natural_id: &NaturalId,
        recipient: &str,
    ) -> Result<bool, StoreError>;

    async fn update_post_status(
        &self,
        natural_id: &NaturalId,
        status: PostStatus,
        error: Option<&str>,
    ) -> Result<bool, StoreError>;

    async fn list(&self, filter: &RecordFilter, limit: i64)
        -> Result<Vec<CommentRecord>, StoreError>;

    async fn list_by_status(
        &self,
        status: CommentStatus,
        limit: i64,
    ) -> Result<Vec<CommentRecord>, StoreError> {
        self.list(&RecordFilter::Status(status), limit).await
    }

    async fn list_by_sentiment(
        &self,
        sentiment: Sentiment,
        limit: i64,
    ) -> Result<Vec<CommentRecord>, StoreError> {
        self.list(&RecordFilter::Sentiment(sentiment), limit).await
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<CommentRecord>, StoreError> {
        self.list(&RecordFilter::Recent, limit).await
    }
}

/// Keyed persistence for in-progress workflow snapshots.
#[async_trait]
pub trait WorkflowStateStore: Send + Sync {
    async fn get(&self, natural_id: &NaturalId) -> Result<Option<WorkflowState>, StoreError>;

    async fn put(&self, state: &WorkflowState) -> Result<(), StoreError>;

    /// Returns whether a snapshot was removed.
    async fn delete(&self, natural_id: &NaturalId) -> Result<bool, StoreError>;

    /// Load and delete in one atomic step. Of two concurrent callers, at most
    /// one receives the snapshot.
    async fn take(&self, natural_id: &NaturalId) -> Result<Option<WorkflowState>, StoreError>;

    async fn list_pending(&self) -> Result<Vec<WorkflowState>, StoreError>;
}
