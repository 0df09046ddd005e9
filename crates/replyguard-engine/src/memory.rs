//! In-process [`RecordStore`] and [`WorkflowStateStore`] implementations.
//! Not durable; used in tests and for dry runs without Postgres.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use replyguard_core::{
    CommentRecord, CommentStatus, NaturalId, NewComment, PostStatus, RecordFilter, RecordStore,
    StoreError, WorkflowState, WorkflowStateStore,
};
use tokio::sync::Mutex;

#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    rows: Mutex<HashMap<NaturalId, CommentRecord>>,
}

impl InMemoryRecordStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.rows.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.lock().await.is_empty()
    }
}

fn matches(record: &CommentRecord, filter: &RecordFilter) -> bool {
    match filter {
        RecordFilter::Status(status) => record.status == *status,
        RecordFilter::Sentiment(sentiment) => record.sentiment == *sentiment,
        RecordFilter::Term(term) => record.tracked_term.eq_ignore_ascii_case(term),
        RecordFilter::FailedPosts => {
            record.status == CommentStatus::Approved && record.post_status == PostStatus::Failed
        }
        RecordFilter::Recent => true,
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn exists(&self, natural_id: &NaturalId) -> Result<bool, StoreError> {
        Ok(self.rows.lock().await.contains_key(natural_id))
    }

    async fn upsert(&self, comment: &NewComment) -> Result<CommentRecord, StoreError> {
        let mut rows = self.rows.lock().await;
        let record = rows
            .entry(comment.item.natural_id.clone())
            .and_modify(|existing| existing.merge_upsert(comment))
            .or_insert_with(|| CommentRecord::from_new(comment, Utc::now()));
        Ok(record.clone())
    }

    async fn get(&self, natural_id: &NaturalId) -> Result<Option<CommentRecord>, StoreError> {
        Ok(self.rows.lock().await.get(natural_id).cloned())
    }

    async fn update_status(
        &self,
        natural_id: &NaturalId,
        status: CommentStatus,
    ) -> Result<bool, StoreError> {
        let mut rows = self.rows.lock().await;
        match rows.get_mut(natural_id) {
            Some(record) if record.status.can_transition_to(status) => {
                record.status = status;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn update_approval(
        &self,
        natural_id: &NaturalId,
        approved: bool,
        final_response: Option<&str>,
    ) -> Result<bool, StoreError> {
        let target = if approved {
            CommentStatus::Approved
        } else {
            CommentStatus::Rejected
        };
        let mut rows = self.rows.lock().await;
        match rows.get_mut(natural_id) {
            Some(record) if record.status.can_transition_to(target) => {
                record.status = target;
                record.final_response = if approved {
                    final_response.map(str::to_string)
                } else {
                    None
                };
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_email_sent(
        &self,
        natural_id: &NaturalId,
        recipient: &str,
    ) -> Result<bool, StoreError> {
        let mut rows = self.rows.lock().await;
        let Some(record) = rows.get_mut(natural_id) else {
            return Ok(false);
        };
        record.email_sent = true;
        record.email_recipient = Some(recipient.to_string());
        Ok(true)
    }

    async fn update_post_status(
        &self,
        natural_id: &NaturalId,
        status: PostStatus,
        error: Option<&str>,
    ) -> Result<bool, StoreError> {
        let mut rows = self.rows.lock().await;
        let Some(record) = rows.get_mut(natural_id) else {
            return Ok(false);
        };
        record.post_status = status;
        record.post_error = error.map(str::to_string);
        Ok(true)
    }

    async fn list(
        &self,
        filter: &RecordFilter,
        limit: i64,
    ) -> Result<Vec<CommentRecord>, StoreError> {
        let limit = usize::try_from(limit.max(0)).unwrap_or(usize::MAX);
        let rows = self.rows.lock().await;
        let mut selected: Vec<CommentRecord> = rows
            .values()
            .filter(|record| matches(record, filter))
            .cloned()
            .collect();

        if *filter == RecordFilter::FailedPosts {
            selected.sort_by(|a, b| a.inserted_at.cmp(&b.inserted_at));
        } else {
            selected.sort_by(|a, b| b.inserted_at.cmp(&a.inserted_at));
        }
        selected.truncate(limit);
        Ok(selected)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryWorkflowStateStore {
    states: Mutex<HashMap<NaturalId, WorkflowState>>,
}

impl InMemoryWorkflowStateStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkflowStateStore for InMemoryWorkflowStateStore {
    async fn get(&self, natural_id: &NaturalId) -> Result<Option<WorkflowState>, StoreError> {
        Ok(self.states.lock().await.get(natural_id).cloned())
    }

    async fn put(&self, state: &WorkflowState) -> Result<(), StoreError> {
        self.states
            .lock()
            .await
            .insert(state.natural_id.clone(), state.clone());
        Ok(())
    }

    async fn delete(&self, natural_id: &NaturalId) -> Result<bool, StoreError> {
        Ok(self.states.lock().await.remove(natural_id).is_some())
    }

    async fn take(&self, natural_id: &NaturalId) -> Result<Option<WorkflowState>, StoreError> {
        Ok(self.states.lock().await.remove(natural_id))
    }

    async fn list_pending(&self) -> Result<Vec<WorkflowState>, StoreError> {
        let mut pending: Vec<WorkflowState> =
            self.states.lock().await.values().cloned().collect();
        pending.sort_by(|a, b| a.analyzed_at.cmp(&b.analyzed_at));
        Ok(pending)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use replyguard_core::{AnalysisResult, Item, Sentiment};

    use super::*;

    fn comment(id: &str, status: CommentStatus) -> NewComment {
        NewComment {
            item: Item {
                natural_id: NaturalId::parse(id).unwrap(),
                source: "smallbusiness".to_string(),
                author: "jane".to_string(),
                body: "Acme".to_string(),
                created_at: Utc::now(),
                permalink: format!("https://www.reddit.com/r/smallbusiness/comments/x/y/{id}/"),
            },
            tracked_term: "acme".to_string(),
            analysis: AnalysisResult::new(Sentiment::Negative, 0.8, "x"),
            draft_response: Some("draft".to_string()),
            status,
        }
    }

    #[tokio::test]
    async fn upsert_is_idempotent_across_id_formats() {
        let store = InMemoryRecordStore::new();
        let first = store.upsert(&comment("abc123", CommentStatus::New)).await.unwrap();
        let second = store
            .upsert(&comment("t1_abc123", CommentStatus::PendingApproval))
            .await
            .unwrap();
        assert_eq!(store.len().await, 1);
        assert_eq!(first.id, second.id);
        assert_eq!(second.status, CommentStatus::PendingApproval);
    }

    #[tokio::test]
    async fn rejection_is_terminal() {
        let store = InMemoryRecordStore::new();
        let id = NaturalId::parse("abc123").unwrap();
        store
            .upsert(&comment("abc123", CommentStatus::PendingApproval))
            .await
            .unwrap();
        assert!(store.update_approval(&id, false, Some("x")).await.unwrap());
        assert!(!store.update_approval(&id, true, Some("x")).await.unwrap());
        assert!(!store.update_status(&id, CommentStatus::New).await.unwrap());

        store.upsert(&comment("abc123", CommentStatus::New)).await.unwrap();
        let record = store.get(&id).await.unwrap().unwrap();
        assert_eq!(record.status, CommentStatus::Rejected);
        assert!(record.final_response.is_none());
    }

    #[tokio::test]
    async fn take_is_single_use() {
        let store = InMemoryWorkflowStateStore::new();
        let c = comment("abc123", CommentStatus::PendingApproval);
        let state = WorkflowState::new(c.item, "acme", None);
        store.put(&state).await.unwrap();

        assert_eq!(store.take(&state.natural_id).await.unwrap(), Some(state.clone()));
        assert!(store.take(&state.natural_id).await.unwrap().is_none());
        assert!(!store.delete(&state.natural_id).await.unwrap());
    }

    #[tokio::test]
    async fn failed_posts_filter_selects_approved_failures() {
        let store = InMemoryRecordStore::new();
        let id = NaturalId::parse("abc123").unwrap();
        store
            .upsert(&comment("abc123", CommentStatus::PendingApproval))
            .await
            .unwrap();
        store.upsert(&comment("other1", CommentStatus::New)).await.unwrap();
        store.update_approval(&id, true, Some("reply")).await.unwrap();
        store
            .update_post_status(&id, PostStatus::Failed, Some("HTTP 503"))
            .await
            .unwrap();

        let failed = store.list(&RecordFilter::FailedPosts, 10).await.unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].natural_id, id);
        assert_eq!(failed[0].post_error.as_deref(), Some("HTTP 503"));
        assert_eq!(store.list(&RecordFilter::Recent, 1).await.unwrap().len(), 1);
    }
}
