//! Postgres-backed implementations of the core store contracts.

use async_trait::async_trait;
use replyguard_core::{
    CommentRecord, CommentStatus, NaturalId, NewComment, PostStatus, RecordFilter, RecordStore,
    StoreError, WorkflowState, WorkflowStateStore,
};
use sqlx::PgPool;

use crate::{comments, workflow_states, DbError};

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound => StoreError::NotFound,
            DbError::Decode(msg) => StoreError::Corrupt(msg),
            DbError::Json(e) => StoreError::Corrupt(e.to_string()),
            other => StoreError::Backend(Box::new(other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn exists(&self, natural_id: &NaturalId) -> Result<bool, StoreError> {
        Ok(comments::comment_exists(&self.pool, natural_id).await?)
    }

    async fn upsert(&self, comment: &NewComment) -> Result<CommentRecord, StoreError> {
        Ok(comments::upsert_comment(&self.pool, comment).await?)
    }

    async fn get(&self, natural_id: &NaturalId) -> Result<Option<CommentRecord>, StoreError> {
        Ok(comments::get_comment(&self.pool, natural_id).await?)
    }

    async fn update_status(
        &self,
        natural_id: &NaturalId,
        status: CommentStatus,
    ) -> Result<bool, StoreError> {
        Ok(comments::update_status(&self.pool, natural_id, status).await?)
    }

    async fn update_approval(
        &self,
        natural_id: &NaturalId,
        approved: bool,
        final_response: Option<&str>,
    ) -> Result<bool, StoreError> {
        Ok(comments::update_approval(&self.pool, natural_id, approved, final_response).await?)
    }

    async fn mark_email_sent(
        &self,
        natural_id: &NaturalId,
        recipient: &str,
    ) -> Result<bool, StoreError> {
        Ok(comments::mark_email_sent(&self.pool, natural_id, recipient).await?)
    }

    async fn update_post_status(
        &self,
        natural_id: &NaturalId,
        status: PostStatus,
        error: Option<&str>,
    ) -> Result<bool, StoreError> {
        Ok(comments::update_post_status(&self.pool, natural_id, status, error).await?)
    }

    async fn list(
        &self,
        filter: &RecordFilter,
        limit: i64,
    ) -> Result<Vec<CommentRecord>, StoreError> {
        Ok(comments::list_comments(&self.pool, filter, limit).await?)
    }
}

#[derive(Debug, Clone)]
pub struct PgWorkflowStateStore {
    pool: PgPool,
}

impl PgWorkflowStateStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WorkflowStateStore for PgWorkflowStateStore {
    async fn get(&self, natural_id: &NaturalId) -> Result<Option<WorkflowState>, StoreError> {
        Ok(workflow_states::get_workflow_state(&self.pool, natural_id).await?)
    }

    async fn put(&self, state: &WorkflowState) -> Result<(), StoreError> {
        Ok(workflow_states::put_workflow_state(&self.pool, state).await?)
    }

    async fn delete(&self, natural_id: &NaturalId) -> Result<bool, StoreError> {
        Ok(workflow_states::delete_workflow_state(&self.pool, natural_id).await?)
    }

    async fn take(&self, natural_id: &NaturalId) -> Result<Option<WorkflowState>, StoreError> {
        let taken = workflow_states::take_workflow_state(&self.pool, natural_id).await?;
        if taken.is_none() {
            tracing::debug!(natural_id = %natural_id, "no workflow snapshot to take");
        }
        Ok(taken)
    }

    async fn list_pending(&self) -> Result<Vec<WorkflowState>, StoreError> {
        Ok(workflow_states::list_workflow_states(&self.pool).await?)
    }
}
