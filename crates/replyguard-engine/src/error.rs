use replyguard_core::{NaturalId, StoreError};
use thiserror::Error;

use crate::transition::TransitionError;

#[derive(Debug, Error)]
pub enum WorkflowError {
    /// No snapshot is waiting for a decision: unknown id or already resolved.
    #[error("no pending approval for {0}")]
    NotFound(NaturalId),

    #[error("no record for {0}")]
    RecordNotFound(NaturalId),

    #[error("cannot retry post for {natural_id}: {reason}")]
    NotRetryable {
        natural_id: NaturalId,
        reason: String,
    },

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("invalid monitor: {0}")]
    InvalidSpec(String),
}
