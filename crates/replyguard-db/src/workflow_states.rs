//! Database operations for the `workflow_states` table.
//!
//! Snapshots are stored as JSONB next to a `schema_version` column so a newer
//! binary can refuse (rather than misread) rows written by a future one.

use chrono::{DateTime, Utc};
use replyguard_core::{NaturalId, WorkflowState, WORKFLOW_SCHEMA_VERSION};
use serde_json::Value;
use sqlx::PgPool;

use crate::DbError;

/// A row from the `workflow_states` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WorkflowStateRow {
    pub natural_id: String,
    pub schema_version: i32,
    pub stage: String,
    pub state: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<WorkflowStateRow> for WorkflowState {
    type Error = DbError;

    fn try_from(row: WorkflowStateRow) -> Result<Self, Self::Error> {
        let version = u32::try_from(row.schema_version)
            .map_err(|_| DbError::Decode(format!("negative schema version for {}", row.natural_id)))?;
        if version > WORKFLOW_SCHEMA_VERSION {
            return Err(DbError::Decode(format!(
                "workflow state {} has schema version {version}, newest supported is {WORKFLOW_SCHEMA_VERSION}",
                row.natural_id
            )));
        }
        Ok(serde_json::from_value(row.state)?)
    }
}

/// Insert or replace the snapshot for `state.natural_id`.
///
/// # Errors
///
/// Returns [`DbError::Json`] if the state cannot be serialized, or
/// [`DbError::Sqlx`] if the write fails.
pub async fn put_workflow_state(pool: &PgPool, state: &WorkflowState) -> Result<(), DbError> {
    let payload = serde_json::to_value(state)?;
    let version = i32::try_from(state.schema_version)
        .map_err(|_| DbError::Decode(format!("schema version {} out of range", state.schema_version)))?;

    sqlx::query(
        "INSERT INTO workflow_states (natural_id, schema_version, stage, state) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (natural_id) DO UPDATE SET \
             schema_version = EXCLUDED.schema_version, \
             stage          = EXCLUDED.stage, \
             state          = EXCLUDED.state, \
             updated_at     = NOW()",
    )
    .bind(state.natural_id.as_str())
    .bind(version)
    .bind(state.stage.as_str())
    .bind(payload)
    .execute(pool)
    .await?;

    Ok(())
}

/// # Errors
///
/// Returns [`DbError`] if the query fails or the stored snapshot cannot be decoded.
pub async fn get_workflow_state(
    pool: &PgPool,
    natural_id: &NaturalId,
) -> Result<Option<WorkflowState>, DbError> {
    let row = sqlx::query_as::<_, WorkflowStateRow>(
        "SELECT natural_id, schema_version, stage, state, created_at, updated_at \
         FROM workflow_states WHERE natural_id = $1",
    )
    .bind(natural_id.as_str())
    .fetch_optional(pool)
    .await?;

    row.map(WorkflowState::try_from).transpose()
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn delete_workflow_state(pool: &PgPool, natural_id: &NaturalId) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM workflow_states WHERE natural_id = $1")
        .bind(natural_id.as_str())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete the snapshot and return what was stored, in one statement.
///
/// Postgres row locking guarantees only one of several concurrent callers
/// gets `Some`.
///
/// # Errors
///
/// Returns [`DbError`] if the delete fails or the snapshot cannot be decoded.
pub async fn take_workflow_state(
    pool: &PgPool,
    natural_id: &NaturalId,
) -> Result<Option<WorkflowState>, DbError> {
    let row = sqlx::query_as::<_, WorkflowStateRow>(
        "DELETE FROM workflow_states WHERE natural_id = $1 \
         RETURNING natural_id, schema_version, stage, state, created_at, updated_at",
    )
    .bind(natural_id.as_str())
    .fetch_optional(pool)
    .await?;

    row.map(WorkflowState::try_from).transpose()
}

/// All pending snapshots, oldest first.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails or any snapshot cannot be decoded.
pub async fn list_workflow_states(pool: &PgPool) -> Result<Vec<WorkflowState>, DbError> {
    let rows = sqlx::query_as::<_, WorkflowStateRow>(
        "SELECT natural_id, schema_version, stage, state, created_at, updated_at \
         FROM workflow_states ORDER BY created_at ASC, natural_id ASC",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(WorkflowState::try_from).collect()
}
