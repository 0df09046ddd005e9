//! Record queries and the human approval actions.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use replyguard_core::{
    CommentRecord, CommentStatus, RecordFilter, RecordStore, Sentiment, WorkflowState,
};
use replyguard_engine::{ApprovalDecision, PostOutcome, ResolveOutcome, WorkflowError};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_workflow_error, normalize_limit, parse_natural_id, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct CommentsQuery {
    pub status: Option<String>,
    pub sentiment: Option<String>,
    pub term: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct ApproveRequest {
    pub edited_response: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct ResolveResponse {
    pub natural_id: String,
    pub approved: bool,
    pub final_response: Option<String>,
    pub posted: Option<bool>,
    pub post_error: Option<String>,
}

impl From<ResolveOutcome> for ResolveResponse {
    fn from(outcome: ResolveOutcome) -> Self {
        Self {
            natural_id: outcome.natural_id.to_string(),
            approved: outcome.approved,
            final_response: outcome.final_response,
            posted: outcome.posted,
            post_error: outcome.post_error,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct RetryPostResponse {
    pub natural_id: String,
    pub posted: bool,
    pub error: Option<String>,
}

impl From<PostOutcome> for RetryPostResponse {
    fn from(outcome: PostOutcome) -> Self {
        Self {
            natural_id: outcome.natural_id.to_string(),
            posted: outcome.posted,
            error: outcome.error,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct PendingItem {
    pub natural_id: String,
    pub tracked_term: String,
    pub source: String,
    pub author: String,
    pub body: String,
    pub permalink: String,
    pub sentiment: Option<Sentiment>,
    pub confidence: Option<f64>,
    pub draft_response: Option<String>,
    pub notify_target: Option<String>,
    pub analyzed_at: Option<DateTime<Utc>>,
}

impl From<WorkflowState> for PendingItem {
    fn from(state: WorkflowState) -> Self {
        Self {
            natural_id: state.natural_id.to_string(),
            tracked_term: state.tracked_term,
            source: state.item.source,
            author: state.item.author,
            body: state.item.body,
            permalink: state.item.permalink,
            sentiment: state.analysis.as_ref().map(|a| a.sentiment),
            confidence: state.analysis.as_ref().map(|a| a.confidence),
            draft_response: state.draft_response,
            notify_target: state.notify_target,
            analyzed_at: state.analyzed_at,
        }
    }
}

/// At most one of `status`, `sentiment`, `term` narrows the listing.
fn filter_from_query(req_id: &str, query: &CommentsQuery) -> Result<RecordFilter, ApiError> {
    let given = [&query.status, &query.sentiment, &query.term]
        .iter()
        .filter(|v| v.is_some())
        .count();
    if given > 1 {
        return Err(ApiError::new(
            req_id,
            "validation_error",
            "use at most one of status, sentiment, term",
        ));
    }

    if let Some(raw) = query.status.as_deref() {
        let status = raw
            .parse::<CommentStatus>()
            .map_err(|e| ApiError::new(req_id, "validation_error", e.to_string()))?;
        return Ok(RecordFilter::Status(status));
    }
    if let Some(raw) = query.sentiment.as_deref() {
        let sentiment = raw
            .parse::<Sentiment>()
            .map_err(|e| ApiError::new(req_id, "validation_error", e.to_string()))?;
        return Ok(RecordFilter::Sentiment(sentiment));
    }
    if let Some(term) = query.term.as_deref() {
        return Ok(RecordFilter::Term(term.trim().to_string()));
    }
    Ok(RecordFilter::Recent)
}

pub(super) async fn list_comments(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<CommentsQuery>,
) -> Result<Json<ApiResponse<Vec<CommentRecord>>>, ApiError> {
    let filter = filter_from_query(&req_id.0, &query)?;
    let rows = state
        .registry
        .workflow()
        .records()
        .list(&filter, normalize_limit(query.limit))
        .await
        .map_err(|e| map_workflow_error(&req_id.0, &WorkflowError::from(e)))?;
    Ok(ApiResponse::new(rows, req_id))
}

pub(super) async fn get_comment(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(raw_id): Path<String>,
) -> Result<Json<ApiResponse<CommentRecord>>, ApiError> {
    let natural_id = parse_natural_id(&req_id.0, &raw_id)?;
    let record = state
        .registry
        .workflow()
        .records()
        .get(&natural_id)
        .await
        .map_err(|e| map_workflow_error(&req_id.0, &WorkflowError::from(e)))?
        .ok_or_else(|| {
            ApiError::new(&req_id.0, "not_found", format!("no record for {natural_id}"))
        })?;
    Ok(ApiResponse::new(record, req_id))
}

/// GET /api/v1/comments/pending: drafts waiting for a decision.
pub(super) async fn list_pending(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<PendingItem>>>, ApiError> {
    let pending = state
        .registry
        .workflow()
        .pending()
        .await
        .map_err(|e| map_workflow_error(&req_id.0, &e))?;
    let data = pending.into_iter().map(PendingItem::from).collect();
    Ok(ApiResponse::new(data, req_id))
}

/// POST /api/v1/comments/{natural_id}/approve: approve, optionally with an
/// edited reply, and post it.
pub(super) async fn approve_comment(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(raw_id): Path<String>,
    body: Option<Json<ApproveRequest>>,
) -> Result<Json<ApiResponse<ResolveResponse>>, ApiError> {
    let natural_id = parse_natural_id(&req_id.0, &raw_id)?;
    let edited = body.and_then(|Json(b)| b.edited_response);
    let outcome = state
        .registry
        .workflow()
        .resolve(&natural_id, ApprovalDecision::approve(edited))
        .await
        .map_err(|e| map_workflow_error(&req_id.0, &e))?;
    Ok(ApiResponse::new(ResolveResponse::from(outcome), req_id))
}

pub(super) async fn reject_comment(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(raw_id): Path<String>,
) -> Result<Json<ApiResponse<ResolveResponse>>, ApiError> {
    let natural_id = parse_natural_id(&req_id.0, &raw_id)?;
    let outcome = state
        .registry
        .workflow()
        .resolve(&natural_id, ApprovalDecision::reject())
        .await
        .map_err(|e| map_workflow_error(&req_id.0, &e))?;
    Ok(ApiResponse::new(ResolveResponse::from(outcome), req_id))
}

/// POST /api/v1/comments/{natural_id}/retry-post: re-post an approved reply
/// whose earlier post failed.
pub(super) async fn retry_post(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(raw_id): Path<String>,
) -> Result<Json<ApiResponse<RetryPostResponse>>, ApiError> {
    let natural_id = parse_natural_id(&req_id.0, &raw_id)?;
    let outcome = state
        .registry
        .workflow()
        .retry_post(&natural_id)
        .await
        .map_err(|e| map_workflow_error(&req_id.0, &e))?;
    Ok(ApiResponse::new(RetryPostResponse::from(outcome), req_id))
}
