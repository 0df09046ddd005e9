//! Monitor control: start, stop, status.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use replyguard_engine::{MonitorSpec, MonitorStatus};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct StartMonitorRequest {
    pub term: String,
    pub notify_target: Option<String>,
    pub sources: Vec<String>,
    pub interval_secs: Option<u64>,
}

#[derive(Debug, Serialize)]
pub(super) struct MonitorItem {
    pub term: String,
    pub notify_target: Option<String>,
    pub sources: Vec<String>,
    pub interval_secs: u64,
    pub generation: u64,
    pub running: bool,
    pub started_at: DateTime<Utc>,
    pub cycles: u64,
    pub last_cycle_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub items_seen: u64,
    pub items_processed: u64,
    pub items_failed: u64,
}

impl From<MonitorStatus> for MonitorItem {
    fn from(status: MonitorStatus) -> Self {
        Self {
            term: status.term,
            notify_target: status.notify_target,
            sources: status.sources,
            interval_secs: status.interval_secs,
            generation: status.generation,
            running: status.running,
            started_at: status.started_at,
            cycles: status.cycles,
            last_cycle_at: status.last_cycle_at,
            last_error: status.last_error,
            items_seen: status.items_seen,
            items_processed: status.items_processed,
            items_failed: status.items_failed,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct StartMonitorResponse {
    pub term: String,
    pub generation: u64,
}

#[derive(Debug, Serialize)]
pub(super) struct StopMonitorResponse {
    pub term: String,
    pub stopped: bool,
}

fn monitor_not_found(req_id: &str, term: &str) -> ApiError {
    ApiError::new(req_id, "not_found", format!("no monitor for '{term}'"))
}

/// POST /api/v1/monitors: start (or restart) monitoring a term.
pub(super) async fn start_monitor(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<StartMonitorRequest>,
) -> Result<(StatusCode, Json<ApiResponse<StartMonitorResponse>>), ApiError> {
    let spec = MonitorSpec::new(
        &body.term,
        body.notify_target,
        &body.sources,
        body.interval_secs.unwrap_or(state.default_interval_secs),
    )
    .map_err(|e| ApiError::new(&req_id.0, "validation_error", e.to_string()))?;

    let term = spec.term.clone();
    let generation = state.registry.start(spec).await;
    tracing::info!(term = %term, generation, "monitor started via api");

    Ok((
        StatusCode::CREATED,
        ApiResponse::new(StartMonitorResponse { term, generation }, req_id),
    ))
}

pub(super) async fn list_monitors(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<Vec<MonitorItem>>> {
    let data = state
        .registry
        .list()
        .await
        .into_iter()
        .map(MonitorItem::from)
        .collect();
    ApiResponse::new(data, req_id)
}

pub(super) async fn get_monitor(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(term): Path<String>,
) -> Result<Json<ApiResponse<MonitorItem>>, ApiError> {
    let status = state
        .registry
        .status(&term)
        .await
        .ok_or_else(|| monitor_not_found(&req_id.0, &term))?;
    Ok(ApiResponse::new(MonitorItem::from(status), req_id))
}

/// DELETE /api/v1/monitors/{term}: stop a running monitor.
pub(super) async fn stop_monitor(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(term): Path<String>,
) -> Result<Json<ApiResponse<StopMonitorResponse>>, ApiError> {
    if !state.registry.stop(&term).await {
        return Err(monitor_not_found(&req_id.0, &term));
    }
    tracing::info!(term = %term, "monitor stopped via api");
    Ok(ApiResponse::new(
        StopMonitorResponse {
            term,
            stopped: true,
        },
        req_id,
    ))
}
