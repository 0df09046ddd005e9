mod comments;
mod monitors;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use replyguard_core::NaturalId;
use replyguard_engine::{MonitorRegistry, WorkflowError};
use serde::Serialize;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{
    enforce_rate_limit, request_id, require_bearer_auth, AuthState, RateLimitState, RequestId,
};

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<MonitorRegistry>,
    /// `None` when running on in-memory stores.
    pub pool: Option<PgPool>,
    pub default_interval_secs: u64,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
    monitors: usize,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub(super) fn new(data: T, req_id: RequestId) -> Json<Self> {
        Json(Self {
            data,
            meta: ResponseMeta::new(req_id.0),
        })
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn normalize_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(50).clamp(1, 200)
}

pub(super) fn parse_natural_id(req_id: &str, raw: &str) -> Result<NaturalId, ApiError> {
    NaturalId::parse(raw).map_err(|e| ApiError::new(req_id, "validation_error", e.to_string()))
}

pub(super) fn map_workflow_error(request_id: &str, error: &WorkflowError) -> ApiError {
    match error {
        WorkflowError::NotFound(id) => ApiError::new(
            request_id,
            "not_found",
            format!("no pending approval for {id}"),
        ),
        WorkflowError::RecordNotFound(id) => {
            ApiError::new(request_id, "not_found", format!("no record for {id}"))
        }
        WorkflowError::NotRetryable { reason, .. } => {
            ApiError::new(request_id, "conflict", reason.clone())
        }
        WorkflowError::Transition(e) => ApiError::new(request_id, "conflict", e.to_string()),
        WorkflowError::Store(e) => {
            tracing::error!(error = %e, "store operation failed");
            ApiError::new(request_id, "internal_error", "store operation failed")
        }
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

fn protected_router(auth: AuthState, rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/monitors",
            get(monitors::list_monitors).post(monitors::start_monitor),
        )
        .route(
            "/api/v1/monitors/{term}",
            get(monitors::get_monitor).delete(monitors::stop_monitor),
        )
        .route("/api/v1/comments", get(comments::list_comments))
        .route("/api/v1/comments/pending", get(comments::list_pending))
        .route("/api/v1/comments/{natural_id}", get(comments::get_comment))
        .route(
            "/api/v1/comments/{natural_id}/approve",
            post(comments::approve_comment),
        )
        .route(
            "/api/v1/comments/{natural_id}/reject",
            post(comments::reject_comment),
        )
        .route(
            "/api/v1/comments/{natural_id}/retry-post",
            post(comments::retry_post),
        )
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    rate_limit,
                    enforce_rate_limit,
                ))
                .layer(axum::middleware::from_fn_with_state(
                    auth,
                    require_bearer_auth,
                )),
        )
}

pub fn build_app(state: AppState, auth: AuthState, rate_limit: RateLimitState) -> Router {
    let public_routes = Router::new().route("/api/v1/health", get(health));

    Router::new()
        .merge(public_routes)
        .merge(protected_router(auth, rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let monitors = state.registry.list().await.len();

    let Some(pool) = state.pool.as_ref() else {
        return (
            StatusCode::OK,
            ApiResponse::new(
                HealthData {
                    status: "ok",
                    database: "in_memory",
                    monitors,
                },
                req_id,
            ),
        );
    };

    match replyguard_db::health_check(pool).await {
        Ok(()) => (
            StatusCode::OK,
            ApiResponse::new(
                HealthData {
                    status: "ok",
                    database: "ok",
                    monitors,
                },
                req_id,
            ),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                ApiResponse::new(
                    HealthData {
                        status: "degraded",
                        database: "unavailable",
                        monitors,
                    },
                    req_id,
                ),
            )
        }
    }
}

pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::new(120, Duration::from_secs(60))
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
