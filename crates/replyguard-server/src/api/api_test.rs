use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::Request;
use chrono::{DateTime, Utc};
use replyguard_analysis::{LexiconClassifier, TemplateDrafter};
use replyguard_core::{
    ExternalError, Item, NaturalId, Poster, RecordStore, SourceReader, TimeWindow,
};
use replyguard_engine::{
    CallPolicies, InMemoryRecordStore, InMemoryWorkflowStateStore, MonitorSettings, Workflow,
    WorkflowDeps,
};
use replyguard_gateway::Gateway;
use replyguard_notify::LogNotifier;
use tower::ServiceExt;

use super::*;

struct QuietSource;

#[async_trait]
impl SourceReader for QuietSource {
    async fn fetch_recent(
        &self,
        _source: &str,
        _since: DateTime<Utc>,
        _limit: usize,
    ) -> Result<Vec<Item>, ExternalError> {
        Ok(Vec::new())
    }

    async fn search(
        &self,
        _query: &str,
        _source: &str,
        _window: TimeWindow,
        _limit: usize,
    ) -> Result<Vec<Item>, ExternalError> {
        Ok(Vec::new())
    }
}

#[derive(Default)]
struct SwitchPoster {
    fail: AtomicBool,
}

#[async_trait]
impl Poster for SwitchPoster {
    async fn post_reply(&self, _natural_id: &NaturalId, _text: &str) -> Result<(), ExternalError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ExternalError::transient("reddit", "HTTP 503: unavailable"));
        }
        Ok(())
    }
}

struct Fixture {
    registry: Arc<MonitorRegistry>,
    records: Arc<InMemoryRecordStore>,
    poster: Arc<SwitchPoster>,
}

impl Fixture {
    fn new() -> Self {
        let records = Arc::new(InMemoryRecordStore::new());
        let poster = Arc::new(SwitchPoster::default());
        let deps = WorkflowDeps {
            gateway: Arc::new(Gateway::new()),
            classifier: Arc::new(LexiconClassifier),
            drafter: Arc::new(TemplateDrafter),
            notifier: Arc::new(LogNotifier),
            poster: poster.clone(),
            records: records.clone(),
            states: Arc::new(InMemoryWorkflowStateStore::new()),
        };
        let workflow = Arc::new(Workflow::new(deps, CallPolicies::immediate()));
        let registry = Arc::new(MonitorRegistry::new(
            workflow,
            Arc::new(QuietSource),
            MonitorSettings::default(),
        ));
        Self {
            registry,
            records,
            poster,
        }
    }

    fn app(&self) -> Router {
        self.app_with(AuthState::disabled(), default_rate_limit_state())
    }

    fn app_with(&self, auth: AuthState, rate_limit: RateLimitState) -> Router {
        let state = AppState {
            registry: Arc::clone(&self.registry),
            pool: None,
            default_interval_secs: 300,
        };
        build_app(state, auth, rate_limit)
    }

    async fn seed_negative(&self, id: &str) {
        let item = Item {
            natural_id: NaturalId::parse(id).expect("id"),
            source: "smallbusiness".to_string(),
            author: "jane".to_string(),
            body: "Acme support is terrible".to_string(),
            created_at: Utc::now(),
            permalink: format!("https://www.reddit.com/r/smallbusiness/comments/x/y/{id}/"),
        };
        self.registry
            .workflow()
            .process(item, "acme", None)
            .await
            .expect("process");
    }
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.oneshot(request).await.expect("response");
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let json = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).expect("json parse")
    };
    (status, json)
}

fn get_req(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

fn post_json(uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn post_empty(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

#[test]
fn normalize_limit_applies_defaults_and_bounds() {
    assert_eq!(normalize_limit(None), 50);
    assert_eq!(normalize_limit(Some(0)), 1);
    assert_eq!(normalize_limit(Some(1_000)), 200);
    assert_eq!(normalize_limit(Some(25)), 25);
}

#[test]
fn api_error_conflict_maps_to_409() {
    let response = ApiError::new("req-1", "conflict", "already posted").into_response();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn health_is_public_and_reports_in_memory_store() {
    let fixture = Fixture::new();
    let auth = AuthState::new(&["secret".to_string()], false).expect("auth");
    let (status, json) = send(
        fixture.app_with(auth, default_rate_limit_state()),
        get_req("/api/v1/health"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["database"], "in_memory");
    assert!(json["meta"]["request_id"].is_string());
}

#[tokio::test]
async fn protected_routes_require_a_valid_bearer_token() {
    let fixture = Fixture::new();
    let auth = AuthState::new(&["secret".to_string()], false).expect("auth");
    let app = fixture.app_with(auth, default_rate_limit_state());

    let (status, json) = send(app.clone(), get_req("/api/v1/monitors")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"]["code"], "unauthorized");

    let authorized = Request::builder()
        .uri("/api/v1/monitors")
        .header("authorization", "Bearer secret")
        .body(Body::empty())
        .expect("request");
    let (status, _) = send(app, authorized).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn rate_limit_rejects_requests_over_the_window() {
    let fixture = Fixture::new();
    let app = fixture.app_with(
        AuthState::disabled(),
        RateLimitState::new(1, Duration::from_secs(60)),
    );

    let (first, _) = send(app.clone(), get_req("/api/v1/monitors")).await;
    let (second, json) = send(app, get_req("/api/v1/monitors")).await;
    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(json["error"]["code"], "rate_limited");
}

#[tokio::test]
async fn request_id_header_is_echoed() {
    let fixture = Fixture::new();
    let request = Request::builder()
        .uri("/api/v1/health")
        .header("x-request-id", "req-42")
        .body(Body::empty())
        .expect("request");
    let response = fixture.app().oneshot(request).await.expect("response");
    assert_eq!(
        response.headers().get("x-request-id").and_then(|v| v.to_str().ok()),
        Some("req-42")
    );
}

#[tokio::test]
async fn monitors_can_be_started_inspected_and_stopped() {
    let fixture = Fixture::new();
    let app = fixture.app();

    let body = serde_json::json!({
        "term": "acme",
        "notify_target": "support@example.com",
        "sources": ["r/smallbusiness", "startups"],
        "interval_secs": 60
    });
    let (status, json) = send(app.clone(), post_json("/api/v1/monitors", &body)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["data"]["generation"], 1);

    let (status, json) = send(app.clone(), get_req("/api/v1/monitors/ACME")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["sources"], serde_json::json!(["smallbusiness", "startups"]));
    assert_eq!(json["data"]["interval_secs"], 60);

    let (status, json) = send(app.clone(), get_req("/api/v1/monitors")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"].as_array().map(Vec::len), Some(1));

    let delete = Request::builder()
        .method("DELETE")
        .uri("/api/v1/monitors/acme")
        .body(Body::empty())
        .expect("request");
    let (status, json) = send(app.clone(), delete).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["stopped"], true);

    let (status, _) = send(app, get_req("/api/v1/monitors/acme")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_monitor_requests_are_rejected() {
    let fixture = Fixture::new();
    let body = serde_json::json!({ "term": "acme", "sources": ["smallbusiness"], "interval_secs": 2 });
    let (status, json) = send(fixture.app(), post_json("/api/v1/monitors", &body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "validation_error");
}

#[tokio::test]
async fn pending_comment_can_be_approved_once_with_an_edit() {
    let fixture = Fixture::new();
    fixture.seed_negative("abc123").await;
    let app = fixture.app();

    let (status, json) = send(app.clone(), get_req("/api/v1/comments/pending")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"][0]["natural_id"], "abc123");

    let (status, json) = send(
        app.clone(),
        get_req("/api/v1/comments?status=pending_approval"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"].as_array().map(Vec::len), Some(1));

    let edit = serde_json::json!({ "edited_response": "Sorry! DM us and we'll sort it." });
    let (status, json) = send(
        app.clone(),
        post_json("/api/v1/comments/t1_abc123/approve", &edit),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["approved"], true);
    assert_eq!(json["data"]["posted"], true);
    assert_eq!(
        json["data"]["final_response"],
        "Sorry! DM us and we'll sort it."
    );

    let (status, _) = send(app.clone(), post_empty("/api/v1/comments/abc123/approve")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, json) = send(app, get_req("/api/v1/comments/abc123")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "approved");
    assert_eq!(json["data"]["post_status"], "posted");
}

#[tokio::test]
async fn rejecting_keeps_the_reply_unposted() {
    let fixture = Fixture::new();
    fixture.seed_negative("abc123").await;

    let (status, json) = send(fixture.app(), post_empty("/api/v1/comments/abc123/reject")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["approved"], false);
    assert!(json["data"]["posted"].is_null());

    let record = fixture
        .records
        .get(&NaturalId::parse("abc123").expect("id"))
        .await
        .expect("get")
        .expect("record");
    assert_eq!(record.status, replyguard_core::CommentStatus::Rejected);
}

#[tokio::test]
async fn failed_post_can_be_retried_through_the_api() {
    let fixture = Fixture::new();
    fixture.seed_negative("abc123").await;
    fixture.poster.fail.store(true, Ordering::SeqCst);
    let app = fixture.app();

    let (status, json) = send(app.clone(), post_empty("/api/v1/comments/abc123/approve")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["posted"], false);

    fixture.poster.fail.store(false, Ordering::SeqCst);
    let (status, json) = send(app.clone(), post_empty("/api/v1/comments/abc123/retry-post")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["posted"], true);

    let (status, json) = send(app, post_empty("/api/v1/comments/abc123/retry-post")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"]["code"], "conflict");
}

#[tokio::test]
async fn comment_queries_validate_their_filters() {
    let fixture = Fixture::new();
    let app = fixture.app();

    let (status, _) = send(app.clone(), get_req("/api/v1/comments?status=archived")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        app.clone(),
        get_req("/api/v1/comments?status=new&sentiment=negative"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = send(app.clone(), get_req("/api/v1/comments/not-an-id!")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "validation_error");

    let (status, _) = send(app, get_req("/api/v1/comments/zzz999")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn comments_can_be_listed_by_term_and_sentiment() {
    let fixture = Fixture::new();
    fixture.seed_negative("abc123").await;
    let app = fixture.app();

    let (status, json) = send(app.clone(), get_req("/api/v1/comments?term=acme&limit=5")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"].as_array().map(Vec::len), Some(1));

    let (status, json) = send(app, get_req("/api/v1/comments?sentiment=positive")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"].as_array().map(Vec::len), Some(0));
}
