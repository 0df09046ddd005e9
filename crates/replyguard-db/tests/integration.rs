//! Offline unit tests for replyguard-db pool configuration and row types.
//! These tests do not require a live database connection.

use chrono::Utc;
use replyguard_core::{
    AppConfig, CommentRecord, CommentStatus, Environment, NaturalId, PostStatus, Sentiment,
    WorkflowState,
};
use replyguard_db::{CommentRow, PoolConfig, WorkflowStateRow};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use uuid::Uuid;

fn app_config() -> AppConfig {
    AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
        log_level: "info".to_string(),
        monitors_path: PathBuf::from("./config/monitors.yaml"),
        api_keys: vec!["k".to_string()],
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        reddit_client_id: "id".to_string(),
        reddit_client_secret: "secret".to_string(),
        reddit_user_agent: "ua".to_string(),
        reddit_refresh_token: None,
        openai_api_key: None,
        openai_model: "gpt-4o-mini".to_string(),
        openai_base_url: "https://api.openai.com/v1".to_string(),
        notify_webhook_url: None,
        request_timeout_secs: 30,
        max_retries: 3,
        retry_base_delay_ms: 3000,
        retry_backoff_factor: 2.0,
        source_min_interval_ms: 2000,
        llm_min_interval_ms: 500,
        fetch_limit: 50,
        lookback_secs: 86_400,
        default_interval_secs: 300,
    }
}

fn comment_row() -> CommentRow {
    CommentRow {
        id: Uuid::new_v4(),
        natural_id: "abc123".to_string(),
        source: "smallbusiness".to_string(),
        author: "someone".to_string(),
        body: "Your product broke".to_string(),
        created_at: Utc::now(),
        permalink: "https://www.reddit.com/r/smallbusiness/comments/x/y/abc123/".to_string(),
        tracked_term: "acme".to_string(),
        sentiment: "negative".to_string(),
        confidence: 0.9,
        explanation: "complaint".to_string(),
        aspects: serde_json::json!([
            {"aspect": "reliability", "sentiment": "negative", "confidence": 0.8, "explanation": "broke"}
        ]),
        draft_response: Some("Sorry to hear that".to_string()),
        final_response: None,
        status: "pending_approval".to_string(),
        email_sent: false,
        email_recipient: None,
        post_status: "not_attempted".to_string(),
        post_error: None,
        inserted_at: Utc::now(),
    }
}

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let pool_config = PoolConfig::from_app_config(&app_config());
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

#[test]
fn comment_row_converts_into_record() {
    let record = CommentRecord::try_from(comment_row()).expect("valid row");
    assert_eq!(record.natural_id.as_str(), "abc123");
    assert_eq!(record.sentiment, Sentiment::Negative);
    assert_eq!(record.status, CommentStatus::PendingApproval);
    assert_eq!(record.post_status, PostStatus::NotAttempted);
    assert_eq!(record.aspects.len(), 1);
    assert_eq!(record.aspects[0].aspect, "reliability");
}

#[test]
fn comment_row_with_unknown_status_is_rejected() {
    let mut row = comment_row();
    row.status = "archived".to_string();
    assert!(CommentRecord::try_from(row).is_err());
}

#[test]
fn workflow_row_from_newer_schema_is_rejected() {
    let item = replyguard_core::Item {
        natural_id: NaturalId::parse("abc123").unwrap(),
        source: "smallbusiness".to_string(),
        author: "a".to_string(),
        body: "b".to_string(),
        created_at: Utc::now(),
        permalink: "p".to_string(),
    };
    let state = WorkflowState::new(item, "acme", None);
    let row = WorkflowStateRow {
        natural_id: "abc123".to_string(),
        schema_version: 99,
        stage: "awaiting_approval".to_string(),
        state: serde_json::to_value(&state).unwrap(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };
    assert!(WorkflowState::try_from(row.clone()).is_err());

    let current = WorkflowStateRow {
        schema_version: 1,
        ..row
    };
    let decoded = WorkflowState::try_from(current).expect("current schema decodes");
    assert_eq!(decoded, state);
}
