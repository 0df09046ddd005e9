//! Scripted collaborators shared by the engine integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration as TimeDelta, Utc};
use replyguard_core::{
    AnalysisResult, AspectResult, Classifier, CommentRecord, CommentStatus, ExternalError, Item,
    NaturalId, NewComment, Notifier, PostStatus, Poster, RecordFilter, RecordStore,
    ResponseDrafter, Sentiment, SourceReader, StoreError, TimeWindow,
};
use replyguard_engine::{
    CallPolicies, InMemoryRecordStore, InMemoryWorkflowStateStore, Workflow, WorkflowDeps,
};
use replyguard_gateway::Gateway;

pub const DRAFT: &str = "Sorry to hear that. Please DM us your order number and we'll fix it.";

pub fn item(id: &str, body: &str) -> Item {
    item_at(id, body, Utc::now())
}

pub fn item_at(id: &str, body: &str, created_at: DateTime<Utc>) -> Item {
    let natural_id = NaturalId::parse(id).unwrap();
    Item {
        permalink: format!(
            "https://www.reddit.com/r/smallbusiness/comments/x/y/{}/",
            natural_id.as_str()
        ),
        natural_id,
        source: "smallbusiness".to_string(),
        author: "jane".to_string(),
        body: body.to_string(),
        created_at,
    }
}

/// "terrible" reads negative (0.9), "love" positive (0.8), anything else neutral.
#[derive(Default)]
pub struct StubClassifier {
    pub fail: AtomicBool,
    pub calls: AtomicU32,
    pub aspect_calls: Mutex<Vec<String>>,
}

#[async_trait]
impl Classifier for StubClassifier {
    async fn analyze(&self, text: &str) -> Result<AnalysisResult, ExternalError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(ExternalError::permanent("llm", "invalid api key"));
        }
        let lower = text.to_lowercase();
        Ok(if lower.contains("terrible") {
            AnalysisResult::new(Sentiment::Negative, 0.9, "complaint")
        } else if lower.contains("love") {
            AnalysisResult::new(Sentiment::Positive, 0.8, "praise")
        } else {
            AnalysisResult::new(Sentiment::Neutral, 0.5, "plain")
        })
    }

    async fn analyze_aspect(
        &self,
        _text: &str,
        aspect: &str,
    ) -> Result<AspectResult, ExternalError> {
        self.aspect_calls.lock().unwrap().push(aspect.to_string());
        Ok(AspectResult::new(aspect, Sentiment::Negative, 0.7, "stub"))
    }
}

#[derive(Default)]
pub struct StubDrafter {
    pub fail: AtomicBool,
}

#[async_trait]
impl ResponseDrafter for StubDrafter {
    async fn draft(&self, _item: &Item) -> Result<String, ExternalError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ExternalError::permanent("llm", "model not found"));
        }
        Ok(DRAFT.to_string())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub fail: AtomicBool,
    pub sent: Mutex<Vec<(String, NaturalId, String)>>,
}

impl RecordingNotifier {
    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(
        &self,
        recipient: &str,
        item: &Item,
        _analysis: &AnalysisResult,
        draft: &str,
    ) -> Result<(), ExternalError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ExternalError::permanent("notify", "HTTP 403: forbidden"));
        }
        self.sent.lock().unwrap().push((
            recipient.to_string(),
            item.natural_id.clone(),
            draft.to_string(),
        ));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingPoster {
    pub fail: AtomicBool,
    pub posts: Mutex<Vec<(NaturalId, String)>>,
}

impl RecordingPoster {
    pub fn count(&self) -> usize {
        self.posts.lock().unwrap().len()
    }
}

#[async_trait]
impl Poster for RecordingPoster {
    async fn post_reply(&self, natural_id: &NaturalId, text: &str) -> Result<(), ExternalError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ExternalError::permanent(
                "reddit",
                "posting requires REDDIT_REFRESH_TOKEN to be configured",
            ));
        }
        self.posts
            .lock()
            .unwrap()
            .push((natural_id.clone(), text.to_string()));
        Ok(())
    }
}

/// Serves fixed items per source. With `ignore_since` it returns every item
/// on every fetch, the way an unreliable listing would.
#[derive(Default)]
pub struct ScriptedSource {
    pub items: Mutex<HashMap<String, Vec<Item>>>,
    pub failing: Mutex<Vec<String>>,
    /// Sources whose fetch never completes.
    pub hanging: Mutex<Vec<String>>,
    pub ignore_since: AtomicBool,
    pub fetches: AtomicU32,
}

impl ScriptedSource {
    pub fn with_items(source: &str, items: Vec<Item>) -> Self {
        let scripted = Self::default();
        scripted.items.lock().unwrap().insert(source.to_string(), items);
        scripted
    }

    pub fn push(&self, source: &str, item: Item) {
        self.items
            .lock()
            .unwrap()
            .entry(source.to_string())
            .or_default()
            .push(item);
    }

    pub fn fail(&self, source: &str) {
        self.failing.lock().unwrap().push(source.to_string());
    }

    pub fn hang(&self, source: &str) {
        self.hanging.lock().unwrap().push(source.to_string());
    }
}

#[async_trait]
impl SourceReader for ScriptedSource {
    async fn fetch_recent(
        &self,
        source: &str,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Item>, ExternalError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.failing.lock().unwrap().iter().any(|s| s == source) {
            return Err(ExternalError::transient("reddit", "HTTP 503: unavailable"));
        }
        let hangs = self.hanging.lock().unwrap().iter().any(|s| s == source);
        if hangs {
            std::future::pending::<()>().await;
        }
        let ignore_since = self.ignore_since.load(Ordering::SeqCst);
        let mut items: Vec<Item> = self
            .items
            .lock()
            .unwrap()
            .get(source)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter(|item| ignore_since || item.created_at > since)
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        items.truncate(limit);
        Ok(items)
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

/// Passes every call through to the in-memory store, except upserts for ids
/// armed with [`FlakyRecords::fail_upserts`].
pub struct FlakyRecords {
    inner: Arc<InMemoryRecordStore>,
    upsert_failures: Mutex<HashMap<NaturalId, u32>>,
    pub upserts_failed: AtomicU32,
}

impl FlakyRecords {
    pub fn new(inner: Arc<InMemoryRecordStore>) -> Self {
        Self {
            inner,
            upsert_failures: Mutex::new(HashMap::new()),
            upserts_failed: AtomicU32::new(0),
        }
    }

    pub fn fail_upserts(&self, natural_id: &NaturalId, times: u32) {
        self.upsert_failures
            .lock()
            .unwrap()
            .insert(natural_id.clone(), times);
    }
}

#[async_trait]
impl RecordStore for FlakyRecords {
    async fn exists(&self, natural_id: &NaturalId) -> Result<bool, StoreError> {
        self.inner.exists(natural_id).await
    }

    async fn upsert(&self, comment: &NewComment) -> Result<CommentRecord, StoreError> {
        let should_fail = {
            let mut failures = self.upsert_failures.lock().unwrap();
            match failures.get_mut(&comment.item.natural_id) {
                Some(remaining) if *remaining > 0 => {
                    *remaining -= 1;
                    true
                }
                _ => false,
            }
        };
        if should_fail {
            self.upserts_failed.fetch_add(1, Ordering::SeqCst);
            return Err(StoreError::Backend("connection reset".into()));
        }
        self.inner.upsert(comment).await
    }

    async fn get(&self, natural_id: &NaturalId) -> Result<Option<CommentRecord>, StoreError> {
        self.inner.get(natural_id).await
    }

    async fn update_status(
        &self,
        natural_id: &NaturalId,
        status: CommentStatus,
    ) -> Result<bool, StoreError> {
        self.inner.update_status(natural_id, status).await
    }

    async fn update_approval(
        &self,
        natural_id: &NaturalId,
        approved: bool,
        final_response: Option<&str>,
    ) -> Result<bool, StoreError> {
        self.inner
            .update_approval(natural_id, approved, final_response)
            .await
    }

    async fn mark_email_sent(
        &self,
        natural_id: &NaturalId,
        recipient: &str,
    ) -> Result<bool, StoreError> {
        self.inner.mark_email_sent(natural_id, recipient).await
    }

    async fn update_post_status(
        &self,
        natural_id: &NaturalId,
        status: PostStatus,
        error: Option<&str>,
    ) -> Result<bool, StoreError> {
        self.inner
            .update_post_status(natural_id, status, error)
            .await
    }

    async fn list(
        &self,
        filter: &RecordFilter,
        limit: i64,
    ) -> Result<Vec<CommentRecord>, StoreError> {
        self.inner.list(filter, limit).await
    }
}

pub struct Harness {
    pub classifier: Arc<StubClassifier>,
    pub drafter: Arc<StubDrafter>,
    pub notifier: Arc<RecordingNotifier>,
    pub poster: Arc<RecordingPoster>,
    pub records: Arc<InMemoryRecordStore>,
    /// What the workflow writes through; wraps `records`.
    pub flaky: Arc<FlakyRecords>,
    pub states: Arc<InMemoryWorkflowStateStore>,
    pub workflow: Arc<Workflow>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_stores(
            Arc::new(InMemoryRecordStore::new()),
            Arc::new(InMemoryWorkflowStateStore::new()),
        )
    }

    /// A fresh workflow over existing stores, as after a process restart.
    pub fn with_stores(
        records: Arc<InMemoryRecordStore>,
        states: Arc<InMemoryWorkflowStateStore>,
    ) -> Self {
        let classifier = Arc::new(StubClassifier::default());
        let drafter = Arc::new(StubDrafter::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let poster = Arc::new(RecordingPoster::default());
        let flaky = Arc::new(FlakyRecords::new(Arc::clone(&records)));
        let deps = WorkflowDeps {
            gateway: Arc::new(Gateway::new()),
            classifier: classifier.clone(),
            drafter: drafter.clone(),
            notifier: notifier.clone(),
            poster: poster.clone(),
            records: flaky.clone(),
            states: states.clone(),
        };
        Self {
            classifier,
            drafter,
            notifier,
            poster,
            records,
            flaky,
            states,
            workflow: Arc::new(Workflow::new(deps, CallPolicies::immediate())),
        }
    }

    pub fn restart(&self) -> Self {
        Self::with_stores(Arc::clone(&self.records), Arc::clone(&self.states))
    }
}

pub fn minutes_ago(minutes: i64) -> DateTime<Utc> {
    Utc::now() - TimeDelta::minutes(minutes)
}

/// Whole-second timestamp, the resolution Reddit reports `created_utc` in.
pub fn whole_seconds_ago(minutes: i64) -> DateTime<Utc> {
    let at = minutes_ago(minutes);
    DateTime::from_timestamp(at.timestamp(), 0).unwrap_or(at)
}
