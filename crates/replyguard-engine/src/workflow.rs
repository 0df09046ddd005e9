//! Driver that executes [`step`] effects against the collaborators.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::Utc;
use replyguard_core::{
    AnalysisResult, AspectResult, Classifier, CommentRecord, CommentStatus, Decision,
    ExternalError, Item, NaturalId, NewComment, Notifier, PostStatus, Poster, RecordFilter,
    RecordStore, ResponseDrafter, Sentiment, Stage, WorkflowState, WorkflowStateStore,
    FALLBACK_RESPONSE,
};
use replyguard_gateway::Gateway;

use crate::error::WorkflowError;
use crate::locks::IdLocks;
use crate::policy::CallPolicies;
use crate::transition::{step, Effect, Event};

/// Everything the workflow talks to.
#[derive(Clone)]
pub struct WorkflowDeps {
    pub gateway: Arc<Gateway>,
    pub classifier: Arc<dyn Classifier>,
    pub drafter: Arc<dyn ResponseDrafter>,
    pub notifier: Arc<dyn Notifier>,
    pub poster: Arc<dyn Poster>,
    pub records: Arc<dyn RecordStore>,
    pub states: Arc<dyn WorkflowStateStore>,
}

/// Human verdict on a pending draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalDecision {
    pub approved: bool,
    /// Replacement text; blank edits fall back to the draft.
    pub edited_response: Option<String>,
}

impl ApprovalDecision {
    #[must_use]
    pub fn approve(edited_response: Option<String>) -> Self {
        Self {
            approved: true,
            edited_response,
        }
    }

    #[must_use]
    pub fn reject() -> Self {
        Self {
            approved: false,
            edited_response: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub natural_id: NaturalId,
    pub sentiment: Sentiment,
    pub stage: Stage,
    pub record: Option<CommentRecord>,
    pub notified: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveOutcome {
    pub natural_id: NaturalId,
    pub approved: bool,
    pub final_response: Option<String>,
    /// `None` when nothing was posted (rejection).
    pub posted: Option<bool>,
    pub post_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostOutcome {
    pub natural_id: NaturalId,
    pub posted: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetrySummary {
    pub attempted: usize,
    pub posted: usize,
    pub failed: usize,
}

#[derive(Debug, Default)]
struct DriveReport {
    record: Option<CommentRecord>,
    notified: bool,
    approval_recorded: bool,
    posted: Option<bool>,
    post_error: Option<String>,
}

pub struct Workflow {
    deps: WorkflowDeps,
    policies: CallPolicies,
    locks: IdLocks,
}

impl Workflow {
    #[must_use]
    pub fn new(deps: WorkflowDeps, policies: CallPolicies) -> Self {
        Self {
            deps,
            policies,
            locks: IdLocks::default(),
        }
    }

    #[must_use]
    pub fn gateway(&self) -> &Arc<Gateway> {
        &self.deps.gateway
    }

    #[must_use]
    pub fn records(&self) -> &Arc<dyn RecordStore> {
        &self.deps.records
    }

    #[must_use]
    pub fn states(&self) -> &Arc<dyn WorkflowStateStore> {
        &self.deps.states
    }

    #[must_use]
    pub fn policies(&self) -> &CallPolicies {
        &self.policies
    }

    /// Run a freshly fetched item through analysis and, for negative items,
    /// drafting, snapshot persistence and notification.
    ///
    /// Classifier and drafter failures degrade to safe defaults and never
    /// surface here.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Store`] when persisting the record or snapshot
    /// fails.
    pub async fn process(
        &self,
        item: Item,
        tracked_term: &str,
        notify_target: Option<String>,
    ) -> Result<ProcessOutcome, WorkflowError> {
        let natural_id = item.natural_id.clone();
        let _guard = self.locks.lock(&natural_id).await;

        let analysis = self.analyze(&item).await;
        let sentiment = analysis.sentiment;
        tracing::info!(
            natural_id = %natural_id,
            term = tracked_term,
            sentiment = %sentiment,
            confidence = analysis.confidence,
            "analyzed item"
        );

        let state = WorkflowState::new(item, tracked_term, notify_target);
        let (state, effects) = step(
            state,
            Event::Analyzed {
                analysis,
                at: Utc::now(),
            },
        )?;
        let mut report = DriveReport::default();
        let state = self.drive(state, effects, &mut report).await?;

        Ok(ProcessOutcome {
            natural_id,
            sentiment,
            stage: state.stage,
            record: report.record,
            notified: report.notified,
        })
    }

    /// Apply a human decision to a pending item. The snapshot is consumed, so
    /// a second call for the same id returns [`WorkflowError::NotFound`].
    ///
    /// # Errors
    ///
    /// [`WorkflowError::NotFound`] when nothing is pending for the id,
    /// [`WorkflowError::RecordNotFound`] when the snapshot has no record to
    /// update, or [`WorkflowError::Store`] when the record cannot be updated.
    /// Nothing is posted in the error cases and the snapshot is restored.
    pub async fn resolve(
        &self,
        natural_id: &NaturalId,
        decision: ApprovalDecision,
    ) -> Result<ResolveOutcome, WorkflowError> {
        let _guard = self.locks.lock(natural_id).await;

        let Some(snapshot) = self.deps.states.take(natural_id).await? else {
            return Err(WorkflowError::NotFound(natural_id.clone()));
        };

        let approved = decision.approved;
        let event = Event::Decided {
            approved,
            edited: decision.edited_response,
        };
        let (state, effects) = match step(snapshot.clone(), event) {
            Ok(next) => next,
            Err(e) => {
                self.restore_snapshot(&snapshot).await;
                return Err(e.into());
            }
        };

        let mut report = DriveReport::default();
        let state = match self.drive(state, effects, &mut report).await {
            Ok(state) => state,
            Err(e) => {
                if !report.approval_recorded {
                    self.restore_snapshot(&snapshot).await;
                }
                return Err(e);
            }
        };

        tracing::info!(
            natural_id = %natural_id,
            approved,
            posted = ?report.posted,
            "resolved pending item"
        );

        Ok(ResolveOutcome {
            natural_id: natural_id.clone(),
            approved: state.decision == Decision::Approved,
            final_response: state.final_response,
            posted: report.posted,
            post_error: report.post_error,
        })
    }

    /// Re-post an approved reply whose earlier post failed.
    ///
    /// # Errors
    ///
    /// [`WorkflowError::RecordNotFound`] for an unknown id,
    /// [`WorkflowError::NotRetryable`] unless the record is approved with a
    /// failed or unattempted post, or [`WorkflowError::Store`].
    pub async fn retry_post(&self, natural_id: &NaturalId) -> Result<PostOutcome, WorkflowError> {
        let _guard = self.locks.lock(natural_id).await;

        let record = self
            .deps
            .records
            .get(natural_id)
            .await?
            .ok_or_else(|| WorkflowError::RecordNotFound(natural_id.clone()))?;

        let not_retryable = |reason: &str| WorkflowError::NotRetryable {
            natural_id: natural_id.clone(),
            reason: reason.to_string(),
        };
        if record.status != CommentStatus::Approved {
            return Err(not_retryable("record is not approved"));
        }
        if record.post_status == PostStatus::Posted {
            return Err(not_retryable("reply already posted"));
        }
        let Some(text) = record.final_response.as_deref() else {
            return Err(not_retryable("record has no final response"));
        };

        let result = self.post(natural_id, text).await;
        let (posted, error) = self.record_post_result(natural_id, result).await?;
        Ok(PostOutcome {
            natural_id: natural_id.clone(),
            posted,
            error,
        })
    }

    /// Retry up to `limit` failed posts, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Store`] if the failed posts cannot be listed.
    /// Per-record failures are logged and counted.
    pub async fn retry_failed_posts(&self, limit: i64) -> Result<RetrySummary, WorkflowError> {
        let failed = self
            .deps
            .records
            .list(&RecordFilter::FailedPosts, limit)
            .await?;

        let mut summary = RetrySummary::default();
        for record in failed {
            summary.attempted += 1;
            match self.retry_post(&record.natural_id).await {
                Ok(outcome) if outcome.posted => summary.posted += 1,
                Ok(_) => summary.failed += 1,
                Err(e) => {
                    summary.failed += 1;
                    tracing::warn!(natural_id = %record.natural_id, error = %e, "post retry skipped");
                }
            }
        }

        if summary.attempted > 0 {
            tracing::info!(
                attempted = summary.attempted,
                posted = summary.posted,
                failed = summary.failed,
                "retried failed posts"
            );
        }
        Ok(summary)
    }

    /// Snapshots awaiting a decision.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Store`] on storage failure.
    pub async fn pending(&self) -> Result<Vec<WorkflowState>, WorkflowError> {
        Ok(self.deps.states.list_pending().await?)
    }

    async fn drive(
        &self,
        mut state: WorkflowState,
        effects: Vec<Effect>,
        report: &mut DriveReport,
    ) -> Result<WorkflowState, WorkflowError> {
        let mut queue: VecDeque<Effect> = effects.into();
        while let Some(effect) = queue.pop_front() {
            if let Some(event) = self.execute(&state, effect, report).await? {
                let (next, more) = step(state, event)?;
                state = next;
                queue.extend(more);
            }
        }
        Ok(state)
    }

    async fn execute(
        &self,
        state: &WorkflowState,
        effect: Effect,
        report: &mut DriveReport,
    ) -> Result<Option<Event>, WorkflowError> {
        let id = &state.natural_id;
        match effect {
            Effect::RequestDraft => Ok(Some(Event::Drafted(self.draft(&state.item).await))),

            Effect::PersistSnapshot(snapshot) => {
                self.deps.states.put(&snapshot).await?;
                tracing::debug!(natural_id = %id, "persisted workflow snapshot");
                Ok(Some(Event::Persisted))
            }

            Effect::WriteRecord { status } => {
                let comment = NewComment {
                    item: state.item.clone(),
                    tracked_term: state.tracked_term.clone(),
                    analysis: state
                        .analysis
                        .clone()
                        .unwrap_or_else(|| AnalysisResult::fallback("missing analysis")),
                    draft_response: state.draft_response.clone(),
                    status,
                };
                let record = self.deps.records.upsert(&comment).await?;
                tracing::debug!(natural_id = %id, status = %record.status, "wrote record");
                report.record = Some(record);
                Ok(None)
            }

            Effect::Notify => {
                report.notified = self.notify(state).await?;
                Ok(None)
            }

            Effect::DeleteSnapshot => {
                // Usually already consumed by `take`.
                self.deps.states.delete(id).await?;
                Ok(None)
            }

            Effect::UpdateApproval {
                approved,
                final_response,
            } => {
                let updated = self
                    .deps
                    .records
                    .update_approval(id, approved, final_response.as_deref())
                    .await?;
                if !updated {
                    // Snapshot without a record: the record write failed after
                    // the snapshot was persisted. Reprocessing rebuilds both.
                    tracing::warn!(natural_id = %id, approved, "no record to apply the decision to");
                    return Err(WorkflowError::RecordNotFound(id.clone()));
                }
                report.approval_recorded = true;
                Ok(None)
            }

            Effect::Post { text } => {
                let result = self.post(id, &text).await;
                let (ok, error) = self.record_post_result(id, result).await?;
                report.posted = Some(ok);
                report.post_error = error;
                Ok(Some(Event::PostFinished { ok }))
            }
        }
    }

    async fn analyze(&self, item: &Item) -> AnalysisResult {
        let classifier = &self.deps.classifier;
        let text = item.body.as_str();
        let analysis = match self
            .deps
            .gateway
            .call(&self.policies.llm, "classify", move || classifier.analyze(text))
            .await
        {
            Ok(analysis) => analysis,
            Err(e) => {
                tracing::warn!(natural_id = %item.natural_id, error = %e, "classification failed; using neutral fallback");
                return AnalysisResult::fallback(e);
            }
        };

        if !analysis.is_negative() {
            return analysis;
        }
        let aspects = self.analyze_aspects(item).await;
        analysis.with_aspects(aspects)
    }

    async fn analyze_aspects(&self, item: &Item) -> Vec<AspectResult> {
        let detected = replyguard_core::extract_aspects(&item.body);
        let mut results = Vec::with_capacity(detected.len());
        for aspect in detected {
            let classifier = &self.deps.classifier;
            let text = item.body.as_str();
            let result = self
                .deps
                .gateway
                .call(&self.policies.llm, "classify_aspect", move || {
                    classifier.analyze_aspect(text, aspect)
                })
                .await;
            results.push(result.unwrap_or_else(|e| {
                tracing::warn!(natural_id = %item.natural_id, aspect, error = %e, "aspect analysis failed");
                AspectResult::new(aspect, Sentiment::Neutral, 0.0, format!("Error: {e}"))
            }));
        }
        results
    }

    async fn draft(&self, item: &Item) -> String {
        let drafter = &self.deps.drafter;
        match self
            .deps
            .gateway
            .call(&self.policies.llm, "draft", move || drafter.draft(item))
            .await
        {
            Ok(draft) if !draft.trim().is_empty() => draft,
            Ok(_) => {
                tracing::warn!(natural_id = %item.natural_id, "drafter returned empty text; using fallback reply");
                FALLBACK_RESPONSE.to_string()
            }
            Err(e) => {
                tracing::warn!(natural_id = %item.natural_id, error = %e, "drafting failed; using fallback reply");
                FALLBACK_RESPONSE.to_string()
            }
        }
    }

    /// Returns whether the alert was delivered. Delivery failures are logged
    /// and never block the workflow.
    async fn notify(&self, state: &WorkflowState) -> Result<bool, WorkflowError> {
        let id = &state.natural_id;
        let Some(recipient) = state.notify_target.as_deref().filter(|r| !r.trim().is_empty())
        else {
            tracing::debug!(natural_id = %id, "no notify target; skipping alert");
            return Ok(false);
        };
        let (Some(analysis), Some(draft)) = (state.analysis.as_ref(), state.draft_response.as_deref())
        else {
            return Ok(false);
        };

        let notifier = &self.deps.notifier;
        let item = &state.item;
        let result = self
            .deps
            .gateway
            .call(&self.policies.notify, "notify", move || {
                notifier.notify(recipient, item, analysis, draft)
            })
            .await;

        match result {
            Ok(()) => {
                if !self.deps.records.mark_email_sent(id, recipient).await? {
                    tracing::warn!(natural_id = %id, "alert sent but record not found to mark");
                }
                tracing::info!(natural_id = %id, recipient, "operator notified");
                Ok(true)
            }
            Err(e) => {
                tracing::warn!(natural_id = %id, recipient, error = %e, "notification failed");
                Ok(false)
            }
        }
    }

    async fn post(&self, natural_id: &NaturalId, text: &str) -> Result<(), ExternalError> {
        let poster = &self.deps.poster;
        self.deps
            .gateway
            .call(&self.policies.post, "post_reply", move || {
                poster.post_reply(natural_id, text)
            })
            .await
    }

    async fn record_post_result(
        &self,
        natural_id: &NaturalId,
        result: Result<(), ExternalError>,
    ) -> Result<(bool, Option<String>), WorkflowError> {
        match result {
            Ok(()) => {
                self.deps
                    .records
                    .update_post_status(natural_id, PostStatus::Posted, None)
                    .await?;
                tracing::info!(natural_id = %natural_id, "reply posted");
                Ok((true, None))
            }
            Err(e) => {
                let message = e.to_string();
                self.deps
                    .records
                    .update_post_status(natural_id, PostStatus::Failed, Some(&message))
                    .await?;
                tracing::error!(natural_id = %natural_id, error = %message, "posting reply failed; approval kept");
                Ok((false, Some(message)))
            }
        }
    }

    async fn restore_snapshot(&self, snapshot: &WorkflowState) {
        if let Err(e) = self.deps.states.put(snapshot).await {
            tracing::error!(
                natural_id = %snapshot.natural_id,
                error = %e,
                "failed to restore workflow snapshot"
            );
        }
    }
}
