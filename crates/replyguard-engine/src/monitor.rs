//! One monitor loop per tracked term.
//!
//! A loop owns a generation id. Starting a term again allocates a newer
//! generation, and every loop checks at the top of each cycle, before each
//! item and on every sleep step that its generation is still current, so a
//! superseded loop winds down even if its join timed out.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use replyguard_core::{
    monitors::is_valid_source_name, Item, MonitorDefinition, SourceReader, MIN_INTERVAL_SECS,
};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::MonitorError;
use crate::policy::MonitorSettings;
use crate::workflow::Workflow;

/// What to watch and how often.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorSpec {
    pub term: String,
    pub notify_target: Option<String>,
    pub sources: Vec<String>,
    pub interval: Duration,
}

impl MonitorSpec {
    /// Normalises and validates a monitor request. Sources may be given with
    /// an `r/` prefix; duplicates are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::InvalidSpec`] for an empty term, no sources,
    /// a malformed source name or an interval below [`MIN_INTERVAL_SECS`].
    pub fn new(
        term: &str,
        notify_target: Option<String>,
        sources: &[String],
        interval_secs: u64,
    ) -> Result<Self, MonitorError> {
        let term = term.trim();
        if term.is_empty() {
            return Err(MonitorError::InvalidSpec("term must be non-empty".to_string()));
        }

        let mut normalised: Vec<String> = Vec::with_capacity(sources.len());
        for raw in sources {
            let name = raw.trim();
            let name = name
                .strip_prefix("r/")
                .or_else(|| name.strip_prefix("/r/"))
                .unwrap_or(name);
            if !is_valid_source_name(name) {
                return Err(MonitorError::InvalidSpec(format!(
                    "invalid source name '{raw}'"
                )));
            }
            if !normalised.iter().any(|s| s.eq_ignore_ascii_case(name)) {
                normalised.push(name.to_string());
            }
        }
        if normalised.is_empty() {
            return Err(MonitorError::InvalidSpec(format!(
                "monitor '{term}' must list at least one source"
            )));
        }

        if interval_secs < MIN_INTERVAL_SECS {
            return Err(MonitorError::InvalidSpec(format!(
                "interval_secs must be at least {MIN_INTERVAL_SECS}, got {interval_secs}"
            )));
        }

        Ok(Self {
            term: term.to_string(),
            notify_target: notify_target
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
            sources: normalised,
            interval: Duration::from_secs(interval_secs),
        })
    }

    /// # Errors
    ///
    /// See [`MonitorSpec::new`].
    pub fn from_definition(definition: &MonitorDefinition) -> Result<Self, MonitorError> {
        Self::new(
            &definition.term,
            definition.notify_target.clone(),
            &definition.sources,
            definition.interval_secs,
        )
    }

    /// Registry key: terms are compared case-insensitively.
    #[must_use]
    pub fn key(&self) -> String {
        monitor_key(&self.term)
    }
}

pub(crate) fn monitor_key(term: &str) -> String {
    term.trim().to_lowercase()
}

/// Point-in-time view of one monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorStatus {
    pub term: String,
    pub notify_target: Option<String>,
    pub sources: Vec<String>,
    pub interval_secs: u64,
    pub generation: u64,
    pub started_at: DateTime<Utc>,
    pub running: bool,
    pub cycles: u64,
    pub last_cycle_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub items_seen: u64,
    pub items_processed: u64,
    pub items_failed: u64,
}

impl MonitorStatus {
    pub(crate) fn new(spec: &MonitorSpec, generation: u64) -> Self {
        Self {
            term: spec.term.clone(),
            notify_target: spec.notify_target.clone(),
            sources: spec.sources.clone(),
            interval_secs: spec.interval.as_secs(),
            generation,
            started_at: Utc::now(),
            running: true,
            cycles: 0,
            last_cycle_at: None,
            last_error: None,
            items_seen: 0,
            items_processed: 0,
            items_failed: 0,
        }
    }
}

/// Current generation per monitor key, shared by the registry and its loops.
#[derive(Debug, Default)]
pub(crate) struct GenerationTable {
    current: Mutex<HashMap<String, u64>>,
}

impl GenerationTable {
    pub(crate) fn set(&self, key: &str, generation: u64) {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), generation);
    }

    pub(crate) fn clear_if(&self, key: &str, generation: u64) {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if current.get(key) == Some(&generation) {
            current.remove(key);
        }
    }

    pub(crate) fn is_current(&self, key: &str, generation: u64) -> bool {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            == Some(&generation)
    }
}

#[derive(Debug, Default)]
struct CycleReport {
    fetched: u64,
    processed: u64,
    failed: u64,
    source_errors: Vec<String>,
}

pub(crate) struct MonitorContext {
    pub(crate) spec: MonitorSpec,
    pub(crate) key: String,
    pub(crate) generation: u64,
    pub(crate) workflow: Arc<Workflow>,
    pub(crate) source: Arc<dyn SourceReader>,
    pub(crate) settings: MonitorSettings,
    pub(crate) token: CancellationToken,
    pub(crate) generations: Arc<GenerationTable>,
    pub(crate) status: Arc<Mutex<MonitorStatus>>,
}

impl MonitorContext {
    fn is_live(&self) -> bool {
        !self.token.is_cancelled() && self.generations.is_current(&self.key, self.generation)
    }

    fn update_status(&self, f: impl FnOnce(&mut MonitorStatus)) {
        let mut status = self.status.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut status);
    }

    /// Sleep `total` in steps of `settings.sleep_step`. Returns `false` as soon
    /// as the loop is cancelled or superseded.
    async fn pause(&self, total: Duration) -> bool {
        let deadline = Instant::now() + total;
        loop {
            if !self.is_live() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            let step = (deadline - now).min(self.settings.sleep_step);
            tokio::select! {
                () = self.token.cancelled() => return false,
                () = tokio::time::sleep(step) => {}
            }
        }
    }
}

pub(crate) async fn run_monitor(ctx: MonitorContext) {
    let lookback = chrono::Duration::from_std(ctx.settings.lookback)
        .unwrap_or_else(|_| chrono::Duration::days(1));
    let initial = Utc::now() - lookback;
    let mut watermarks: HashMap<String, DateTime<Utc>> = ctx
        .spec
        .sources
        .iter()
        .map(|source| (source.clone(), initial))
        .collect();

    tracing::info!(
        term = %ctx.spec.term,
        generation = ctx.generation,
        sources = ?ctx.spec.sources,
        interval_secs = ctx.spec.interval.as_secs(),
        "monitor started"
    );

    while ctx.is_live() {
        let report = run_cycle(&ctx, &mut watermarks).await;
        let all_failed = report.source_errors.len() == ctx.spec.sources.len();
        let last_error = report.source_errors.last().cloned();

        ctx.update_status(|status| {
            status.cycles += 1;
            status.last_cycle_at = Some(Utc::now());
            status.last_error.clone_from(&last_error);
            status.items_seen += report.fetched;
            status.items_processed += report.processed;
            status.items_failed += report.failed;
        });

        let pause = if all_failed {
            tracing::error!(
                term = %ctx.spec.term,
                generation = ctx.generation,
                error = last_error.as_deref().unwrap_or_default(),
                backoff_secs = ctx.settings.error_backoff.as_secs(),
                "monitor cycle failed"
            );
            ctx.settings.error_backoff
        } else {
            tracing::info!(
                term = %ctx.spec.term,
                generation = ctx.generation,
                fetched = report.fetched,
                processed = report.processed,
                failed = report.failed,
                "monitor cycle complete"
            );
            ctx.spec.interval
        };

        if !ctx.pause(pause).await {
            break;
        }
    }

    ctx.update_status(|status| status.running = false);
    tracing::info!(
        term = %ctx.spec.term,
        generation = ctx.generation,
        "monitor stopped"
    );
}

async fn run_cycle(
    ctx: &MonitorContext,
    watermarks: &mut HashMap<String, DateTime<Utc>>,
) -> CycleReport {
    let mut report = CycleReport::default();
    let term = ctx.spec.term.as_str();

    for source in &ctx.spec.sources {
        if !ctx.is_live() {
            break;
        }
        let since = watermarks.get(source).copied().unwrap_or_else(Utc::now);

        let reader = &ctx.source;
        let limit = ctx.settings.fetch_limit;
        let fetched = ctx
            .workflow
            .gateway()
            .call(&ctx.workflow.policies().source, "fetch_recent", move || {
                reader.fetch_recent(source, since, limit)
            })
            .await;

        let mut items = match fetched {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(term, subreddit = %source, error = %e, "fetch failed; skipping source");
                report.source_errors.push(format!("r/{source}: {e}"));
                continue;
            }
        };
        items.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        report.fetched += u64::try_from(items.len()).unwrap_or(u64::MAX);

        if let Some(advanced) = process_items(ctx, items, &mut report).await {
            watermarks.insert(source.clone(), advanced);
        }
    }

    report
}

/// Handle items oldest first. Returns the watermark for the next fetch: one
/// overlap step behind the newest item before the first failure, so a failed
/// item, and anything sharing its timestamp second, is fetched again next
/// cycle. Repeats are absorbed by the dedup check.
async fn process_items(
    ctx: &MonitorContext,
    items: Vec<Item>,
    report: &mut CycleReport,
) -> Option<DateTime<Utc>> {
    let term = ctx.spec.term.as_str();
    let mut handled_through = None;
    let mut blocked = false;

    for item in items {
        if !ctx.is_live() {
            break;
        }
        let created_at = item.created_at;
        let handled = handle_item(ctx, item, report).await;
        if !handled {
            blocked = true;
        }
        if !blocked {
            handled_through = Some(created_at);
        }
    }

    if blocked {
        tracing::debug!(term, "watermark held back by a failed item");
    }
    handled_through.map(overlapped_watermark)
}

/// Source timestamps have whole-second resolution and the fetch filter is
/// strictly-after, so the watermark trails the last handled item by a second.
fn overlapped_watermark(handled_through: DateTime<Utc>) -> DateTime<Utc> {
    handled_through - chrono::Duration::seconds(1)
}

async fn handle_item(ctx: &MonitorContext, item: Item, report: &mut CycleReport) -> bool {
    let term = ctx.spec.term.as_str();
    let natural_id = item.natural_id.clone();

    if !item.mentions(term) {
        return true;
    }

    match ctx.workflow.records().exists(&natural_id).await {
        Ok(true) => {
            tracing::debug!(term, natural_id = %natural_id, "already processed");
            return true;
        }
        Ok(false) => {}
        Err(e) => {
            tracing::error!(term, natural_id = %natural_id, error = %e, "dedup lookup failed");
            report.failed += 1;
            return false;
        }
    }

    match ctx
        .workflow
        .process(item, term, ctx.spec.notify_target.clone())
        .await
    {
        Ok(outcome) => {
            report.processed += 1;
            tracing::debug!(
                term,
                natural_id = %natural_id,
                stage = %outcome.stage,
                "item processed"
            );
            true
        }
        Err(e) => {
            report.failed += 1;
            tracing::error!(term, natural_id = %natural_id, error = %e, "item processing failed");
            false
        }
    }
}
