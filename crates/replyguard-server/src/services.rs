//! Wires configuration into the engine's collaborators.

use std::sync::Arc;

use replyguard_core::AppConfig;
use replyguard_db::{PgRecordStore, PgWorkflowStateStore};
use replyguard_engine::{CallPolicies, MonitorRegistry, MonitorSettings, Workflow, WorkflowDeps};
use replyguard_gateway::Gateway;
use replyguard_reddit::{RedditClient, RedditConfig};
use sqlx::PgPool;

/// Build the monitor registry over Postgres-backed stores.
///
/// # Errors
///
/// Returns an error if an external client cannot be constructed from the
/// configuration.
pub fn build_registry(config: &AppConfig, pool: PgPool) -> anyhow::Result<Arc<MonitorRegistry>> {
    let reddit = Arc::new(RedditClient::new(RedditConfig::from_app_config(config))?);
    if !reddit.can_post() {
        tracing::warn!("REDDIT_REFRESH_TOKEN not set; approved replies will be recorded as failed posts");
    }

    let backends = replyguard_analysis::backends_from_config(config)?;
    let notifier = replyguard_notify::notifier_from_config(config)?;
    tracing::info!(analysis = %backends.description, "analysis backends ready");

    let deps = WorkflowDeps {
        gateway: Arc::new(Gateway::new()),
        classifier: backends.classifier,
        drafter: backends.drafter,
        notifier,
        poster: reddit.clone(),
        records: Arc::new(PgRecordStore::new(pool.clone())),
        states: Arc::new(PgWorkflowStateStore::new(pool)),
    };
    let workflow = Arc::new(Workflow::new(deps, CallPolicies::from_app_config(config)));

    Ok(Arc::new(MonitorRegistry::new(
        workflow,
        reddit,
        MonitorSettings::from_app_config(config),
    )))
}
