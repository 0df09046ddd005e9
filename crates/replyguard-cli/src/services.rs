//! Connects the CLI to the same stores and collaborators the server uses.

use std::sync::Arc;

use anyhow::Context;
use replyguard_core::AppConfig;
use replyguard_db::{PgRecordStore, PgWorkflowStateStore, PoolConfig};
use replyguard_engine::{CallPolicies, MonitorRegistry, MonitorSettings, Workflow, WorkflowDeps};
use replyguard_gateway::Gateway;
use replyguard_reddit::{RedditClient, RedditConfig};

/// # Errors
///
/// Returns an error if the database is unreachable or a client cannot be
/// built from the configuration.
pub(crate) async fn connect(config: &AppConfig) -> anyhow::Result<MonitorRegistry> {
    let pool =
        replyguard_db::connect_pool(&config.database_url, PoolConfig::from_app_config(config))
            .await
            .context("failed to connect to database")?;

    let reddit = Arc::new(RedditClient::new(RedditConfig::from_app_config(config))?);
    let backends = replyguard_analysis::backends_from_config(config)?;
    let notifier = replyguard_notify::notifier_from_config(config)?;
    tracing::debug!(analysis = %backends.description, "analysis backends ready");

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

    Ok(MonitorRegistry::new(
        workflow,
        reddit,
        MonitorSettings::from_app_config(config),
    ))
}

/// # Errors
///
/// Returns an error if `DATABASE_URL` is unset or a migration fails.
pub(crate) async fn migrate() -> anyhow::Result<()> {
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let pool = replyguard_db::connect_pool(&database_url, PoolConfig::default())
        .await
        .context("failed to connect to database")?;
    let applied = replyguard_db::run_migrations(&pool).await?;
    println!("applied {applied} migration(s)");
    Ok(())
}
