//! Background job scheduler.
//!
//! Initialises a [`JobScheduler`] at server startup and registers the
//! recurring retry of replies whose post failed.

use std::sync::Arc;

use replyguard_engine::Workflow;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Every 15 minutes, on the quarter hour.
const POST_RETRY_CRON: &str = "0 */15 * * * *";
const POST_RETRY_BATCH: i64 = 50;

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive
/// for the lifetime of the process.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// a job cannot be registered, or the scheduler fails to start.
pub async fn build_scheduler(workflow: Arc<Workflow>) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    register_post_retry_job(&scheduler, workflow).await?;

    scheduler.start().await?;
    Ok(scheduler)
}

async fn register_post_retry_job(
    scheduler: &JobScheduler,
    workflow: Arc<Workflow>,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(POST_RETRY_CRON, move |_uuid, _lock| {
        let workflow = Arc::clone(&workflow);

        Box::pin(async move {
            tracing::debug!("scheduler: starting post retry run");
            match workflow.retry_failed_posts(POST_RETRY_BATCH).await {
                Ok(summary) if summary.attempted == 0 => {
                    tracing::debug!("scheduler: no failed posts to retry");
                }
                Ok(summary) => tracing::info!(
                    attempted = summary.attempted,
                    posted = summary.posted,
                    failed = summary.failed,
                    "scheduler: post retry run complete"
                ),
                Err(e) => tracing::error!(error = %e, "scheduler: post retry run failed"),
            }
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron = POST_RETRY_CRON, "scheduler: registered post retry job");
    Ok(())
}
