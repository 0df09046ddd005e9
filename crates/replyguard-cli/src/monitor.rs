//! Foreground monitor command.

use replyguard_engine::{MonitorRegistry, MonitorSpec};

/// Start one monitor and keep it running until Ctrl-C.
///
/// # Errors
///
/// Returns an error for an invalid monitor definition or if the Ctrl-C
/// handler cannot be installed.
pub(crate) async fn run_foreground(
    registry: &MonitorRegistry,
    term: &str,
    notify_target: Option<String>,
    sources: &[String],
    interval_secs: u64,
) -> anyhow::Result<()> {
    let spec = MonitorSpec::new(term, notify_target, sources, interval_secs)?;
    println!(
        "monitoring '{}' in {} every {interval_secs}s; Ctrl-C to stop",
        spec.term,
        spec.sources
            .iter()
            .map(|s| format!("r/{s}"))
            .collect::<Vec<_>>()
            .join(", ")
    );
    let term = spec.term.clone();
    registry.start(spec).await;

    tokio::signal::ctrl_c().await?;
    tracing::info!(term = %term, "stopping monitor");

    let status = registry.status(&term).await;
    registry.stop_all().await;

    if let Some(status) = status {
        println!(
            "stopped after {} cycle(s): {} seen, {} processed, {} failed",
            status.cycles, status.items_seen, status.items_processed, status.items_failed
        );
        if let Some(error) = status.last_error {
            println!("last error: {error}");
        }
    }
    Ok(())
}
