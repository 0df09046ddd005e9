//! Starts the monitors listed in the YAML definitions file at boot.

use std::path::Path;

use replyguard_engine::{MonitorRegistry, MonitorSpec};

/// Returns how many monitors were started. A missing file is not an error.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read, parsed or
/// validated.
pub async fn start_configured_monitors(
    registry: &MonitorRegistry,
    path: &Path,
) -> anyhow::Result<usize> {
    if !path.exists() {
        tracing::info!(path = %path.display(), "no monitors file; nothing to autostart");
        return Ok(0);
    }

    let file = replyguard_core::load_monitors(path)?;
    let mut started = 0;
    for definition in &file.monitors {
        let spec = MonitorSpec::from_definition(definition)?;
        let generation = registry.start(spec).await;
        tracing::info!(term = %definition.term, generation, "autostarted monitor");
        started += 1;
    }
    Ok(started)
}
