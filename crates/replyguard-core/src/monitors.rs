use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Shortest scan interval accepted for a monitor.
pub const MIN_INTERVAL_SECS: u64 = 10;

fn default_interval_secs() -> u64 {
    300
}

/// A monitor to start when the server boots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorDefinition {
    pub term: String,
    pub notify_target: Option<String>,
    pub sources: Vec<String>,
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct MonitorsFile {
    #[serde(default)]
    pub monitors: Vec<MonitorDefinition>,
}

/// Load and validate monitor definitions from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_monitors(path: &Path) -> Result<MonitorsFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::MonitorsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_monitors(&content)
}

fn parse_monitors(content: &str) -> Result<MonitorsFile, ConfigError> {
    let monitors_file: MonitorsFile = serde_yaml::from_str(content)?;
    validate_monitors(&monitors_file)?;
    Ok(monitors_file)
}

/// Source names are bare subreddit names: letters, digits and underscores.
#[must_use]
pub fn is_valid_source_name(source: &str) -> bool {
    !source.is_empty() && source.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn validate_monitors(monitors_file: &MonitorsFile) -> Result<(), ConfigError> {
    let mut seen_terms = HashSet::new();

    for monitor in &monitors_file.monitors {
        let term = monitor.term.trim();
        if term.is_empty() {
            return Err(ConfigError::Validation(
                "monitor term must be non-empty".to_string(),
            ));
        }

        if monitor.sources.is_empty() {
            return Err(ConfigError::Validation(format!(
                "monitor '{term}' must list at least one source"
            )));
        }

        if let Some(bad) = monitor.sources.iter().find(|s| !is_valid_source_name(s)) {
            return Err(ConfigError::Validation(format!(
                "monitor '{term}' has invalid source name '{bad}'"
            )));
        }

        if monitor.interval_secs < MIN_INTERVAL_SECS {
            return Err(ConfigError::Validation(format!(
                "monitor '{term}' interval {}s is below the {MIN_INTERVAL_SECS}s minimum",
                monitor.interval_secs
            )));
        }

        if !seen_terms.insert(term.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate monitor term: '{term}'"
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "monitors_test.rs"]
mod tests;
