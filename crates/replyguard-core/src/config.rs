use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from the variables already in the process.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Parse and validate configuration through an injectable env lookup so tests
/// can drive it from a plain `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        match lookup(var) {
            Ok(v) if !v.trim().is_empty() => Ok(v),
            _ => Err(ConfigError::MissingEnvVar(var.to_string())),
        }
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var).ok().filter(|v| !v.trim().is_empty())
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let database_url = require("DATABASE_URL")?;
    let reddit_client_id = require("REDDIT_CLIENT_ID")?;
    let reddit_client_secret = require("REDDIT_CLIENT_SECRET")?;

    let env = parse_environment(&or_default("REPLYGUARD_ENV", "development"))?;

    let bind_addr = or_default("REPLYGUARD_BIND_ADDR", "0.0.0.0:3000")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("REPLYGUARD_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("REPLYGUARD_LOG_LEVEL", "info");
    let monitors_path = PathBuf::from(or_default(
        "REPLYGUARD_MONITORS_PATH",
        "./config/monitors.yaml",
    ));
    let api_keys = parse_api_keys(&or_default("REPLYGUARD_API_KEYS", ""));
    if api_keys.is_empty() && env != Environment::Development {
        return Err(ConfigError::MissingEnvVar("REPLYGUARD_API_KEYS".to_string()));
    }

    let db_max_connections = parse_u32("REPLYGUARD_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("REPLYGUARD_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("REPLYGUARD_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let reddit_user_agent = or_default("REDDIT_USER_AGENT", "replyguard/0.1 (mention-monitor)");
    let reddit_refresh_token = optional("REDDIT_REFRESH_TOKEN");

    let openai_api_key = optional("OPENAI_API_KEY");
    let openai_model = or_default("OPENAI_MODEL", "gpt-4o-mini");
    let openai_base_url = or_default("OPENAI_BASE_URL", "https://api.openai.com/v1");

    let notify_webhook_url = optional("REPLYGUARD_NOTIFY_WEBHOOK_URL");

    let request_timeout_secs = parse_u64("REPLYGUARD_REQUEST_TIMEOUT_SECS", "30")?;
    if request_timeout_secs == 0 {
        return Err(invalid(
            "REPLYGUARD_REQUEST_TIMEOUT_SECS",
            "must be greater than zero".to_string(),
        ));
    }
    let max_retries = parse_u32("REPLYGUARD_MAX_RETRIES", "3")?;
    let retry_base_delay_ms = parse_u64("REPLYGUARD_RETRY_BASE_DELAY_MS", "3000")?;
    let retry_backoff_factor = parse_backoff_factor(&or_default(
        "REPLYGUARD_RETRY_BACKOFF_FACTOR",
        "2.0",
    ))
    .map_err(|reason| invalid("REPLYGUARD_RETRY_BACKOFF_FACTOR", reason))?;
    let source_min_interval_ms = parse_u64("REPLYGUARD_SOURCE_MIN_INTERVAL_MS", "2000")?;
    let llm_min_interval_ms = parse_u64("REPLYGUARD_LLM_MIN_INTERVAL_MS", "500")?;
    let fetch_limit = parse_usize("REPLYGUARD_FETCH_LIMIT", "50")?;
    let lookback_secs = parse_u64("REPLYGUARD_LOOKBACK_SECS", "86400")?;
    let default_interval_secs = parse_u64("REPLYGUARD_DEFAULT_INTERVAL_SECS", "300")?;

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        monitors_path,
        api_keys,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        reddit_client_id,
        reddit_client_secret,
        reddit_user_agent,
        reddit_refresh_token,
        openai_api_key,
        openai_model,
        openai_base_url,
        notify_webhook_url,
        request_timeout_secs,
        max_retries,
        retry_base_delay_ms,
        retry_backoff_factor,
        source_min_interval_ms,
        llm_min_interval_ms,
        fetch_limit,
        lookback_secs,
        default_interval_secs,
    })
}

fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "REPLYGUARD_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

fn parse_api_keys(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

fn parse_backoff_factor(raw: &str) -> Result<f64, String> {
    let factor = raw.trim().parse::<f64>().map_err(|e| e.to_string())?;
    if !factor.is_finite() || factor < 1.0 {
        return Err(format!("backoff factor must be a finite number >= 1.0, got {raw}"));
    }
    Ok(factor)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
