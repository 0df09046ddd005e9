use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub monitors_path: PathBuf,
    pub api_keys: Vec<String>,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub reddit_client_id: String,
    pub reddit_client_secret: String,
    pub reddit_user_agent: String,
    pub reddit_refresh_token: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: String,
    pub notify_webhook_url: Option<String>,
    pub request_timeout_secs: u64,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub retry_backoff_factor: f64,
    pub source_min_interval_ms: u64,
    pub llm_min_interval_ms: u64,
    pub fetch_limit: usize,
    pub lookback_secs: u64,
    pub default_interval_secs: u64,
}

impl AppConfig {
    #[must_use]
    pub fn is_development(&self) -> bool {
        self.env == Environment::Development
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("monitors_path", &self.monitors_path)
            .field("database_url", &"[redacted]")
            .field("api_keys", &format_args!("[{} redacted]", self.api_keys.len()))
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("reddit_client_id", &self.reddit_client_id)
            .field("reddit_client_secret", &"[redacted]")
            .field("reddit_user_agent", &self.reddit_user_agent)
            .field(
                "reddit_refresh_token",
                &self.reddit_refresh_token.as_ref().map(|_| "[redacted]"),
            )
            .field(
                "openai_api_key",
                &self.openai_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("openai_model", &self.openai_model)
            .field("openai_base_url", &self.openai_base_url)
            .field("notify_webhook_url", &self.notify_webhook_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_base_delay_ms", &self.retry_base_delay_ms)
            .field("retry_backoff_factor", &self.retry_backoff_factor)
            .field("source_min_interval_ms", &self.source_min_interval_ms)
            .field("llm_min_interval_ms", &self.llm_min_interval_ms)
            .field("fetch_limit", &self.fetch_limit)
            .field("lookback_secs", &self.lookback_secs)
            .field("default_interval_secs", &self.default_interval_secs)
            .finish()
    }
}
