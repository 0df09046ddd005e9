use replyguard_core::{ErrorKind, ExternalError};
use thiserror::Error;

pub(crate) const SERVICE: &str = "reddit";

/// Errors returned by the Reddit API client.
#[derive(Debug, Error)]
pub enum RedditError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status from the API.
    #[error("Reddit API returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Token endpoint refused the configured credentials.
    #[error("Reddit authentication failed: {0}")]
    Auth(String),

    /// The cached bearer token was refused; the next attempt re-authenticates.
    #[error("Reddit rejected the access token")]
    TokenRejected,

    /// `/api/comment` answered 200 with an error list.
    #[error("Reddit rejected the request: {0}")]
    Rejected(String),

    /// Replying needs a user-scoped refresh token.
    #[error("posting requires REDDIT_REFRESH_TOKEN to be configured")]
    PostingDisabled,

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

impl From<RedditError> for ExternalError {
    fn from(err: RedditError) -> Self {
        let kind = match &err {
            RedditError::Http(e) if e.is_builder() => ErrorKind::Permanent,
            RedditError::Http(_) | RedditError::TokenRejected => ErrorKind::Transient,
            RedditError::Status { status, body } => {
                return ExternalError::from_status(SERVICE, *status, body);
            }
            RedditError::Rejected(msg) if msg.contains("RATELIMIT") => ErrorKind::RateLimited,
            RedditError::Auth(_)
            | RedditError::PostingDisabled
            | RedditError::InvalidBaseUrl { .. }
            | RedditError::Rejected(_) => ErrorKind::Permanent,
            RedditError::Deserialize { .. } => ErrorKind::Validation,
        };
        ExternalError::new(kind, SERVICE, err.to_string())
    }
}
