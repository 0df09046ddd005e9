use thiserror::Error;

/// Failure classes for calls that leave the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Platform signalled throttling (HTTP 429 or a "rate limit" message).
    RateLimited,
    /// Network failure, timeout or 5xx.
    Transient,
    /// Auth/permission failure or missing credentials.
    Permanent,
    /// Malformed item or response.
    Validation,
}

impl ErrorKind {
    #[must_use]
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::RateLimited | ErrorKind::Transient)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::Transient => "transient",
            ErrorKind::Permanent => "permanent",
            ErrorKind::Validation => "validation",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error)]
#[error("{service} {kind} error: {message}")]
pub struct ExternalError {
    pub kind: ErrorKind,
    pub service: &'static str,
    pub message: String,
}

impl ExternalError {
    #[must_use]
    pub fn new(kind: ErrorKind, service: &'static str, message: impl Into<String>) -> Self {
        Self {
            kind,
            service,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn transient(service: &'static str, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transient, service, message)
    }

    #[must_use]
    pub fn permanent(service: &'static str, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Permanent, service, message)
    }

    #[must_use]
    pub fn validation(service: &'static str, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, service, message)
    }

    /// Classify a non-success HTTP status.
    #[must_use]
    pub fn from_status(service: &'static str, status: u16, body: &str) -> Self {
        let message = format!("HTTP {status}: {}", truncate(body, 200));
        let kind = match status {
            429 => ErrorKind::RateLimited,
            408 | 500..=599 => ErrorKind::Transient,
            _ => ErrorKind::Permanent,
        };
        Self::new(kind, service, message)
    }

    /// Rate-limit-like errors are reported differently in logs; both classes
    /// retry on the same schedule.
    #[must_use]
    pub fn is_rate_limit(&self) -> bool {
        self.kind == ErrorKind::RateLimited
            || self.message.contains("429")
            || self.message.to_lowercase().contains("rate limit")
    }
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("stored data is invalid: {0}")]
    Corrupt(String),
    #[error("storage backend error: {0}")]
    Backend(Box<dyn std::error::Error + Send + Sync>),
}
