use replyguard_core::{ErrorKind, ExternalError};
use thiserror::Error;

pub(crate) const SERVICE: &str = "llm";

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("LLM API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("LLM returned no message content")]
    EmptyResponse,

    #[error("invalid LLM output for {context}: {reason}")]
    InvalidOutput { context: String, reason: String },

    #[error("invalid base URL '{0}'")]
    InvalidBaseUrl(String),
}

impl From<AnalysisError> for ExternalError {
    fn from(err: AnalysisError) -> Self {
        let kind = match &err {
            AnalysisError::Status { status, body } => {
                return ExternalError::from_status(SERVICE, *status, body);
            }
            AnalysisError::Http(e) if e.is_builder() => ErrorKind::Permanent,
            AnalysisError::Http(_) | AnalysisError::EmptyResponse => ErrorKind::Transient,
            AnalysisError::InvalidOutput { .. } => ErrorKind::Validation,
            AnalysisError::InvalidBaseUrl(_) => ErrorKind::Permanent,
        };
        ExternalError::new(kind, SERVICE, err.to_string())
    }
}
