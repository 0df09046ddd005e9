use replyguard_core::{ErrorKind, ExternalError};
use thiserror::Error;

pub(crate) const SERVICE: &str = "notify";

/// Errors that can occur when delivering an alert.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("webhook returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid webhook URL '{0}'")]
    InvalidUrl(String),

    #[error("recipient must not be empty")]
    EmptyRecipient,
}

impl From<NotifyError> for ExternalError {
    fn from(err: NotifyError) -> Self {
        let kind = match &err {
            NotifyError::Status { status, body } => {
                return ExternalError::from_status(SERVICE, *status, body);
            }
            NotifyError::Http(e) if e.is_builder() => ErrorKind::Permanent,
            NotifyError::Http(_) => ErrorKind::Transient,
            NotifyError::InvalidUrl(_) => ErrorKind::Permanent,
            NotifyError::EmptyRecipient => ErrorKind::Validation,
        };
        ExternalError::new(kind, SERVICE, err.to_string())
    }
}
