//! Domain model and collaborator contracts shared by every `replyguard` crate.

pub mod analysis;
pub mod app_config;
pub mod aspects;
pub mod config;
pub mod error;
pub mod ids;
pub mod item;
pub mod monitors;
pub mod ports;
pub mod record;
pub mod workflow_state;

use thiserror::Error;

pub use analysis::{
    clamp_confidence, AnalysisResult, AspectResult, Sentiment, BUSINESS_ASPECTS, FALLBACK_RESPONSE,
};
pub use app_config::{AppConfig, Environment};
pub use aspects::extract_aspects;
pub use config::{load_app_config, load_app_config_from_env};
pub use error::{ErrorKind, ExternalError, StoreError};
pub use ids::NaturalId;
pub use item::Item;
pub use monitors::{load_monitors, MonitorDefinition, MonitorsFile, MIN_INTERVAL_SECS};
pub use ports::{
    Classifier, Notifier, Poster, RecordStore, ResponseDrafter, SourceReader, TimeWindow,
    WorkflowStateStore,
};
pub use record::{CommentRecord, CommentStatus, NewComment, PostStatus, RecordFilter};
pub use workflow_state::{Decision, Stage, WorkflowState, WORKFLOW_SCHEMA_VERSION};

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid natural id: {0:?}")]
    InvalidNaturalId(String),
    #[error("invalid sentiment: {0}")]
    InvalidSentiment(String),
    #[error("invalid comment status: {0}")]
    InvalidStatus(String),
    #[error("invalid post status: {0}")]
    InvalidPostStatus(String),
    #[error("invalid workflow stage: {0}")]
    InvalidStage(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
    #[error("failed to read monitors file {path}: {source}")]
    MonitorsFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse monitors file: {0}")]
    MonitorsFileParse(#[from] serde_yaml::Error),
    #[error("config validation error: {0}")]
    Validation(String),
}
