use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AnalysisResult, CoreError, Item, NaturalId};

/// Bumped whenever the persisted shape of [`WorkflowState`] changes.
pub const WORKFLOW_SCHEMA_VERSION: u32 = 1;

/// Position of an item in the sentiment and response workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Start,
    Analyzed,
    Drafted,
    AwaitingApproval,
    Resolved,
    Posted,
    /// Terminal stage for non-negative items.
    Ended,
}

impl Stage {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Start => "start",
            Stage::Analyzed => "analyzed",
            Stage::Drafted => "drafted",
            Stage::AwaitingApproval => "awaiting_approval",
            Stage::Resolved => "resolved",
            Stage::Posted => "posted",
            Stage::Ended => "ended",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Stage {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(Stage::Start),
            "analyzed" => Ok(Stage::Analyzed),
            "drafted" => Ok(Stage::Drafted),
            "awaiting_approval" => Ok(Stage::AwaitingApproval),
            "resolved" => Ok(Stage::Resolved),
            "posted" => Ok(Stage::Posted),
            "ended" => Ok(Stage::Ended),
            other => Err(CoreError::InvalidStage(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Pending,
    Approved,
    Rejected,
}

/// Snapshot of an in-flight item, persisted while a human decision is pending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    pub schema_version: u32,
    pub natural_id: NaturalId,
    pub stage: Stage,
    pub item: Item,
    pub tracked_term: String,
    pub notify_target: Option<String>,
    pub analysis: Option<AnalysisResult>,
    pub draft_response: Option<String>,
    pub decision: Decision,
    pub final_response: Option<String>,
    pub analyzed_at: Option<DateTime<Utc>>,
}

impl WorkflowState {
    #[must_use]
    pub fn new(item: Item, tracked_term: impl Into<String>, notify_target: Option<String>) -> Self {
        Self {
            schema_version: WORKFLOW_SCHEMA_VERSION,
            natural_id: item.natural_id.clone(),
            stage: Stage::Start,
            item,
            tracked_term: tracked_term.into(),
            notify_target,
            analysis: None,
            draft_response: None,
            decision: Decision::Pending,
            final_response: None,
            analyzed_at: None,
        }
    }
}
