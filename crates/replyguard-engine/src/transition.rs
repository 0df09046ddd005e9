//! Pure state transitions of the sentiment and response workflow.
//!
//! [`step`] never performs I/O. It returns the next [`WorkflowState`] and the
//! [`Effect`]s the driver must execute, in order. Effects that complete with a
//! result (a draft, a persisted snapshot, a post) feed the next [`Event`] back
//! into [`step`].

use chrono::{DateTime, Utc};
use replyguard_core::{AnalysisResult, CommentStatus, Decision, Stage, WorkflowState};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Analyzed {
        analysis: AnalysisResult,
        at: DateTime<Utc>,
    },
    Drafted(String),
    Persisted,
    Decided {
        approved: bool,
        edited: Option<String>,
    },
    PostFinished {
        ok: bool,
    },
}

impl Event {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Event::Analyzed { .. } => "analyzed",
            Event::Drafted(_) => "drafted",
            Event::Persisted => "persisted",
            Event::Decided { .. } => "decided",
            Event::PostFinished { .. } => "post_finished",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    RequestDraft,
    /// Save this snapshot under its natural id. Completion yields [`Event::Persisted`].
    PersistSnapshot(Box<WorkflowState>),
    Notify,
    WriteRecord {
        status: CommentStatus,
    },
    DeleteSnapshot,
    UpdateApproval {
        approved: bool,
        final_response: Option<String>,
    },
    Post {
        text: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("event '{event}' is not valid in stage '{stage}'")]
    Invalid { stage: Stage, event: &'static str },

    #[error("approved item has neither a draft nor an edited response")]
    NothingToPost,
}

fn invalid(stage: Stage, event: &Event) -> TransitionError {
    TransitionError::Invalid {
        stage,
        event: event.name(),
    }
}

/// Advance `state` by one `event`.
///
/// # Errors
///
/// Returns [`TransitionError::Invalid`] for an event the current stage does
/// not accept, and [`TransitionError::NothingToPost`] for an approval with no
/// text to post.
pub fn step(
    mut state: WorkflowState,
    event: Event,
) -> Result<(WorkflowState, Vec<Effect>), TransitionError> {
    match (state.stage, event) {
        (Stage::Start, Event::Analyzed { analysis, at }) => {
            let negative = analysis.is_negative();
            state.analysis = Some(analysis);
            state.analyzed_at = Some(at);
            if negative {
                state.stage = Stage::Analyzed;
                Ok((state, vec![Effect::RequestDraft]))
            } else {
                state.stage = Stage::Ended;
                Ok((
                    state,
                    vec![Effect::WriteRecord {
                        status: CommentStatus::New,
                    }],
                ))
            }
        }

        (Stage::Analyzed, Event::Drafted(draft)) => {
            state.draft_response = Some(draft);
            state.stage = Stage::Drafted;

            // The stored snapshot is already waiting for a decision so a
            // resume after restart can apply `Decided` directly.
            let mut snapshot = state.clone();
            snapshot.stage = Stage::AwaitingApproval;
            Ok((state, vec![Effect::PersistSnapshot(Box::new(snapshot))]))
        }

        (Stage::Drafted, Event::Persisted) => {
            state.stage = Stage::AwaitingApproval;
            Ok((
                state,
                vec![
                    Effect::WriteRecord {
                        status: CommentStatus::PendingApproval,
                    },
                    Effect::Notify,
                ],
            ))
        }

        (Stage::AwaitingApproval, Event::Decided { approved, edited }) => {
            let final_response = if approved {
                let edited = edited.filter(|text| !text.trim().is_empty());
                Some(
                    edited
                        .or_else(|| state.draft_response.clone())
                        .ok_or(TransitionError::NothingToPost)?,
                )
            } else {
                None
            };

            state.decision = if approved {
                Decision::Approved
            } else {
                Decision::Rejected
            };
            state.final_response.clone_from(&final_response);
            state.stage = Stage::Resolved;

            let mut effects = vec![
                Effect::UpdateApproval {
                    approved,
                    final_response: final_response.clone(),
                },
                Effect::DeleteSnapshot,
            ];
            if let Some(text) = final_response {
                effects.push(Effect::Post { text });
            }
            Ok((state, effects))
        }

        (Stage::Resolved, Event::PostFinished { ok }) if state.decision == Decision::Approved => {
            if ok {
                state.stage = Stage::Posted;
            }
            Ok((state, Vec::new()))
        }

        (stage, event) => Err(invalid(stage, &event)),
    }
}
