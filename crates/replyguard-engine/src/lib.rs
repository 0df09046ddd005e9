//! Monitoring and approval engine.
//!
//! - [`transition`]: pure [`step`] function over workflow stages.
//! - [`Workflow`]: executes effects against the collaborators, resumes
//!   pending items on a human decision, and retries failed posts.
//! - [`MonitorRegistry`]: one cancellable polling loop per tracked term.

pub mod error;
pub mod memory;
pub mod monitor;
pub mod policy;
pub mod registry;
pub mod transition;
pub mod workflow;

mod locks;

pub use error::{MonitorError, WorkflowError};
pub use memory::{InMemoryRecordStore, InMemoryWorkflowStateStore};
pub use monitor::{MonitorSpec, MonitorStatus};
pub use policy::{CallPolicies, MonitorSettings};
pub use registry::MonitorRegistry;
pub use transition::{step, Effect, Event, TransitionError};
pub use workflow::{
    ApprovalDecision, PostOutcome, ProcessOutcome, ResolveOutcome, RetrySummary, Workflow,
    WorkflowDeps,
};
