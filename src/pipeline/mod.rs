//! Pipeline orchestration and per-run state

pub mod context;
pub mod orchestrator;
pub mod state;

pub use context::{CalendarEvent, TaskWindow, WorkspaceContext};
pub use orchestrator::Pipeline;
pub use state::{min_confidence, PipelineState, PipelineStatus};
