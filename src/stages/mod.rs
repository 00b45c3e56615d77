//! The five pipeline stages
//!
//! Each stage consumes the previous stage's output plus the read-only run
//! context, reports a confidence score, and fails loudly rather than passing
//! malformed output downstream. Provider-vs-deterministic behavior is
//! selected once, at pipeline construction, not inside the stages.

pub mod execution;
pub mod intake;
pub mod link;
pub mod plan;
pub mod priority;

pub use execution::{ExecutionOutcome, ExecutionStage};
pub use intake::{IntakeStage, Intention, ParsedIntent, RawInput};
pub use link::{LinkChoice, LinkDecision, LinkStage};
pub use plan::{PlanStage, PlannedSubtask, TaskPlan};
pub use priority::{PriorityDecision, PriorityStage};
