//! Task-intake pipeline: one freeform utterance in, one structured,
//! prioritized, linked task record out.
//!
//! Five stages run in strict sequence (intake, link, plan, priority,
//! execution), each validating its output before the next sees it. The
//! inference provider is optional: without one the pipeline runs on
//! deterministic fallbacks and still completes.

pub mod core;
pub mod llm;
pub mod pipeline;
pub mod stages;
pub mod store;

pub use crate::core::config::PipelineConfig;
pub use crate::core::error::{PipelineError, Result};
pub use crate::llm::{InferenceProvider, InferenceStrategy, LlmClient};
pub use crate::pipeline::{Pipeline, PipelineState, PipelineStatus, TaskWindow, WorkspaceContext};
pub use crate::store::{MemoryStore, TaskStore};
