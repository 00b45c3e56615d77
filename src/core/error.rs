use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// The inference provider was reachable but the call failed or returned
    /// malformed/empty output. Aborts the owning stage; no automatic retry.
    #[error("Inference provider error: {0}")]
    Provider(String),

    /// A link decision targeted a task that is not in the supplied window.
    #[error("Link target not found in task window: {0:?}")]
    LinkResolution(crate::core::types::TaskId),

    /// A structural invariant was violated (empty input, non-contiguous
    /// subtask ordering, missing required field).
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Task store rejected a read or write.
    #[error("Store error: {0}")]
    Store(String),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
