//! Inference provider seam and strategy selection
//!
//! Every stage talks to the provider through the `InferenceProvider` trait,
//! and the decision "inference-backed vs deterministic" is made exactly once,
//! at pipeline construction, as an `InferenceStrategy`. Stages never probe
//! for API keys themselves.

use crate::core::error::{PipelineError, Result};
use crate::llm::client::LlmClient;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// A structured-completion backend
///
/// `complete` takes a system prompt (the extraction contract) and the user
/// content, and returns the raw text response. Implementations do not retry;
/// a failed call is a stage failure.
#[async_trait]
pub trait InferenceProvider: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String>;
}

#[async_trait]
impl InferenceProvider for LlmClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        LlmClient::complete(self, system, user).await
    }
}

/// How the pipeline obtains stage decisions
///
/// Chosen once when the pipeline is built. `Deterministic` is not a degraded
/// error state: it is the supported no-provider mode, and every stage has a
/// defined deterministic output under it.
#[derive(Clone)]
pub enum InferenceStrategy {
    /// Delegate stage decisions to an inference provider
    Backed(Arc<dyn InferenceProvider>),
    /// Use the stages' deterministic fallback outputs
    Deterministic,
}

impl InferenceStrategy {
    /// Select the strategy from the environment: provider-backed when
    /// LLM_API_KEY is configured, deterministic otherwise.
    pub fn from_env(timeout: Duration) -> Self {
        match LlmClient::from_env(timeout) {
            Some(client) => {
                tracing::info!("inference provider configured, using backed strategy");
                Self::Backed(Arc::new(client))
            }
            None => {
                tracing::info!("no inference provider configured, using deterministic strategy");
                Self::Deterministic
            }
        }
    }

    pub fn backed(provider: Arc<dyn InferenceProvider>) -> Self {
        Self::Backed(provider)
    }

    pub fn is_backed(&self) -> bool {
        matches!(self, Self::Backed(_))
    }
}

impl std::fmt::Debug for InferenceStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Backed(_) => f.write_str("InferenceStrategy::Backed"),
            Self::Deterministic => f.write_str("InferenceStrategy::Deterministic"),
        }
    }
}

/// Extract the JSON object from an LLM response (handles surrounding text)
pub fn extract_json(response: &str) -> Result<&str> {
    let start = response
        .find('{')
        .ok_or_else(|| PipelineError::Provider("No JSON found in response".into()))?;
    let end = response
        .rfind('}')
        .ok_or_else(|| PipelineError::Provider("No closing brace found in response".into()))?;
    if end < start {
        return Err(PipelineError::Provider("Malformed JSON in response".into()));
    }
    Ok(&response[start..=end])
}
