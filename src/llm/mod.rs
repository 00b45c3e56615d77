//! Inference provider integration
//!
//! The pipeline's only external intelligence. Key principle: the provider
//! proposes, the stages validate: every provider response is parsed and
//! checked against the stage's structural invariants before anything
//! downstream sees it.

pub mod client;
pub mod provider;

pub use client::LlmClient;
pub use provider::{extract_json, InferenceProvider, InferenceStrategy};
