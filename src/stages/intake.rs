//! Intake stage - parse freeform input into a structured intent
//!
//! First stage of the pipeline. One user utterance (typed or transcribed)
//! in, one `ParsedIntent` out. The stage never panics past its boundary:
//! provider failures and malformed completions surface as `Err`, and with no
//! provider configured it degrades to a deterministic truncation of the
//! input.

use crate::core::config::PipelineConfig;
use crate::core::error::{PipelineError, Result};
use crate::core::types::{EntityRef, Priority, WorkspaceId};
use crate::llm::provider::{extract_json, InferenceProvider, InferenceStrategy};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One freeform user message, scoped to a workspace
#[derive(Debug, Clone)]
pub struct RawInput {
    pub text: String,
    pub workspace_id: WorkspaceId,
}

impl RawInput {
    pub fn new(text: impl Into<String>, workspace_id: WorkspaceId) -> Self {
        Self {
            text: text.into(),
            workspace_id,
        }
    }
}

/// What the user wants to happen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intention {
    /// Capture new work
    New,
    /// Change existing work
    Update,
    /// Mark existing work finished
    Complete,
    /// Ask about state, not an action
    Question,
}

/// Structured intent extracted from one utterance
///
/// Immutable once produced; consumed by the link and plan stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedIntent {
    pub intention: Intention,
    /// Short imperative restatement of what to do
    pub action: String,
    /// Named references found in the input (clients, people, projects, tags)
    #[serde(default)]
    pub entities: Vec<EntityRef>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    pub priority: Priority,
    /// Free-text context the extraction kept but could not structure
    #[serde(default)]
    pub context: Option<String>,
    /// Extraction confidence (0.0 - 1.0)
    pub confidence: f32,
}

impl ParsedIntent {
    /// First client entity mentioned in the input, if any
    pub fn client(&self) -> Option<&str> {
        self.entities
            .iter()
            .find(|e| e.kind == crate::core::types::EntityKind::Client)
            .map(|e| e.value.as_str())
    }
}

/// Parses freeform text into a `ParsedIntent`
pub struct IntakeStage<'a> {
    strategy: &'a InferenceStrategy,
    config: &'a PipelineConfig,
}

impl<'a> IntakeStage<'a> {
    pub fn new(strategy: &'a InferenceStrategy, config: &'a PipelineConfig) -> Self {
        Self { strategy, config }
    }

    /// Run the stage
    ///
    /// Empty input is a validation failure. Provider parse failures are
    /// surfaced, not retried.
    pub async fn run(&self, input: &RawInput) -> Result<ParsedIntent> {
        if input.text.trim().is_empty() {
            return Err(PipelineError::Validation("input text is empty".into()));
        }

        match self.strategy {
            InferenceStrategy::Backed(provider) => {
                let response = provider.complete(INTAKE_SYSTEM_PROMPT, &input.text).await?;
                let json = extract_json(&response)?;
                let intent: ParsedIntent = serde_json::from_str(json).map_err(|e| {
                    PipelineError::Provider(format!(
                        "Failed to parse intent: {} - Response: {}",
                        e, response
                    ))
                })?;
                tracing::debug!(
                    intention = ?intent.intention,
                    confidence = intent.confidence,
                    "intake extracted intent"
                );
                Ok(intent)
            }
            InferenceStrategy::Deterministic => Ok(self.fallback(&input.text)),
        }
    }

    /// Deterministic extraction: keep the utterance usable as an action line
    fn fallback(&self, text: &str) -> ParsedIntent {
        let action: String = text
            .trim()
            .chars()
            .take(self.config.fallback_action_len)
            .collect();
        tracing::debug!("intake running deterministic fallback");
        ParsedIntent {
            intention: Intention::New,
            action,
            entities: Vec::new(),
            due_date: None,
            priority: Priority::P2,
            context: None,
            confidence: self.config.intake_fallback_confidence,
        }
    }
}

/// System prompt for intent extraction
const INTAKE_SYSTEM_PROMPT: &str = r#"You are parsing freeform task-capture messages for a task management workspace.
Convert the message into structured JSON.

EXTRACTION TARGETS:
- intention: what the user wants ("new" = capture new work, "update" = change existing work, "complete" = mark work finished, "question" = asking about state)
- action: short imperative restatement of what to do
- entities: named references in the message, each {"type": "client"|"person"|"project"|"tag", "value": "..."}
- due_date: ISO date (YYYY-MM-DD) if a deadline is stated or clearly implied, else null
- priority: 1 (urgent), 2 (normal), or 3 (low), judged from urgency language
- context: any remaining detail worth keeping, else null
- confidence: 0.0-1.0

OUTPUT FORMAT (JSON only, no explanation):
{
  "intention": "new|update|complete|question",
  "action": "...",
  "entities": [{"type": "client", "value": "..."}],
  "due_date": "YYYY-MM-DD" or null,
  "priority": 1-3,
  "context": "..." or null,
  "confidence": 0.0-1.0
}

Examples:
"Cliente Kabbatec precisa de orcamento ate sexta" -> {"intention": "new", "action": "Preparar orcamento para Kabbatec", "entities": [{"type": "client", "value": "Kabbatec"}], "due_date": "2024-06-07", "priority": 1, "context": null, "confidence": 0.9}
"finish the onboarding deck" -> {"intention": "new", "action": "Finish the onboarding deck", "entities": [], "due_date": null, "priority": 2, "context": null, "confidence": 0.85}
"mark the invoice task done" -> {"intention": "complete", "action": "Mark invoice task done", "entities": [], "due_date": null, "priority": 2, "context": null, "confidence": 0.9}
"#;
