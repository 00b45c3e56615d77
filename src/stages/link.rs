//! Link stage - decide whether the intent is new work, an attachment, or an edit
//!
//! Consumes the parsed intent plus the bounded window of existing tasks and
//! decides how the new input relates to work already in flight. The decision
//! weighs contextual similarity (same client/project), temporal proximity
//! (same day/week), and complementarity (is this naturally a sub-step of an
//! open task). Tie-break: when signals are ambiguous, prefer `create_new`;
//! missing a legitimate link is cheaper than corrupting an unrelated task.

use crate::core::config::PipelineConfig;
use crate::core::error::{PipelineError, Result};
use crate::core::types::TaskId;
use crate::llm::provider::{extract_json, InferenceProvider, InferenceStrategy};
use crate::pipeline::context::TaskWindow;
use crate::stages::intake::ParsedIntent;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How the intent relates to existing work
///
/// The target id only exists for the variants that need one, so
/// "create_new has no target" holds by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkChoice {
    CreateNew,
    AttachTo(TaskId),
    EditExisting(TaskId),
}

impl LinkChoice {
    pub fn target(&self) -> Option<TaskId> {
        match self {
            LinkChoice::CreateNew => None,
            LinkChoice::AttachTo(id) | LinkChoice::EditExisting(id) => Some(*id),
        }
    }
}

/// Output of the link stage
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "LinkWire", into = "LinkWire")]
pub struct LinkDecision {
    pub choice: LinkChoice,
    pub reasoning: String,
    pub confidence: f32,
}

/// Flat wire shape used in the provider contract
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LinkWire {
    decision: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    target_task_id: Option<Uuid>,
    reasoning: String,
    confidence: f32,
}

impl TryFrom<LinkWire> for LinkDecision {
    type Error = String;

    fn try_from(wire: LinkWire) -> std::result::Result<Self, Self::Error> {
        let choice = match (wire.decision.as_str(), wire.target_task_id) {
            ("create_new", None) => LinkChoice::CreateNew,
            ("create_new", Some(_)) => {
                return Err("create_new must not carry a target_task_id".into())
            }
            ("attach_to", Some(id)) => LinkChoice::AttachTo(TaskId(id)),
            ("edit_existing", Some(id)) => LinkChoice::EditExisting(TaskId(id)),
            ("attach_to", None) | ("edit_existing", None) => {
                return Err(format!("{} requires a target_task_id", wire.decision))
            }
            (other, _) => return Err(format!("unknown link decision: {}", other)),
        };
        Ok(LinkDecision {
            choice,
            reasoning: wire.reasoning,
            confidence: wire.confidence,
        })
    }
}

impl From<LinkDecision> for LinkWire {
    fn from(d: LinkDecision) -> Self {
        let (decision, target_task_id) = match d.choice {
            LinkChoice::CreateNew => ("create_new", None),
            LinkChoice::AttachTo(id) => ("attach_to", Some(id.0)),
            LinkChoice::EditExisting(id) => ("edit_existing", Some(id.0)),
        };
        LinkWire {
            decision: decision.into(),
            target_task_id,
            reasoning: d.reasoning,
            confidence: d.confidence,
        }
    }
}

/// Decides new-vs-attach-vs-edit against the task window
pub struct LinkStage<'a> {
    strategy: &'a InferenceStrategy,
    config: &'a PipelineConfig,
}

impl<'a> LinkStage<'a> {
    pub fn new(strategy: &'a InferenceStrategy, config: &'a PipelineConfig) -> Self {
        Self { strategy, config }
    }

    /// Run the stage
    ///
    /// An empty window short-circuits to `create_new` without a provider
    /// call. Structural problems in the provider response fail here;
    /// whether a named target actually resolves in the window is checked by
    /// the execution stage.
    pub async fn run(&self, intent: &ParsedIntent, window: &TaskWindow) -> Result<LinkDecision> {
        if window.is_empty() {
            return Ok(LinkDecision {
                choice: LinkChoice::CreateNew,
                reasoning: "workspace has no recent tasks to link to".into(),
                confidence: 0.95,
            });
        }

        match self.strategy {
            InferenceStrategy::Backed(provider) => {
                let user = format!(
                    "PARSED INTENT:\n{}\n\n{}\nDecide how this input relates to the existing tasks. Respond with JSON:",
                    serde_json::to_string_pretty(intent)?,
                    window.summary()
                );
                let response = provider.complete(LINK_SYSTEM_PROMPT, &user).await?;
                let json = extract_json(&response)?;
                let decision: LinkDecision = serde_json::from_str(json).map_err(|e| {
                    PipelineError::Provider(format!(
                        "Failed to parse link decision: {} - Response: {}",
                        e, response
                    ))
                })?;

                tracing::debug!(choice = ?decision.choice, confidence = decision.confidence, "link decided");
                Ok(decision)
            }
            InferenceStrategy::Deterministic => {
                tracing::debug!("link running deterministic fallback");
                Ok(LinkDecision {
                    choice: LinkChoice::CreateNew,
                    reasoning: "no inference provider configured; defaulting to new task".into(),
                    confidence: self.config.link_fallback_confidence,
                })
            }
        }
    }
}

/// System prompt for the link decision
const LINK_SYSTEM_PROMPT: &str = r#"You decide how a newly captured task intent relates to a workspace's existing tasks.

DECISIONS:
- create_new: the input is independent work
- attach_to: the input is naturally a sub-step of an existing open task
- edit_existing: the input changes an existing task (deadline, scope, completion)

WEIGH THESE SIGNALS:
- Contextual similarity: same client, project, or named people
- Temporal proximity: references to work from the same day or week
- Complementarity: does the input read as a step toward an existing open task, or as independent work

TIE-BREAK: when signals are ambiguous, choose create_new. Missing a legitimate link is cheaper than silently attaching to the wrong task.

target_task_id MUST be one of the listed task ids, and MUST be omitted for create_new.

OUTPUT FORMAT (JSON only, no explanation):
{
  "decision": "create_new|attach_to|edit_existing",
  "target_task_id": "uuid of the target task (omit for create_new)",
  "reasoning": "one sentence",
  "confidence": 0.0-1.0
}
"#;
