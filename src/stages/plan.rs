//! Plan stage - expand a new-task decision into title, subtasks, and effort
//!
//! Only `create_new` decisions are decomposed; anything targeting an
//! existing task gets a trivial zero-subtask plan that echoes the action.
//! Subtask ordering is load-bearing downstream, so every plan is validated
//! before it leaves this stage: order_index starts at 1 and increases by 1
//! with no gaps.

use crate::core::config::PipelineConfig;
use crate::core::error::{PipelineError, Result};
use crate::llm::provider::{extract_json, InferenceProvider, InferenceStrategy};
use crate::stages::intake::ParsedIntent;
use crate::stages::link::{LinkChoice, LinkDecision};
use serde::{Deserialize, Serialize};

/// A planned unit of work, not yet persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedSubtask {
    pub title: String,
    pub description: String,
    /// 1-based, contiguous within the plan
    pub order_index: u32,
}

/// Output of the plan stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskPlan {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub subtasks: Vec<PlannedSubtask>,
    pub definition_of_done: String,
    pub estimated_minutes: u32,
    pub confidence: f32,
}

impl TaskPlan {
    /// Check the structural invariants the rest of the pipeline relies on
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(PipelineError::Validation("plan title is empty".into()));
        }
        if self.estimated_minutes == 0 {
            return Err(PipelineError::Validation(
                "estimated_minutes must be positive".into(),
            ));
        }
        validate_ordering(&self.subtasks)?;
        Ok(())
    }
}

/// Enforce 1-based contiguous order_index over a subtask list
pub fn validate_ordering(subtasks: &[PlannedSubtask]) -> Result<()> {
    for (i, subtask) in subtasks.iter().enumerate() {
        let expected = (i + 1) as u32;
        if subtask.order_index != expected {
            return Err(PipelineError::Validation(format!(
                "subtask order_index {} at position {} (expected {})",
                subtask.order_index, i, expected
            )));
        }
    }
    Ok(())
}

/// Expands create_new decisions into an ordered work breakdown
pub struct PlanStage<'a> {
    strategy: &'a InferenceStrategy,
    config: &'a PipelineConfig,
}

impl<'a> PlanStage<'a> {
    pub fn new(strategy: &'a InferenceStrategy, config: &'a PipelineConfig) -> Self {
        Self { strategy, config }
    }

    /// Run the stage
    pub async fn run(&self, intent: &ParsedIntent, link: &LinkDecision) -> Result<TaskPlan> {
        if link.choice != LinkChoice::CreateNew {
            // Work targeting an existing task does not get decomposed
            let plan = self.trivial_plan(intent);
            plan.validate()?;
            return Ok(plan);
        }

        let plan = match self.strategy {
            InferenceStrategy::Backed(provider) => {
                let user = format!(
                    "PARSED INTENT:\n{}\n\nExpand this into a task plan. Respond with JSON:",
                    serde_json::to_string_pretty(intent)?
                );
                let response = provider.complete(PLAN_SYSTEM_PROMPT, &user).await?;
                let json = extract_json(&response)?;
                let plan: TaskPlan = serde_json::from_str(json).map_err(|e| {
                    PipelineError::Provider(format!(
                        "Failed to parse plan: {} - Response: {}",
                        e, response
                    ))
                })?;
                let n = plan.subtasks.len();
                if n < self.config.plan_min_subtasks || n > self.config.plan_max_subtasks {
                    return Err(PipelineError::Validation(format!(
                        "plan has {} subtasks, expected {}-{}",
                        n, self.config.plan_min_subtasks, self.config.plan_max_subtasks
                    )));
                }
                plan
            }
            InferenceStrategy::Deterministic => self.fallback_plan(intent),
        };

        plan.validate()?;
        tracing::debug!(
            subtasks = plan.subtasks.len(),
            estimated_minutes = plan.estimated_minutes,
            "plan produced"
        );
        Ok(plan)
    }

    /// Zero-subtask plan echoing the action, for attach/edit decisions
    fn trivial_plan(&self, intent: &ParsedIntent) -> TaskPlan {
        TaskPlan {
            title: intent.action.clone(),
            description: intent.context.clone().unwrap_or_default(),
            subtasks: Vec::new(),
            definition_of_done: intent.action.clone(),
            estimated_minutes: self.config.fallback_estimate_minutes,
            confidence: intent.confidence,
        }
    }

    /// Fixed three-step decomposition used when no provider is configured
    fn fallback_plan(&self, intent: &ParsedIntent) -> TaskPlan {
        let action = &intent.action;
        TaskPlan {
            title: action.clone(),
            description: intent.context.clone().unwrap_or_else(|| action.clone()),
            subtasks: vec![
                PlannedSubtask {
                    title: "Define objective".into(),
                    description: format!("Clarify the outcome expected from: {}", action),
                    order_index: 1,
                },
                PlannedSubtask {
                    title: "Plan execution".into(),
                    description: "Lay out the concrete steps and gather what is needed".into(),
                    order_index: 2,
                },
                PlannedSubtask {
                    title: "Review delivery".into(),
                    description: "Check the result against the objective before handing off".into(),
                    order_index: 3,
                },
            ],
            definition_of_done: format!("{}: reviewed and delivered", action),
            estimated_minutes: self.config.fallback_estimate_minutes,
            confidence: self.config.plan_fallback_confidence,
        }
    }
}

/// System prompt for plan expansion
const PLAN_SYSTEM_PROMPT: &str = r#"You expand a captured task intent into an actionable plan for a task management workspace.

REQUIREMENTS:
- title: short, imperative
- description: one or two sentences of scope
- subtasks: 3 to 7 ordered steps, each {"title", "description", "order_index"}; order_index starts at 1 and increases by 1 with no gaps
- definition_of_done: one sentence stating when the task counts as finished
- estimated_minutes: realistic total effort, positive integer
- confidence: 0.0-1.0

OUTPUT FORMAT (JSON only, no explanation):
{
  "title": "...",
  "description": "...",
  "subtasks": [{"title": "...", "description": "...", "order_index": 1}],
  "definition_of_done": "...",
  "estimated_minutes": 90,
  "confidence": 0.0-1.0
}
"#;
