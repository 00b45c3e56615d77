//! Execution stage - materialize the final task record
//!
//! Pure construction: combines the plan, priority, and link decisions into
//! the value the store will persist, without touching the store itself.
//! Attach and edit targets must resolve inside the supplied window; an
//! unresolved target is an explicit failure, never a silent downgrade to a
//! new task, because that would mask a linking bug.

use crate::core::error::{PipelineError, Result};
use crate::core::types::{Subtask, Task, TaskId, TaskPatch, TaskStatus, WorkspaceId};
use crate::pipeline::context::TaskWindow;
use crate::stages::intake::{Intention, ParsedIntent};
use crate::stages::link::{LinkChoice, LinkDecision};
use crate::stages::plan::TaskPlan;
use crate::stages::priority::PriorityDecision;
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// What the pipeline hands to the persistence layer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutionOutcome {
    /// Insert a new task (subtasks ride along inside it)
    Insert { task: Task },
    /// Append a derived subtask to an existing task
    Attach { target: TaskId, subtask: Subtask },
    /// Apply an update to an existing task
    Edit { target: TaskId, patch: TaskPatch },
}

impl ExecutionOutcome {
    /// The task the outcome writes to (the new task's id for inserts)
    pub fn task_id(&self) -> TaskId {
        match self {
            ExecutionOutcome::Insert { task } => task.id,
            ExecutionOutcome::Attach { target, .. } | ExecutionOutcome::Edit { target, .. } => {
                *target
            }
        }
    }
}

/// Builds the final record from all prior stage outputs
pub struct ExecutionStage;

impl ExecutionStage {
    /// Run the stage
    pub fn run(
        workspace_id: WorkspaceId,
        intent: &ParsedIntent,
        link: &LinkDecision,
        plan: &TaskPlan,
        priority: &PriorityDecision,
        window: &TaskWindow,
    ) -> Result<ExecutionOutcome> {
        match link.choice {
            LinkChoice::CreateNew => {
                let subtasks = plan
                    .subtasks
                    .iter()
                    .map(|s| Subtask::new(s.title.clone(), s.description.clone(), s.order_index))
                    .collect();
                let task = Task {
                    id: TaskId::new(),
                    workspace_id,
                    title: plan.title.clone(),
                    description: plan.description.clone(),
                    status: TaskStatus::Open,
                    priority: priority.priority,
                    due_date: priority.suggested_due_date,
                    client: intent.client().map(str::to_owned),
                    entities: intent.entities.clone(),
                    subtasks,
                    definition_of_done: Some(plan.definition_of_done.clone()),
                    estimated_minutes: Some(plan.estimated_minutes),
                    created_at: Utc::now(),
                };
                tracing::info!(task_id = %task.id, "execution materialized new task");
                Ok(ExecutionOutcome::Insert { task })
            }
            LinkChoice::AttachTo(target) => {
                let parent = Self::resolve(window, target)?;
                // The new step extends the parent's ordering
                let subtask = Subtask::new(
                    plan.title.clone(),
                    plan.description.clone(),
                    parent.max_order_index() + 1,
                );
                tracing::info!(task_id = %target, "execution derived subtask for attach");
                Ok(ExecutionOutcome::Attach { target, subtask })
            }
            LinkChoice::EditExisting(target) => {
                Self::resolve(window, target)?;
                let patch = TaskPatch {
                    due_date: priority.suggested_due_date,
                    priority: Some(priority.priority),
                    status: (intent.intention == Intention::Complete).then_some(TaskStatus::Done),
                    append_note: intent.context.clone().or_else(|| Some(intent.action.clone())),
                    ..Default::default()
                };
                tracing::info!(task_id = %target, "execution built edit patch");
                Ok(ExecutionOutcome::Edit { target, patch })
            }
        }
    }

    fn resolve(window: &TaskWindow, target: TaskId) -> Result<&Task> {
        window
            .get(target)
            .ok_or(PipelineError::LinkResolution(target))
    }
}
