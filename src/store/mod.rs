//! Task store collaborator interface
//!
//! The pipeline constructs records; persistence belongs to the store. The
//! store also owns concurrency control (id uniqueness, isolation), which is
//! why `MemoryStore` is a plain `RwLock` map: good enough for tests and
//! demos, replaced by the real backend in production wiring.

use crate::core::error::{PipelineError, Result};
use crate::core::types::{Task, TaskId, TaskPatch, WorkspaceId};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Persistence seam consumed by the orchestrator
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Most recent tasks for a workspace, newest first, at most `limit`
    async fn list_recent(&self, workspace_id: WorkspaceId, limit: usize) -> Result<Vec<Task>>;

    /// Insert a new task
    async fn save(&self, task: Task) -> Result<Task>;

    /// Apply a patch to an existing task
    async fn update(&self, task_id: TaskId, patch: TaskPatch) -> Result<Task>;
}

/// In-memory store used by tests and demos
#[derive(Default)]
pub struct MemoryStore {
    tasks: RwLock<HashMap<TaskId, Task>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with existing tasks
    pub async fn seed(&self, tasks: Vec<Task>) {
        let mut guard = self.tasks.write().await;
        for task in tasks {
            guard.insert(task.id, task);
        }
    }

    pub async fn get(&self, task_id: TaskId) -> Option<Task> {
        self.tasks.read().await.get(&task_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }
}

/// Apply a patch to a task value, field-wise
///
/// Appended subtasks are renumbered to extend the task's current ordering so
/// the contiguity invariant survives concurrent attach flows.
pub fn apply_patch(task: &mut Task, patch: TaskPatch) {
    if let Some(title) = patch.title {
        task.title = title;
    }
    if let Some(description) = patch.description {
        task.description = description;
    }
    if let Some(priority) = patch.priority {
        task.priority = priority;
    }
    if let Some(due_date) = patch.due_date {
        task.due_date = Some(due_date);
    }
    if let Some(status) = patch.status {
        task.status = status;
    }
    if let Some(note) = patch.append_note {
        if task.description.is_empty() {
            task.description = note;
        } else {
            task.description.push_str("\n\n");
            task.description.push_str(&note);
        }
    }
    let mut next = task.max_order_index();
    for mut subtask in patch.append_subtasks {
        next += 1;
        subtask.order_index = next;
        task.subtasks.push(subtask);
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn list_recent(&self, workspace_id: WorkspaceId, limit: usize) -> Result<Vec<Task>> {
        let guard = self.tasks.read().await;
        let mut tasks: Vec<Task> = guard
            .values()
            .filter(|t| t.workspace_id == workspace_id)
            .cloned()
            .collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        tasks.truncate(limit);
        Ok(tasks)
    }

    async fn save(&self, task: Task) -> Result<Task> {
        let mut guard = self.tasks.write().await;
        if guard.contains_key(&task.id) {
            return Err(PipelineError::Store(format!(
                "task {} already exists",
                task.id
            )));
        }
        guard.insert(task.id, task.clone());
        Ok(task)
    }

    async fn update(&self, task_id: TaskId, patch: TaskPatch) -> Result<Task> {
        let mut guard = self.tasks.write().await;
        let task = guard
            .get_mut(&task_id)
            .ok_or_else(|| PipelineError::Store(format!("task {} not found", task_id)))?;
        apply_patch(task, patch);
        Ok(task.clone())
    }
}
