//! Core type definitions used throughout the pipeline

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Unique identifier for workspaces (the tenant boundary)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkspaceId(pub Uuid);

impl WorkspaceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for WorkspaceId {
    fn default() -> Self {
        Self::new()
    }
}

/// Priority tiers with explicit numeric values
///
/// Lower numeric value = more urgent. P1 is the most urgent tier.
/// Serialized as the bare integer so provider prompts and responses
/// can use 1/2/3 directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Priority {
    P1 = 1,
    P2 = 2,
    P3 = 3,
}

impl Priority {
    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Priority::P1),
            2 => Some(Priority::P2),
            3 => Some(Priority::P3),
            _ => None,
        }
    }

    pub fn as_number(self) -> u8 {
        self as u8
    }
}

impl Serialize for Priority {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u8(*self as u8)
    }
}

impl<'de> Deserialize<'de> for Priority {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let n = u8::deserialize(deserializer)?;
        Priority::from_number(n)
            .ok_or_else(|| serde::de::Error::custom(format!("priority out of range: {}", n)))
    }
}

/// Task lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Open,
    InProgress,
    Done,
}

/// Kind of named reference extracted from input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Client,
    Person,
    Project,
    Tag,
}

/// A named reference (client, person, project, tag) associated with a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    #[serde(rename = "type")]
    pub kind: EntityKind,
    pub value: String,
}

impl EntityRef {
    pub fn new(kind: EntityKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}

/// A unit of work within a task
///
/// `order_index` is 1-based and contiguous within the owning task; rendering
/// and sequencing downstream rely on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subtask {
    pub id: TaskId,
    pub title: String,
    pub description: String,
    pub order_index: u32,
    pub done: bool,
}

impl Subtask {
    pub fn new(title: impl Into<String>, description: impl Into<String>, order_index: u32) -> Self {
        Self {
            id: TaskId::new(),
            title: title.into(),
            description: description.into(),
            order_index,
            done: false,
        }
    }
}

/// The final task artifact produced by the pipeline
///
/// Owned by a workspace; subtasks are owned by the task, entities are
/// workspace-owned references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub workspace_id: WorkspaceId,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
    /// Client name this task is associated with, when one was identified
    pub client: Option<String>,
    pub entities: Vec<EntityRef>,
    pub subtasks: Vec<Subtask>,
    pub definition_of_done: Option<String>,
    pub estimated_minutes: Option<u32>,
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Highest order_index currently in use (0 when there are no subtasks)
    pub fn max_order_index(&self) -> u32 {
        self.subtasks.iter().map(|s| s.order_index).max().unwrap_or(0)
    }
}

/// Update instruction applied to an existing task
///
/// Every field is optional; `None` means "leave unchanged". Appended
/// subtasks are renumbered by the store to extend the target's ordering.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub due_date: Option<NaiveDate>,
    pub status: Option<TaskStatus>,
    /// Free-text note appended to the task description
    pub append_note: Option<String>,
    /// Subtasks to append after the task's current last order_index
    pub append_subtasks: Vec<Subtask>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.due_date.is_none()
            && self.status.is_none()
            && self.append_note.is_none()
            && self.append_subtasks.is_empty()
    }
}
