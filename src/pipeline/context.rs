//! Read-only context snapshots carried through a pipeline run
//!
//! Both the workspace context and the existing-task window are captured once
//! per run and never mutated mid-run. Their `summary()` renderings feed the
//! provider prompts for disambiguation.

use crate::core::types::{Task, TaskId, TaskStatus};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A calendar event on the day of the run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub title: String,
    pub start: chrono::DateTime<chrono::Utc>,
    pub duration_minutes: u32,
}

/// Workspace-level signals consumed by the priority stage
#[derive(Debug, Clone, Default)]
pub struct WorkspaceContext {
    /// Contracted response hours per client name
    pub client_slas: HashMap<String, u32>,
    /// Today's calendar, for the prompt only
    pub calendar_today: Vec<CalendarEvent>,
    /// How many priority-1 tasks the workspace already has today
    pub p1_count: u32,
}

impl WorkspaceContext {
    /// Case-insensitive SLA lookup by client name
    pub fn sla_hours(&self, client: &str) -> Option<u32> {
        let client_lower = client.to_lowercase();
        self.client_slas
            .iter()
            .find(|(name, _)| name.to_lowercase() == client_lower)
            .map(|(_, hours)| *hours)
    }

    /// Render the context for provider prompts
    pub fn summary(&self) -> String {
        let mut s = String::new();

        if !self.client_slas.is_empty() {
            s.push_str("Clients with contracted SLAs:\n");
            let mut slas: Vec<_> = self.client_slas.iter().collect();
            slas.sort_by(|a, b| a.0.cmp(b.0));
            for (client, hours) in slas {
                s.push_str(&format!("- {} ({}h response)\n", client, hours));
            }
        }

        s.push_str(&format!("Open priority-1 tasks today: {}\n", self.p1_count));

        if !self.calendar_today.is_empty() {
            s.push_str("Today's calendar:\n");
            for event in &self.calendar_today {
                s.push_str(&format!(
                    "- {} at {} ({} min)\n",
                    event.title,
                    event.start.format("%H:%M"),
                    event.duration_minutes
                ));
            }
        }

        s
    }
}

/// Bounded most-recent-first view over a workspace's existing tasks
///
/// At most `limit` tasks are kept; anything older is invisible to the link
/// stage and cannot be attached to. The window is a snapshot: it does not
/// observe store writes made after capture.
#[derive(Debug, Clone)]
pub struct TaskWindow {
    tasks: Vec<Task>,
}

impl TaskWindow {
    /// Build a window from existing tasks, newest first, capped at `limit`
    pub fn new(mut tasks: Vec<Task>, limit: usize) -> Self {
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        tasks.truncate(limit);
        Self { tasks }
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    /// Resolve a task id within the window
    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Render the window for provider prompts
    pub fn summary(&self) -> String {
        if self.tasks.is_empty() {
            return "No existing tasks.\n".into();
        }

        let mut s = String::from("Existing tasks (most recent first):\n");
        for task in &self.tasks {
            let status = match task.status {
                TaskStatus::Open => "open",
                TaskStatus::InProgress => "in progress",
                TaskStatus::Done => "done",
            };
            let client = task.client.as_deref().unwrap_or("-");
            let due = task
                .due_date
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".into());
            s.push_str(&format!(
                "- id={} title=\"{}\" client={} status={} due={} created={}\n",
                task.id,
                task.title,
                client,
                status,
                due,
                task.created_at.format("%Y-%m-%d %H:%M"),
            ));
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Priority, WorkspaceId};
    use chrono::{Duration, Utc};

    fn task(title: &str, age_hours: i64) -> Task {
        Task {
            id: TaskId::new(),
            workspace_id: WorkspaceId::new(),
            title: title.into(),
            description: String::new(),
            status: TaskStatus::Open,
            priority: Priority::P3,
            due_date: None,
            client: None,
            entities: vec![],
            subtasks: vec![],
            definition_of_done: None,
            estimated_minutes: None,
            created_at: Utc::now() - Duration::hours(age_hours),
        }
    }

    #[test]
    fn test_window_orders_newest_first() {
        let window = TaskWindow::new(vec![task("old", 48), task("new", 1), task("mid", 24)], 10);
        let titles: Vec<_> = window.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["new", "mid", "old"]);
    }

    #[test]
    fn test_window_caps_at_limit() {
        let tasks = (0..20).map(|i| task(&format!("t{}", i), i)).collect();
        let window = TaskWindow::new(tasks, 10);
        assert_eq!(window.len(), 10);
        // The newest survive the cap
        assert_eq!(window.iter().next().unwrap().title, "t0");
    }

    #[test]
    fn test_window_get_resolves_only_inside_window() {
        let inside = task("inside", 1);
        let inside_id = inside.id;
        let window = TaskWindow::new(vec![inside], 10);
        assert!(window.get(inside_id).is_some());
        assert!(window.get(TaskId::new()).is_none());
    }

    #[test]
    fn test_sla_lookup_case_insensitive() {
        let mut ctx = WorkspaceContext::default();
        ctx.client_slas.insert("Kabbatec".into(), 4);
        assert_eq!(ctx.sla_hours("kabbatec"), Some(4));
        assert_eq!(ctx.sla_hours("KABBATEC"), Some(4));
        assert_eq!(ctx.sla_hours("Other"), None);
    }

    #[test]
    fn test_context_summary_mentions_slas_and_p1_load() {
        let mut ctx = WorkspaceContext::default();
        ctx.client_slas.insert("Kabbatec".into(), 4);
        ctx.p1_count = 2;
        let summary = ctx.summary();
        assert!(summary.contains("Kabbatec"));
        assert!(summary.contains("4h"));
        assert!(summary.contains("2"));
    }

    #[test]
    fn test_empty_window_summary() {
        let window = TaskWindow::new(vec![], 10);
        assert!(window.summary().contains("No existing tasks"));
    }
}
