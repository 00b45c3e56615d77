//! Pipeline orchestrator - sequences the five stages over shared state
//!
//! Strict order: Intake -> Link -> Plan -> Priority -> Execution. No
//! parallelism, no stage entered twice. A stage failure is recorded and
//! terminates the run; outputs already computed stay in the state for
//! diagnostics, but no task is produced. Stages never retry; retry policy,
//! if any, belongs to the caller.

use crate::core::config::PipelineConfig;
use crate::core::types::{Task, WorkspaceId};
use crate::llm::provider::InferenceStrategy;
use crate::pipeline::context::{TaskWindow, WorkspaceContext};
use crate::pipeline::state::{min_confidence, PipelineState, PipelineStatus};
use crate::stages::execution::{ExecutionOutcome, ExecutionStage};
use crate::stages::intake::{IntakeStage, RawInput};
use crate::stages::link::LinkStage;
use crate::stages::plan::PlanStage;
use crate::stages::priority::PriorityStage;
use crate::store::TaskStore;

/// The task-intake pipeline
///
/// Construct once, run per user message. Independent runs share nothing but
/// the external store; the strategy and config are read-only.
pub struct Pipeline {
    strategy: InferenceStrategy,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(strategy: InferenceStrategy, config: PipelineConfig) -> Self {
        Self { strategy, config }
    }

    /// Build with defaults, selecting the strategy from the environment
    pub fn from_env() -> Self {
        let config = PipelineConfig::default();
        let strategy = InferenceStrategy::from_env(config.provider_timeout);
        Self::new(strategy, config)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn strategy(&self) -> &InferenceStrategy {
        &self.strategy
    }

    /// Process one freeform message into a pipeline state
    ///
    /// `existing_tasks` and `context` are read-only snapshots for the whole
    /// run; the window is capped at `config.task_window`, most recent first.
    pub async fn process(
        &self,
        raw_text: &str,
        workspace_id: WorkspaceId,
        existing_tasks: Vec<Task>,
        context: &WorkspaceContext,
    ) -> PipelineState {
        let window = TaskWindow::new(existing_tasks, self.config.task_window);
        let mut state = PipelineState::new(workspace_id);
        let input = RawInput::new(raw_text, workspace_id);

        tracing::info!(
            workspace = ?workspace_id,
            window = window.len(),
            backed = self.strategy.is_backed(),
            "pipeline run started"
        );

        let intake = IntakeStage::new(&self.strategy, &self.config);
        let intent = match intake.run(&input).await {
            Ok(intent) => intent,
            Err(e) => return self.fail(state, "intake", e),
        };
        state.intent = Some(intent.clone());

        let link_stage = LinkStage::new(&self.strategy, &self.config);
        let link = match link_stage.run(&intent, &window).await {
            Ok(link) => link,
            Err(e) => return self.fail(state, "link", e),
        };
        state.link = Some(link.clone());

        let plan_stage = PlanStage::new(&self.strategy, &self.config);
        let plan = match plan_stage.run(&intent, &link).await {
            Ok(plan) => plan,
            Err(e) => return self.fail(state, "plan", e),
        };
        state.plan = Some(plan.clone());

        let priority_stage = PriorityStage::new(&self.strategy, &self.config);
        let priority = match priority_stage.run(&intent, &plan, context).await {
            Ok(priority) => priority,
            Err(e) => return self.fail(state, "priority", e),
        };
        state.priority = Some(priority.clone());

        match ExecutionStage::run(workspace_id, &intent, &link, &plan, &priority, &window) {
            Ok(outcome) => {
                state.outcome = Some(outcome);
                state.status = PipelineStatus::CompletedWithTask;
                state.confidence = min_confidence(&state.stage_confidences());
                tracing::info!(confidence = state.confidence, "pipeline run completed");
                state
            }
            Err(e) => self.fail(state, "execution", e),
        }
    }

    /// Process and, on success, persist the outcome through the store
    ///
    /// Insert outcomes are saved; attach and edit outcomes become updates
    /// against the target task. A store failure flips the run to failed.
    pub async fn process_and_persist(
        &self,
        raw_text: &str,
        workspace_id: WorkspaceId,
        context: &WorkspaceContext,
        store: &dyn TaskStore,
    ) -> PipelineState {
        let existing = match store.list_recent(workspace_id, self.config.task_window).await {
            Ok(tasks) => tasks,
            Err(e) => {
                return self.fail(PipelineState::new(workspace_id), "store", e);
            }
        };

        let mut state = self.process(raw_text, workspace_id, existing, context).await;
        if !state.is_completed() {
            return state;
        }

        let result = match &state.outcome {
            Some(ExecutionOutcome::Insert { task }) => store.save(task.clone()).await.map(|_| ()),
            Some(ExecutionOutcome::Attach { target, subtask }) => {
                let patch = crate::core::types::TaskPatch {
                    append_subtasks: vec![subtask.clone()],
                    ..Default::default()
                };
                store.update(*target, patch).await.map(|_| ())
            }
            Some(ExecutionOutcome::Edit { target, patch }) => {
                store.update(*target, patch.clone()).await.map(|_| ())
            }
            None => Ok(()),
        };

        if let Err(e) = result {
            return self.fail(state, "persist", e);
        }
        state
    }

    fn fail(
        &self,
        mut state: PipelineState,
        stage: &str,
        error: crate::core::error::PipelineError,
    ) -> PipelineState {
        tracing::warn!(stage, %error, "pipeline stage failed, aborting run");
        state.errors.push(format!("{}: {}", stage, error));
        state.status = PipelineStatus::Failed;
        state.outcome = None;
        state.confidence = min_confidence(&state.stage_confidences());
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::PipelineError;
    use crate::llm::provider::InferenceProvider;
    use async_trait::async_trait;

    /// Provider whose intake call always fails
    struct FailingProvider;

    #[async_trait]
    impl InferenceProvider for FailingProvider {
        async fn complete(&self, _system: &str, _user: &str) -> crate::core::error::Result<String> {
            Err(PipelineError::Provider("boom".into()))
        }
    }

    #[tokio::test]
    async fn test_intake_failure_leaves_no_partial_outputs() {
        let pipeline = Pipeline::new(
            InferenceStrategy::backed(std::sync::Arc::new(FailingProvider)),
            PipelineConfig::default(),
        );
        let state = pipeline
            .process(
                "some message",
                WorkspaceId::new(),
                vec![],
                &WorkspaceContext::default(),
            )
            .await;

        assert_eq!(state.status, PipelineStatus::Failed);
        assert!(state.intent.is_none());
        assert!(state.link.is_none());
        assert!(state.plan.is_none());
        assert!(state.priority.is_none());
        assert!(state.outcome.is_none());
        assert_eq!(state.errors.len(), 1);
        assert!(state.errors[0].starts_with("intake:"));
        assert_eq!(state.confidence, 0.0);
    }

    #[tokio::test]
    async fn test_empty_input_fails_at_intake() {
        let pipeline = Pipeline::new(InferenceStrategy::Deterministic, PipelineConfig::default());
        let state = pipeline
            .process("", WorkspaceId::new(), vec![], &WorkspaceContext::default())
            .await;
        assert_eq!(state.status, PipelineStatus::Failed);
        assert!(state.errors[0].contains("empty"));
    }
}
