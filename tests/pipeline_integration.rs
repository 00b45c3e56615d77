//! End-to-end pipeline tests with a scripted inference provider
//!
//! These cover the provider-backed flows:
//! - SLA-client capture (create_new, priority 1, due date suggested)
//! - same-day follow-up (attach_to an existing task)
//! - unresolvable attach target (fails at execution, no task produced)
//! - malformed provider output (stage failure aborts the run)

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::VecDeque;
use std::sync::Arc;
use task_intake::core::types::{
    Priority, Subtask, Task, TaskId, TaskStatus, WorkspaceId,
};
use task_intake::stages::execution::ExecutionOutcome;
use task_intake::stages::link::LinkChoice;
use task_intake::{
    InferenceProvider, InferenceStrategy, MemoryStore, Pipeline, PipelineConfig, PipelineStatus,
    WorkspaceContext,
};
use tokio::sync::Mutex;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Returns canned responses in call order
struct ScriptedProvider {
    responses: Mutex<VecDeque<String>>,
}

impl ScriptedProvider {
    fn new(responses: Vec<&str>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into_iter().map(String::from).collect()),
        })
    }
}

#[async_trait]
impl InferenceProvider for ScriptedProvider {
    async fn complete(&self, _system: &str, _user: &str) -> task_intake::Result<String> {
        self.responses
            .lock()
            .await
            .pop_front()
            .ok_or_else(|| task_intake::PipelineError::Provider("script exhausted".into()))
    }
}

fn pipeline_with(provider: Arc<dyn InferenceProvider>) -> Pipeline {
    Pipeline::new(
        InferenceStrategy::backed(provider),
        PipelineConfig::default(),
    )
}

fn existing_task(workspace_id: WorkspaceId, title: &str, client: Option<&str>) -> Task {
    Task {
        id: TaskId::new(),
        workspace_id,
        title: title.into(),
        description: String::new(),
        status: TaskStatus::Open,
        priority: Priority::P2,
        due_date: None,
        client: client.map(str::to_owned),
        entities: vec![],
        subtasks: vec![Subtask::new("first step", "", 1)],
        definition_of_done: None,
        estimated_minutes: None,
        created_at: Utc::now(),
    }
}

const PLAN_RESPONSE: &str = r#"{
    "title": "Preparar orcamento para Kabbatec",
    "description": "Montar e enviar o orcamento solicitado",
    "subtasks": [
        {"title": "Levantar escopo", "description": "", "order_index": 1},
        {"title": "Calcular valores", "description": "", "order_index": 2},
        {"title": "Montar documento", "description": "", "order_index": 3},
        {"title": "Enviar ao cliente", "description": "", "order_index": 4}
    ],
    "definition_of_done": "Orcamento enviado ao cliente",
    "estimated_minutes": 120,
    "confidence": 0.85
}"#;

// ============================================================================
// Scenario: SLA client capture
// ============================================================================

/// "Cliente Kabbatec precisa de orçamento até sexta" with a contracted SLA
/// for Kabbatec must create a new P1 task with a due date.
#[tokio::test]
async fn test_sla_client_capture_creates_p1_task() {
    init_tracing();
    let friday = "2030-06-07"; // a Friday
    let intake = format!(
        r#"{{"intention": "new", "action": "Preparar orcamento para Kabbatec",
            "entities": [{{"type": "client", "value": "Kabbatec"}}],
            "due_date": "{}", "priority": 1, "context": null, "confidence": 0.9}}"#,
        friday
    );
    let link = r#"{"decision": "create_new", "reasoning": "no related open task", "confidence": 0.9}"#;
    let priority = format!(
        r#"{{"suggested_due_date": "{}", "priority": 2, "reasoning": "client deadline stated", "confidence": 0.9}}"#,
        friday
    );

    let provider = ScriptedProvider::new(vec![&intake, link, PLAN_RESPONSE, &priority]);
    let pipeline = pipeline_with(provider);

    let workspace_id = WorkspaceId::new();
    let mut context = WorkspaceContext::default();
    context.client_slas.insert("Kabbatec".into(), 4);

    let state = pipeline
        .process(
            "Cliente Kabbatec precisa de orçamento até sexta",
            workspace_id,
            vec![existing_task(workspace_id, "Unrelated work", None)],
            &context,
        )
        .await;

    assert_eq!(state.status, PipelineStatus::CompletedWithTask);
    let link = state.link.as_ref().unwrap();
    assert_eq!(link.choice, LinkChoice::CreateNew);

    let priority = state.priority.as_ref().unwrap();
    assert_eq!(priority.priority, Priority::P1);
    assert!(priority.reasoning.contains("SLA"));
    assert_eq!(
        priority.suggested_due_date,
        Some(NaiveDate::from_ymd_opt(2030, 6, 7).unwrap())
    );

    let Some(ExecutionOutcome::Insert { task }) = state.outcome else {
        panic!("expected an insert outcome");
    };
    assert_eq!(task.priority, Priority::P1);
    assert_eq!(task.client.as_deref(), Some("Kabbatec"));
    assert_eq!(task.subtasks.len(), 4);
    assert!(task.due_date.is_some());
}

// ============================================================================
// Scenario: same-day follow-up attaches to the open task
// ============================================================================

/// Input referencing an existing open task's client on the same day attaches
/// a derived subtask to that task.
#[tokio::test]
async fn test_same_day_follow_up_attaches_to_existing_task() {
    let workspace_id = WorkspaceId::new();
    let parent = existing_task(workspace_id, "Website da Kabbatec", Some("Kabbatec"));
    let parent_id = parent.id;

    let intake = r#"{"intention": "new", "action": "Revisar a home do site da Kabbatec",
        "entities": [{"type": "client", "value": "Kabbatec"}],
        "due_date": null, "priority": 2, "context": null, "confidence": 0.9}"#;
    let link = format!(
        r#"{{"decision": "attach_to", "target_task_id": "{}",
            "reasoning": "same client, same day, reads as a step of the open website task",
            "confidence": 0.85}}"#,
        parent_id.0
    );
    // attach_to short-circuits the plan stage, so the next scripted call is priority
    let priority = r#"{"suggested_due_date": null, "priority": 2, "reasoning": "routine follow-up", "confidence": 0.8}"#;

    let provider = ScriptedProvider::new(vec![intake, &link, priority]);
    let pipeline = pipeline_with(provider);

    let state = pipeline
        .process(
            "revisar a home do site da Kabbatec hoje",
            workspace_id,
            vec![parent],
            &WorkspaceContext::default(),
        )
        .await;

    assert_eq!(state.status, PipelineStatus::CompletedWithTask);
    let Some(ExecutionOutcome::Attach { target, subtask }) = state.outcome else {
        panic!("expected an attach outcome");
    };
    assert_eq!(target, parent_id);
    // Parent already had order_index 1
    assert_eq!(subtask.order_index, 2);
    assert!(state.plan.as_ref().unwrap().subtasks.is_empty());
}

// ============================================================================
// Scenario: attach target outside the window
// ============================================================================

/// An attach_to decision naming a task outside the supplied window must fail
/// the run at execution, never silently fall back to create_new.
#[tokio::test]
async fn test_unresolvable_attach_target_fails_run() {
    init_tracing();
    let workspace_id = WorkspaceId::new();
    let ghost = TaskId::new();

    let intake = r#"{"intention": "new", "action": "follow up",
        "entities": [], "due_date": null, "priority": 2, "context": null, "confidence": 0.9}"#;
    let link = format!(
        r#"{{"decision": "attach_to", "target_task_id": "{}",
            "reasoning": "looks related", "confidence": 0.7}}"#,
        ghost.0
    );
    let priority = r#"{"suggested_due_date": null, "priority": 2, "reasoning": "routine", "confidence": 0.8}"#;

    let provider = ScriptedProvider::new(vec![intake, &link, priority]);
    let pipeline = pipeline_with(provider);

    let state = pipeline
        .process(
            "follow up on that thing",
            workspace_id,
            vec![existing_task(workspace_id, "Some other task", None)],
            &WorkspaceContext::default(),
        )
        .await;

    assert_eq!(state.status, PipelineStatus::Failed);
    assert!(state.outcome.is_none());
    assert_eq!(state.errors.len(), 1);
    assert!(state.errors[0].starts_with("execution:"));
    assert!(state.errors[0].contains("Link target not found"));
    // Earlier stage outputs are retained for diagnostics
    assert!(state.intent.is_some());
    assert!(state.link.is_some());
}

// ============================================================================
// Scenario: malformed provider output
// ============================================================================

/// A provider response with no JSON aborts the run at the owning stage.
#[tokio::test]
async fn test_malformed_intake_response_fails_run() {
    let provider = ScriptedProvider::new(vec!["sorry, I cannot help with that"]);
    let pipeline = pipeline_with(provider);

    let state = pipeline
        .process(
            "prepare the budget",
            WorkspaceId::new(),
            vec![],
            &WorkspaceContext::default(),
        )
        .await;

    assert_eq!(state.status, PipelineStatus::Failed);
    assert!(state.intent.is_none());
    assert!(state.outcome.is_none());
    assert!(state.errors[0].starts_with("intake:"));
}

// ============================================================================
// Persistence through the store
// ============================================================================

/// process_and_persist saves insert outcomes and applies attach outcomes as
/// updates against the target task.
#[tokio::test]
async fn test_process_and_persist_applies_attach_as_update() {
    let workspace_id = WorkspaceId::new();
    let parent = existing_task(workspace_id, "Website da Kabbatec", Some("Kabbatec"));
    let parent_id = parent.id;

    let store = MemoryStore::new();
    store.seed(vec![parent]).await;

    let intake = r#"{"intention": "new", "action": "Revisar a home",
        "entities": [{"type": "client", "value": "Kabbatec"}],
        "due_date": null, "priority": 2, "context": null, "confidence": 0.9}"#;
    let link = format!(
        r#"{{"decision": "attach_to", "target_task_id": "{}",
            "reasoning": "same client", "confidence": 0.85}}"#,
        parent_id.0
    );
    let priority = r#"{"suggested_due_date": null, "priority": 2, "reasoning": "routine", "confidence": 0.8}"#;

    let provider = ScriptedProvider::new(vec![intake, &link, priority]);
    let pipeline = pipeline_with(provider);

    let state = pipeline
        .process_and_persist(
            "revisar a home",
            workspace_id,
            &WorkspaceContext::default(),
            &store,
        )
        .await;

    assert_eq!(state.status, PipelineStatus::CompletedWithTask);
    let stored = store.get(parent_id).await.unwrap();
    assert_eq!(stored.subtasks.len(), 2);
    assert_eq!(stored.subtasks[1].order_index, 2);
}

/// A task with no due date, no client, and no urgency signal lands at P3
/// even when the provider insists it is urgent.
#[tokio::test]
async fn test_no_signal_task_lands_p3_regardless_of_provider() {
    let intake = r#"{"intention": "new", "action": "tidy the meeting notes",
        "entities": [], "due_date": null, "priority": 2, "context": null, "confidence": 0.9}"#;
    let link = r#"{"decision": "create_new", "reasoning": "independent", "confidence": 0.9}"#;
    let priority = r#"{"suggested_due_date": null, "priority": 1, "reasoning": "sounds urgent to me", "confidence": 0.9}"#;

    let provider = ScriptedProvider::new(vec![intake, link, PLAN_RESPONSE, priority]);
    let pipeline = pipeline_with(provider);

    let workspace_id = WorkspaceId::new();
    let state = pipeline
        .process(
            "tidy the meeting notes",
            workspace_id,
            vec![existing_task(workspace_id, "Unrelated work", None)],
            &WorkspaceContext::default(),
        )
        .await;

    assert_eq!(state.status, PipelineStatus::CompletedWithTask);
    let Some(ExecutionOutcome::Insert { task }) = state.outcome else {
        panic!("expected an insert outcome");
    };
    assert_eq!(task.priority, Priority::P3);
}

/// Overall confidence is the minimum across the stages that ran.
#[tokio::test]
async fn test_confidence_is_minimum_across_stages() {
    let intake = r#"{"intention": "new", "action": "write report",
        "entities": [], "due_date": null, "priority": 2, "context": null, "confidence": 0.9}"#;
    let link = r#"{"decision": "create_new", "reasoning": "independent", "confidence": 0.6}"#;
    let priority = r#"{"suggested_due_date": null, "priority": 3, "reasoning": "no urgency", "confidence": 0.95}"#;

    let provider = ScriptedProvider::new(vec![intake, link, PLAN_RESPONSE, priority]);
    let pipeline = pipeline_with(provider);

    let state = pipeline
        .process(
            "write the report",
            WorkspaceId::new(),
            vec![existing_task(WorkspaceId::new(), "other", None)],
            &WorkspaceContext::default(),
        )
        .await;

    assert_eq!(state.status, PipelineStatus::CompletedWithTask);
    assert!((state.confidence - 0.6).abs() < 1e-6);
}
