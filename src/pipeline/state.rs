//! Transient per-run state accumulated by the orchestrator
//!
//! One `PipelineState` lives for exactly one run. It keeps every stage
//! output that was produced (for diagnostics even when a later stage fails),
//! the error list, and the aggregate confidence.

use crate::core::types::WorkspaceId;
use crate::stages::execution::ExecutionOutcome;
use crate::stages::intake::ParsedIntent;
use crate::stages::link::LinkDecision;
use crate::stages::plan::TaskPlan;
use crate::stages::priority::PriorityDecision;
use serde::Serialize;

/// Terminal state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    /// Execution succeeded and an outcome is present
    CompletedWithTask,
    /// Some stage failed; partial outputs are retained, no outcome
    Failed,
}

/// Aggregate confidence across completed stages
///
/// The minimum, not the mean: a single weak stage caps overall trust.
/// Returns 0.0 when no stage completed.
pub fn min_confidence(scores: &[f32]) -> f32 {
    scores
        .iter()
        .copied()
        .fold(None, |acc: Option<f32>, s| {
            Some(acc.map_or(s, |a| a.min(s)))
        })
        .unwrap_or(0.0)
        .clamp(0.0, 1.0)
}

/// Everything one pipeline run produced
#[derive(Debug, Serialize)]
pub struct PipelineState {
    pub workspace_id: WorkspaceId,
    pub intent: Option<ParsedIntent>,
    pub link: Option<LinkDecision>,
    pub plan: Option<TaskPlan>,
    pub priority: Option<PriorityDecision>,
    pub outcome: Option<ExecutionOutcome>,
    pub errors: Vec<String>,
    /// min over the confidences of the stages that completed
    pub confidence: f32,
    pub status: PipelineStatus,
}

impl PipelineState {
    pub(crate) fn new(workspace_id: WorkspaceId) -> Self {
        Self {
            workspace_id,
            intent: None,
            link: None,
            plan: None,
            priority: None,
            outcome: None,
            errors: Vec::new(),
            confidence: 0.0,
            status: PipelineStatus::Failed,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == PipelineStatus::CompletedWithTask
    }

    /// Confidences of the stages that ran, in stage order
    pub(crate) fn stage_confidences(&self) -> Vec<f32> {
        [
            self.intent.as_ref().map(|s| s.confidence),
            self.link.as_ref().map(|s| s.confidence),
            self.plan.as_ref().map(|s| s.confidence),
            self.priority.as_ref().map(|s| s.confidence),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_min_confidence_takes_minimum() {
        assert_eq!(min_confidence(&[0.9, 0.6, 0.8]), 0.6);
    }

    #[test]
    fn test_min_confidence_empty_is_zero() {
        assert_eq!(min_confidence(&[]), 0.0);
    }

    #[test]
    fn test_min_confidence_single() {
        assert_eq!(min_confidence(&[0.7]), 0.7);
    }

    proptest! {
        #[test]
        fn prop_min_confidence_bounded(scores in proptest::collection::vec(0.0f32..=1.0, 0..8)) {
            let c = min_confidence(&scores);
            prop_assert!((0.0..=1.0).contains(&c));
        }

        #[test]
        fn prop_min_confidence_never_exceeds_any_stage(
            scores in proptest::collection::vec(0.0f32..=1.0, 1..8)
        ) {
            let c = min_confidence(&scores);
            for s in &scores {
                prop_assert!(c <= *s + f32::EPSILON);
            }
        }
    }
}
