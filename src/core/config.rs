//! Pipeline configuration with documented constants
//!
//! All tunable values are collected here with explanations of their purpose.
//! The priority thresholds come from the product's business-rule table; the
//! rest bound prompt size and fallback behavior.

use std::time::Duration;

/// Configuration for one pipeline instance
///
/// Constructed once and shared by every stage of every run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    // === PROMPT BOUNDS ===
    /// Maximum number of existing tasks shown to the link stage
    ///
    /// Most-recent-first. Bounds prompt size; tasks outside the window
    /// cannot be linked to.
    pub task_window: usize,

    /// Maximum length (chars) of the action string produced by the
    /// deterministic intake fallback
    pub fallback_action_len: usize,

    // === FALLBACK CONFIDENCE ===
    /// Confidence reported by the deterministic intake fallback
    ///
    /// 0.6 reflects that a verbatim truncation is usually right about the
    /// action but knows nothing about entities or dates.
    pub intake_fallback_confidence: f32,

    /// Confidence reported by the deterministic link fallback
    ///
    /// Lower than intake's: choosing create_new without reading the window
    /// is correct for independent work and wrong for follow-ups.
    pub link_fallback_confidence: f32,

    /// Confidence reported by the deterministic plan fallback
    pub plan_fallback_confidence: f32,

    // === PLAN BOUNDS ===
    /// Minimum subtasks a provider-generated plan may contain
    pub plan_min_subtasks: usize,

    /// Maximum subtasks a provider-generated plan may contain
    pub plan_max_subtasks: usize,

    /// Effort estimate (minutes) used by the deterministic plan fallback
    pub fallback_estimate_minutes: u32,

    // === PRIORITY RULES ===
    /// Due dates within this many hours of now force priority 1
    pub urgent_due_hours: i64,

    /// Due dates within this many days of now force at least priority 2
    pub soon_due_days: i64,

    /// Effort below this many minutes combined with an urgent intent
    /// qualifies for priority 1 (quick wins rule)
    pub quick_win_minutes: u32,

    /// Soft daily budget of priority-1 tasks per workspace
    ///
    /// When the workspace has already reached this count, borderline P1
    /// candidates are demoted to P2. SLA-client tasks are never demoted.
    pub p1_daily_cap: u32,

    // === PROVIDER ===
    /// Timeout applied to every inference-provider HTTP call
    ///
    /// A hung provider call must not hang the pipeline.
    pub provider_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            task_window: 10,
            fallback_action_len: 120,
            intake_fallback_confidence: 0.6,
            link_fallback_confidence: 0.5,
            plan_fallback_confidence: 0.5,
            plan_min_subtasks: 3,
            plan_max_subtasks: 7,
            fallback_estimate_minutes: 60,
            urgent_due_hours: 24,
            soon_due_days: 7,
            quick_win_minutes: 15,
            p1_daily_cap: 3,
            provider_timeout: Duration::from_secs(30),
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<(), String> {
        if self.task_window == 0 {
            return Err("task_window must be at least 1".into());
        }
        if self.plan_min_subtasks == 0 || self.plan_min_subtasks > self.plan_max_subtasks {
            return Err(format!(
                "plan subtask bounds invalid: min {} max {}",
                self.plan_min_subtasks, self.plan_max_subtasks
            ));
        }
        for (name, c) in [
            ("intake_fallback_confidence", self.intake_fallback_confidence),
            ("link_fallback_confidence", self.link_fallback_confidence),
            ("plan_fallback_confidence", self.plan_fallback_confidence),
        ] {
            if !(0.0..=1.0).contains(&c) {
                return Err(format!("{} must be in [0, 1], got {}", name, c));
            }
        }
        if self.urgent_due_hours >= self.soon_due_days * 24 {
            return Err(format!(
                "urgent_due_hours ({}) should be < soon_due_days in hours ({})",
                self.urgent_due_hours,
                self.soon_due_days * 24
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_window_rejected() {
        let config = PipelineConfig {
            task_window: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inverted_due_thresholds_rejected() {
        let config = PipelineConfig {
            urgent_due_hours: 24 * 10,
            soon_due_days: 7,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_confidence_out_of_range_rejected() {
        let config = PipelineConfig {
            link_fallback_confidence: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
