//! Priority stage - assign a tier and suggested due date from workspace signals
//!
//! The tier comes from a fixed precedence table so every assignment is
//! explainable; the provider, when configured, contributes a suggested due
//! date and richer reasoning but never overrides the table. Precedence,
//! highest first:
//!
//! 1. due within `urgent_due_hours` -> P1
//! 2. client with a contracted SLA -> P1 (never demoted)
//! 3. effort under `quick_win_minutes` and marked urgent -> P1
//! 4. due within `soon_due_days` -> P2
//! 5. any client association -> P2
//! 6. otherwise -> P3
//!
//! A workspace that has already reached its daily P1 budget demotes
//! borderline P1 candidates (rules 1 and 3) to P2; an SLA match is a
//! contract and is exempt. Without a provider, a task that matches no
//! rule keeps the intent's own tier guess instead of dropping to P3.

use crate::core::config::PipelineConfig;
use crate::core::error::{PipelineError, Result};
use crate::core::types::Priority;
use crate::llm::provider::{extract_json, InferenceProvider, InferenceStrategy};
use crate::pipeline::context::WorkspaceContext;
use crate::stages::intake::ParsedIntent;
use crate::stages::plan::TaskPlan;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Output of the priority stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriorityDecision {
    pub priority: Priority,
    pub suggested_due_date: Option<NaiveDate>,
    pub reasoning: String,
    pub confidence: f32,
}

/// Wire shape of the provider's contribution
///
/// Deliberately carries no tier field: the rule table owns the tier.
#[derive(Debug, Deserialize)]
struct PriorityWire {
    #[serde(default)]
    suggested_due_date: Option<NaiveDate>,
    reasoning: String,
    confidence: f32,
}

/// Which precedence rule fired, for the reasoning line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuleMatched {
    DueWithin24h,
    SlaClient,
    QuickWin,
    DueWithin7d,
    ClientAssociation,
    NoSignal,
}

struct RuleOutcome {
    priority: Priority,
    rule: RuleMatched,
    demoted: bool,
}

/// Assigns the priority tier and suggested due date
pub struct PriorityStage<'a> {
    strategy: &'a InferenceStrategy,
    config: &'a PipelineConfig,
}

impl<'a> PriorityStage<'a> {
    pub fn new(strategy: &'a InferenceStrategy, config: &'a PipelineConfig) -> Self {
        Self { strategy, config }
    }

    /// Run the stage against the current wall clock
    pub async fn run(
        &self,
        intent: &ParsedIntent,
        plan: &TaskPlan,
        context: &WorkspaceContext,
    ) -> Result<PriorityDecision> {
        self.run_at(intent, plan, context, Utc::now()).await
    }

    /// Run the stage with an explicit `now`, for deterministic tests
    pub async fn run_at(
        &self,
        intent: &ParsedIntent,
        plan: &TaskPlan,
        context: &WorkspaceContext,
        now: DateTime<Utc>,
    ) -> Result<PriorityDecision> {
        match self.strategy {
            InferenceStrategy::Backed(provider) => {
                let user = format!(
                    "TASK:\ntitle: {}\ndescription: {}\nestimated_minutes: {}\nintent priority guess: {}\nintent due date: {}\nclient: {}\n\nWORKSPACE:\n{}\nSuggest a due date and reasoning. Respond with JSON:",
                    plan.title,
                    plan.description,
                    plan.estimated_minutes,
                    intent.priority.as_number(),
                    intent.due_date.map(|d| d.to_string()).unwrap_or_else(|| "none".into()),
                    intent.client().unwrap_or("none"),
                    context.summary(),
                );
                let response = provider.complete(PRIORITY_SYSTEM_PROMPT, &user).await?;
                let json = extract_json(&response)?;
                let wire: PriorityWire = serde_json::from_str(json).map_err(|e| {
                    PipelineError::Provider(format!(
                        "Failed to parse priority decision: {} - Response: {}",
                        e, response
                    ))
                })?;

                // The provider proposes a due date; the rule table decides the tier.
                let due = wire.suggested_due_date.or(intent.due_date);
                let outcome = self.evaluate_rules(intent, plan, context, due, now);
                let reasoning = format!("{} ({})", wire.reasoning, rule_label(&outcome));
                tracing::debug!(priority = outcome.priority.as_number(), "priority assigned");
                Ok(PriorityDecision {
                    priority: outcome.priority,
                    suggested_due_date: due,
                    reasoning,
                    confidence: wire.confidence,
                })
            }
            InferenceStrategy::Deterministic => {
                let due = intent.due_date;
                let outcome = self.evaluate_rules(intent, plan, context, due, now);
                // No provider and no signal: trust the intent's own guess
                let (priority, reasoning) = match outcome.rule {
                    RuleMatched::NoSignal => (
                        intent.priority,
                        "no urgency signal; kept the intent's own tier".to_string(),
                    ),
                    _ => (outcome.priority, rule_label(&outcome)),
                };
                tracing::debug!(priority = priority.as_number(), "priority assigned (fallback)");
                Ok(PriorityDecision {
                    priority,
                    suggested_due_date: due,
                    reasoning,
                    confidence: intent.confidence,
                })
            }
        }
    }

    fn evaluate_rules(
        &self,
        intent: &ParsedIntent,
        plan: &TaskPlan,
        context: &WorkspaceContext,
        due: Option<NaiveDate>,
        now: DateTime<Utc>,
    ) -> RuleOutcome {
        let urgent_cutoff = (now + Duration::hours(self.config.urgent_due_hours)).date_naive();
        let soon_cutoff = (now + Duration::days(self.config.soon_due_days)).date_naive();
        let due_urgent = due.map(|d| d <= urgent_cutoff).unwrap_or(false);
        let due_soon = due.map(|d| d <= soon_cutoff).unwrap_or(false);
        let client = intent.client();
        let has_sla = client.map(|c| context.sla_hours(c).is_some()).unwrap_or(false);
        let quick_win = plan.estimated_minutes < self.config.quick_win_minutes
            && intent.priority == Priority::P1;
        let cap_reached = context.p1_count >= self.config.p1_daily_cap;

        // SLA outranks the cap: a contract is not subject to the daily budget
        if has_sla {
            return RuleOutcome {
                priority: Priority::P1,
                rule: RuleMatched::SlaClient,
                demoted: false,
            };
        }
        if due_urgent {
            return self.maybe_demote(RuleMatched::DueWithin24h, cap_reached);
        }
        if quick_win {
            return self.maybe_demote(RuleMatched::QuickWin, cap_reached);
        }
        if due_soon {
            return RuleOutcome {
                priority: Priority::P2,
                rule: RuleMatched::DueWithin7d,
                demoted: false,
            };
        }
        if client.is_some() {
            return RuleOutcome {
                priority: Priority::P2,
                rule: RuleMatched::ClientAssociation,
                demoted: false,
            };
        }
        RuleOutcome {
            priority: Priority::P3,
            rule: RuleMatched::NoSignal,
            demoted: false,
        }
    }

    fn maybe_demote(&self, rule: RuleMatched, cap_reached: bool) -> RuleOutcome {
        if cap_reached {
            RuleOutcome {
                priority: Priority::P2,
                rule,
                demoted: true,
            }
        } else {
            RuleOutcome {
                priority: Priority::P1,
                rule,
                demoted: false,
            }
        }
    }
}

fn rule_label(outcome: &RuleOutcome) -> String {
    let base = match outcome.rule {
        RuleMatched::DueWithin24h => "due within 24 hours",
        RuleMatched::SlaClient => "client has a contracted SLA",
        RuleMatched::QuickWin => "low effort and marked urgent",
        RuleMatched::DueWithin7d => "due within the week",
        RuleMatched::ClientAssociation => "client-associated work",
        RuleMatched::NoSignal => "no urgency signal",
    };
    if outcome.demoted {
        format!("{}; demoted to P2, daily P1 budget already reached", base)
    } else {
        base.to_string()
    }
}

/// System prompt for the priority contribution
const PRIORITY_SYSTEM_PROMPT: &str = r#"You help prioritize a task inside a workspace. The final tier is decided by fixed business rules; your job is to suggest a realistic due date (when the task or workspace implies one) and to explain the urgency signals you see.

OUTPUT FORMAT (JSON only, no explanation):
{
  "suggested_due_date": "YYYY-MM-DD" or null,
  "reasoning": "one sentence",
  "confidence": 0.0-1.0
}
"#;
