use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::models::event::CalendarEvent;
use crate::models::plan::{StudyPlanOutcome, StudySuggestion, ValidationResult};
use crate::services::oracle_client::StudyOracle;
use crate::services::plan_generator::{PlanGenerator, PlanRequest};
use crate::services::plan_validator;
use crate::services::prompt_templates;

pub const MAX_PLAN_ATTEMPTS: u32 = 3;

/// Orchestrates the generate-and-validate loop: up to `MAX_PLAN_ATTEMPTS`
/// oracle calls, each retry carrying corrective feedback derived from the
/// previous attempt's validation result. Deliberately not a constraint
/// solver; the oracle does the placement reasoning.
pub struct PlanningService {
    generator: PlanGenerator,
}

impl PlanningService {
    pub fn new(oracle: Arc<dyn StudyOracle>) -> Self {
        Self {
            generator: PlanGenerator::new(oracle),
        }
    }

    /// Best-effort plan for `target`. Returns the first validated plan, or
    /// after exhausting the budget the last non-empty candidate flagged
    /// `best_effort`, or an empty plan when every attempt failed to parse.
    ///
    /// Oracle and parse failures consume one attempt each and never abort
    /// the loop; only invalid inputs are rejected up front.
    pub async fn generate_study_plan(
        &self,
        target: &CalendarEvent,
        preparation_hours: f64,
        existing_events: &[CalendarEvent],
        now: DateTime<FixedOffset>,
    ) -> AppResult<StudyPlanOutcome> {
        if !target.requires_preparation {
            return Err(AppError::validation(
                "target event is not flagged as requiring preparation",
            ));
        }
        if !preparation_hours.is_finite() || preparation_hours <= 0.0 {
            return Err(AppError::validation(
                "preparation hours must be a positive number",
            ));
        }

        let request = PlanRequest {
            target,
            preparation_hours,
            existing_events,
            now,
        };

        let mut previous: Option<(Vec<StudySuggestion>, ValidationResult)> = None;
        let mut best_effort_plan: Vec<StudySuggestion> = Vec::new();

        for attempt in 1..=MAX_PLAN_ATTEMPTS {
            let feedback = previous
                .as_ref()
                .map(|(plan, validation)| prompt_templates::build_feedback_block(validation, plan));

            let suggestions = match self.generator.generate(&request, feedback.as_deref()).await {
                Ok(suggestions) => suggestions,
                Err(error) => {
                    warn!(
                        target: "app::plan",
                        attempt,
                        error = %error,
                        "plan generation attempt failed"
                    );
                    Vec::new()
                }
            };

            let validation = plan_validator::validate(&suggestions, preparation_hours);
            info!(
                target: "app::plan",
                attempt,
                session_count = suggestions.len(),
                total_minutes = validation.total_minutes,
                minutes_difference = validation.minutes_difference,
                is_valid = validation.is_valid,
                "plan attempt validated"
            );

            if validation.is_valid {
                return Ok(StudyPlanOutcome {
                    suggestions,
                    validation,
                    attempts: attempt,
                    best_effort: false,
                });
            }

            if !suggestions.is_empty() {
                best_effort_plan = suggestions.clone();
            }
            previous = Some((suggestions, validation));
        }

        let validation = plan_validator::validate(&best_effort_plan, preparation_hours);
        warn!(
            target: "app::plan",
            attempts = MAX_PLAN_ATTEMPTS,
            session_count = best_effort_plan.len(),
            "attempt budget exhausted, returning best-effort plan"
        );

        Ok(StudyPlanOutcome {
            suggestions: best_effort_plan,
            validation,
            attempts: MAX_PLAN_ATTEMPTS,
            best_effort: true,
        })
    }
}
