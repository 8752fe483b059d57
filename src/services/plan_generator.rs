use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Timelike};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::error::{AppError, AppResult, OracleErrorCode};
use crate::models::event::CalendarEvent;
use crate::models::plan::{StudySuggestion, SuggestionPriority};
use crate::services::classifier;
use crate::services::oracle_client::StudyOracle;
use crate::services::prompt_templates::{
    build_study_plan_prompt, study_plan_system_prompt, StudyPlanPromptInput,
};
use crate::services::schedule_utils;

/// One planning problem: the target event, the requested hours, and the
/// read-only view of the user's calendar. `now` is injected rather than
/// sampled so attempts and tests share a stable reference point.
pub struct PlanRequest<'a> {
    pub target: &'a CalendarEvent,
    pub preparation_hours: f64,
    pub existing_events: &'a [CalendarEvent],
    pub now: DateTime<FixedOffset>,
}

/// Builds the scheduling prompt, invokes the oracle, and parses the reply
/// into typed suggestions. One call is one attempt; the retry loop lives in
/// `planning_service`.
pub struct PlanGenerator {
    oracle: Arc<dyn StudyOracle>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSuggestion {
    suggested_start_time: String,
    suggested_end_time: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    priority: SuggestionPriority,
}

impl PlanGenerator {
    pub fn new(oracle: Arc<dyn StudyOracle>) -> Self {
        Self { oracle }
    }

    pub async fn generate(
        &self,
        request: &PlanRequest<'_>,
        feedback: Option<&str>,
    ) -> AppResult<Vec<StudySuggestion>> {
        let target_start = schedule_utils::parse_datetime(&request.target.start)?;
        let category = classifier::classify_event(request.target);
        let digest = build_event_digest(
            request.existing_events,
            &request.target.id,
            request.now,
            target_start,
        )?;

        let prompt_input = StudyPlanPromptInput {
            target_title: &request.target.title,
            category,
            deadline: &request.target.start,
            now: &schedule_utils::format_datetime(request.now),
            preparation_hours: request.preparation_hours,
            days_until_event: schedule_utils::days_until(request.now, target_start),
            existing_event_lines: &digest,
            due_before_5pm: target_start.hour() < 17,
            feedback,
        };
        let user_prompt = build_study_plan_prompt(&prompt_input);

        debug!(
            target: "app::plan",
            target_id = %request.target.id,
            category = category.as_str(),
            digest_lines = digest.len(),
            with_feedback = feedback.is_some(),
            "requesting study plan from oracle"
        );

        let reply = self
            .oracle
            .complete(study_plan_system_prompt(), &user_prompt)
            .await?;

        parse_suggestions(&reply, &request.target.id)
    }
}

/// One line per existing event whose start falls inside `[now, deadline]`,
/// excluding the target itself. All-day events show the date only.
pub fn build_event_digest(
    events: &[CalendarEvent],
    target_id: &str,
    now: DateTime<FixedOffset>,
    deadline: DateTime<FixedOffset>,
) -> AppResult<Vec<String>> {
    let mut lines = Vec::new();

    for event in events {
        if event.id == target_id {
            continue;
        }
        let start = schedule_utils::parse_datetime(&event.start)?;
        if start < now || start > deadline {
            continue;
        }

        if event.all_day {
            lines.push(format!(
                "{} (all day): {}",
                start.format("%Y-%m-%d"),
                event.title
            ));
        } else {
            let end = schedule_utils::parse_datetime(&event.end)?;
            lines.push(format!(
                "{} to {}: {}",
                start.format("%Y-%m-%d %H:%M"),
                end.format("%Y-%m-%d %H:%M"),
                event.title
            ));
        }
    }

    Ok(lines)
}

/// Extracts the first bracket-delimited JSON array from the oracle's reply
/// and converts it into suggestions. Fallback order: fenced code block,
/// bare array, first `[ ... ]` span inside surrounding prose.
pub fn parse_suggestions(reply: &str, related_event_id: &str) -> AppResult<Vec<StudySuggestion>> {
    let trimmed = reply.trim();
    let cleaned = if trimmed.starts_with("```") {
        trimmed
            .trim_start_matches("```json")
            .trim_start_matches("```JSON")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim()
    } else {
        trimmed
    };

    let array_text = match (cleaned.find('['), cleaned.rfind(']')) {
        (Some(open), Some(close)) if open < close => &cleaned[open..=close],
        _ => {
            return Err(AppError::oracle_with_details(
                OracleErrorCode::InvalidResponse,
                "oracle reply contained no JSON array",
                None,
                Some(json!({ "replyLength": reply.len() })),
            ))
        }
    };

    let raw: Vec<RawSuggestion> = serde_json::from_str(array_text).map_err(|err| {
        AppError::oracle_with_details(
            OracleErrorCode::InvalidResponse,
            format!("oracle reply was not a valid session array: {err}"),
            None,
            Some(json!({ "reason": "invalid_json" })),
        )
    })?;

    let mut suggestions = Vec::with_capacity(raw.len());
    for entry in raw {
        let start = schedule_utils::parse_datetime(&entry.suggested_start_time)?;
        let end = schedule_utils::parse_datetime(&entry.suggested_end_time)?;
        if end <= start {
            return Err(AppError::oracle_with_details(
                OracleErrorCode::InvalidResponse,
                "oracle proposed a session that ends at or before its start",
                None,
                Some(json!({
                    "suggestedStartTime": entry.suggested_start_time,
                    "suggestedEndTime": entry.suggested_end_time,
                })),
            ));
        }

        suggestions.push(StudySuggestion {
            related_event_id: related_event_id.to_string(),
            suggested_start: schedule_utils::format_datetime(start),
            suggested_end: schedule_utils::format_datetime(end),
            message: entry.message,
            priority: entry.priority,
        });
    }

    Ok(suggestions)
}
