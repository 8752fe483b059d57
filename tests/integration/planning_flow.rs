use std::collections::BTreeSet;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, FixedOffset, Timelike};
use prepcal::error::{AppError, AppResult, OracleErrorCode};
use prepcal::models::event::CalendarEvent;
use prepcal::services::conflict::find_conflicts;
use prepcal::services::oracle_client::StudyOracle;
use prepcal::services::planning_service::{PlanningService, MAX_PLAN_ATTEMPTS};
use prepcal::services::schedule_utils;

/// Replays canned oracle replies in order and records every user prompt.
struct ScriptedOracle {
    replies: Mutex<VecDeque<AppResult<String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedOracle {
    fn new(replies: Vec<AppResult<String>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl StudyOracle for ScriptedOracle {
    async fn complete(&self, _system_prompt: &str, user_prompt: &str) -> AppResult<String> {
        self.prompts.lock().unwrap().push(user_prompt.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(AppError::oracle(
                    OracleErrorCode::Unavailable,
                    "scripted oracle exhausted",
                ))
            })
    }
}

fn dt(value: &str) -> DateTime<FixedOffset> {
    schedule_utils::parse_datetime(value).unwrap()
}

fn exam_target() -> CalendarEvent {
    CalendarEvent {
        id: "exam-1".to_string(),
        title: "Final Exam".to_string(),
        description: Some("Covers the whole semester".to_string()),
        start: "2025-03-20T10:00:00+00:00".to_string(),
        end: "2025-03-20T12:00:00+00:00".to_string(),
        all_day: false,
        is_recurring: false,
        recurrence_frequency: None,
        recurrence_days: Vec::new(),
        recurrence_end_date: None,
        requires_preparation: true,
        preparation_hours: Some(5.0),
        is_study_session: false,
        related_event_id: None,
    }
}

fn lecture_block() -> CalendarEvent {
    CalendarEvent {
        id: "lecture-1".to_string(),
        title: "Morning lecture".to_string(),
        description: None,
        start: "2025-03-19T09:00:00+00:00".to_string(),
        end: "2025-03-19T11:00:00+00:00".to_string(),
        all_day: false,
        is_recurring: false,
        recurrence_frequency: None,
        recurrence_days: Vec::new(),
        recurrence_end_date: None,
        requires_preparation: false,
        preparation_hours: None,
        is_study_session: false,
        related_event_id: None,
    }
}

fn now() -> DateTime<FixedOffset> {
    dt("2025-03-15T12:00:00+00:00")
}

/// A plan summing to exactly 5 hours on 3 distinct days, clear of the
/// lecture block with a 30-minute buffer, and outside 01:00-08:00.
fn valid_five_hour_plan() -> String {
    r#"[
        {"suggestedStartTime": "2025-03-17T14:00:00+00:00", "suggestedEndTime": "2025-03-17T16:00:00+00:00", "message": "Review lecture notes", "priority": "medium"},
        {"suggestedStartTime": "2025-03-18T14:00:00+00:00", "suggestedEndTime": "2025-03-18T15:30:00+00:00", "message": "Work through past exams", "priority": "high"},
        {"suggestedStartTime": "2025-03-19T13:00:00+00:00", "suggestedEndTime": "2025-03-19T14:30:00+00:00", "message": "Final recap of weak areas", "priority": "high"}
    ]"#
    .to_string()
}

/// Sums to 4 hours when 5 were requested: 60 minutes short, outside the
/// 30-minute tolerance band.
fn short_four_hour_plan() -> String {
    r#"[
        {"suggestedStartTime": "2025-03-18T14:00:00+00:00", "suggestedEndTime": "2025-03-18T16:00:00+00:00", "message": "Review lecture notes", "priority": "medium"},
        {"suggestedStartTime": "2025-03-19T13:00:00+00:00", "suggestedEndTime": "2025-03-19T15:00:00+00:00", "message": "Practice problems", "priority": "high"}
    ]"#
    .to_string()
}

#[tokio::test]
async fn valid_first_attempt_passes_all_scenario_constraints() {
    let oracle = ScriptedOracle::new(vec![Ok(valid_five_hour_plan())]);
    let service = PlanningService::new(oracle.clone());

    let target = exam_target();
    let existing = vec![target.clone(), lecture_block()];

    let outcome = service
        .generate_study_plan(&target, 5.0, &existing, now())
        .await
        .unwrap();

    assert!(outcome.validation.is_valid);
    assert!(!outcome.best_effort);
    assert_eq!(outcome.attempts, 1);

    // Total within the 15-minute-per-spec scenario band.
    assert!((285..=315).contains(&outcome.validation.total_minutes));

    let mut days = BTreeSet::new();
    for suggestion in &outcome.suggestions {
        let start = dt(&suggestion.suggested_start);
        let end = dt(&suggestion.suggested_end);
        days.insert(start.date_naive());

        // Sleep-hours constraint: nothing between 01:00 and 08:00.
        assert!(start.hour() >= 8, "session starts inside sleep hours");
        assert!(end.hour() >= 8, "session ends inside sleep hours");

        // No conflict with the lecture even with a 30-minute buffer.
        let buffered_start = start - chrono::Duration::minutes(30);
        let buffered_end = end + chrono::Duration::minutes(30);
        let conflicts =
            find_conflicts(buffered_start, buffered_end, &existing, &target.id).unwrap();
        assert!(conflicts.is_empty(), "session violates the event buffer");
    }
    assert!(days.len() <= 3, "plan uses more than ceil(5/2) days");

    // The prompt carried the calendar digest for the lecture block.
    let prompts = oracle.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("2025-03-19 09:00 to 2025-03-19 11:00: Morning lecture"));
    assert!(prompts[0].contains("exactly 5 hours (300 minutes)"));
}

#[tokio::test]
async fn second_prompt_carries_shortfall_feedback() {
    let oracle = ScriptedOracle::new(vec![
        Ok(short_four_hour_plan()),
        Ok(valid_five_hour_plan()),
    ]);
    let service = PlanningService::new(oracle.clone());

    let target = exam_target();
    let outcome = service
        .generate_study_plan(&target, 5.0, &[target.clone()], now())
        .await
        .unwrap();

    assert!(outcome.validation.is_valid);
    assert_eq!(outcome.attempts, 2);

    let prompts = oracle.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(!prompts[0].contains("Feedback on your previous attempt"));
    assert!(prompts[1].contains("Feedback on your previous attempt"));
    assert!(prompts[1].contains("60 minutes too short"));
    assert!(prompts[1].contains("Add another session or extend"));
    // Line-by-line breakdown of the previous attempt.
    assert!(prompts[1].contains("2025-03-18T14:00:00+00:00 to 2025-03-18T16:00:00+00:00 (120 minutes)"));
}

#[tokio::test]
async fn unparsable_replies_terminate_within_attempt_budget() {
    let oracle = ScriptedOracle::new(vec![
        Ok("I cannot plan anything today.".to_string()),
        Err(AppError::oracle(
            OracleErrorCode::HttpTimeout,
            "simulated timeout",
        )),
        Ok("Still no JSON array here.".to_string()),
    ]);
    let service = PlanningService::new(oracle.clone());

    let target = exam_target();
    let outcome = service
        .generate_study_plan(&target, 5.0, &[target.clone()], now())
        .await
        .unwrap();

    assert_eq!(oracle.prompts().len(), MAX_PLAN_ATTEMPTS as usize);
    assert!(outcome.suggestions.is_empty());
    assert!(outcome.best_effort);
    assert!(!outcome.validation.is_valid);
    assert_eq!(outcome.validation.total_minutes, 0);
}

#[tokio::test]
async fn best_effort_keeps_last_non_empty_plan() {
    let oracle = ScriptedOracle::new(vec![
        Ok(short_four_hour_plan()),
        Ok("garbage".to_string()),
        Ok("more garbage".to_string()),
    ]);
    let service = PlanningService::new(oracle.clone());

    let target = exam_target();
    let outcome = service
        .generate_study_plan(&target, 5.0, &[target.clone()], now())
        .await
        .unwrap();

    assert!(outcome.best_effort);
    assert_eq!(outcome.attempts, MAX_PLAN_ATTEMPTS);
    // The invalid-but-parsable first plan is not thrown away.
    assert_eq!(outcome.suggestions.len(), 2);
    assert_eq!(outcome.validation.total_minutes, 240);
    assert!(!outcome.validation.is_valid);
}

#[tokio::test]
async fn invalid_inputs_are_rejected_before_any_oracle_call() {
    let oracle = ScriptedOracle::new(vec![Ok(valid_five_hour_plan())]);
    let service = PlanningService::new(oracle.clone());

    let mut target = exam_target();
    let error = service
        .generate_study_plan(&target, 0.0, &[], now())
        .await
        .unwrap_err();
    assert!(matches!(error, AppError::Validation { .. }));

    target.requires_preparation = false;
    let error = service
        .generate_study_plan(&target, 5.0, &[], now())
        .await
        .unwrap_err();
    assert!(matches!(error, AppError::Validation { .. }));

    assert!(oracle.prompts().is_empty());
}
