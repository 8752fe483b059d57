use serde::{Deserialize, Serialize};

/// A proposed preparation session. Ephemeral: regenerated on every attempt
/// and persisted as a study-session `CalendarEvent` only on user acceptance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StudySuggestion {
    pub related_event_id: String,
    pub suggested_start: String,
    pub suggested_end: String,
    pub message: String,
    pub priority: SuggestionPriority,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionPriority {
    High,
    #[default]
    Medium,
    Low,
}

/// Derived facts about one candidate plan, recomputed every attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub total_minutes: i64,
    pub requested_minutes: i64,
    /// Signed: scheduled minus requested.
    pub minutes_difference: i64,
    pub tolerance_minutes: i64,
}

/// Final output of a planning run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StudyPlanOutcome {
    pub suggestions: Vec<StudySuggestion>,
    pub validation: ValidationResult,
    pub attempts: u32,
    /// True when the attempt budget was exhausted and the plan returned is
    /// the last non-empty candidate rather than a validated one.
    pub best_effort: bool,
}
