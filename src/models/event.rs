use serde::{Deserialize, Serialize};

/// A user calendar event. Timestamps are RFC 3339 strings; services parse
/// them on use (see `services::schedule_utils`). All-day events store
/// `start` at 00:00 of the first day and `end` at 00:00 of the day after
/// the last day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub start: String,
    pub end: String,
    #[serde(default)]
    pub all_day: bool,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default)]
    pub recurrence_frequency: Option<RecurrenceFrequency>,
    /// Weekday names for WEEKLY/BIWEEKLY recurrence, e.g. ["Monday", "Wednesday"].
    #[serde(default)]
    pub recurrence_days: Vec<String>,
    /// Absent means the recurrence is unbounded.
    #[serde(default)]
    pub recurrence_end_date: Option<String>,
    #[serde(default)]
    pub requires_preparation: bool,
    #[serde(default)]
    pub preparation_hours: Option<f64>,
    #[serde(default)]
    pub is_study_session: bool,
    /// Back-reference to the event this study session prepares for.
    #[serde(default)]
    pub related_event_id: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecurrenceFrequency {
    Daily,
    Weekly,
    Biweekly,
    Monthly,
}

/// Coarse category driving the scheduling-weight policy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EventCategory {
    Exam,
    Homework,
    Project,
    General,
}

impl EventCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            EventCategory::Exam => "exam",
            EventCategory::Homework => "homework",
            EventCategory::Project => "project",
            EventCategory::General => "general",
        }
    }
}
