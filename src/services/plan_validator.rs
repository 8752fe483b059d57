use tracing::debug;

use crate::models::plan::{StudySuggestion, ValidationResult};
use crate::services::schedule_utils;

/// Acceptable deviation in minutes between requested and scheduled time:
/// base 15 minutes, plus 5 minutes per requested hour beyond 2, capped so
/// the band never exceeds 60 minutes.
pub fn tolerance_minutes(requested_hours: f64) -> i64 {
    let extra = (((requested_hours - 2.0).max(0.0)) * 5.0).floor() as i64;
    15 + extra.min(45)
}

/// Compares a candidate plan's total duration against the requested hours.
/// Empty or malformed input yields an invalid result with zero totals;
/// this function never fails.
pub fn validate(suggestions: &[StudySuggestion], requested_hours: f64) -> ValidationResult {
    let requested_minutes = (requested_hours * 60.0).round() as i64;
    let tolerance = tolerance_minutes(requested_hours);

    let invalid = |reason: &str| {
        debug!(target: "app::validation", reason, "plan rejected without duration check");
        ValidationResult {
            is_valid: false,
            total_minutes: 0,
            requested_minutes,
            minutes_difference: -requested_minutes,
            tolerance_minutes: tolerance,
        }
    };

    if suggestions.is_empty() {
        return invalid("empty plan");
    }

    let mut total_minutes = 0i64;
    for suggestion in suggestions {
        let minutes = schedule_utils::parse_datetime(&suggestion.suggested_start)
            .and_then(|start| {
                schedule_utils::parse_datetime(&suggestion.suggested_end)
                    .and_then(|end| schedule_utils::duration_minutes(start, end))
            });
        match minutes {
            Ok(value) => total_minutes += value,
            Err(_) => return invalid("malformed session timestamps"),
        }
    }

    let minutes_difference = total_minutes - requested_minutes;
    ValidationResult {
        is_valid: minutes_difference.abs() <= tolerance,
        total_minutes,
        requested_minutes,
        minutes_difference,
        tolerance_minutes: tolerance,
    }
}
