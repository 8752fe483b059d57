use chrono::{DateTime, FixedOffset};
use tracing::debug;

use crate::error::AppResult;
use crate::models::event::CalendarEvent;
use crate::services::occurrence;
use crate::services::schedule_utils;

/// Events whose occupied interval overlaps the candidate interval.
///
/// Skip rules, in order:
/// 1. the event the plan is being built for (`exclude_event_id`),
/// 2. study sessions already generated for that same target,
/// 3. all-day events (policy: they never block preparation sessions).
///
/// Recurring events are resolved onto the candidate's start date first; a
/// recurring event with no occurrence on that date cannot conflict. The
/// overlap test is strict half-open, so touching endpoints do not conflict.
pub fn find_conflicts(
    candidate_start: DateTime<FixedOffset>,
    candidate_end: DateTime<FixedOffset>,
    events: &[CalendarEvent],
    exclude_event_id: &str,
) -> AppResult<Vec<CalendarEvent>> {
    let candidate_day = candidate_start.date_naive();
    let mut conflicts = Vec::new();

    for event in events {
        if event.id == exclude_event_id {
            continue;
        }
        if event.is_study_session
            && event.related_event_id.as_deref() == Some(exclude_event_id)
        {
            continue;
        }
        if event.all_day {
            continue;
        }

        let (event_start, event_end) = if event.is_recurring {
            if !occurrence::occurs_on(event, candidate_day)? {
                continue;
            }
            occurrence::resolve_instant(event, candidate_day)?
        } else {
            (
                schedule_utils::parse_datetime(&event.start)?,
                schedule_utils::parse_datetime(&event.end)?,
            )
        };

        if schedule_utils::overlaps(candidate_start, candidate_end, event_start, event_end) {
            conflicts.push(event.clone());
        }
    }

    if !conflicts.is_empty() {
        debug!(
            target: "app::plan",
            candidate_start = %candidate_start,
            candidate_end = %candidate_end,
            conflict_count = conflicts.len(),
            "candidate interval rejected"
        );
    }

    Ok(conflicts)
}
