use std::cmp::Ordering;

use chrono::{offset::LocalResult, DateTime, Datelike, FixedOffset, NaiveDate, TimeZone, Weekday};

use crate::error::{AppError, AppResult};
use crate::models::event::{CalendarEvent, RecurrenceFrequency};
use crate::services::schedule_utils;

/// Decides whether `event` occupies the calendar date `day`.
///
/// All-day events span `date(start)..=date(end)` inclusive, compared on the
/// literal dates written in the stored strings. Non-recurring timed events
/// match only the calendar date of `start`; an event whose `end` runs past
/// midnight deliberately does not match the following date.
pub fn occurs_on(event: &CalendarEvent, day: NaiveDate) -> AppResult<bool> {
    let start_date = schedule_utils::literal_date(&event.start)?;

    if event.all_day {
        let end_date = schedule_utils::literal_date(&event.end)?;
        return Ok(start_date <= day && day <= end_date);
    }

    if !event.is_recurring {
        return Ok(day == start_date);
    }

    if day < start_date {
        return Ok(false);
    }
    if let Some(until) = event.recurrence_end_date.as_ref() {
        if day > schedule_utils::literal_date(until)? {
            return Ok(false);
        }
    }

    // Weekly recurrence honors the explicit recurrenceDays set when present
    // and falls back to the start date's weekday when it is empty.
    let matched = match event.recurrence_frequency {
        Some(RecurrenceFrequency::Daily) => true,
        Some(RecurrenceFrequency::Weekly) | None => weekday_matches(event, day, start_date),
        Some(RecurrenceFrequency::Biweekly) => {
            weekday_matches(event, day, start_date) && week_parity_matches(day, start_date)
        }
        Some(RecurrenceFrequency::Monthly) => day.day() == start_date.day(),
    };

    Ok(matched)
}

/// Concrete start/end instants of a timed event's occurrence on `day`:
/// the event's time-of-day and duration transplanted onto that date.
pub fn resolve_instant(
    event: &CalendarEvent,
    day: NaiveDate,
) -> AppResult<(DateTime<FixedOffset>, DateTime<FixedOffset>)> {
    let start = schedule_utils::parse_datetime(&event.start)?;
    let end = schedule_utils::parse_datetime(&event.end)?;
    let duration = end.signed_duration_since(start);

    let resolved_start = match start.offset().from_local_datetime(&day.and_time(start.time())) {
        LocalResult::Single(dt) => dt,
        _ => {
            return Err(AppError::validation(
                "could not resolve occurrence instant on requested day",
            ))
        }
    };

    Ok((resolved_start, resolved_start + duration))
}

/// Display order within one day: all-day events first, then timed events by
/// start instant ascending.
pub fn compare_for_day(a: &CalendarEvent, b: &CalendarEvent) -> Ordering {
    match (a.all_day, b.all_day) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => a.start.cmp(&b.start),
    }
}

/// Events occupying `day`, sorted for display.
pub fn day_schedule(events: &[CalendarEvent], day: NaiveDate) -> AppResult<Vec<CalendarEvent>> {
    let mut occupying = Vec::new();
    for event in events {
        if occurs_on(event, day)? {
            occupying.push(event.clone());
        }
    }
    occupying.sort_by(compare_for_day);
    Ok(occupying)
}

fn weekday_matches(event: &CalendarEvent, day: NaiveDate, start_date: NaiveDate) -> bool {
    let configured: Vec<Weekday> = event
        .recurrence_days
        .iter()
        .filter_map(|name| schedule_utils::parse_weekday(name))
        .collect();

    if configured.is_empty() {
        day.weekday() == start_date.weekday()
    } else {
        configured.contains(&day.weekday())
    }
}

fn week_parity_matches(day: NaiveDate, start_date: NaiveDate) -> bool {
    let weeks = (schedule_utils::week_anchor(day) - schedule_utils::week_anchor(start_date))
        .num_days()
        / 7;
    weeks % 2 == 0
}
