use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Weekday};
use serde_json::json;

use crate::error::{AppError, AppResult};

pub fn parse_datetime(value: &str) -> AppResult<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(value).map_err(|err| {
        AppError::validation_with_details(
            "invalid datetime format",
            json!({"value": value, "error": err.to_string()}),
        )
    })
}

pub fn format_datetime(dt: DateTime<FixedOffset>) -> String {
    dt.to_rfc3339()
}

/// Calendar date as literally written in the stored RFC 3339 string, i.e.
/// the date in the event's own offset. Comparing these avoids the
/// midnight-shift bugs of converting to a common zone first.
pub fn literal_date(value: &str) -> AppResult<NaiveDate> {
    Ok(parse_datetime(value)?.date_naive())
}

/// Rounded whole-minute duration. Errors when `end` precedes `start`.
pub fn duration_minutes(
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
) -> AppResult<i64> {
    let seconds = end.signed_duration_since(start).num_seconds();
    if seconds < 0 {
        Err(AppError::validation("end time must not precede start time"))
    } else {
        Ok((seconds as f64 / 60.0).round() as i64)
    }
}

/// Strict half-open interval overlap: touching endpoints do not overlap.
/// Zero-duration intervals are valid point-events.
pub fn overlaps(
    a_start: DateTime<FixedOffset>,
    a_end: DateTime<FixedOffset>,
    b_start: DateTime<FixedOffset>,
    b_end: DateTime<FixedOffset>,
) -> bool {
    a_start < b_end && b_start < a_end
}

/// Whole days from `now` until `target`, rounded up.
pub fn days_until(now: DateTime<FixedOffset>, target: DateTime<FixedOffset>) -> i64 {
    let minutes = target.signed_duration_since(now).num_minutes();
    (minutes as f64 / 1440.0).ceil() as i64
}

pub fn parse_weekday(name: &str) -> Option<Weekday> {
    match name.trim().to_lowercase().as_str() {
        "monday" | "mon" => Some(Weekday::Mon),
        "tuesday" | "tue" => Some(Weekday::Tue),
        "wednesday" | "wed" => Some(Weekday::Wed),
        "thursday" | "thu" => Some(Weekday::Thu),
        "friday" | "fri" => Some(Weekday::Fri),
        "saturday" | "sat" => Some(Weekday::Sat),
        "sunday" | "sun" => Some(Weekday::Sun),
        _ => Option::None,
    }
}

/// Monday of the week containing `day`; anchors biweekly parity checks.
pub fn week_anchor(day: NaiveDate) -> NaiveDate {
    day - Duration::days(chrono::Datelike::weekday(&day).num_days_from_monday() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn dt(value: &str) -> DateTime<FixedOffset> {
        parse_datetime(value).unwrap()
    }

    #[test]
    fn literal_date_keeps_written_offset() {
        // 23:30 -05:00 is already the next day in UTC; the literal date wins.
        assert_eq!(
            literal_date("2025-05-01T23:30:00-05:00").unwrap(),
            NaiveDate::from_ymd_opt(2025, 5, 1).unwrap()
        );
    }

    #[test]
    fn overlaps_is_strict_at_endpoints() {
        let a_start = dt("2025-03-19T09:00:00+00:00");
        let a_end = dt("2025-03-19T11:00:00+00:00");
        let b_start = dt("2025-03-19T11:00:00+00:00");
        let b_end = dt("2025-03-19T12:00:00+00:00");

        assert!(!overlaps(a_start, a_end, b_start, b_end));
        assert!(overlaps(a_start, a_end, dt("2025-03-19T10:59:00+00:00"), b_end));
    }

    #[test]
    fn zero_duration_point_event_conflicts_only_strictly_inside() {
        let point = dt("2025-03-19T10:00:00+00:00");
        let start = dt("2025-03-19T09:00:00+00:00");
        let end = dt("2025-03-19T11:00:00+00:00");

        assert!(overlaps(start, end, point, point));
        assert!(!overlaps(start, point, point, point));
    }

    #[test]
    fn days_until_rounds_up() {
        let now = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2025, 3, 15, 12, 0, 0)
            .unwrap();
        let target = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2025, 3, 20, 10, 0, 0)
            .unwrap();
        assert_eq!(days_until(now, target), 5);
    }

    #[test]
    fn duration_minutes_rounds_seconds() {
        let start = dt("2025-03-19T09:00:00+00:00");
        let end = dt("2025-03-19T09:30:31+00:00");
        assert_eq!(duration_minutes(start, end).unwrap(), 31);
        assert!(duration_minutes(end, start).is_err());
    }
}
