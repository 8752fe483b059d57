use std::fmt::Write as _;

use crate::models::event::EventCategory;
use crate::models::plan::{StudySuggestion, ValidationResult};
use crate::services::schedule_utils;

/// System prompt guiding the oracle when proposing preparation sessions.
pub fn study_plan_system_prompt() -> &'static str {
    r#"You are an academic calendar assistant that plans study sessions.
Respond with a JSON array only. Each element must match:
{
  "suggestedStartTime": string (ISO-8601 with offset),
  "suggestedEndTime": string (ISO-8601 with offset),
  "message": string (what to work on in this session),
  "priority": "high"|"medium"|"low"
}
Do not wrap the response in markdown code blocks and do not add prose
outside the array. Times must honor every constraint in the user message."#
}

/// Maximum distinct days a plan may use for the given category and hours.
pub fn day_budget(category: EventCategory, hours: f64) -> u32 {
    let budget = match category {
        EventCategory::Homework if hours <= 2.0 => 1.0,
        EventCategory::Homework => (hours / 3.0).ceil(),
        _ => (hours / 2.0).ceil(),
    };
    (budget as u32).max(1)
}

/// Category-specific day-weighting guidance. Advisory text for the oracle;
/// the validator only enforces the total-duration constraint.
pub fn allocation_guidance(category: EventCategory, hours: f64, due_before_5pm: bool) -> String {
    match category {
        EventCategory::Exam | EventCategory::General => format!(
            "Spread the {hours} hours across up to {days} days (use at least 2 days when \
             possible): roughly 40% the day before the deadline, 30% two days before, \
             20% three days before, and 10% earlier.",
            hours = hours,
            days = day_budget(category, hours)
        ),
        EventCategory::Project => format!(
            "Spread the {hours} hours across up to {days} days: roughly 30% the day before \
             the deadline, 40% two to three days before, and 30% earlier for planning work.",
            hours = hours,
            days = day_budget(category, hours)
        ),
        EventCategory::Homework if hours <= 2.0 => {
            "Schedule all of the time on the due date itself, finishing before the deadline."
                .to_string()
        }
        EventCategory::Homework => {
            let mut guidance = format!(
                "Spread the {hours} hours across up to {days} days: roughly 35% on the due \
                 date, 50% the day before, 10% two days before, and 5% earlier.",
                hours = hours,
                days = day_budget(category, hours)
            );
            if due_before_5pm {
                guidance.push_str(
                    " The assignment is due before 17:00, so do not schedule any session on \
                     the due date itself.",
                );
            }
            guidance
        }
    }
}

/// Inputs for one prompt build. The digest is one preformatted line per
/// existing event inside the planning window.
pub struct StudyPlanPromptInput<'a> {
    pub target_title: &'a str,
    pub category: EventCategory,
    pub deadline: &'a str,
    pub now: &'a str,
    pub preparation_hours: f64,
    pub days_until_event: i64,
    pub existing_event_lines: &'a [String],
    pub due_before_5pm: bool,
    pub feedback: Option<&'a str>,
}

pub fn build_study_plan_prompt(input: &StudyPlanPromptInput<'_>) -> String {
    let requested_minutes = (input.preparation_hours * 60.0).round() as i64;
    let mut prompt = String::new();

    if let Some(feedback) = input.feedback {
        prompt.push_str(feedback);
        prompt.push_str("\n\n");
    }

    let _ = writeln!(
        prompt,
        "Plan preparation sessions for \"{}\" (category: {}).",
        input.target_title,
        input.category.as_str()
    );
    let _ = writeln!(
        prompt,
        "The deadline is {} ({} day(s) from now). The current time is {}.",
        input.deadline, input.days_until_event, input.now
    );
    prompt.push('\n');

    if input.existing_event_lines.is_empty() {
        prompt.push_str("The calendar has no other events before the deadline.\n");
    } else {
        prompt.push_str("Existing calendar events before the deadline:\n");
        for line in input.existing_event_lines {
            let _ = writeln!(prompt, "- {line}");
        }
    }

    prompt.push_str("\nConstraints:\n");
    let _ = writeln!(
        prompt,
        "- The sessions must sum to exactly {} hours ({} minutes) in total.",
        input.preparation_hours, requested_minutes
    );
    let _ = writeln!(prompt, "- No session may start before {}.", input.now);
    prompt.push_str(
        "- No session may overlap any listed event; leave at least a 30-minute buffer \
         before and after each one.\n",
    );
    prompt.push_str("- No session may fall between 01:00 and 08:00 local time.\n");
    prompt.push_str("- No single session may be longer than 4 hours.\n");
    let _ = writeln!(
        prompt,
        "- Use at most {} distinct day(s).",
        day_budget(input.category, input.preparation_hours)
    );
    prompt.push_str("- Session start and end times must align to 15-minute increments.\n");
    prompt.push('\n');
    prompt.push_str(&allocation_guidance(
        input.category,
        input.preparation_hours,
        input.due_before_5pm,
    ));
    prompt.push('\n');

    prompt
}

/// Corrective feedback derived from the previous attempt, prepended to the
/// next prompt so the oracle can repair the duration mismatch.
pub fn build_feedback_block(
    validation: &ValidationResult,
    previous: &[StudySuggestion],
) -> String {
    let mut block = String::from("Feedback on your previous attempt:\n");

    let deviation = validation.minutes_difference;
    if deviation < 0 {
        let _ = writeln!(
            block,
            "- You scheduled {} minutes in total, which is {} minutes too short of the \
             requested {} minutes. Add another session or extend an existing one to cover \
             the missing {} minutes.",
            validation.total_minutes,
            deviation.abs(),
            validation.requested_minutes,
            deviation.abs()
        );
    } else {
        let _ = writeln!(
            block,
            "- You scheduled {} minutes in total, which is {} minutes too long over the \
             requested {} minutes. Remove a session or shorten an existing one by {} minutes.",
            validation.total_minutes,
            deviation,
            validation.requested_minutes,
            deviation
        );
    }

    if previous.is_empty() {
        block.push_str("- The previous reply contained no usable sessions.\n");
    } else {
        block.push_str("Previous sessions:\n");
        for (index, suggestion) in previous.iter().enumerate() {
            let duration = schedule_utils::parse_datetime(&suggestion.suggested_start)
                .and_then(|start| {
                    schedule_utils::parse_datetime(&suggestion.suggested_end)
                        .and_then(|end| schedule_utils::duration_minutes(start, end))
                })
                .unwrap_or(0);
            let _ = writeln!(
                block,
                "{}. {} to {} ({} minutes)",
                index + 1,
                suggestion.suggested_start,
                suggestion.suggested_end,
                duration
            );
        }
    }

    block
}
