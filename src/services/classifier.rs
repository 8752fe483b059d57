use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::event::{CalendarEvent, EventCategory};

static EXAM_KEYWORDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(exam|test|midterm|final|quiz)\b").expect("exam keyword regex"));
static HOMEWORK_KEYWORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(homework|assignment|problem set|pset|exercise)\b")
        .expect("homework keyword regex")
});
static PROJECT_KEYWORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(project|presentation|paper|essay|report)\b").expect("project keyword regex")
});

/// Keyword classification of an event into its scheduling category.
/// First matching family wins: exam > homework > project, else general.
pub fn classify(title: &str, description: Option<&str>) -> EventCategory {
    let haystack = format!("{} {}", title, description.unwrap_or("")).to_lowercase();

    if EXAM_KEYWORDS.is_match(&haystack) {
        EventCategory::Exam
    } else if HOMEWORK_KEYWORDS.is_match(&haystack) {
        EventCategory::Homework
    } else if PROJECT_KEYWORDS.is_match(&haystack) {
        EventCategory::Project
    } else {
        EventCategory::General
    }
}

pub fn classify_event(event: &CalendarEvent) -> EventCategory {
    classify(&event.title, event.description.as_deref())
}
