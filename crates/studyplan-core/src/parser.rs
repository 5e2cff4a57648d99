//! Free-text task parser.
//!
//! Turns input like `"Physics homework on 2025-11-22 2 hours"` into a
//! [`ParsedTask`]. Parsing never fails: anything not recognized falls back
//! to a default (subject `General`, no deadline, 60 minutes).
//!
//! Subject keywords match on whole words. Relative date keywords
//! (`tomorrow`, `today`, `next week`, `next monday`) match anywhere in the
//! text, so `"todays"` still counts as `today`.

use std::sync::LazyLock;

use chrono::{Datelike, Days, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};

use studyplan_db::models::{DEFAULT_ESTIMATED_MINUTES, DEFAULT_SUBJECT, NewTask};

/// Known subjects, in tie-break order.
pub const SUBJECTS: &[&str] = &[
    "math",
    "physics",
    "chemistry",
    "biology",
    "english",
    "history",
    "computer",
    "science",
];

/// Titles derived from free text are cut to this many characters.
pub const MAX_TITLE_CHARS: usize = 120;

static SUBJECT_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    SUBJECTS
        .iter()
        .map(|s| {
            let re = Regex::new(&format!(r"\b{}\b", regex::escape(s))).expect("valid regex");
            (*s, re)
        })
        .collect()
});

static ISO_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]{4}-[0-9]{2}-[0-9]{2}").expect("valid regex"));

static DAY_MONTH_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([0-9]{1,2})[/-]([0-9]{1,2})[/-]([0-9]{2,4})").expect("valid regex")
});

static HOURS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]+)\s*(?:hours|hrs|hr|h)\b").expect("valid regex"));

static MINUTES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]+)\s*(?:minutes|mins|min|m)\b").expect("valid regex"));

/// Structured fields extracted from free text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedTask {
    pub subject: String,
    pub title: String,
    pub deadline: Option<NaiveDate>,
    #[serde(rename = "est_minutes", alias = "estimated_minutes")]
    pub estimated_minutes: i64,
}

impl From<ParsedTask> for NewTask {
    fn from(parsed: ParsedTask) -> Self {
        Self {
            subject: parsed.subject,
            title: parsed.title,
            notes: String::new(),
            deadline: parsed.deadline,
            estimated_minutes: parsed.estimated_minutes,
        }
    }
}

/// Parse free text into task fields. Relative dates resolve against `today`.
pub fn parse_task_text(text: &str, today: NaiveDate) -> ParsedTask {
    let lower = text.to_lowercase();
    ParsedTask {
        subject: extract_subject(&lower),
        title: derive_title(text),
        deadline: extract_deadline(text, &lower, today),
        estimated_minutes: extract_minutes(&lower),
    }
}

/// First known subject appearing as a whole word, capitalized.
fn extract_subject(lower: &str) -> String {
    SUBJECT_PATTERNS
        .iter()
        .find(|(_, re)| re.is_match(lower))
        .map(|(s, _)| capitalize(s))
        .unwrap_or_else(|| DEFAULT_SUBJECT.to_owned())
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Deadline by priority: relative keywords, then ISO dates, then D/M/Y.
/// The first rule that matches decides, even when its date is invalid.
fn extract_deadline(text: &str, lower: &str, today: NaiveDate) -> Option<NaiveDate> {
    if lower.contains("tomorrow") {
        return today.checked_add_days(Days::new(1));
    }
    if lower.contains("today") {
        return Some(today);
    }
    if lower.contains("next week") {
        return today.checked_add_days(Days::new(7));
    }
    if lower.contains("next monday") {
        return next_monday(today);
    }
    if let Some(m) = ISO_DATE.find(text) {
        return NaiveDate::parse_from_str(m.as_str(), "%Y-%m-%d").ok();
    }
    if let Some(caps) = DAY_MONTH_YEAR.captures(text) {
        return assemble_date(&caps[1], &caps[2], &caps[3]);
    }
    None
}

/// The Monday strictly after `today` (a week ahead when today is Monday).
fn next_monday(today: NaiveDate) -> Option<NaiveDate> {
    let ahead = 7 - u64::from(today.weekday().num_days_from_monday());
    today.checked_add_days(Days::new(ahead))
}

/// Build a date from day/month/year captures. Two-digit years are in the
/// 2000s; any other width except four is rejected.
fn assemble_date(day: &str, month: &str, year: &str) -> Option<NaiveDate> {
    let year = match year.len() {
        2 => 2000 + year.parse::<i32>().ok()?,
        4 => year.parse::<i32>().ok()?,
        _ => return None,
    };
    NaiveDate::from_ymd_opt(year, month.parse().ok()?, day.parse().ok()?)
}

/// Estimated minutes: an hour amount wins over a minute amount. Zero or
/// out-of-range amounts fall back to the default.
fn extract_minutes(lower: &str) -> i64 {
    let minutes = if let Some(caps) = HOURS.captures(lower) {
        caps[1]
            .parse::<i64>()
            .ok()
            .and_then(|h| h.checked_mul(60))
    } else if let Some(caps) = MINUTES.captures(lower) {
        caps[1].parse::<i64>().ok()
    } else {
        None
    };
    minutes
        .filter(|m| *m > 0)
        .unwrap_or(DEFAULT_ESTIMATED_MINUTES)
}

fn derive_title(text: &str) -> String {
    text.chars().take(MAX_TITLE_CHARS).collect()
}
