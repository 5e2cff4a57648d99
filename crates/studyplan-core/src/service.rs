//! Task service layer.
//!
//! Validated input structs for each write/plan operation, their defaulting
//! rules, and the functions that run them against the store. Both the HTTP
//! handlers and the CLI go through here.

use anyhow::Context;
use chrono::NaiveDate;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;

use studyplan_db::models::{
    DEFAULT_ESTIMATED_MINUTES, DEFAULT_SUBJECT, DEFAULT_TITLE, NewTask, Task,
};
use studyplan_db::queries::tasks as task_db;

use crate::parser::{ParsedTask, parse_task_text};
use crate::planner::{DEFAULT_AVAILABLE_MINUTES, DailyPlan, generate_plan};

/// Client-side input problems. Nothing is written when one is returned.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaskInputError {
    #[error("No text provided")]
    EmptyText,

    #[error("invalid deadline {0:?} (expected YYYY-MM-DD)")]
    InvalidDeadline(String),

    #[error("estimated_minutes must be positive, got {0}")]
    InvalidEstimate(i64),

    #[error("available_minutes must not be negative, got {0}")]
    NegativeBudget(i64),

    #[error("invalid date {0:?} (expected YYYY-MM-DD)")]
    InvalidDate(String),
}

/// Errors from service operations.
#[derive(Debug, Error)]
pub enum TaskServiceError {
    #[error(transparent)]
    Input(#[from] TaskInputError),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Structured task creation. Every field is optional; empty strings and a
/// zero estimate count as missing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateTaskInput {
    pub subject: Option<String>,
    pub title: Option<String>,
    pub notes: Option<String>,
    pub deadline: Option<String>,
    #[serde(alias = "est_minutes", default, deserialize_with = "whole_minutes")]
    pub estimated_minutes: Option<i64>,
}

impl CreateTaskInput {
    /// Apply defaults and validate.
    pub fn into_new_task(self) -> Result<NewTask, TaskInputError> {
        let deadline = match non_empty(self.deadline) {
            Some(raw) => Some(parse_date(&raw).ok_or(TaskInputError::InvalidDeadline(raw))?),
            None => None,
        };
        let estimated_minutes = match self.estimated_minutes {
            None | Some(0) => DEFAULT_ESTIMATED_MINUTES,
            Some(m) if m < 0 => return Err(TaskInputError::InvalidEstimate(m)),
            Some(m) => m,
        };
        Ok(NewTask {
            subject: non_empty(self.subject).unwrap_or_else(|| DEFAULT_SUBJECT.to_owned()),
            title: non_empty(self.title).unwrap_or_else(|| DEFAULT_TITLE.to_owned()),
            notes: self.notes.unwrap_or_default(),
            deadline,
            estimated_minutes,
        })
    }
}

/// Free-text task creation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateFromTextInput {
    pub text: Option<String>,
}

/// Plan generation request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeneratePlanInput {
    #[serde(default, deserialize_with = "whole_minutes")]
    pub available_minutes: Option<i64>,
    pub date: Option<String>,
}

impl GeneratePlanInput {
    /// Resolve the budget (default 180) and plan date (default `today`).
    pub fn resolve(self, today: NaiveDate) -> Result<(i64, NaiveDate), TaskInputError> {
        let minutes = self.available_minutes.unwrap_or(DEFAULT_AVAILABLE_MINUTES);
        if minutes < 0 {
            return Err(TaskInputError::NegativeBudget(minutes));
        }
        let date = match non_empty(self.date) {
            Some(raw) => parse_date(&raw).ok_or(TaskInputError::InvalidDate(raw))?,
            None => today,
        };
        Ok((minutes, date))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(i64),
    Text(String),
}

/// Minute counts arrive as JSON integers or numeric strings (`"45"`). A
/// blank string counts as missing.
fn whole_minutes<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    match Option::<NumberOrText>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrText::Number(n)) => Ok(Some(n)),
        Some(NumberOrText::Text(raw)) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed.parse().map(Some).map_err(|_| {
                D::Error::custom(format!("expected a whole number of minutes, got {raw:?}"))
            })
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Insert a task from structured fields.
pub async fn create_task(
    pool: &SqlitePool,
    input: CreateTaskInput,
) -> Result<Task, TaskServiceError> {
    let new = input.into_new_task()?;
    let task = task_db::insert_task(pool, &new).await?;
    info!(task_id = task.id, subject = %task.subject, "task created");
    Ok(task)
}

/// Parse free text and insert the result.
///
/// Empty text is rejected before parsing. Whitespace-only text is not
/// empty and is stored with the parser's defaults.
pub async fn create_task_from_text(
    pool: &SqlitePool,
    text: &str,
    today: NaiveDate,
) -> Result<(ParsedTask, Task), TaskServiceError> {
    if text.is_empty() {
        return Err(TaskInputError::EmptyText.into());
    }
    let parsed = parse_task_text(text, today);
    let task = task_db::insert_task(pool, &NewTask::from(parsed.clone()))
        .await
        .context("failed to store parsed task")?;
    info!(
        task_id = task.id,
        subject = %parsed.subject,
        deadline = ?parsed.deadline,
        minutes = parsed.estimated_minutes,
        "task created from text"
    );
    Ok((parsed, task))
}

/// Build a plan over every pending task.
pub async fn build_daily_plan(
    pool: &SqlitePool,
    input: GeneratePlanInput,
    today: NaiveDate,
) -> Result<DailyPlan, TaskServiceError> {
    let (available_minutes, date) = input.resolve(today)?;
    let pending = task_db::list_pending_tasks(pool).await?;
    let plan = generate_plan(&pending, available_minutes, date);
    info!(
        %date,
        available_minutes,
        used_minutes = plan.used_minutes,
        entries = plan.plan.len(),
        "plan generated"
    );
    Ok(plan)
}
