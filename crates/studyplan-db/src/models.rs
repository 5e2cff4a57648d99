use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Subject used when none is given or recognized.
pub const DEFAULT_SUBJECT: &str = "General";

/// Title used for structured inserts that omit one.
pub const DEFAULT_TITLE: &str = "Untitled";

/// Estimate used when none is given or recognized.
pub const DEFAULT_ESTIMATED_MINUTES: i64 = 60;

// ---------------------------------------------------------------------------
// Row structs
// ---------------------------------------------------------------------------

/// A study task.
///
/// `id` and `created_at` are assigned by the database on insert. The only
/// mutation after insert is flipping `completed` to `true`. The estimate is
/// serialized as `est_minutes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Task {
    pub id: i64,
    pub subject: String,
    pub title: String,
    pub notes: String,
    pub deadline: Option<NaiveDate>,
    #[serde(rename = "est_minutes", alias = "estimated_minutes")]
    pub estimated_minutes: i64,
    pub created_at: DateTime<Utc>,
    pub completed: bool,
}

/// Fields for inserting a new task. All defaulting happens before this
/// struct is built; the store writes it verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub subject: String,
    pub title: String,
    pub notes: String,
    pub deadline: Option<NaiveDate>,
    pub estimated_minutes: i64,
}

impl NewTask {
    /// A task with the given title and every other field at its default.
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            subject: DEFAULT_SUBJECT.to_owned(),
            title: title.into(),
            notes: String::new(),
            deadline: None,
            estimated_minutes: DEFAULT_ESTIMATED_MINUTES,
        }
    }
}

/// Aggregate task counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct TaskStats {
    pub total: i64,
    pub completed: i64,
    pub pending: i64,
}
