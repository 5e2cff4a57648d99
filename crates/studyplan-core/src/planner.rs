//! Daily plan generation.
//!
//! Greedy earliest-deadline-first allocation: walk pending tasks in the order
//! given and hand each one `min(remaining, estimate)` minutes until the budget
//! runs out. Tasks past that point are left out of the plan.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use studyplan_db::models::Task;

/// Budget used when the caller does not give one.
pub const DEFAULT_AVAILABLE_MINUTES: i64 = 180;

/// One task's slot in a plan.
///
/// `minutes` may be less than the task's estimate when the budget ran out
/// part way through it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanEntry {
    pub task_id: i64,
    pub subject: String,
    pub title: String,
    pub deadline: Option<NaiveDate>,
    pub minutes: i64,
}

/// A time-boxed plan for one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyPlan {
    pub date: NaiveDate,
    pub available_minutes: i64,
    pub used_minutes: i64,
    pub remaining_minutes: i64,
    pub plan: Vec<PlanEntry>,
}

/// Allocate `available_minutes` across `tasks` in iteration order.
///
/// `tasks` should already be sorted by deadline; completed tasks are skipped.
/// `date` is carried into the result and does not filter anything.
pub fn generate_plan<'a, I>(tasks: I, available_minutes: i64, date: NaiveDate) -> DailyPlan
where
    I: IntoIterator<Item = &'a Task>,
{
    let mut remaining = available_minutes;
    let mut plan = Vec::new();

    for task in tasks.into_iter().filter(|t| !t.completed) {
        if remaining <= 0 {
            break;
        }
        let take = remaining.min(task.estimated_minutes);
        plan.push(PlanEntry {
            task_id: task.id,
            subject: task.subject.clone(),
            title: task.title.clone(),
            deadline: task.deadline,
            minutes: take,
        });
        remaining -= take;
    }

    DailyPlan {
        date,
        available_minutes,
        used_minutes: available_minutes - remaining,
        remaining_minutes: remaining,
        plan,
    }
}
