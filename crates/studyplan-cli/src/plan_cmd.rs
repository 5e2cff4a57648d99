//! `studyplan plan` command: print a time-boxed plan for the day.

use anyhow::Result;
use chrono::Local;
use sqlx::SqlitePool;

use studyplan_core::DailyPlan;
use studyplan_core::service::{self, GeneratePlanInput};

use crate::task_cmds::truncate;

/// Build and print a plan over all pending tasks.
pub async fn run_plan(pool: &SqlitePool, minutes: Option<i64>, date: Option<String>) -> Result<()> {
    let input = GeneratePlanInput {
        available_minutes: minutes,
        date,
    };
    let plan = service::build_daily_plan(pool, input, Local::now().date_naive()).await?;
    print!("{}", render_plan(&plan));
    Ok(())
}

fn render_plan(plan: &DailyPlan) -> String {
    let mut out = format!(
        "Plan for {} ({} of {} min used, {} left)\n",
        plan.date, plan.used_minutes, plan.available_minutes, plan.remaining_minutes
    );

    if plan.plan.is_empty() {
        out.push_str("  Nothing scheduled.\n");
        return out;
    }

    for (i, entry) in plan.plan.iter().enumerate() {
        let deadline = entry
            .deadline
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "  {:>2}. [{:>4} min] #{} {} / {} (due {})\n",
            i + 1,
            entry.minutes,
            entry.task_id,
            entry.subject,
            truncate(&entry.title, 40),
            deadline,
        ));
    }
    out
}
