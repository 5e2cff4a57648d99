//! `studyplan task ...` and `studyplan stats` commands.

use anyhow::Result;
use chrono::Local;
use sqlx::SqlitePool;

use studyplan_core::service::{self, CreateTaskInput};
use studyplan_db::models::Task;
use studyplan_db::queries::tasks as task_db;

use crate::TaskCommands;

/// Dispatch a `task` subcommand.
pub async fn run_task_command(command: TaskCommands, pool: &SqlitePool) -> Result<()> {
    match command {
        TaskCommands::Add {
            title,
            subject,
            notes,
            deadline,
            minutes,
        } => {
            let input = CreateTaskInput {
                subject,
                title: Some(title),
                notes,
                deadline,
                estimated_minutes: minutes,
            };
            let task = service::create_task(pool, input).await?;
            println!("Created task {}: {}", task.id, task.title);
        }
        TaskCommands::AddText { text } => {
            let today = Local::now().date_naive();
            let (parsed, task) = service::create_task_from_text(pool, &text, today).await?;
            println!("Created task {}", task.id);
            println!("  subject:  {}", parsed.subject);
            println!("  title:    {}", parsed.title);
            println!("  deadline: {}", format_deadline(&task));
            println!("  estimate: {} min", parsed.estimated_minutes);
        }
        TaskCommands::List { pending } => {
            let tasks = if pending {
                task_db::list_pending_tasks(pool).await?
            } else {
                task_db::list_tasks(pool).await?
            };
            print_task_table(&tasks);
        }
        TaskCommands::Complete { id } => {
            let affected = task_db::mark_task_completed(pool, id).await?;
            if affected == 0 {
                println!("No task with id {id}; nothing to do.");
            } else {
                println!("Task {id} marked as completed.");
            }
        }
        TaskCommands::Delete { id } => {
            let affected = task_db::delete_task(pool, id).await?;
            if affected == 0 {
                println!("No task with id {id}; nothing to do.");
            } else {
                println!("Task {id} deleted.");
            }
        }
    }
    Ok(())
}

/// Print total/completed/pending counts.
pub async fn run_stats(pool: &SqlitePool) -> Result<()> {
    let stats = task_db::task_stats(pool).await?;
    println!("Total:     {}", stats.total);
    println!("Completed: {}", stats.completed);
    println!("Pending:   {}", stats.pending);
    Ok(())
}

fn format_deadline(task: &Task) -> String {
    task.deadline
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn print_task_table(tasks: &[Task]) {
    if tasks.is_empty() {
        println!("No tasks found.");
        return;
    }

    println!(
        "{:>5}  {:<3} {:<10} {:<12} {:>6}  TITLE",
        "ID", "", "SUBJECT", "DEADLINE", "MIN"
    );
    println!("{}", "-".repeat(80));

    for task in tasks {
        let done = if task.completed { "[x]" } else { "[ ]" };
        println!(
            "{:>5}  {:<3} {:<10} {:<12} {:>6}  {}",
            task.id,
            done,
            task.subject,
            format_deadline(task),
            task.estimated_minutes,
            truncate(&task.title, 40),
        );
    }
}

/// Shorten `s` to at most `max` characters, marking the cut with `...`.
pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let kept: String = s.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}
