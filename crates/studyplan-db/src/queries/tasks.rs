//! Database query functions for the `tasks` table.
//!
//! Listing order is deadline ascending with undated tasks last, ties broken
//! by id so insertion order is stable.

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqlitePool;

use crate::models::{NewTask, Task, TaskStats};

const DEADLINE_ORDER: &str = "ORDER BY deadline IS NULL, deadline ASC, id ASC";

/// Insert a new task row. Returns the inserted task with its assigned id
/// and creation timestamp.
pub async fn insert_task(pool: &SqlitePool, new: &NewTask) -> Result<Task> {
    let task = sqlx::query_as::<_, Task>(
        "INSERT INTO tasks (subject, title, notes, deadline, estimated_minutes, created_at) \
         VALUES (?, ?, ?, ?, ?, ?) \
         RETURNING *",
    )
    .bind(&new.subject)
    .bind(&new.title)
    .bind(&new.notes)
    .bind(new.deadline)
    .bind(new.estimated_minutes)
    .bind(Utc::now())
    .fetch_one(pool)
    .await
    .context("failed to insert task")?;

    tracing::debug!(task_id = task.id, subject = %task.subject, "task inserted");
    Ok(task)
}

/// Fetch a single task by ID.
pub async fn get_task(pool: &SqlitePool, id: i64) -> Result<Option<Task>> {
    let task = sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch task")?;

    Ok(task)
}

/// List every task, ordered by deadline.
pub async fn list_tasks(pool: &SqlitePool) -> Result<Vec<Task>> {
    let query = format!("SELECT * FROM tasks {DEADLINE_ORDER}");
    let tasks = sqlx::query_as::<_, Task>(&query)
        .fetch_all(pool)
        .await
        .context("failed to list tasks")?;

    Ok(tasks)
}

/// List tasks that are not yet completed, ordered by deadline.
pub async fn list_pending_tasks(pool: &SqlitePool) -> Result<Vec<Task>> {
    let query = format!("SELECT * FROM tasks WHERE completed = 0 {DEADLINE_ORDER}");
    let tasks = sqlx::query_as::<_, Task>(&query)
        .fetch_all(pool)
        .await
        .context("failed to list pending tasks")?;

    Ok(tasks)
}

/// Mark a task completed.
///
/// Idempotent, and a missing id is not an error. Returns the number of rows
/// matched (0 when the task does not exist).
pub async fn mark_task_completed(pool: &SqlitePool, id: i64) -> Result<u64> {
    let result = sqlx::query("UPDATE tasks SET completed = 1 WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("failed to mark task completed")?;

    Ok(result.rows_affected())
}

/// Delete a task. A missing id is not an error. Returns the number of rows
/// removed.
pub async fn delete_task(pool: &SqlitePool, id: i64) -> Result<u64> {
    let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("failed to delete task")?;

    Ok(result.rows_affected())
}

/// Total, completed, and pending task counts.
pub async fn task_stats(pool: &SqlitePool) -> Result<TaskStats> {
    let stats = sqlx::query_as::<_, TaskStats>(
        "SELECT COUNT(*) AS total, \
                COALESCE(SUM(CASE WHEN completed THEN 1 ELSE 0 END), 0) AS completed, \
                COALESCE(SUM(CASE WHEN completed THEN 0 ELSE 1 END), 0) AS pending \
         FROM tasks",
    )
    .fetch_one(pool)
    .await
    .context("failed to get task stats")?;

    Ok(stats)
}
