//! Minimal task mirror.
//!
//! Tasks belong to the task-management layer; sessions only need to check that a
//! referenced task exists and is owned by the caller, and to show its title.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use crate::db::{
    connection::Database,
    helpers::{format_datetime, parse_datetime},
    models::TaskRef,
};

fn row_to_task(row: &Row) -> Result<TaskRef> {
    let created_at: String = row.get("created_at")?;
    Ok(TaskRef {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        title: row.get("title")?,
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

impl Database {
    pub async fn insert_task(
        &self,
        user_id: i64,
        title: String,
        now: DateTime<Utc>,
    ) -> Result<TaskRef> {
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO tasks (user_id, title, created_at) VALUES (?1, ?2, ?3)",
                params![user_id, title, format_datetime(&now)],
            )?;
            let task_id = conn.last_insert_rowid();

            let mut stmt =
                conn.prepare("SELECT id, user_id, title, created_at FROM tasks WHERE id = ?1")?;
            let mut rows = stmt.query(params![task_id])?;
            match rows.next()? {
                Some(row) => row_to_task(row),
                None => Err(anyhow!("Task not found after insert")),
            }
        })
        .await
    }

    pub async fn get_task(&self, user_id: i64, task_id: i64) -> Result<Option<TaskRef>> {
        self.execute(move |conn| {
            let task = conn
                .query_row(
                    "SELECT id, user_id, title, created_at FROM tasks WHERE id = ?1 AND user_id = ?2",
                    params![task_id, user_id],
                    |row| Ok(row_to_task(row)),
                )
                .optional()?
                .transpose()?;
            Ok(task)
        })
        .await
    }

    /// Removes a task; sessions pointing at it keep existing with the link cleared.
    pub async fn delete_task(&self, user_id: i64, task_id: i64) -> Result<bool> {
        self.execute(move |conn| {
            let rows_affected = conn.execute(
                "DELETE FROM tasks WHERE id = ?1 AND user_id = ?2",
                params![task_id, user_id],
            )?;
            Ok(rows_affected > 0)
        })
        .await
    }
}
