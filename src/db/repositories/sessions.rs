use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};

use crate::{
    db::{
        connection::Database,
        helpers::{
            format_datetime, format_optional_datetime, parse_datetime, parse_optional_datetime,
            parse_session_type, parse_status, to_u32,
        },
        models::{Session, SessionFilter},
    },
    error::{PomodoroError, PomodoroResult},
};

const SESSION_SELECT: &str = "SELECT s.id, s.user_id, s.task_id, s.session_type, s.status,
        s.planned_duration, s.actual_duration, s.session_number, s.started_at, s.paused_at,
        s.completed_at, s.total_paused_seconds, s.notes, s.productivity_rating,
        s.created_at, s.updated_at, t.title AS task_title
     FROM sessions s
     LEFT JOIN tasks t ON t.id = s.task_id";

fn row_to_session(row: &Row) -> Result<(Session, Option<String>)> {
    let session_type: String = row.get("session_type")?;
    let status: String = row.get("status")?;
    let planned_duration: i64 = row.get("planned_duration")?;
    let actual_duration: Option<i64> = row.get("actual_duration")?;
    let session_number: i64 = row.get("session_number")?;
    let started_at: String = row.get("started_at")?;
    let paused_at: Option<String> = row.get("paused_at")?;
    let completed_at: Option<String> = row.get("completed_at")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;
    let rating: Option<i64> = row.get("productivity_rating")?;

    let session = Session {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        task_id: row.get("task_id")?,
        session_type: parse_session_type(&session_type)?,
        status: parse_status(&status)?,
        planned_duration: to_u32(planned_duration, "planned_duration")?,
        actual_duration: actual_duration
            .map(|v| to_u32(v, "actual_duration"))
            .transpose()?,
        session_number: to_u32(session_number, "session_number")?,
        started_at: parse_datetime(&started_at, "started_at")?,
        paused_at: parse_optional_datetime(paused_at, "paused_at")?,
        completed_at: parse_optional_datetime(completed_at, "completed_at")?,
        total_paused_seconds: row.get("total_paused_seconds")?,
        notes: row.get("notes")?,
        productivity_rating: rating
            .map(|v| u8::try_from(v).context("productivity_rating out of range"))
            .transpose()?,
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    };

    Ok((session, row.get("task_title")?))
}

fn load_session(
    conn: &Connection,
    user_id: i64,
    session_id: &str,
) -> Result<Option<(Session, Option<String>)>> {
    let mut stmt = conn.prepare(&format!("{SESSION_SELECT} WHERE s.id = ?1 AND s.user_id = ?2"))?;
    let mut rows = stmt.query(params![session_id, user_id])?;
    match rows.next()? {
        Some(row) => Ok(Some(row_to_session(row)?)),
        None => Ok(None),
    }
}

fn collect_sessions(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> Result<Vec<(Session, Option<String>)>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params)?;
    let mut sessions = Vec::new();
    while let Some(row) = rows.next()? {
        sessions.push(row_to_session(row)?);
    }
    Ok(sessions)
}

/// Looks up a task and confirms it belongs to `user_id`.
///
/// Either failure is a validation error on the `task` field.
pub(crate) fn ensure_task_owned(conn: &Connection, user_id: i64, task_id: i64) -> Result<()> {
    let owner: Option<i64> = conn
        .query_row(
            "SELECT user_id FROM tasks WHERE id = ?1",
            params![task_id],
            |row| row.get(0),
        )
        .optional()?;

    match owner {
        Some(owner) if owner == user_id => Ok(()),
        Some(_) => Err(PomodoroError::validation(
            "task",
            "Task must belong to the current user.",
        )
        .into()),
        None => Err(
            PomodoroError::validation("task", format!("Task {task_id} does not exist.")).into(),
        ),
    }
}

impl Database {
    /// Inserts a new session after checking task ownership in the same unit of work.
    pub async fn insert_session(&self, session: &Session) -> Result<Option<String>> {
        let record = session.clone();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            if let Some(task_id) = record.task_id {
                ensure_task_owned(&tx, record.user_id, task_id)?;
            }

            tx.execute(
                "INSERT INTO sessions (id, user_id, task_id, session_type, status, planned_duration,
                                       actual_duration, session_number, started_at, paused_at,
                                       completed_at, total_paused_seconds, notes, productivity_rating,
                                       created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
                params![
                    record.id,
                    record.user_id,
                    record.task_id,
                    record.session_type.as_str(),
                    record.status.as_str(),
                    record.planned_duration,
                    record.actual_duration,
                    record.session_number,
                    format_datetime(&record.started_at),
                    format_optional_datetime(record.paused_at.as_ref()),
                    format_optional_datetime(record.completed_at.as_ref()),
                    record.total_paused_seconds,
                    record.notes,
                    record.productivity_rating,
                    format_datetime(&record.created_at),
                    format_datetime(&record.updated_at),
                ],
            )
            .with_context(|| "failed to insert session")?;

            let title: Option<String> = match record.task_id {
                Some(task_id) => tx
                    .query_row(
                        "SELECT title FROM tasks WHERE id = ?1",
                        params![task_id],
                        |row| row.get(0),
                    )
                    .optional()?,
                None => None,
            };

            tx.commit()?;
            Ok(title)
        })
        .await
    }

    pub async fn get_session(
        &self,
        user_id: i64,
        session_id: &str,
    ) -> Result<Option<(Session, Option<String>)>> {
        let session_id = session_id.to_string();
        self.execute(move |conn| load_session(conn, user_id, &session_id))
            .await
    }

    /// Reads, mutates and writes back one session as a single unit.
    ///
    /// The write is conditional on the status that was read, so a concurrent
    /// transition that got there first makes this one fail with a conflict
    /// instead of overwriting it.
    pub async fn update_session_with<F>(
        &self,
        user_id: i64,
        session_id: &str,
        mutate: F,
    ) -> PomodoroResult<(Session, Option<String>)>
    where
        F: FnOnce(&Connection, &mut Session) -> PomodoroResult<()> + Send + 'static,
    {
        let session_id = session_id.to_string();
        let result = self
            .execute(move |conn| {
                let tx = conn.transaction()?;
                let (mut session, _) = load_session(&tx, user_id, &session_id)?
                    .ok_or_else(|| PomodoroError::not_found("Session not found"))?;
                let expected_status = session.status;

                mutate(&tx, &mut session).map_err(anyhow::Error::new)?;

                let rows_affected = tx.execute(
                    "UPDATE sessions
                     SET task_id = ?1,
                         status = ?2,
                         actual_duration = ?3,
                         paused_at = ?4,
                         completed_at = ?5,
                         total_paused_seconds = ?6,
                         notes = ?7,
                         productivity_rating = ?8,
                         updated_at = ?9
                     WHERE id = ?10 AND user_id = ?11 AND status = ?12",
                    params![
                        session.task_id,
                        session.status.as_str(),
                        session.actual_duration,
                        format_optional_datetime(session.paused_at.as_ref()),
                        format_optional_datetime(session.completed_at.as_ref()),
                        session.total_paused_seconds,
                        session.notes,
                        session.productivity_rating,
                        format_datetime(&session.updated_at),
                        session.id,
                        user_id,
                        expected_status.as_str(),
                    ],
                )?;

                if rows_affected == 0 {
                    return Err(PomodoroError::Conflict(format!(
                        "Session {} changed while it was being updated",
                        session.id
                    ))
                    .into());
                }

                let updated = load_session(&tx, user_id, &session.id)?
                    .ok_or_else(|| PomodoroError::not_found("Session not found"))?;
                tx.commit()?;
                Ok(updated)
            })
            .await?;
        Ok(result)
    }

    /// Most recently started session that is still running or paused.
    pub async fn get_open_session(&self, user_id: i64) -> Result<Option<(Session, Option<String>)>> {
        self.execute(move |conn| {
            let mut sessions = collect_sessions(
                conn,
                &format!(
                    "{SESSION_SELECT}
                     WHERE s.user_id = ?1 AND s.status IN ('active', 'paused')
                     ORDER BY s.started_at DESC
                     LIMIT 1"
                ),
                params![user_id],
            )?;
            Ok(sessions.pop())
        })
        .await
    }

    /// Session that is active or paused, or `None` if it is terminal, missing or not the user's.
    pub async fn get_open_session_by_id(
        &self,
        user_id: i64,
        session_id: &str,
    ) -> Result<Option<Session>> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            Ok(load_session(conn, user_id, &session_id)?
                .map(|(session, _)| session)
                .filter(|session| !session.status.is_terminal()))
        })
        .await
    }

    pub async fn list_sessions(
        &self,
        user_id: i64,
        filter: SessionFilter,
    ) -> Result<Vec<(Session, Option<String>)>> {
        self.execute(move |conn| {
            let mut clauses = vec!["s.user_id = ?".to_string()];
            let mut values: Vec<Box<dyn ToSql>> = vec![Box::new(user_id)];

            if let Some(session_type) = filter.session_type {
                clauses.push("s.session_type = ?".into());
                values.push(Box::new(session_type.as_str()));
            }
            if let Some(status) = filter.status {
                clauses.push("s.status = ?".into());
                values.push(Box::new(status.as_str()));
            }
            if let Some(start) = filter.start_date {
                clauses.push("substr(s.started_at, 1, 10) >= ?".into());
                values.push(Box::new(start.format("%Y-%m-%d").to_string()));
            }
            if let Some(end) = filter.end_date {
                clauses.push("substr(s.started_at, 1, 10) <= ?".into());
                values.push(Box::new(end.format("%Y-%m-%d").to_string()));
            }

            let sql = format!(
                "{SESSION_SELECT} WHERE {} ORDER BY s.started_at DESC",
                clauses.join(" AND ")
            );
            let params_refs: Vec<&dyn ToSql> = values.iter().map(|b| b.as_ref()).collect();
            collect_sessions(conn, &sql, &params_refs)
        })
        .await
    }

    /// Sessions whose `started_at` falls at or after `since`, oldest first.
    pub async fn sessions_started_since(
        &self,
        user_id: i64,
        since: DateTime<Utc>,
    ) -> Result<Vec<Session>> {
        let since = format_datetime(&since);
        self.execute(move |conn| {
            let sessions = collect_sessions(
                conn,
                &format!(
                    "{SESSION_SELECT}
                     WHERE s.user_id = ?1 AND s.started_at >= ?2
                     ORDER BY s.started_at ASC"
                ),
                params![user_id, since],
            )?;
            Ok(sessions.into_iter().map(|(session, _)| session).collect())
        })
        .await
    }

    /// Distinct UTC calendar days carrying at least one completed session, ascending.
    pub async fn completed_session_days(&self, user_id: i64) -> Result<Vec<NaiveDate>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT substr(started_at, 1, 10) AS day
                 FROM sessions
                 WHERE user_id = ?1 AND status = 'completed'
                 ORDER BY day ASC",
            )?;
            let mut rows = stmt.query(params![user_id])?;
            let mut days = Vec::new();
            while let Some(row) = rows.next()? {
                let raw: String = row.get(0)?;
                days.push(
                    NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                        .with_context(|| format!("invalid session day '{raw}'"))?,
                );
            }
            Ok(days)
        })
        .await
    }

    pub async fn delete_session(&self, user_id: i64, session_id: &str) -> Result<bool> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let rows_affected = conn.execute(
                "DELETE FROM sessions WHERE id = ?1 AND user_id = ?2",
                params![session_id, user_id],
            )?;
            Ok(rows_affected > 0)
        })
        .await
    }
}
