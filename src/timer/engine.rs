use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Deserializer};
use uuid::Uuid;

use crate::{
    clock::Clock,
    db::{
        models::{Session, SessionFilter, SessionView},
        repositories::sessions::ensure_task_owned,
        Database,
    },
    error::{ensure_max_chars, ensure_range, PomodoroError, PomodoroResult},
    timer::state::{
        validate_rating, SessionAction, SessionStatus, SessionType, MAX_PLANNED_DURATION,
        MIN_PLANNED_DURATION,
    },
};

pub const MAX_NOTES_CHARS: usize = 1000;

/// Present-but-null deserializes to `Some(None)`, absent to `None`.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewSession {
    pub session_type: SessionType,
    pub planned_duration: i64,
    #[serde(default)]
    pub session_number: Option<i64>,
    #[serde(default)]
    pub task: Option<i64>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewSession {
    pub const FIELDS: &'static [&'static str] = &[
        "session_type",
        "planned_duration",
        "session_number",
        "task",
        "notes",
    ];
}

/// Metadata edits. Status and timing are never reachable from here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionUpdate {
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub productivity_rating: Option<Option<i64>>,
    #[serde(default, deserialize_with = "nullable")]
    pub task: Option<Option<i64>>,
}

impl SessionUpdate {
    pub const FIELDS: &'static [&'static str] = &["notes", "productivity_rating", "task"];
}

fn checked_rating(session_type: SessionType, rating: Option<i64>) -> PomodoroResult<Option<u8>> {
    // Anything outside u8 is out of scale as well.
    let rating = rating.map(|raw| u8::try_from(raw).unwrap_or(u8::MAX));
    validate_rating(session_type, rating)?;
    Ok(rating)
}

/// Drives the session state machine against storage.
///
/// Each transition is read, validated and written back as one unit on the
/// database worker, with the write conditional on the status that was read.
#[derive(Clone)]
pub struct SessionEngine {
    db: Database,
    clock: Arc<dyn Clock>,
    sync_threshold_secs: i64,
}

impl SessionEngine {
    pub fn new(db: Database, clock: Arc<dyn Clock>, sync_threshold_secs: i64) -> Self {
        Self {
            db,
            clock,
            sync_threshold_secs,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub(crate) fn db(&self) -> &Database {
        &self.db
    }

    pub(crate) fn sync_threshold_secs(&self) -> i64 {
        self.sync_threshold_secs
    }

    pub async fn create(&self, user_id: i64, request: NewSession) -> PomodoroResult<SessionView> {
        ensure_range(
            "planned_duration",
            request.planned_duration,
            MIN_PLANNED_DURATION,
            MAX_PLANNED_DURATION,
            "minutes",
        )?;
        let session_number = request.session_number.unwrap_or(1);
        if session_number < 1 {
            return Err(PomodoroError::validation(
                "session_number",
                "must be at least 1",
            ));
        }
        let session_number = u32::try_from(session_number)
            .map_err(|_| PomodoroError::validation("session_number", "is too large"))?;
        let notes = request.notes.unwrap_or_default();
        ensure_max_chars("notes", &notes, MAX_NOTES_CHARS)?;

        let now = self.clock.now();
        let session = Session {
            id: Uuid::new_v4().to_string(),
            user_id,
            task_id: request.task,
            session_type: request.session_type,
            status: SessionStatus::Active,
            planned_duration: u32::try_from(request.planned_duration).map_err(|_| {
                PomodoroError::validation("planned_duration", "is out of range")
            })?,
            actual_duration: None,
            session_number,
            started_at: now,
            paused_at: None,
            completed_at: None,
            total_paused_seconds: 0,
            notes,
            productivity_rating: None,
            created_at: now,
            updated_at: now,
        };

        let task_title = self.db.insert_session(&session).await?;
        info!(
            "Session {} created for user {} ({}, {} min)",
            session.id,
            user_id,
            session.session_type.as_str(),
            session.planned_duration
        );
        Ok(SessionView::build(session, task_title, now))
    }

    pub async fn get(&self, user_id: i64, session_id: &str) -> PomodoroResult<SessionView> {
        let (session, task_title) = self
            .db
            .get_session(user_id, session_id)
            .await?
            .ok_or_else(|| PomodoroError::not_found("Session not found"))?;
        let session = self.reconcile(session).await?;
        Ok(SessionView::build(session, task_title, self.clock.now()))
    }

    pub async fn list(
        &self,
        user_id: i64,
        filter: SessionFilter,
    ) -> PomodoroResult<Vec<SessionView>> {
        self.reconcile_all(user_id).await?;
        let now = self.clock.now();
        let sessions = self.db.list_sessions(user_id, filter).await?;
        Ok(sessions
            .into_iter()
            .map(|(session, task_title)| SessionView::build(session, task_title, now))
            .collect())
    }

    pub async fn pause(&self, user_id: i64, session_id: &str) -> PomodoroResult<SessionView> {
        self.transition(user_id, session_id, SessionAction::Pause)
            .await
    }

    pub async fn resume(&self, user_id: i64, session_id: &str) -> PomodoroResult<SessionView> {
        self.transition(user_id, session_id, SessionAction::Resume)
            .await
    }

    pub async fn complete(&self, user_id: i64, session_id: &str) -> PomodoroResult<SessionView> {
        self.transition(user_id, session_id, SessionAction::Complete)
            .await
    }

    pub async fn skip(&self, user_id: i64, session_id: &str) -> PomodoroResult<SessionView> {
        self.transition(user_id, session_id, SessionAction::Skip)
            .await
    }

    pub async fn cancel(&self, user_id: i64, session_id: &str) -> PomodoroResult<SessionView> {
        self.transition(user_id, session_id, SessionAction::Cancel)
            .await
    }

    pub async fn transition(
        &self,
        user_id: i64,
        session_id: &str,
        action: SessionAction,
    ) -> PomodoroResult<SessionView> {
        let now = self.clock.now();
        let result = self
            .db
            .update_session_with(user_id, session_id, move |_, session| {
                session.apply(action, now)
            })
            .await;

        let (session, task_title) = match result {
            Ok(updated) => updated,
            Err(PomodoroError::Conflict(message)) => {
                warn!("Concurrent {} on session {session_id}: {message}", action.as_str());
                return Err(PomodoroError::Conflict(message));
            }
            Err(err) => return Err(err),
        };

        match action {
            SessionAction::Pause | SessionAction::Resume => info!(
                "Session {} {} (paused total {}s)",
                session.id,
                session.status,
                session.total_paused_seconds
            ),
            _ => info!(
                "Session {} {} after {} min",
                session.id,
                session.status,
                session.actual_duration.unwrap_or(0)
            ),
        }
        Ok(SessionView::build(session, task_title, now))
    }

    /// Completes an active session whose planned time has run out.
    ///
    /// Returns the session unchanged when it is not overdue. A session that a
    /// concurrent request already moved on is reported as it now stands.
    pub async fn reconcile(&self, session: Session) -> PomodoroResult<Session> {
        let now = self.clock.now();
        if !session.is_overdue(now) {
            return Ok(session);
        }

        let user_id = session.user_id;
        let session_id = session.id.clone();
        let result = self
            .db
            .update_session_with(user_id, &session_id, move |_, current| {
                if current.is_overdue(now) {
                    current.apply(SessionAction::Complete, now)
                } else {
                    Ok(())
                }
            })
            .await;

        match result {
            Ok((completed, _)) => {
                if completed.status == SessionStatus::Completed {
                    info!(
                        "Session {} auto-completed after {} min",
                        completed.id,
                        completed.actual_duration.unwrap_or(0)
                    );
                }
                Ok(completed)
            }
            Err(PomodoroError::Conflict(_)) => {
                let (current, _) = self
                    .db
                    .get_session(user_id, &session_id)
                    .await?
                    .ok_or_else(|| PomodoroError::not_found("Session not found"))?;
                Ok(current)
            }
            Err(err) => Err(err),
        }
    }

    /// Runs [`reconcile`](Self::reconcile) over every active session of the user.
    pub async fn reconcile_all(&self, user_id: i64) -> PomodoroResult<()> {
        let now = self.clock.now();
        let running = self
            .db
            .list_sessions(
                user_id,
                SessionFilter {
                    status: Some(SessionStatus::Active),
                    ..SessionFilter::default()
                },
            )
            .await?;
        for (session, _) in running {
            if session.is_overdue(now) {
                self.reconcile(session).await?;
            }
        }
        Ok(())
    }

    /// The user's running or paused session, or `None`.
    ///
    /// An active session past its planned duration is completed first and then
    /// no longer counts as open.
    pub async fn active(&self, user_id: i64) -> PomodoroResult<Option<SessionView>> {
        let Some((session, task_title)) = self.db.get_open_session(user_id).await? else {
            return Ok(None);
        };

        let session = self.reconcile(session).await?;
        if session.status.is_terminal() {
            return Ok(None);
        }
        Ok(Some(SessionView::build(session, task_title, self.clock.now())))
    }

    /// Edits notes, rating or task link; leaves status and timing alone.
    pub async fn update(
        &self,
        user_id: i64,
        session_id: &str,
        update: SessionUpdate,
    ) -> PomodoroResult<SessionView> {
        if let Some(notes) = &update.notes {
            ensure_max_chars("notes", notes, MAX_NOTES_CHARS)?;
        }

        let now = self.clock.now();
        let (session, task_title) = self
            .db
            .update_session_with(user_id, session_id, move |conn, session| {
                if let Some(notes) = update.notes {
                    session.notes = notes;
                }
                if let Some(rating) = update.productivity_rating {
                    session.productivity_rating = checked_rating(session.session_type, rating)?;
                }
                if let Some(task) = update.task {
                    if let Some(task_id) = task {
                        ensure_task_owned(conn, user_id, task_id)?;
                    }
                    session.task_id = task;
                }
                session.updated_at = now;
                Ok(())
            })
            .await?;

        Ok(SessionView::build(session, task_title, now))
    }

    pub async fn delete(&self, user_id: i64, session_id: &str) -> PomodoroResult<()> {
        if !self.db.delete_session(user_id, session_id).await? {
            return Err(PomodoroError::not_found("Session not found"));
        }
        info!("Session {session_id} deleted by user {user_id}");
        Ok(())
    }
}
