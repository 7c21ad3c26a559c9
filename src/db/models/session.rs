//! Session records as persisted and as returned to callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::{SessionStatus, SessionType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub user_id: i64,
    pub task_id: Option<i64>,
    pub session_type: SessionType,
    pub status: SessionStatus,
    /// Minutes.
    pub planned_duration: u32,
    /// Minutes; only set by a terminal transition.
    pub actual_duration: Option<u32>,
    pub session_number: u32,
    pub started_at: DateTime<Utc>,
    pub paused_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub total_paused_seconds: i64,
    pub notes: String,
    pub productivity_rating: Option<u8>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Session as it leaves the service: the stored record plus values derived at read time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionView {
    pub id: String,
    pub task: Option<i64>,
    pub task_title: Option<String>,
    pub session_type: SessionType,
    pub status: SessionStatus,
    pub planned_duration: u32,
    pub actual_duration: Option<u32>,
    pub started_at: DateTime<Utc>,
    pub paused_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub session_number: u32,
    pub total_paused_seconds: i64,
    pub notes: String,
    pub productivity_rating: Option<u8>,
    pub elapsed_minutes: i64,
    pub remaining_minutes: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionView {
    pub fn build(session: Session, task_title: Option<String>, now: DateTime<Utc>) -> Self {
        let elapsed_minutes = session.elapsed_minutes(now);
        let remaining_minutes = session.remaining_minutes(now);
        Self {
            id: session.id,
            task: session.task_id,
            task_title,
            session_type: session.session_type,
            status: session.status,
            planned_duration: session.planned_duration,
            actual_duration: session.actual_duration,
            started_at: session.started_at,
            paused_at: session.paused_at,
            completed_at: session.completed_at,
            session_number: session.session_number,
            total_paused_seconds: session.total_paused_seconds,
            notes: session.notes,
            productivity_rating: session.productivity_rating,
            elapsed_minutes,
            remaining_minutes,
            created_at: session.created_at,
            updated_at: session.updated_at,
        }
    }
}

/// Optional filters for listing a user's sessions.
#[derive(Debug, Clone, Default)]
pub struct SessionFilter {
    pub session_type: Option<SessionType>,
    pub status: Option<SessionStatus>,
    /// Inclusive, by `started_at` calendar day (UTC).
    pub start_date: Option<chrono::NaiveDate>,
    pub end_date: Option<chrono::NaiveDate>,
}
