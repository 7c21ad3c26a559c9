//! Session lifecycle state machine.
//!
//! ```text
//!            pause              complete / skip / cancel
//!   active ---------> paused ---------------------------+
//!     ^ |   <---------                                   v
//!     | |   resume                      completed | skipped | cancelled
//!     | +--------------------------------------------------^
//! ```
//!
//! Everything here is pure: the caller supplies `now`, and persistence is the
//! engine's job.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    db::models::Session,
    error::{PomodoroError, PomodoroResult},
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    Work,
    ShortBreak,
    LongBreak,
}

impl SessionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionType::Work => "work",
            SessionType::ShortBreak => "short_break",
            SessionType::LongBreak => "long_break",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "work" => Some(SessionType::Work),
            "short_break" => Some(SessionType::ShortBreak),
            "long_break" => Some(SessionType::LongBreak),
            _ => None,
        }
    }

    pub fn is_break(&self) -> bool {
        !matches!(self, SessionType::Work)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Paused,
    Completed,
    Skipped,
    Cancelled,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Paused => "paused",
            SessionStatus::Completed => "completed",
            SessionStatus::Skipped => "skipped",
            SessionStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(SessionStatus::Active),
            "paused" => Some(SessionStatus::Paused),
            "completed" => Some(SessionStatus::Completed),
            "skipped" => Some(SessionStatus::Skipped),
            "cancelled" => Some(SessionStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionStatus::Completed | SessionStatus::Skipped | SessionStatus::Cancelled
        )
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAction {
    Pause,
    Resume,
    Complete,
    Skip,
    Cancel,
}

impl SessionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionAction::Pause => "pause",
            SessionAction::Resume => "resume",
            SessionAction::Complete => "complete",
            SessionAction::Skip => "skip",
            SessionAction::Cancel => "cancel",
        }
    }

    pub fn target(&self) -> SessionStatus {
        match self {
            SessionAction::Pause => SessionStatus::Paused,
            SessionAction::Resume => SessionStatus::Active,
            SessionAction::Complete => SessionStatus::Completed,
            SessionAction::Skip => SessionStatus::Skipped,
            SessionAction::Cancel => SessionStatus::Cancelled,
        }
    }
}

pub const MIN_PLANNED_DURATION: i64 = 1;
pub const MAX_PLANNED_DURATION: i64 = 120;
pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

/// Ratings are only meaningful for work sessions and only on the 1..=5 scale.
pub fn validate_rating(session_type: SessionType, rating: Option<u8>) -> PomodoroResult<()> {
    let Some(rating) = rating else {
        return Ok(());
    };
    if session_type != SessionType::Work {
        return Err(PomodoroError::validation(
            "productivity_rating",
            "Productivity rating can only be set for work sessions.",
        ));
    }
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(PomodoroError::validation(
            "productivity_rating",
            format!("must be between {MIN_RATING} and {MAX_RATING}"),
        ));
    }
    Ok(())
}

fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    (to - from).num_seconds().max(0)
}

impl Session {
    /// Seconds of the pause currently in progress, zero unless paused.
    pub fn live_pause_seconds(&self, now: DateTime<Utc>) -> i64 {
        match (self.status, self.paused_at) {
            (SessionStatus::Paused, Some(paused_at)) => seconds_between(paused_at, now),
            _ => 0,
        }
    }

    /// Wall time since start (or until completion) minus every pause, in seconds.
    pub fn net_elapsed_seconds(&self, now: DateTime<Utc>) -> i64 {
        let end = self.completed_at.unwrap_or(now);
        let wall = seconds_between(self.started_at, end);
        (wall - self.total_paused_seconds - self.live_pause_seconds(now)).max(0)
    }

    pub fn elapsed_minutes(&self, now: DateTime<Utc>) -> i64 {
        self.net_elapsed_seconds(now) / 60
    }

    pub fn remaining_minutes(&self, now: DateTime<Utc>) -> i64 {
        (i64::from(self.planned_duration) - self.elapsed_minutes(now)).max(0)
    }

    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> i64 {
        (i64::from(self.planned_duration) * 60 - self.net_elapsed_seconds(now)).max(0)
    }

    /// An active session whose countdown has run out.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == SessionStatus::Active && self.remaining_minutes(now) <= 0
    }

    /// Applies `action` at `now`, or explains why it is not allowed from the current status.
    pub fn apply(&mut self, action: SessionAction, now: DateTime<Utc>) -> PomodoroResult<()> {
        self.check(action)?;

        match action {
            SessionAction::Pause => {
                self.paused_at = Some(now);
            }
            SessionAction::Resume => {
                self.fold_open_pause(now);
            }
            SessionAction::Complete | SessionAction::Skip | SessionAction::Cancel => {
                self.fold_open_pause(now);
                self.completed_at = Some(now);
                let net_minutes = self.net_elapsed_seconds(now) / 60;
                let minutes = if action == SessionAction::Complete {
                    net_minutes.max(1)
                } else {
                    net_minutes
                };
                self.actual_duration = Some(u32::try_from(minutes).unwrap_or(u32::MAX));
            }
        }

        self.status = action.target();
        self.updated_at = now;
        Ok(())
    }

    /// Validates `action` against the current status without changing anything.
    pub fn check(&self, action: SessionAction) -> PomodoroResult<()> {
        let allowed = match action {
            SessionAction::Pause => self.status == SessionStatus::Active,
            SessionAction::Resume => self.status == SessionStatus::Paused,
            SessionAction::Complete | SessionAction::Skip | SessionAction::Cancel => {
                !self.status.is_terminal()
            }
        };
        if allowed {
            return Ok(());
        }

        let reason = match action {
            SessionAction::Pause => "Can only pause active sessions".to_string(),
            SessionAction::Resume => "Can only resume paused sessions".to_string(),
            _ => format!("Session is already {}", self.status),
        };
        Err(PomodoroError::InvalidTransition {
            status: self.status,
            action: action.as_str(),
            reason,
        })
    }

    fn fold_open_pause(&mut self, now: DateTime<Utc>) {
        if let Some(paused_at) = self.paused_at.take() {
            self.total_paused_seconds += seconds_between(paused_at, now);
        }
    }
}
