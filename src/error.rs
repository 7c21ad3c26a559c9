use thiserror::Error;

use crate::timer::SessionStatus;

#[derive(Debug, Error)]
pub enum PomodoroError {
    #[error("{field}: {message}")]
    Validation { field: String, message: String },

    #[error("{reason}")]
    InvalidTransition {
        status: SessionStatus,
        action: &'static str,
        reason: String,
    },

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Internal(anyhow::Error),
}

/// Database closures run as `anyhow::Result`; a typed error raised inside one
/// comes back out as itself rather than as an internal failure.
impl From<anyhow::Error> for PomodoroError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<PomodoroError>() {
            Ok(typed) => typed,
            Err(other) => PomodoroError::Internal(other),
        }
    }
}

impl From<rusqlite::Error> for PomodoroError {
    fn from(err: rusqlite::Error) -> Self {
        PomodoroError::Internal(err.into())
    }
}

impl PomodoroError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }
}

pub type PomodoroResult<T> = Result<T, PomodoroError>;

/// Checks an inclusive integer range and names the field on failure.
pub fn ensure_range(field: &str, value: i64, min: i64, max: i64, unit: &str) -> PomodoroResult<()> {
    if value < min || value > max {
        return Err(PomodoroError::validation(
            field,
            format!("must be between {min} and {max} {unit}"),
        ));
    }
    Ok(())
}

pub fn ensure_max_chars(field: &str, value: &str, max: usize) -> PomodoroResult<()> {
    if value.chars().count() > max {
        return Err(PomodoroError::validation(
            field,
            format!("must be at most {max} characters"),
        ));
    }
    Ok(())
}
