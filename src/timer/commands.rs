use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::{
    db::models::{SessionFilter, SessionView},
    error::PomodoroError,
    server::{ApiResult, AppState, CheckedJson, CurrentUser},
    timer::{
        engine::{NewSession, SessionUpdate},
        state::{SessionStatus, SessionType},
        sync::{SyncReport, SyncRequest},
    },
};

/// Raw list filters; parsed here so a bad value names its parameter.
#[derive(Debug, Default, Deserialize)]
pub struct SessionListQuery {
    #[serde(rename = "type")]
    pub session_type: Option<String>,
    pub status: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

fn parse_date(field: &str, raw: Option<String>) -> Result<Option<NaiveDate>, PomodoroError> {
    raw.filter(|value| !value.is_empty())
        .map(|value| {
            NaiveDate::parse_from_str(&value, "%Y-%m-%d").map_err(|_| {
                PomodoroError::validation(field, format!("'{value}' is not a YYYY-MM-DD date"))
            })
        })
        .transpose()
}

impl TryFrom<SessionListQuery> for SessionFilter {
    type Error = PomodoroError;

    fn try_from(query: SessionListQuery) -> Result<Self, Self::Error> {
        let session_type = query
            .session_type
            .filter(|value| !value.is_empty())
            .map(|value| {
                SessionType::parse(&value).ok_or_else(|| {
                    PomodoroError::validation("type", format!("'{value}' is not a session type"))
                })
            })
            .transpose()?;
        let status = query
            .status
            .filter(|value| !value.is_empty())
            .map(|value| {
                SessionStatus::parse(&value).ok_or_else(|| {
                    PomodoroError::validation("status", format!("'{value}' is not a session status"))
                })
            })
            .transpose()?;

        Ok(SessionFilter {
            session_type,
            status,
            start_date: parse_date("start_date", query.start_date)?,
            end_date: parse_date("end_date", query.end_date)?,
        })
    }
}

pub async fn list_sessions(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Query(query): Query<SessionListQuery>,
) -> ApiResult<Json<Vec<SessionView>>> {
    let filter = SessionFilter::try_from(query)?;
    Ok(Json(state.engine.list(user_id, filter).await?))
}

pub async fn create_session(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    CheckedJson(request): CheckedJson<NewSession>,
) -> ApiResult<(StatusCode, Json<SessionView>)> {
    let view = state.engine.create(user_id, request).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn get_session(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(session_id): Path<String>,
) -> ApiResult<Json<SessionView>> {
    Ok(Json(state.engine.get(user_id, &session_id).await?))
}

pub async fn update_session(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(session_id): Path<String>,
    CheckedJson(update): CheckedJson<SessionUpdate>,
) -> ApiResult<Json<SessionView>> {
    Ok(Json(state.engine.update(user_id, &session_id, update).await?))
}

pub async fn delete_session(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(session_id): Path<String>,
) -> ApiResult<StatusCode> {
    state.engine.delete(user_id, &session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn pause_session(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(session_id): Path<String>,
) -> ApiResult<Json<SessionView>> {
    Ok(Json(state.engine.pause(user_id, &session_id).await?))
}

pub async fn resume_session(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(session_id): Path<String>,
) -> ApiResult<Json<SessionView>> {
    Ok(Json(state.engine.resume(user_id, &session_id).await?))
}

pub async fn complete_session(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(session_id): Path<String>,
) -> ApiResult<Json<SessionView>> {
    Ok(Json(state.engine.complete(user_id, &session_id).await?))
}

pub async fn skip_session(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(session_id): Path<String>,
) -> ApiResult<Json<SessionView>> {
    Ok(Json(state.engine.skip(user_id, &session_id).await?))
}

pub async fn cancel_session(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(session_id): Path<String>,
) -> ApiResult<Json<SessionView>> {
    Ok(Json(state.engine.cancel(user_id, &session_id).await?))
}

/// `null` when nothing is running, including right after an overdue session was closed.
pub async fn active_session(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> ApiResult<Json<Option<SessionView>>> {
    Ok(Json(state.engine.active(user_id).await?))
}

pub async fn sync_session(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    CheckedJson(request): CheckedJson<SyncRequest>,
) -> ApiResult<Json<SyncReport>> {
    Ok(Json(state.engine.sync(user_id, request).await?))
}
