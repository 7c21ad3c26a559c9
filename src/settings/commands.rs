use axum::{extract::State, Json};

use crate::{
    db::models::{SettingsPatch, SettingsValues, TimerSettings},
    server::{ApiResult, AppState, CheckedJson, CurrentUser},
};

pub async fn get_settings(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> ApiResult<Json<TimerSettings>> {
    Ok(Json(state.settings.get_or_create(user_id).await?))
}

pub async fn update_settings(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    CheckedJson(patch): CheckedJson<SettingsPatch>,
) -> ApiResult<Json<TimerSettings>> {
    Ok(Json(state.settings.update(user_id, patch).await?))
}

pub async fn replace_settings(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    CheckedJson(values): CheckedJson<SettingsValues>,
) -> ApiResult<Json<TimerSettings>> {
    Ok(Json(state.settings.replace(user_id, values).await?))
}

/// Resets to defaults and returns them; the record itself stays.
pub async fn reset_settings(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> ApiResult<Json<TimerSettings>> {
    Ok(Json(state.settings.reset(user_id).await?))
}
