use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    db::models::{Preset, PresetInput, PresetPatch, TimerSettings},
    server::{ApiResult, AppState, CheckedJson, CurrentUser},
};

pub async fn list_presets(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> ApiResult<Json<Vec<Preset>>> {
    Ok(Json(state.presets.list(user_id).await?))
}

pub async fn create_preset(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    CheckedJson(input): CheckedJson<PresetInput>,
) -> ApiResult<(StatusCode, Json<Preset>)> {
    let preset = state.presets.create(user_id, input).await?;
    Ok((StatusCode::CREATED, Json(preset)))
}

pub async fn get_preset(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(preset_id): Path<i64>,
) -> ApiResult<Json<Preset>> {
    Ok(Json(state.presets.get(user_id, preset_id).await?))
}

pub async fn update_preset(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(preset_id): Path<i64>,
    CheckedJson(patch): CheckedJson<PresetPatch>,
) -> ApiResult<Json<Preset>> {
    Ok(Json(state.presets.update(user_id, preset_id, patch).await?))
}

pub async fn replace_preset(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(preset_id): Path<i64>,
    CheckedJson(input): CheckedJson<PresetInput>,
) -> ApiResult<Json<Preset>> {
    Ok(Json(state.presets.replace(user_id, preset_id, input).await?))
}

pub async fn delete_preset(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(preset_id): Path<i64>,
) -> ApiResult<StatusCode> {
    state.presets.delete(user_id, preset_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn set_default_preset(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(preset_id): Path<i64>,
) -> ApiResult<Json<Preset>> {
    Ok(Json(state.presets.set_default(user_id, preset_id).await?))
}

pub async fn apply_preset(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(preset_id): Path<i64>,
) -> ApiResult<Json<TimerSettings>> {
    Ok(Json(
        state.presets.apply_to_settings(user_id, preset_id).await?,
    ))
}
