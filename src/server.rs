//! HTTP surface: shared state, identity, body policy, error mapping and routes.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Request},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use log::{error, warn};
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use serde_path_to_error::Segment;

use crate::{
    clock::Clock,
    config::Config,
    db::Database,
    error::PomodoroError,
    presets::{self, PresetCatalog},
    settings::{self, SettingsStore},
    stats::{self, StatsEngine},
    timer::{self, SessionEngine},
};

pub const USER_HEADER: &str = "x-user-id";

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub engine: SessionEngine,
    pub settings: SettingsStore,
    pub presets: PresetCatalog,
    pub stats: StatsEngine,
}

impl AppState {
    pub fn new(db: Database, clock: Arc<dyn Clock>, config: Config) -> Self {
        let engine = SessionEngine::new(db.clone(), clock.clone(), config.sync_threshold_secs);
        Self {
            settings: SettingsStore::new(db.clone(), clock.clone()),
            presets: PresetCatalog::new(db.clone(), clock.clone()),
            stats: StatsEngine::new(db, clock, engine.clone()),
            engine,
            config: Arc::new(config),
        }
    }
}

/// Error returned by every handler.
#[derive(Debug)]
pub struct ApiError(pub PomodoroError);

impl From<PomodoroError> for ApiError {
    fn from(err: PomodoroError) -> Self {
        Self(err)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self(PomodoroError::from(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self.0 {
            PomodoroError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                json!({ "error": message, "field": field }),
            ),
            PomodoroError::InvalidTransition { status, reason, .. } => (
                StatusCode::BAD_REQUEST,
                json!({ "error": reason, "status": status }),
            ),
            PomodoroError::NotFound(message) => {
                (StatusCode::NOT_FOUND, json!({ "error": message }))
            }
            PomodoroError::Conflict(message) => (StatusCode::CONFLICT, json!({ "error": message })),
            PomodoroError::Internal(err) => {
                error!("Request failed: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal server error" }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Caller identity forwarded by the upstream auth layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser(pub i64);

#[derive(Debug)]
pub struct Unauthorized;

impl IntoResponse for Unauthorized {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Authentication credentials were not provided." })),
        )
            .into_response()
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Unauthorized;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<i64>().ok())
            .filter(|id| *id > 0)
            .map(CurrentUser)
            .ok_or(Unauthorized)
    }
}

/// Request bodies that declare which top-level fields they accept.
pub trait BodyFields {
    const FIELDS: &'static [&'static str];
}

impl BodyFields for crate::db::models::SettingsPatch {
    const FIELDS: &'static [&'static str] = crate::db::models::SettingsPatch::FIELDS;
}

impl BodyFields for crate::db::models::SettingsValues {
    const FIELDS: &'static [&'static str] = crate::db::models::SettingsPatch::FIELDS;
}

impl BodyFields for crate::db::models::PresetInput {
    const FIELDS: &'static [&'static str] = crate::db::models::PresetInput::FIELDS;
}

impl BodyFields for crate::db::models::PresetPatch {
    const FIELDS: &'static [&'static str] = crate::db::models::PresetInput::FIELDS;
}

impl BodyFields for timer::NewSession {
    const FIELDS: &'static [&'static str] = timer::NewSession::FIELDS;
}

impl BodyFields for timer::SessionUpdate {
    const FIELDS: &'static [&'static str] = timer::SessionUpdate::FIELDS;
}

impl BodyFields for timer::SyncRequest {
    const FIELDS: &'static [&'static str] = timer::SyncRequest::FIELDS;
}

/// Drops or rejects top-level keys outside `known`, depending on `strict`.
pub fn apply_field_policy(
    mut body: Map<String, Value>,
    known: &[&str],
    strict: bool,
) -> Result<Map<String, Value>, PomodoroError> {
    let unknown: Vec<String> = body
        .keys()
        .filter(|key| !known.contains(&key.as_str()))
        .cloned()
        .collect();
    if unknown.is_empty() {
        return Ok(body);
    }

    if strict {
        return Err(PomodoroError::validation(
            unknown[0].clone(),
            "Unknown field.",
        ));
    }
    warn!("Ignoring unknown request fields: {}", unknown.join(", "));
    for key in unknown {
        body.remove(&key);
    }
    Ok(body)
}

/// Best-effort field name from a serde message such as "missing field `name`".
fn field_from_serde_message(message: &str) -> String {
    message
        .split('`')
        .nth(1)
        .filter(|_| message.starts_with("missing field") || message.starts_with("unknown field"))
        .map(str::to_string)
        .unwrap_or_else(|| "body".to_string())
}

/// JSON body with the configured unknown-field policy applied before decoding.
#[derive(Debug)]
pub struct CheckedJson<T>(pub T);

impl<T> FromRequest<AppState> for CheckedJson<T>
where
    T: DeserializeOwned + BodyFields + Send,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| PomodoroError::validation("body", rejection.body_text()))?;

        let value: Value = if bytes.iter().all(u8::is_ascii_whitespace) {
            Value::Object(Map::new())
        } else {
            serde_json::from_slice(&bytes).map_err(|err| {
                PomodoroError::validation("body", format!("Malformed JSON: {err}"))
            })?
        };

        let Value::Object(object) = value else {
            return Err(PomodoroError::validation("body", "Expected a JSON object.").into());
        };
        let object = apply_field_policy(object, T::FIELDS, state.config.strict_fields)?;

        decode_object(object).map(CheckedJson).map_err(ApiError::from)
    }
}

/// Deserializes `object`, naming the top-level key whose value serde rejected.
pub fn decode_object<T>(object: Map<String, Value>) -> Result<T, PomodoroError>
where
    T: DeserializeOwned,
{
    serde_path_to_error::deserialize(Value::Object(object)).map_err(|err| {
        let message = err.inner().to_string();
        let field = match err.path().iter().next() {
            Some(Segment::Map { key }) => key.clone(),
            _ => field_from_serde_message(&message),
        };
        PomodoroError::validation(field, message)
    })
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/settings",
            get(settings::commands::get_settings)
                .put(settings::commands::replace_settings)
                .patch(settings::commands::update_settings)
                .delete(settings::commands::reset_settings),
        )
        .route(
            "/presets",
            get(presets::commands::list_presets).post(presets::commands::create_preset),
        )
        .route(
            "/presets/{id}",
            get(presets::commands::get_preset)
                .put(presets::commands::replace_preset)
                .patch(presets::commands::update_preset)
                .delete(presets::commands::delete_preset),
        )
        .route(
            "/presets/{id}/set_default",
            post(presets::commands::set_default_preset),
        )
        .route(
            "/presets/{id}/apply_to_settings",
            post(presets::commands::apply_preset),
        )
        .route(
            "/sessions",
            get(timer::commands::list_sessions).post(timer::commands::create_session),
        )
        .route("/sessions/active", get(timer::commands::active_session))
        .route("/sessions/sync", post(timer::commands::sync_session))
        .route("/sessions/stats", get(stats::commands::get_stats))
        .route(
            "/sessions/{id}",
            get(timer::commands::get_session)
                .patch(timer::commands::update_session)
                .delete(timer::commands::delete_session),
        )
        .route("/sessions/{id}/pause", post(timer::commands::pause_session))
        .route("/sessions/{id}/resume", post(timer::commands::resume_session))
        .route(
            "/sessions/{id}/complete",
            post(timer::commands::complete_session),
        )
        .route("/sessions/{id}/skip", post(timer::commands::skip_session))
        .route("/sessions/{id}/cancel", post(timer::commands::cancel_session))
        .with_state(state)
}
