use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::{
    error::PomodoroError,
    server::{ApiResult, AppState, CurrentUser},
    stats::{Stats, DEFAULT_WINDOW_DAYS},
};

#[derive(Debug, Default, Deserialize)]
pub struct StatsQuery {
    pub days: Option<String>,
}

fn parse_days(raw: Option<&str>) -> Result<i64, PomodoroError> {
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        None => Ok(DEFAULT_WINDOW_DAYS),
        Some(value) => value
            .parse()
            .map_err(|_| PomodoroError::validation("days", format!("'{value}' is not an integer"))),
    }
}

pub async fn get_stats(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Query(query): Query<StatsQuery>,
) -> ApiResult<Json<Stats>> {
    let days = parse_days(query.days.as_deref())?;
    Ok(Json(state.stats.compute(user_id, days).await?))
}
