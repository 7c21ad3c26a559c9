//! Client/server countdown comparison.
//!
//! Read-only: a sync call never changes the session, it only tells the client
//! whether its local countdown has drifted too far to trust.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::{
    error::{PomodoroError, PomodoroResult},
    timer::{engine::SessionEngine, state::SessionStatus},
};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyncRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub remaining_seconds: Option<i64>,
}

impl SyncRequest {
    pub const FIELDS: &'static [&'static str] = &["session_id", "remaining_seconds"];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub server_remaining_seconds: i64,
    pub client_remaining_seconds: i64,
    pub time_difference: i64,
    pub sync_required: bool,
    pub session_status: SessionStatus,
}

impl SessionEngine {
    pub async fn sync(&self, user_id: i64, request: SyncRequest) -> PomodoroResult<SyncReport> {
        let session_id = request
            .session_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| PomodoroError::validation("session_id", "session_id is required"))?;
        let client_remaining_seconds = request.remaining_seconds.unwrap_or(0);

        let session = self
            .db()
            .get_open_session_by_id(user_id, &session_id)
            .await?
            .ok_or_else(|| PomodoroError::not_found("Active session not found"))?;

        let server_remaining_seconds = session.remaining_seconds(self.now());
        let time_difference = (server_remaining_seconds - client_remaining_seconds).abs();
        let sync_required = time_difference > self.sync_threshold_secs();

        if sync_required {
            warn!(
                "Timer drift for user {user_id}, session {session_id}: {time_difference}s \
                 (server {server_remaining_seconds}s, client {client_remaining_seconds}s)"
            );
        }

        Ok(SyncReport {
            server_remaining_seconds,
            client_remaining_seconds,
            time_difference,
            sync_required,
            session_status: session.status,
        })
    }
}
