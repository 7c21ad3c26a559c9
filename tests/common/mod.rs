//! Shared harness for the HTTP integration tests.
//!
//! Each integration test file is its own crate, so helpers used by only some of
//! them would otherwise warn as dead code.

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::{DateTime, TimeZone, Utc};
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use pomodoro_server::{router, AppState, Config, Database, ManualClock};

pub struct TestApp {
    _dir: TempDir,
    pub clock: ManualClock,
    pub db: Database,
    router: Router,
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 10, 9, 0, 0).unwrap()
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn strict() -> Self {
        Self::with_config(Config {
            strict_fields: true,
            ..Config::default()
        })
    }

    pub fn with_config(mut config: Config) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        config.db_path = dir.path().join("pomodoro.sqlite3");
        let db = Database::new(config.db_path.clone()).expect("open database");
        let clock = ManualClock::new(start_time());
        let state = AppState::new(db.clone(), Arc::new(clock.clone()), config);

        Self {
            _dir: dir,
            clock,
            db,
            router: router(state),
        }
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        user: Option<i64>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header("x-user-id", user.to_string());
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, user: i64) -> (StatusCode, Value) {
        self.send(Method::GET, uri, Some(user), None).await
    }

    pub async fn post(&self, uri: &str, user: i64, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(user), Some(body)).await
    }

    pub async fn post_empty(&self, uri: &str, user: i64) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(user), None).await
    }

    pub async fn patch(&self, uri: &str, user: i64, body: Value) -> (StatusCode, Value) {
        self.send(Method::PATCH, uri, Some(user), Some(body)).await
    }

    pub async fn put(&self, uri: &str, user: i64, body: Value) -> (StatusCode, Value) {
        self.send(Method::PUT, uri, Some(user), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, user: i64) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, Some(user), None).await
    }

    /// Starts a session and returns its id.
    pub async fn start_session(&self, user: i64, session_type: &str, planned: i64) -> String {
        let (status, body) = self
            .post(
                "/sessions",
                user,
                serde_json::json!({ "session_type": session_type, "planned_duration": planned }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create failed: {body}");
        body["id"].as_str().unwrap().to_string()
    }
}
