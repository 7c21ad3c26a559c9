mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::TestApp;

#[tokio::test]
async fn settings_are_created_with_defaults() {
    let app = TestApp::new();
    let (status, body) = app.get("/settings", 1).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["work_duration"], 25);
    assert_eq!(body["short_break_duration"], 5);
    assert_eq!(body["long_break_duration"], 15);
    assert_eq!(body["sessions_until_long_break"], 4);
    assert_eq!(body["volume"], 0.7);
    assert_eq!(body["work_sound"], "bell");
    assert_eq!(body["break_sound"], "chime");
    assert!(body.get("user_id").is_none());
}

#[tokio::test]
async fn patch_validates_each_field() {
    let app = TestApp::new();
    let (status, body) = app
        .patch("/settings", 1, json!({ "work_duration": 50, "auto_start_work": true }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["work_duration"], 50);
    assert_eq!(body["auto_start_work"], true);

    let (status, body) = app.patch("/settings", 1, json!({ "volume": 1.2 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "volume");

    let (status, body) = app
        .patch("/settings", 1, json!({ "short_break_duration": 0 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "short_break_duration");

    let (status, body) = app.patch("/settings", 1, json!({ "work_duration": -5 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "work_duration");

    let (status, body) = app
        .patch("/settings", 1, json!({ "enable_audio": "loud" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "enable_audio");

    let (_, current) = app.get("/settings", 1).await;
    assert_eq!(current["work_duration"], 50);
    assert_eq!(current["volume"], 0.7);
}

#[tokio::test]
async fn put_requires_every_field() {
    let app = TestApp::new();
    let (status, body) = app.put("/settings", 1, json!({ "work_duration": 30 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_ne!(body["field"], "work_duration");

    let full = json!({
        "work_duration": 30,
        "short_break_duration": 6,
        "long_break_duration": 20,
        "sessions_until_long_break": 5,
        "auto_start_breaks": true,
        "auto_start_work": false,
        "enable_audio": false,
        "work_sound": "gong",
        "break_sound": "birds",
        "volume": 0.3,
        "enable_notifications": false
    });
    let (status, body) = app.put("/settings", 1, full).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["work_sound"], "gong");
    assert_eq!(body["sessions_until_long_break"], 5);
}

#[tokio::test]
async fn delete_resets_to_defaults() {
    let app = TestApp::new();
    let (_, before) = app
        .patch("/settings", 1, json!({ "work_duration": 90, "enable_audio": false }))
        .await;

    let (status, body) = app.delete("/settings", 1).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], before["id"]);
    assert_eq!(body["work_duration"], 25);
    assert_eq!(body["enable_audio"], true);
}

#[tokio::test]
async fn preset_type_errors_name_the_field() {
    let app = TestApp::new();
    let (status, body) = app
        .post(
            "/presets",
            1,
            json!({
                "name": "Sprint",
                "work_duration": -1,
                "short_break_duration": 5,
                "long_break_duration": 15,
                "sessions_until_long_break": 4
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "work_duration");

    let (_, presets) = app.get("/presets", 1).await;
    assert_eq!(presets, json!([]));
}

#[tokio::test]
async fn presets_round_trip_through_the_api() {
    let app = TestApp::new();
    let preset = json!({
        "name": "  Deep focus ",
        "work_duration": 50,
        "short_break_duration": 10,
        "long_break_duration": 30,
        "sessions_until_long_break": 3
    });

    let (status, created) = app.post("/presets", 1, preset.clone()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["name"], "Deep focus");
    assert_eq!(created["is_default"], false);
    let id = created["id"].as_i64().unwrap();

    let (status, body) = app.post("/presets", 1, preset).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "name");
    assert_eq!(body["error"], "A preset with this name already exists.");

    let (status, _) = app.get(&format!("/presets/{id}"), 2).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, updated) = app
        .patch(&format!("/presets/{id}"), 1, json!({ "work_duration": 45 }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["work_duration"], 45);
    assert_eq!(updated["name"], "Deep focus");

    let (status, settings) = app
        .post_empty(&format!("/presets/{id}/apply_to_settings"), 1)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(settings["work_duration"], 45);
    assert_eq!(settings["short_break_duration"], 10);
    assert_eq!(settings["long_break_duration"], 30);
    assert_eq!(settings["sessions_until_long_break"], 3);

    let (status, _) = app.delete(&format!("/presets/{id}"), 1).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, list) = app.get("/presets", 1).await;
    assert!(list.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn set_default_moves_the_flag() {
    let app = TestApp::new();
    let mut ids = Vec::new();
    for (name, is_default) in [("One", true), ("Two", false)] {
        let (_, created) = app
            .post(
                "/presets",
                1,
                json!({
                    "name": name,
                    "work_duration": 25,
                    "short_break_duration": 5,
                    "long_break_duration": 15,
                    "sessions_until_long_break": 4,
                    "is_default": is_default
                }),
            )
            .await;
        ids.push(created["id"].as_i64().unwrap());
    }

    let (status, body) = app
        .post_empty(&format!("/presets/{}/set_default", ids[1]), 1)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_default"], true);

    let (_, list) = app.get("/presets", 1).await;
    let defaults: Vec<i64> = list
        .as_array()
        .unwrap()
        .iter()
        .filter(|p| p["is_default"] == true)
        .map(|p| p["id"].as_i64().unwrap())
        .collect();
    assert_eq!(defaults, vec![ids[1]]);

    let (status, _) = app
        .post_empty(&format!("/presets/{}/set_default", ids[0]), 2)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
