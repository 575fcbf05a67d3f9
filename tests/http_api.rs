mod common;

use std::path::PathBuf;
use actix_web::{http::StatusCode, test, web, App};
use common::{engine_with, MockDevice};
use funscript_sync::{handlers::types::AppState, routes};
use serde_json::{json, Value};

fn scripts_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("funscript-sync-http-{}-{}", name, std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn app_state(dir: PathBuf, device: std::sync::Arc<MockDevice>) -> web::Data<AppState> {
    web::Data::new(AppState {
        engine: engine_with(device),
        funscript_dir: dir,
    })
}

#[actix_web::test]
async fn play_without_a_script_is_a_conflict() {
    let state = app_state(scripts_dir("conflict"), MockDevice::connected());
    let app = test::init_service(App::new().app_data(state).configure(routes::setup_routes)).await;

    let req = test::TestRequest::post().uri("/api/play").set_json(json!({})).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[actix_web::test]
async fn missing_and_invalid_scripts_are_reported() {
    let dir = scripts_dir("invalid");
    std::fs::write(dir.join("broken.funscript"), r#"{"version":"1.0","actions":[{"at":10,"pos":1},{"at":5,"pos":2}]}"#)
        .unwrap();
    let state = app_state(dir, MockDevice::connected());
    let app = test::init_service(App::new().app_data(state).configure(routes::setup_routes)).await;

    let req = test::TestRequest::post()
        .uri("/api/script")
        .set_json(json!({"path": "nowhere.mp4"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::post()
        .uri("/api/script")
        .set_json(json!({"path": "videos/broken.mp4"}))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::UNPROCESSABLE_ENTITY
    );
}

#[actix_web::test]
async fn load_play_and_stop_through_the_api() {
    let dir = scripts_dir("flow");
    std::fs::write(
        dir.join("clip.funscript"),
        r#"{"version":"1.0","actions":[{"at":0,"pos":0},{"at":100,"pos":50},{"at":300,"pos":100}]}"#,
    )
    .unwrap();
    let device = MockDevice::connected();
    let state = app_state(dir, device.clone());
    let app = test::init_service(App::new().app_data(state).configure(routes::setup_routes)).await;

    let req = test::TestRequest::post()
        .uri("/api/script")
        .set_json(json!({"path": "clip.mp4"}))
        .to_request();
    let summary: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(summary, json!({"actionCount": 3, "durationMs": 300}));

    let req = test::TestRequest::post()
        .uri("/api/play")
        .set_json(json!({"startTime": 200}))
        .to_request();
    let status: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(status["phase"], "playing");
    assert_eq!(status["actionCursor"], 2);

    let req = test::TestRequest::post()
        .uri("/api/latency")
        .set_json(json!({"offsetMs": 500}))
        .to_request();
    let latency: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(latency, json!({"offsetMs": 200}));

    let req = test::TestRequest::post()
        .uri("/api/position")
        .set_json(json!({"time": 260}))
        .to_request();
    let drift: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(drift, json!({"drift": "tracked", "diffMs": 60}));

    let req = test::TestRequest::post().uri("/api/stop").to_request();
    let status: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(status["phase"], "stopped");
    assert_eq!(status["currentTime"], 0);
    assert_eq!(device.stop_count(), 1);

    let req = test::TestRequest::get().uri("/api/status").to_request();
    let status: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(status["totalActions"], 3);
    assert_eq!(status["latencyOffsetMs"], 200);
}
