//! Integration tests for the Recital player HTTP API
//!
//! Exercises the router surface end to end against an in-process mock
//! backend: playback control, validation failures, status, and export.

mod helpers;

use axum::body::Body;
use http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use recital_player::api::{create_router, AppState};
use recital_player::backend::SynthesisClient;
use recital_player::playback::PlaybackEngine;
use recital_player::state::SharedState;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use helpers::{wait_until, wav_segment, MockBackend};

const RATE: u32 = 44100;

/// Build a router wired to an engine with no audio thread.
fn setup(base_url: &str) -> (axum::Router, Arc<PlaybackEngine>) {
    let client = SynthesisClient::new(base_url, Duration::from_secs(5)).unwrap();
    let state = Arc::new(SharedState::new());
    let engine = Arc::new(PlaybackEngine::new_silent(client, Arc::clone(&state)));

    let router = create_router(AppState {
        engine: Arc::clone(&engine),
        state,
        port: 5750,
    });
    (router, engine)
}

async fn make_request(
    app: &axum::Router,
    method: Method,
    path: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(path);
    if body.is_some() {
        request = request.header("content-type", "application/json");
    }
    let request = match body {
        Some(json_body) => request.body(Body::from(json_body.to_string())).unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

#[tokio::test]
async fn test_health() {
    let backend = MockBackend::builder().spawn().await;
    let (app, _engine) = setup(&backend.base_url);

    let (status, body) = make_request(&app, Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["module"], "recital-player");
}

#[tokio::test]
async fn test_status_idle_shape() {
    let backend = MockBackend::builder().spawn().await;
    let (app, _engine) = setup(&backend.base_url);

    let (status, body) = make_request(&app, Method::GET, "/playback/status", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "idle");
    assert_eq!(body["progress_percent"], 0);
    assert_eq!(body["position_ms"], 0);
    assert_eq!(body["duration_ms"], 0);
    assert_eq!(body["rate"], 1.0);
}

#[tokio::test]
async fn test_start_and_status_playing() {
    let backend = MockBackend::builder()
        .segments(vec![wav_segment(0.5, RATE), wav_segment(0.5, RATE)])
        .spawn()
        .await;
    let (app, engine) = setup(&backend.base_url);

    let (status, body) = make_request(
        &app,
        Method::POST,
        "/playback/start",
        Some(json!({"text": "hola mundo", "lang": "es"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "playing");
    assert!(body["attempt"].is_string());

    let queue = engine.queue();
    assert!(
        wait_until(
            || queue.lock().unwrap().is_prefetch_complete(),
            Duration::from_secs(5)
        )
        .await
    );

    let (status, body) = make_request(&app, Method::GET, "/playback/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "playing");
    assert_eq!(body["progress_percent"], 100);
    assert_eq!(body["duration_ms"], 1000);
}

#[tokio::test]
async fn test_start_defaults_lang() {
    let backend = MockBackend::builder()
        .segments(vec![wav_segment(0.05, RATE)])
        .spawn()
        .await;
    let (app, _engine) = setup(&backend.base_url);

    // No lang field: the player fills in the default
    let (status, _body) = make_request(
        &app,
        Method::POST,
        "/playback/start",
        Some(json!({"text": "hola"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_start_empty_text_is_bad_request() {
    let backend = MockBackend::builder().spawn().await;
    let (app, _engine) = setup(&backend.base_url);

    let (status, body) = make_request(
        &app,
        Method::POST,
        "/playback/start",
        Some(json!({"text": "", "lang": "es"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("text"));
}

#[tokio::test]
async fn test_start_backend_failure_is_bad_gateway() {
    let backend = MockBackend::builder()
        .manifest_error(500, "synthesis exploded")
        .spawn()
        .await;
    let (app, _engine) = setup(&backend.base_url);

    let (status, body) = make_request(
        &app,
        Method::POST,
        "/playback/start",
        Some(json!({"text": "hola", "lang": "es"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].as_str().unwrap().contains("synthesis exploded"));
}

#[tokio::test]
async fn test_pause_while_idle_is_conflict() {
    let backend = MockBackend::builder().spawn().await;
    let (app, _engine) = setup(&backend.base_url);

    let (status, _body) = make_request(&app, Method::POST, "/playback/pause", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_pause_resume_stop_cycle() {
    let backend = MockBackend::builder()
        .segments(vec![wav_segment(0.5, RATE)])
        .spawn()
        .await;
    let (app, _engine) = setup(&backend.base_url);

    make_request(
        &app,
        Method::POST,
        "/playback/start",
        Some(json!({"text": "ciclo", "lang": "es"})),
    )
    .await;

    let (status, body) = make_request(&app, Method::POST, "/playback/pause", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "paused");

    let (_status, body) = make_request(&app, Method::GET, "/playback/status", None).await;
    assert_eq!(body["state"], "paused");

    let (status, body) = make_request(&app, Method::POST, "/playback/resume", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "playing");

    let (status, body) = make_request(&app, Method::POST, "/playback/stop", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "stopped");

    let (_status, body) = make_request(&app, Method::GET, "/playback/status", None).await;
    assert_eq!(body["state"], "idle");
}

#[tokio::test]
async fn test_stop_while_idle_is_ok() {
    let backend = MockBackend::builder().spawn().await;
    let (app, _engine) = setup(&backend.base_url);

    let (status, _body) = make_request(&app, Method::POST, "/playback/stop", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_rate_endpoint_validates_range() {
    let backend = MockBackend::builder().spawn().await;
    let (app, _engine) = setup(&backend.base_url);

    let (status, _body) = make_request(
        &app,
        Method::POST,
        "/playback/rate",
        Some(json!({"rate": 5.0})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _body) = make_request(
        &app,
        Method::POST,
        "/playback/rate",
        Some(json!({"rate": 1.5})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_status, body) = make_request(&app, Method::GET, "/playback/status", None).await;
    assert_eq!(body["rate"], 1.5);
}

#[tokio::test]
async fn test_export_is_accepted_and_forwarded() {
    let backend = MockBackend::builder().spawn().await;
    let (app, _engine) = setup(&backend.base_url);

    let (status, body) = make_request(
        &app,
        Method::POST,
        "/export",
        Some(json!({"text": "descarga", "lang": "es"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "accepted");

    assert!(wait_until(|| backend.export_count() == 1, Duration::from_secs(2)).await);
}

#[tokio::test]
async fn test_export_empty_text_rejected() {
    let backend = MockBackend::builder().spawn().await;
    let (app, _engine) = setup(&backend.base_url);

    let (status, _body) = make_request(
        &app,
        Method::POST,
        "/export",
        Some(json!({"text": " ", "lang": "es"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(backend.export_count(), 0);
}
