//! Shared test helpers
//!
//! In-process mock of the synthesis backend plus WAV fixture generation.

// Not every test binary uses every helper
#![allow(dead_code)]

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

/// Generate an in-memory mono WAV fixture of the given duration.
pub fn wav_segment(seconds: f64, sample_rate: u32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let frames = (seconds * sample_rate as f64).round() as usize;
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for i in 0..frames {
            let t = i as f32 / sample_rate as f32;
            let sample = ((2.0 * std::f32::consts::PI * 330.0 * t).sin() * 0.4 * 32767.0) as i16;
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// Expected output frame count for a fixture at the device rate.
pub fn frames_for(seconds: f64, sample_rate: u32) -> u64 {
    (seconds * sample_rate as f64).round() as u64
}

struct BackendInner {
    session: String,
    segments: Vec<Vec<u8>>,
    /// Segment index that responds with this HTTP status instead of bytes
    fail_at: Option<(u32, u16)>,
    /// Segment index whose first response blocks until the gate is released
    gate_at: Option<u32>,
    gate: Notify,
    gate_used: AtomicBool,
    /// HTTP status for manifest requests, if they should fail
    manifest_error: Option<(u16, String)>,
    fetch_log: Mutex<Vec<u32>>,
    export_count: Mutex<u32>,
}

/// In-process synthesis backend serving canned segments.
pub struct MockBackend {
    pub base_url: String,
    inner: Arc<BackendInner>,
}

/// Configuration for a `MockBackend`.
pub struct MockBackendBuilder {
    segments: Vec<Vec<u8>>,
    fail_at: Option<(u32, u16)>,
    gate_at: Option<u32>,
    manifest_error: Option<(u16, String)>,
}

impl MockBackendBuilder {
    pub fn segments(mut self, segments: Vec<Vec<u8>>) -> Self {
        self.segments = segments;
        self
    }

    /// Respond to this segment index with an HTTP error.
    pub fn fail_at(mut self, index: u32, status: u16) -> Self {
        self.fail_at = Some((index, status));
        self
    }

    /// Hold this segment's response until `release_gate` is called.
    pub fn gate_at(mut self, index: u32) -> Self {
        self.gate_at = Some(index);
        self
    }

    pub fn manifest_error(mut self, status: u16, message: &str) -> Self {
        self.manifest_error = Some((status, message.to_string()));
        self
    }

    pub async fn spawn(self) -> MockBackend {
        let inner = Arc::new(BackendInner {
            session: "test-session".to_string(),
            segments: self.segments,
            fail_at: self.fail_at,
            gate_at: self.gate_at,
            gate: Notify::new(),
            gate_used: AtomicBool::new(false),
            manifest_error: self.manifest_error,
            fetch_log: Mutex::new(Vec::new()),
            export_count: Mutex::new(0),
        });

        let router = Router::new()
            .route("/api/manifest", post(manifest))
            .route("/api/chunk/:session/:index", get(chunk))
            .route("/api/export", post(export))
            .with_state(Arc::clone(&inner));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        MockBackend {
            base_url: format!("http://{}", addr),
            inner,
        }
    }
}

impl MockBackend {
    pub fn builder() -> MockBackendBuilder {
        MockBackendBuilder {
            segments: Vec::new(),
            fail_at: None,
            gate_at: None,
            manifest_error: None,
        }
    }

    /// Order of segment fetches received so far.
    pub fn fetch_log(&self) -> Vec<u32> {
        self.inner.fetch_log.lock().unwrap().clone()
    }

    pub fn export_count(&self) -> u32 {
        *self.inner.export_count.lock().unwrap()
    }

    /// Unblock a gated segment response.
    pub fn release_gate(&self) {
        self.inner.gate.notify_one();
    }
}

async fn manifest(State(inner): State<Arc<BackendInner>>) -> impl IntoResponse {
    if let Some((status, message)) = &inner.manifest_error {
        return (
            StatusCode::from_u16(*status).unwrap(),
            Json(json!({ "error": message })),
        )
            .into_response();
    }
    Json(json!({
        "session": inner.session,
        "count": inner.segments.len() as u32,
    }))
    .into_response()
}

async fn chunk(
    State(inner): State<Arc<BackendInner>>,
    Path((_session, index)): Path<(String, u32)>,
) -> impl IntoResponse {
    inner.fetch_log.lock().unwrap().push(index);

    if let Some((fail_index, status)) = inner.fail_at {
        if fail_index == index {
            return (
                StatusCode::from_u16(status).unwrap(),
                "segment unavailable",
            )
                .into_response();
        }
    }

    if inner.gate_at == Some(index) && !inner.gate_used.swap(true, Ordering::SeqCst) {
        inner.gate.notified().await;
    }

    match inner.segments.get(index as usize) {
        Some(bytes) => bytes.clone().into_response(),
        None => (StatusCode::NOT_FOUND, "no such segment").into_response(),
    }
}

async fn export(State(inner): State<Arc<BackendInner>>) -> impl IntoResponse {
    *inner.export_count.lock().unwrap() += 1;
    Json(json!({ "status": "ok" }))
}

/// Poll until `predicate` holds or the timeout elapses.
pub async fn wait_until<F: Fn() -> bool>(predicate: F, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if predicate() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
