//! HTTP request handlers
//!
//! Implements REST API endpoints for playback control.

use crate::api::AppState;
use crate::error::Error;
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// Default synthesis language when a request omits it
const DEFAULT_LANG: &str = "es";

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
    port: u16,
}

#[derive(Debug, Deserialize)]
pub struct SpeakRequest {
    pub text: String,
    #[serde(default = "default_lang")]
    pub lang: String,
}

fn default_lang() -> String {
    DEFAULT_LANG.to_string()
}

#[derive(Debug, Serialize)]
pub struct StartResponse {
    status: String,
    attempt: Uuid,
}

#[derive(Debug, Serialize)]
pub struct StatusMessage {
    status: String,
}

#[derive(Debug, Deserialize)]
pub struct RateRequest {
    pub rate: f32,
}

#[derive(Debug, Serialize)]
pub struct PlaybackStatusResponse {
    state: String,
    progress_percent: u8,
    position_ms: u64,
    duration_ms: u64,
    rate: f32,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    error: String,
}

/// Map a player error to an HTTP response.
fn error_response(error: Error) -> (StatusCode, Json<ErrorResponse>) {
    let status = match &error {
        Error::BadRequest(_) => StatusCode::BAD_REQUEST,
        Error::InvalidState(_) => StatusCode::CONFLICT,
        Error::Manifest(_) | Error::Network(_) | Error::SegmentFetch { .. } => {
            StatusCode::BAD_GATEWAY
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
}

// ============================================================================
// Endpoints
// ============================================================================

/// GET /health - Health check endpoint
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        module: "recital-player".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        port: state.port,
    })
}

/// POST /playback/start - Begin playback of a block of text
pub async fn start(
    State(state): State<AppState>,
    Json(request): Json<SpeakRequest>,
) -> Result<Json<StartResponse>, (StatusCode, Json<ErrorResponse>)> {
    info!(
        "Playback start requested: {} chars, lang={}",
        request.text.len(),
        request.lang
    );

    match state.engine.start(&request.text, &request.lang).await {
        Ok(attempt) => Ok(Json(StartResponse {
            status: "playing".to_string(),
            attempt,
        })),
        // Superseded by a newer start; nothing for this caller to act on
        Err(Error::Cancelled) => Err((
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                error: "superseded by a newer playback request".to_string(),
            }),
        )),
        Err(e) => Err(error_response(e)),
    }
}

/// POST /playback/pause - Suspend the playback clock
pub async fn pause(
    State(state): State<AppState>,
) -> Result<Json<StatusMessage>, (StatusCode, Json<ErrorResponse>)> {
    state.engine.pause().await.map_err(error_response)?;
    Ok(Json(StatusMessage {
        status: "paused".to_string(),
    }))
}

/// POST /playback/resume - Resume the playback clock
pub async fn resume(
    State(state): State<AppState>,
) -> Result<Json<StatusMessage>, (StatusCode, Json<ErrorResponse>)> {
    state.engine.resume().await.map_err(error_response)?;
    Ok(Json(StatusMessage {
        status: "playing".to_string(),
    }))
}

/// POST /playback/stop - Abort playback and return to idle
pub async fn stop(
    State(state): State<AppState>,
) -> Result<Json<StatusMessage>, (StatusCode, Json<ErrorResponse>)> {
    state.engine.stop().await.map_err(error_response)?;
    Ok(Json(StatusMessage {
        status: "stopped".to_string(),
    }))
}

/// POST /playback/rate - Change the playback rate multiplier
pub async fn set_rate(
    State(state): State<AppState>,
    Json(request): Json<RateRequest>,
) -> Result<Json<StatusMessage>, (StatusCode, Json<ErrorResponse>)> {
    state
        .engine
        .set_rate(request.rate)
        .await
        .map_err(error_response)?;
    Ok(Json(StatusMessage {
        status: "ok".to_string(),
    }))
}

/// GET /playback/status - Current playback snapshot
pub async fn status(State(state): State<AppState>) -> Json<PlaybackStatusResponse> {
    let status = state.engine.status().await;
    Json(PlaybackStatusResponse {
        state: status.state.as_str().to_string(),
        progress_percent: status.progress_percent,
        position_ms: status.position_ms,
        duration_ms: status.duration_ms,
        rate: status.rate,
    })
}

/// POST /export - Ask the backend to render text as a downloadable file
pub async fn export(
    State(state): State<AppState>,
    Json(request): Json<SpeakRequest>,
) -> Result<Json<StatusMessage>, (StatusCode, Json<ErrorResponse>)> {
    state
        .engine
        .export(request.text, request.lang)
        .map_err(error_response)?;
    Ok(Json(StatusMessage {
        status: "accepted".to_string(),
    }))
}
