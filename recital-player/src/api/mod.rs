//! REST API for the Recital audio player

pub mod handlers;
pub mod sse;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::playback::engine::PlaybackEngine;
use crate::state::SharedState;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Playback engine
    pub engine: Arc<PlaybackEngine>,
    /// Shared playback state and event bus
    pub state: Arc<SharedState>,
    /// Server port
    pub port: u16,
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/playback/start", post(handlers::start))
        .route("/playback/pause", post(handlers::pause))
        .route("/playback/resume", post(handlers::resume))
        .route("/playback/stop", post(handlers::stop))
        .route("/playback/rate", post(handlers::set_rate))
        .route("/playback/status", get(handlers::status))
        .route("/export", post(handlers::export))
        .route("/events", get(sse::event_stream))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
