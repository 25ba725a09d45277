//! Server-Sent Events (SSE) broadcaster
//!
//! Streams real-time playback events to connected clients. Each new client
//! first receives a snapshot of the current playback state, then live
//! events from the broadcast bus.

use crate::api::AppState;
use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use futures::stream::{Stream, StreamExt};
use recital_common::events::RecitalEvent;
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, warn};

/// GET /events - SSE event stream
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    debug!("New SSE client connected");

    // Subscribe before snapshotting so no transition is missed in between
    let rx = state.state.subscribe_events();
    let initial = RecitalEvent::PlaybackStateChanged {
        state: state.state.get_playback_state().await,
        timestamp: chrono::Utc::now(),
    };

    let stream = async_stream::stream! {
        if let Some(event) = to_sse_event(&initial) {
            yield Ok(event);
        }

        let mut events = BroadcastStream::new(rx);
        while let Some(result) = events.next().await {
            match result {
                Ok(event) => {
                    if let Some(event) = to_sse_event(&event) {
                        yield Ok(event);
                    }
                }
                Err(e) => {
                    // BroadcastStream error (lagged or closed)
                    warn!("SSE stream error: {:?}", e);
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Serialize a player event into an SSE frame.
fn to_sse_event(event: &RecitalEvent) -> Option<Event> {
    match serde_json::to_string(event) {
        Ok(json) => {
            let event_type = event.event_type();
            debug!("Broadcasting SSE event: {}", event_type);
            Some(Event::default().event(event_type).data(json))
        }
        Err(e) => {
            warn!("Failed to serialize event: {}", e);
            None
        }
    }
}
