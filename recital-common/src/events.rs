//! Event types for the Recital event system
//!
//! Every observable change in the player is broadcast as a `RecitalEvent`
//! and relayed to SSE subscribers. Events carry the playback attempt id so
//! a late event from a torn-down attempt can be told apart from the
//! current one.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Recital event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RecitalEvent {
    /// Playback state changed
    PlaybackStateChanged {
        state: PlaybackState,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A segment's encoded bytes finished downloading.
    ///
    /// `percent` is the coarse fetch progress: round(100 * (index+1) / count).
    SegmentFetched {
        attempt: Uuid,
        index: u32,
        count: u32,
        percent: u8,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A decoded segment was placed on the playback timeline.
    SegmentScheduled {
        attempt: Uuid,
        index: u32,
        start_ms: u64,
        duration_ms: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Playback position update (sent ~1/s while playing)
    PlaybackPosition {
        attempt: Uuid,
        position_ms: u64,
        duration_ms: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// All segments were scheduled and the clock consumed the whole timeline
    PlaybackFinished {
        attempt: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Playback failed.
    ///
    /// `blocking` is true for errors raised before any audio was scheduled
    /// (manifest / first segment); false for background prefetch errors,
    /// where already-buffered audio keeps playing to its natural end.
    PlaybackError {
        attempt: Uuid,
        message: String,
        blocking: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Playback rate changed
    RateChanged {
        rate: f32,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl RecitalEvent {
    /// Event type string used as the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            RecitalEvent::PlaybackStateChanged { .. } => "PlaybackStateChanged",
            RecitalEvent::SegmentFetched { .. } => "SegmentFetched",
            RecitalEvent::SegmentScheduled { .. } => "SegmentScheduled",
            RecitalEvent::PlaybackPosition { .. } => "PlaybackPosition",
            RecitalEvent::PlaybackFinished { .. } => "PlaybackFinished",
            RecitalEvent::PlaybackError { .. } => "PlaybackError",
            RecitalEvent::RateChanged { .. } => "RateChanged",
        }
    }
}

/// Playback session state machine
///
/// `Idle → Preparing → Buffering → Playing → {Paused ⇄ Playing} → Finished`,
/// with `Error` reachable from any non-Idle state. `stop()` returns to `Idle`
/// from anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    /// No active playback attempt
    Idle,
    /// Manifest requested, nothing fetched yet
    Preparing,
    /// First segment downloading/decoding, nothing audible yet
    Buffering,
    /// At least the first segment is on the timeline and the clock runs
    Playing,
    /// Clock suspended; scheduled buffers keep their relative offsets
    Paused,
    /// Whole timeline consumed
    Finished,
    /// Playback attempt failed (already-scheduled audio may still drain)
    Error,
}

impl PlaybackState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackState::Idle => "idle",
            PlaybackState::Preparing => "preparing",
            PlaybackState::Buffering => "buffering",
            PlaybackState::Playing => "playing",
            PlaybackState::Paused => "paused",
            PlaybackState::Finished => "finished",
            PlaybackState::Error => "error",
        }
    }
}
