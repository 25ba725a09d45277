//! Shared playback state
//!
//! Thread-safe shared state for coordination between the playback engine,
//! the prefetch coordinator, and the HTTP/SSE layer.

use std::sync::atomic::{AtomicU8, Ordering};
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

pub use recital_common::events::{PlaybackState, RecitalEvent};

/// Shared state accessible by all components
///
/// Uses RwLock for concurrent read access with rare writes.
pub struct SharedState {
    /// Current playback state machine position
    pub playback_state: RwLock<PlaybackState>,

    /// Fetch progress of the current attempt (0-100)
    pub progress_percent: AtomicU8,

    /// Playback rate multiplier (0.5-3.0)
    pub rate: RwLock<f32>,

    /// Event broadcaster for SSE events
    pub event_tx: broadcast::Sender<RecitalEvent>,
}

impl SharedState {
    /// Create new shared state with default values
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(100); // Buffer up to 100 events
        Self {
            playback_state: RwLock::new(PlaybackState::Idle),
            progress_percent: AtomicU8::new(0),
            rate: RwLock::new(1.0),
            event_tx,
        }
    }

    /// Broadcast an event to all SSE listeners
    pub fn broadcast_event(&self, event: RecitalEvent) {
        // Ignore send errors (no receivers is OK)
        let _ = self.event_tx.send(event);
    }

    /// Subscribe to event stream for SSE
    pub fn subscribe_events(&self) -> broadcast::Receiver<RecitalEvent> {
        self.event_tx.subscribe()
    }

    /// Get current playback state
    pub async fn get_playback_state(&self) -> PlaybackState {
        *self.playback_state.read().await
    }

    /// Set playback state and broadcast the transition
    pub async fn set_playback_state(&self, state: PlaybackState) {
        {
            let mut guard = self.playback_state.write().await;
            if *guard == state {
                return;
            }
            *guard = state;
        }
        self.broadcast_event(RecitalEvent::PlaybackStateChanged {
            state,
            timestamp: chrono::Utc::now(),
        });
    }

    /// Get fetch progress percent (0-100)
    pub fn get_progress_percent(&self) -> u8 {
        self.progress_percent.load(Ordering::Relaxed)
    }

    /// Reset fetch progress to zero
    pub fn reset_progress(&self) {
        self.progress_percent.store(0, Ordering::Relaxed);
    }

    /// Record a completed segment fetch and broadcast progress
    ///
    /// Progress is round(100 * (index + 1) / count). `count` is at least 1
    /// here because a zero-segment manifest is rejected at request time.
    pub fn report_segment_fetched(&self, attempt: Uuid, index: u32, count: u32) {
        let percent = (((index as u64 + 1) * 100 + count as u64 / 2) / count as u64) as u8;
        self.progress_percent.store(percent, Ordering::Relaxed);
        self.broadcast_event(RecitalEvent::SegmentFetched {
            attempt,
            index,
            count,
            percent,
            timestamp: chrono::Utc::now(),
        });
    }

    /// Get playback rate
    pub async fn get_rate(&self) -> f32 {
        *self.rate.read().await
    }

    /// Set playback rate (caller validates range)
    pub async fn set_rate(&self, rate: f32) {
        *self.rate.write().await = rate;
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_playback_state() {
        let state = SharedState::new();

        assert_eq!(state.get_playback_state().await, PlaybackState::Idle);

        state.set_playback_state(PlaybackState::Preparing).await;
        assert_eq!(state.get_playback_state().await, PlaybackState::Preparing);
    }

    #[tokio::test]
    async fn test_state_transition_broadcasts_once() {
        let state = SharedState::new();
        let mut rx = state.subscribe_events();

        state.set_playback_state(PlaybackState::Playing).await;
        // Setting the same state again must not re-broadcast
        state.set_playback_state(PlaybackState::Playing).await;

        let event = rx.try_recv().unwrap();
        assert!(matches!(
            event,
            RecitalEvent::PlaybackStateChanged { state: PlaybackState::Playing, .. }
        ));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_progress_rounding() {
        let state = SharedState::new();
        let attempt = Uuid::new_v4();

        // 3 segments: 33%, 67%, 100%
        state.report_segment_fetched(attempt, 0, 3);
        assert_eq!(state.get_progress_percent(), 33);
        state.report_segment_fetched(attempt, 1, 3);
        assert_eq!(state.get_progress_percent(), 67);
        state.report_segment_fetched(attempt, 2, 3);
        assert_eq!(state.get_progress_percent(), 100);
    }
}
