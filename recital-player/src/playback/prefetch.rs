//! Prefetch coordinator
//!
//! Background task that walks the manifest sequentially after segment 0 is
//! already playing: fetch segment i, decode it off the async runtime, place
//! it at the end of the timeline, repeat. Strictly one segment at a time so
//! scheduling order always matches manifest order.
//!
//! Failures here are non-blocking: already-scheduled audio keeps playing to
//! its natural end while the error is reported. Cancellation (a new start
//! or an explicit stop) ends the task silently.

use crate::audio::decode_segment;
use crate::backend::SynthesisClient;
use crate::error::{Error, Result};
use crate::playback::playout::PlayoutQueue;
use crate::state::SharedState;
use recital_common::api::Manifest;
use recital_common::events::{PlaybackState, RecitalEvent};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Sequential fetch/decode/schedule worker for segments 1..count.
pub struct PrefetchCoordinator {
    client: SynthesisClient,
    queue: Arc<Mutex<PlayoutQueue>>,
    state: Arc<SharedState>,
    attempt: Uuid,
    manifest: Manifest,
    cancel: CancellationToken,
    output_rate: u32,
}

impl PrefetchCoordinator {
    pub fn new(
        client: SynthesisClient,
        queue: Arc<Mutex<PlayoutQueue>>,
        state: Arc<SharedState>,
        attempt: Uuid,
        manifest: Manifest,
        cancel: CancellationToken,
        output_rate: u32,
    ) -> Self {
        Self {
            client,
            queue,
            state,
            attempt,
            manifest,
            cancel,
            output_rate,
        }
    }

    /// Drive prefetch to completion.
    ///
    /// Returns when every remaining segment is scheduled, the attempt is
    /// cancelled, or a segment fails.
    pub async fn run(self) {
        match self.prefetch_all().await {
            Ok(()) => {
                info!(
                    "Prefetch complete: all {} segments scheduled",
                    self.manifest.count
                );
                self.queue.lock().unwrap().mark_prefetch_complete();
            }
            Err(Error::Cancelled) => {
                debug!("Prefetch cancelled for attempt {}", self.attempt);
            }
            Err(e) => {
                error!("Prefetch failed: {}", e);
                self.state.set_playback_state(PlaybackState::Error).await;
                self.state.broadcast_event(RecitalEvent::PlaybackError {
                    attempt: self.attempt,
                    message: e.to_string(),
                    blocking: false,
                    timestamp: chrono::Utc::now(),
                });
            }
        }
    }

    async fn prefetch_all(&self) -> Result<()> {
        // Segment 0 was fetched and scheduled before playback started
        for index in 1..self.manifest.count {
            if self.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let bytes = self
                .client
                .fetch_segment(&self.manifest.session, index, &self.cancel)
                .await?;

            self.state
                .report_segment_fetched(self.attempt, index, self.manifest.count);

            if self.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let output_rate = self.output_rate;
            let buffer = tokio::task::spawn_blocking(move || {
                decode_segment(index, bytes, output_rate)
            })
            .await
            .map_err(|e| Error::Decode {
                index,
                reason: format!("Decode task failed: {}", e),
            })??;

            // Checked under the lock: a superseding start() cancels the
            // token before it resets the queue, so a cancelled attempt can
            // never schedule onto the fresh timeline.
            let (span, sample_rate) = {
                let mut queue = self.queue.lock().unwrap();
                if self.cancel.is_cancelled() {
                    return Err(Error::Cancelled);
                }
                let span = queue.schedule(buffer);
                (span, queue.sample_rate())
            };

            debug!(
                "Segment {} scheduled at frame {} ({} frames)",
                index, span.start_frame, span.frames
            );
            self.state.broadcast_event(RecitalEvent::SegmentScheduled {
                attempt: self.attempt,
                index,
                start_ms: span.start_ms(sample_rate),
                duration_ms: span.duration_ms(sample_rate),
                timestamp: chrono::Utc::now(),
            });
        }

        Ok(())
    }
}
