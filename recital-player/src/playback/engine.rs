//! Playback engine
//!
//! Owns the playout queue, the output device thread, and the lifecycle of
//! playback attempts. `start()` tears down any previous attempt, fetches
//! and schedules segment 0 inline, then hands the rest of the manifest to
//! a background prefetch coordinator.
//!
//! cpal streams are not `Send`, so the `AudioOutput` lives on a dedicated
//! std thread for the life of the process; the callback it runs pulls
//! frames from the shared playout queue.

use crate::audio::{decode_segment, AudioFrame, AudioOutput};
use crate::backend::SynthesisClient;
use crate::error::{Error, Result};
use crate::playback::playout::{PlayoutQueue, MAX_RATE, MIN_RATE};
use crate::playback::prefetch::PrefetchCoordinator;
use crate::state::SharedState;
use recital_common::events::{PlaybackState, RecitalEvent};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Fallback clock rate when no output device is available
const FALLBACK_SAMPLE_RATE: u32 = 44100;

/// Handle to the currently active playback attempt.
struct AttemptHandle {
    attempt: Uuid,
    cancel: CancellationToken,
}

/// Snapshot of playback state for the status endpoint.
#[derive(Debug, Clone)]
pub struct EngineStatus {
    pub state: PlaybackState,
    pub progress_percent: u8,
    pub position_ms: u64,
    pub duration_ms: u64,
    pub rate: f32,
}

/// Central playback coordinator.
pub struct PlaybackEngine {
    client: SynthesisClient,
    state: Arc<SharedState>,
    queue: Arc<Mutex<PlayoutQueue>>,
    /// Serializes start() so concurrent requests cannot interleave teardown
    start_serial: tokio::sync::Mutex<()>,
    /// Active attempt, replaced on each start and cleared on stop
    current: Mutex<Option<AttemptHandle>>,
    output_started: AtomicBool,
    /// Output device rate, known once the audio thread reports in
    output_rate: Mutex<u32>,
    /// Cleared on shutdown; the audio thread exits when it sees false
    running: Arc<AtomicBool>,
}

impl PlaybackEngine {
    pub fn new(client: SynthesisClient, state: Arc<SharedState>) -> Self {
        Self {
            client,
            state,
            queue: Arc::new(Mutex::new(PlayoutQueue::new(FALLBACK_SAMPLE_RATE))),
            start_serial: tokio::sync::Mutex::new(()),
            current: Mutex::new(None),
            output_started: AtomicBool::new(false),
            output_rate: Mutex::new(FALLBACK_SAMPLE_RATE),
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Engine with no audio thread; the caller drives the clock through
    /// `queue()` and `monitor_tick()`.
    pub fn new_silent(client: SynthesisClient, state: Arc<SharedState>) -> Self {
        let engine = Self::new(client, state);
        engine.output_started.store(true, Ordering::SeqCst);
        engine
    }

    /// Begin playback of `text`, superseding any active attempt.
    ///
    /// Returns once segment 0 is audible (scheduled and the state is
    /// Playing); remaining segments arrive in the background.
    pub async fn start(&self, text: &str, lang: &str) -> Result<Uuid> {
        if text.trim().is_empty() {
            return Err(Error::BadRequest("text must not be empty".to_string()));
        }

        let _serial = self.start_serial.lock().await;

        // Tear down the previous attempt before touching the timeline
        self.cancel_current();

        let output_rate = self.ensure_output_started();

        let rate = self.state.get_rate().await;
        {
            let mut queue = self.queue.lock().unwrap();
            queue.reset(output_rate);
            queue.set_rate(rate);
        }
        self.state.reset_progress();

        let attempt = Uuid::new_v4();
        let cancel = CancellationToken::new();
        *self.current.lock().unwrap() = Some(AttemptHandle {
            attempt,
            cancel: cancel.clone(),
        });

        info!("Starting playback attempt {} (lang={})", attempt, lang);

        match self.start_inner(attempt, text, lang, &cancel, output_rate).await {
            Ok(()) => Ok(attempt),
            Err(Error::Cancelled) => {
                debug!("Playback attempt {} cancelled during startup", attempt);
                Err(Error::Cancelled)
            }
            Err(e) => {
                error!("Playback attempt {} failed: {}", attempt, e);
                self.state.set_playback_state(PlaybackState::Error).await;
                self.state.broadcast_event(RecitalEvent::PlaybackError {
                    attempt,
                    message: e.to_string(),
                    blocking: e.is_blocking(),
                    timestamp: chrono::Utc::now(),
                });
                Err(e)
            }
        }
    }

    /// Manifest, segment 0, and prefetch kickoff.
    async fn start_inner(
        &self,
        attempt: Uuid,
        text: &str,
        lang: &str,
        cancel: &CancellationToken,
        output_rate: u32,
    ) -> Result<()> {
        self.state.set_playback_state(PlaybackState::Preparing).await;

        let manifest = self.client.request_manifest(text, lang, cancel).await?;

        self.state.set_playback_state(PlaybackState::Buffering).await;

        // Segment 0 is fetched inline: nothing is audible until it plays
        let bytes = self
            .client
            .fetch_segment(&manifest.session, 0, cancel)
            .await?;
        self.state.report_segment_fetched(attempt, 0, manifest.count);

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let buffer = tokio::task::spawn_blocking(move || decode_segment(0, bytes, output_rate))
            .await
            .map_err(|e| Error::Decode {
                index: 0,
                reason: format!("Decode task failed: {}", e),
            })??;

        let (span, sample_rate) = {
            let mut queue = self.queue.lock().unwrap();
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            let span = queue.schedule(buffer);
            (span, queue.sample_rate())
        };
        self.state.broadcast_event(RecitalEvent::SegmentScheduled {
            attempt,
            index: 0,
            start_ms: span.start_ms(sample_rate),
            duration_ms: span.duration_ms(sample_rate),
            timestamp: chrono::Utc::now(),
        });

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        self.state.set_playback_state(PlaybackState::Playing).await;

        if manifest.count == 1 {
            self.queue.lock().unwrap().mark_prefetch_complete();
            return Ok(());
        }

        let coordinator = PrefetchCoordinator::new(
            self.client.clone(),
            Arc::clone(&self.queue),
            Arc::clone(&self.state),
            attempt,
            manifest,
            cancel.clone(),
            output_rate,
        );
        tokio::spawn(coordinator.run());

        Ok(())
    }

    /// Suspend the playback clock.
    pub async fn pause(&self) -> Result<()> {
        match self.state.get_playback_state().await {
            PlaybackState::Playing | PlaybackState::Paused => {
                self.queue.lock().unwrap().set_paused(true);
                self.state.set_playback_state(PlaybackState::Paused).await;
                Ok(())
            }
            other => Err(Error::InvalidState(format!(
                "Cannot pause while {}",
                other.as_str()
            ))),
        }
    }

    /// Resume the playback clock.
    pub async fn resume(&self) -> Result<()> {
        match self.state.get_playback_state().await {
            PlaybackState::Playing | PlaybackState::Paused => {
                self.queue.lock().unwrap().set_paused(false);
                self.state.set_playback_state(PlaybackState::Playing).await;
                Ok(())
            }
            other => Err(Error::InvalidState(format!(
                "Cannot resume while {}",
                other.as_str()
            ))),
        }
    }

    /// Abort the active attempt and return to Idle.
    ///
    /// Valid from any state; stopping an idle player is a no-op.
    pub async fn stop(&self) -> Result<()> {
        // Cancel first so an in-flight start() unwinds quickly, then take
        // the serial lock so teardown cannot interleave with the remaining
        // startup steps (state transitions after segment 0 is scheduled).
        self.cancel_current();
        let _serial = self.start_serial.lock().await;
        self.cancel_current();

        {
            let mut queue = self.queue.lock().unwrap();
            let sample_rate = queue.sample_rate();
            queue.reset(sample_rate);
        }
        self.state.reset_progress();
        self.state.set_playback_state(PlaybackState::Idle).await;

        info!("Playback stopped");
        Ok(())
    }

    /// Change the rate multiplier; applies mid-segment.
    pub async fn set_rate(&self, rate: f32) -> Result<()> {
        if !rate.is_finite() || !(MIN_RATE..=MAX_RATE).contains(&rate) {
            return Err(Error::BadRequest(format!(
                "rate must be between {} and {}",
                MIN_RATE, MAX_RATE
            )));
        }

        self.queue.lock().unwrap().set_rate(rate);
        self.state.set_rate(rate).await;
        self.state.broadcast_event(RecitalEvent::RateChanged {
            rate,
            timestamp: chrono::Utc::now(),
        });

        debug!("Playback rate set to {:.2}", rate);
        Ok(())
    }

    /// Fire-and-forget export request to the backend.
    pub fn export(&self, text: String, lang: String) -> Result<()> {
        if text.trim().is_empty() {
            return Err(Error::BadRequest("text must not be empty".to_string()));
        }

        let client = self.client.clone();
        tokio::spawn(async move {
            if let Err(e) = client.request_export(&text, &lang).await {
                debug!("Export request failed: {}", e);
            }
        });
        Ok(())
    }

    /// Snapshot for the status endpoint.
    pub async fn status(&self) -> EngineStatus {
        let (position_ms, duration_ms) = {
            let queue = self.queue.lock().unwrap();
            (queue.position_ms(), queue.scheduled_ms())
        };
        EngineStatus {
            state: self.state.get_playback_state().await,
            progress_percent: self.state.get_progress_percent(),
            position_ms,
            duration_ms,
            rate: self.state.get_rate().await,
        }
    }

    /// Periodic position reporting and the Finished transition.
    ///
    /// Called ~1/s by `run_monitor`; exposed so tests can drive it.
    pub async fn monitor_tick(&self) {
        let attempt = match self.current_attempt() {
            Some(attempt) => attempt,
            None => return,
        };

        let state = self.state.get_playback_state().await;
        if state != PlaybackState::Playing {
            return;
        }

        let (position_ms, duration_ms, finished) = {
            let queue = self.queue.lock().unwrap();
            (queue.position_ms(), queue.scheduled_ms(), queue.is_finished())
        };

        if finished {
            info!("Playback attempt {} finished", attempt);
            self.state.set_playback_state(PlaybackState::Finished).await;
            self.state.broadcast_event(RecitalEvent::PlaybackFinished {
                attempt,
                timestamp: chrono::Utc::now(),
            });
            return;
        }

        self.state.broadcast_event(RecitalEvent::PlaybackPosition {
            attempt,
            position_ms,
            duration_ms,
            timestamp: chrono::Utc::now(),
        });
    }

    /// Position/finish monitor loop; runs until shutdown.
    pub async fn run_monitor(self: Arc<Self>) {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        loop {
            interval.tick().await;
            if !self.running.load(Ordering::SeqCst) {
                break;
            }
            self.monitor_tick().await;
        }
    }

    /// Stop the audio thread and cancel any active attempt.
    pub fn shutdown(&self) {
        self.cancel_current();
        self.running.store(false, Ordering::SeqCst);
    }

    /// Id of the active attempt, if any.
    pub fn current_attempt(&self) -> Option<Uuid> {
        self.current.lock().unwrap().as_ref().map(|h| h.attempt)
    }

    /// Shared playout queue handle (tests drive the clock through this).
    pub fn queue(&self) -> Arc<Mutex<PlayoutQueue>> {
        Arc::clone(&self.queue)
    }

    fn cancel_current(&self) {
        if let Some(handle) = self.current.lock().unwrap().take() {
            debug!("Cancelling playback attempt {}", handle.attempt);
            handle.cancel.cancel();
        }
    }

    /// Start the audio thread on first use; returns the output sample rate.
    ///
    /// Device open failure is non-fatal: a fallback thread drives the clock
    /// at the fallback rate so the state machine still progresses headless.
    fn ensure_output_started(&self) -> u32 {
        if self.output_started.swap(true, Ordering::SeqCst) {
            return *self.output_rate.lock().unwrap();
        }

        let queue = Arc::clone(&self.queue);
        let running = Arc::clone(&self.running);
        let (rate_tx, rate_rx) = mpsc::channel::<u32>();

        std::thread::Builder::new()
            .name("audio-output".to_string())
            .spawn(move || {
                audio_thread(queue, running, rate_tx);
            })
            .ok();

        let rate = match rate_rx.recv_timeout(Duration::from_millis(500)) {
            Ok(rate) => rate,
            Err(_) => {
                warn!("Audio thread did not report a sample rate, assuming {}", FALLBACK_SAMPLE_RATE);
                FALLBACK_SAMPLE_RATE
            }
        };

        *self.output_rate.lock().unwrap() = rate;
        rate
    }
}

/// Dedicated thread owning the cpal stream (cpal streams are not Send).
fn audio_thread(
    queue: Arc<Mutex<PlayoutQueue>>,
    running: Arc<AtomicBool>,
    rate_tx: mpsc::Sender<u32>,
) {
    let callback_queue = Arc::clone(&queue);

    match AudioOutput::new() {
        Ok(mut output) => {
            let rate = output.sample_rate();
            let _ = rate_tx.send(rate);
            info!("Audio output ready: {} at {}Hz", output.device_name(), rate);

            // One queue lock per device callback, not one per frame
            let fill = move |frames: &mut [AudioFrame]| {
                let mut queue = callback_queue.lock().unwrap();
                for frame in frames.iter_mut() {
                    *frame = queue.next_frame();
                }
            };
            if let Err(e) = output.start(fill) {
                error!("Failed to start audio stream: {}", e);
            }

            // Keep the stream alive until shutdown
            while running.load(Ordering::SeqCst) {
                std::thread::sleep(Duration::from_millis(250));
            }
            let _ = output.stop();
        }
        Err(e) => {
            warn!("No audio device available, running silent: {}", e);
            let _ = rate_tx.send(FALLBACK_SAMPLE_RATE);

            // Headless fallback: drive the clock at the fallback rate so
            // playback still reaches Finished without a device.
            let tick = Duration::from_millis(10);
            let frames_per_tick = (FALLBACK_SAMPLE_RATE / 100) as usize;
            while running.load(Ordering::SeqCst) {
                {
                    let mut queue = callback_queue.lock().unwrap();
                    for _ in 0..frames_per_tick {
                        queue.next_frame();
                    }
                }
                std::thread::sleep(tick);
            }
        }
    }
}
