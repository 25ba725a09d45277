//! Playout queue
//!
//! Owns the decoded segments and the playback cursor. The audio callback
//! pulls one frame per device tick via `next_frame()`; the cursor advances
//! by the rate multiplier each tick, with linear interpolation between
//! source frames, so rate changes apply uniformly at the output stage.
//!
//! When the cursor reaches the scheduled end before prefetch has finished,
//! it freezes and silence is emitted until the next segment lands. The
//! clock never skips ahead, so late segments still play gaplessly from
//! their scheduled offsets.

use crate::audio::types::{AudioFrame, SegmentBuffer};
use crate::playback::timeline::{ScheduledSpan, Timeline};

/// Minimum playback rate multiplier
pub const MIN_RATE: f32 = 0.5;
/// Maximum playback rate multiplier
pub const MAX_RATE: f32 = 3.0;

/// Decoded segments plus the playback cursor over their shared timeline.
///
/// Accessed from the audio callback under a short-held mutex; all methods
/// are non-blocking.
pub struct PlayoutQueue {
    timeline: Timeline,
    /// Decoded segments, parallel to `timeline.spans()`
    segments: Vec<SegmentBuffer>,
    /// Fractional frame position on the output clock
    cursor: f64,
    rate: f32,
    paused: bool,
    prefetch_complete: bool,
    underrun_ticks: u64,
}

impl PlayoutQueue {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            timeline: Timeline::new(sample_rate),
            segments: Vec::new(),
            cursor: 0.0,
            rate: 1.0,
            paused: false,
            prefetch_complete: false,
            underrun_ticks: 0,
        }
    }

    /// Clear all scheduled audio and restart the clock at zero.
    ///
    /// The rate multiplier persists across attempts.
    pub fn reset(&mut self, sample_rate: u32) {
        self.timeline = Timeline::new(sample_rate);
        self.segments.clear();
        self.cursor = 0.0;
        self.paused = false;
        self.prefetch_complete = false;
        self.underrun_ticks = 0;
    }

    /// Place a decoded segment at the end of the timeline.
    pub fn schedule(&mut self, buffer: SegmentBuffer) -> ScheduledSpan {
        let span = self.timeline.schedule(buffer.index, buffer.frame_count());
        self.segments.push(buffer);
        span
    }

    /// Produce the next output frame and advance the cursor.
    pub fn next_frame(&mut self) -> AudioFrame {
        if self.paused {
            return AudioFrame::zero();
        }

        let scheduled = self.timeline.scheduled_frames() as f64;
        if self.cursor >= scheduled {
            // Clock caught up with the schedule. Freeze until more audio
            // lands or the attempt finishes.
            if !self.prefetch_complete && !self.segments.is_empty() {
                self.underrun_ticks += 1;
            }
            return AudioFrame::zero();
        }

        let base = self.cursor as u64;
        let frac = (self.cursor - base as f64) as f32;

        let frame = if frac == 0.0 || base + 1 >= self.timeline.scheduled_frames() {
            self.frame_at(base)
        } else {
            self.frame_at(base).lerp(&self.frame_at(base + 1), frac)
        };

        self.cursor = (self.cursor + self.rate as f64).min(scheduled);
        frame
    }

    /// Read the frame at a global clock position.
    fn frame_at(&self, global: u64) -> AudioFrame {
        match self.timeline.span_at(global) {
            Some((pos, span)) => {
                let local = global - span.start_frame;
                self.segments[pos]
                    .get_frame(local as usize)
                    .unwrap_or_else(AudioFrame::zero)
            }
            None => AudioFrame::zero(),
        }
    }

    /// All segments scheduled and the clock consumed the whole timeline.
    pub fn is_finished(&self) -> bool {
        self.prefetch_complete
            && !self.segments.is_empty()
            && self.cursor >= self.timeline.scheduled_frames() as f64
    }

    pub fn mark_prefetch_complete(&mut self) {
        self.prefetch_complete = true;
    }

    pub fn is_prefetch_complete(&self) -> bool {
        self.prefetch_complete
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Set the rate multiplier (caller validates against MIN_RATE/MAX_RATE).
    pub fn set_rate(&mut self, rate: f32) {
        self.rate = rate.clamp(MIN_RATE, MAX_RATE);
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    /// Current clock position in whole frames
    pub fn position_frames(&self) -> u64 {
        self.cursor as u64
    }

    /// Current clock position in milliseconds
    pub fn position_ms(&self) -> u64 {
        self.position_frames() * 1000 / self.timeline.sample_rate() as u64
    }

    /// Total scheduled duration in milliseconds
    pub fn scheduled_ms(&self) -> u64 {
        self.timeline.scheduled_ms()
    }

    pub fn scheduled_frames(&self) -> u64 {
        self.timeline.scheduled_frames()
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn sample_rate(&self) -> u32 {
        self.timeline.sample_rate()
    }

    /// Device ticks spent frozen waiting for late segments
    pub fn underrun_ticks(&self) -> u64 {
        self.underrun_ticks
    }

    pub fn spans(&self) -> &[ScheduledSpan] {
        self.timeline.spans()
    }
}
