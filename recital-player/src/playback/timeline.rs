//! Virtual playback timeline
//!
//! Tracks where each scheduled segment sits on the shared output clock.
//! Segment `i` occupies frames `[sum(frames[0..i]), sum(frames[0..i+1]))`,
//! so playback is gapless regardless of when each segment arrived.

/// One scheduled segment's position on the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledSpan {
    /// Segment index within the synthesis session
    pub index: u32,
    /// First frame of this segment on the output clock
    pub start_frame: u64,
    /// Segment length in output frames
    pub frames: u64,
}

impl ScheduledSpan {
    /// Start offset in milliseconds at the given rate-1.0 clock
    pub fn start_ms(&self, sample_rate: u32) -> u64 {
        self.start_frame * 1000 / sample_rate as u64
    }

    /// Duration in milliseconds
    pub fn duration_ms(&self, sample_rate: u32) -> u64 {
        self.frames * 1000 / sample_rate as u64
    }
}

/// Append-only schedule of segment spans on the output clock.
///
/// Spans are contiguous: each new span starts exactly where the previous
/// one ended.
#[derive(Debug)]
pub struct Timeline {
    sample_rate: u32,
    spans: Vec<ScheduledSpan>,
    scheduled_frames: u64,
}

impl Timeline {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            spans: Vec::new(),
            scheduled_frames: 0,
        }
    }

    /// Append a segment of `frames` length; returns its span.
    pub fn schedule(&mut self, index: u32, frames: u64) -> ScheduledSpan {
        let span = ScheduledSpan {
            index,
            start_frame: self.scheduled_frames,
            frames,
        };
        self.spans.push(span);
        self.scheduled_frames += frames;
        span
    }

    /// Total frames scheduled so far
    pub fn scheduled_frames(&self) -> u64 {
        self.scheduled_frames
    }

    /// Total scheduled duration in milliseconds
    pub fn scheduled_ms(&self) -> u64 {
        self.scheduled_frames * 1000 / self.sample_rate as u64
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn spans(&self) -> &[ScheduledSpan] {
        &self.spans
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Find which span covers a clock frame, with its position in `spans()`.
    pub fn span_at(&self, frame: u64) -> Option<(usize, &ScheduledSpan)> {
        if frame >= self.scheduled_frames {
            return None;
        }
        // Spans are sorted by start_frame
        let idx = match self
            .spans
            .binary_search_by(|span| span.start_frame.cmp(&frame))
        {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        Some((idx, &self.spans[idx]))
    }
}
