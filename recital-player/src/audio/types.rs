//! Core audio data types
//!
//! Structures for decoded segment audio and single stereo frames used
//! throughout the decode and playout pipeline.

/// SegmentBuffer holds one fully decoded and resampled synthesis segment.
///
/// The whole segment lives in RAM so the playout queue can place it at an
/// exact frame offset and read it sample-accurately.
///
/// **Format:**
/// - Samples are f32 (floating point -1.0 to 1.0)
/// - Stereo interleaved: [L, R, L, R, ...]
/// - Sample rate matches the output device after resampling
#[derive(Debug, Clone)]
pub struct SegmentBuffer {
    /// Segment index within the synthesis session
    pub index: u32,

    /// PCM audio samples (interleaved stereo)
    pub samples: Vec<f32>,

    /// Sample rate after resampling
    pub sample_rate: u32,
}

impl SegmentBuffer {
    /// Create a new SegmentBuffer from decoded and resampled audio data
    pub fn new(index: u32, samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            index,
            samples,
            sample_rate,
        }
    }

    /// Number of stereo frames (samples.len() / 2)
    pub fn frame_count(&self) -> u64 {
        (self.samples.len() / 2) as u64
    }

    /// Get duration in milliseconds
    pub fn duration_ms(&self) -> u64 {
        self.frame_count() * 1000 / self.sample_rate as u64
    }

    /// Get audio frame at specific frame index
    pub fn get_frame(&self, frame_index: usize) -> Option<AudioFrame> {
        let sample_index = frame_index * 2;
        if sample_index + 1 < self.samples.len() {
            Some(AudioFrame {
                left: self.samples[sample_index],
                right: self.samples[sample_index + 1],
            })
        } else {
            None
        }
    }
}

/// AudioFrame represents a single stereo sample (one frame of audio).
///
/// Used for passing audio data between the playout queue and output device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioFrame {
    /// Left channel sample
    pub left: f32,

    /// Right channel sample
    pub right: f32,
}

impl AudioFrame {
    /// Create a silent frame (0.0, 0.0)
    pub fn zero() -> Self {
        AudioFrame { left: 0.0, right: 0.0 }
    }

    /// Create a frame from left and right samples
    pub fn from_stereo(left: f32, right: f32) -> Self {
        AudioFrame { left, right }
    }

    /// Linear interpolation toward another frame
    pub fn lerp(&self, other: &AudioFrame, t: f32) -> AudioFrame {
        AudioFrame {
            left: self.left + (other.left - self.left) * t,
            right: self.right + (other.right - self.right) * t,
        }
    }

    /// Clamp samples to valid range [-1.0, 1.0] to prevent clipping
    pub fn clamp(&mut self) {
        self.left = self.left.clamp(-1.0, 1.0);
        self.right = self.right.clamp(-1.0, 1.0);
    }
}
