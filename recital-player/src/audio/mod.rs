//! Audio pipeline: decode, resample, output
//!
//! Segments arrive as encoded bytes, get decoded to interleaved stereo f32,
//! resampled to the output device rate, and pulled frame-by-frame through
//! the cpal callback.

pub mod decode;
pub mod output;
pub mod resampler;
pub mod types;

pub use decode::decode_segment;
pub use output::AudioOutput;
pub use types::{AudioFrame, SegmentBuffer};
