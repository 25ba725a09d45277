//! Error types for the Recital audio player

use thiserror::Error;

/// Player errors
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Manifest request failed: {0}")]
    Manifest(String),

    #[error("Segment {index} fetch failed with HTTP {status}")]
    SegmentFetch { index: u32, status: u16 },

    #[error("Segment {index} decode failed: {reason}")]
    Decode { index: u32, reason: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Audio output error: {0}")]
    AudioOutput(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for player operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// True for failures raised before any audio reached the timeline.
    ///
    /// Blocking errors abort the playback attempt; non-blocking prefetch
    /// errors leave already-scheduled audio to play out.
    pub fn is_blocking(&self) -> bool {
        !matches!(self, Error::SegmentFetch { index, .. } | Error::Decode { index, .. } if *index > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_segment_errors_are_blocking() {
        assert!(Error::SegmentFetch { index: 0, status: 500 }.is_blocking());
        assert!(Error::Manifest("boom".into()).is_blocking());
    }

    #[test]
    fn test_later_segment_errors_are_non_blocking() {
        assert!(!Error::SegmentFetch { index: 3, status: 500 }.is_blocking());
        assert!(!Error::Decode { index: 1, reason: "truncated".into() }.is_blocking());
    }
}
