//! Playback scheduling and coordination
//!
//! The engine owns attempt lifecycle; the playout queue and timeline hold
//! scheduled audio; the prefetch coordinator streams the remaining segments
//! in the background.

pub mod engine;
pub mod playout;
pub mod prefetch;
pub mod timeline;

pub use engine::{EngineStatus, PlaybackEngine};
pub use playout::PlayoutQueue;
pub use timeline::{ScheduledSpan, Timeline};
