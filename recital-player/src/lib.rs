//! # Recital Audio Player (recital-player)
//!
//! Streamed text-to-speech playback daemon.
//!
//! **Purpose:** Request synthesized speech from a backend in numbered
//! segments, decode them as they arrive, and play them gaplessly on a
//! frame-accurate virtual timeline, with an HTTP/SSE control interface.
//!
//! **Architecture:** Single-stream audio pipeline using symphonia + rubato
//! + cpal; segment fetching and scheduling on tokio.

pub mod api;
pub mod audio;
pub mod backend;
pub mod config;
pub mod error;
pub mod playback;
pub mod state;

pub use error::{Error, Result};
pub use state::SharedState;
