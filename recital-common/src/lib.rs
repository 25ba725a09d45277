//! # Recital Common Library
//!
//! Shared code for the Recital streaming speech services:
//! - Event types (RecitalEvent enum) broadcast over SSE
//! - Backend API wire types (manifest, synthesis requests)
//!
//! The player daemon and any front end consuming its event stream share
//! these definitions so the wire contract lives in exactly one place.

pub mod api;
pub mod events;

pub use events::{PlaybackState, RecitalEvent};
