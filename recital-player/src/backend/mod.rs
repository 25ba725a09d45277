//! Synthesis backend integration

pub mod client;

pub use client::SynthesisClient;
