//! Audio output using cpal
//!
//! Manages the output device stream. Each device callback requests a whole
//! buffer of frames from the fill function at once, so the caller can take
//! its playout lock once per callback rather than once per frame.

use crate::audio::types::AudioFrame;
use crate::error::{Error, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};
use tracing::{debug, error, info};

/// Audio output manager using cpal.
pub struct AudioOutput {
    device: Device,
    config: StreamConfig,
    sample_format: SampleFormat,
    stream: Option<Stream>,
}

impl AudioOutput {
    /// Open the default output device.
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| Error::AudioOutput("No default output device found".to_string()))?;

        let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        info!("Using default audio device: {}", name);

        let (config, sample_format) = Self::get_best_config(&device)?;

        debug!(
            "Audio config: sample_rate={}, channels={}, format={:?}",
            config.sample_rate.0, config.channels, sample_format
        );

        Ok(Self {
            device,
            config,
            sample_format,
            stream: None,
        })
    }

    /// Get the best supported configuration for playback.
    ///
    /// Prefers 44.1kHz, stereo, f32 samples (matching our internal format).
    fn get_best_config(device: &Device) -> Result<(StreamConfig, SampleFormat)> {
        let mut supported_configs = device
            .supported_output_configs()
            .map_err(|e| Error::AudioOutput(format!("Failed to get device configs: {}", e)))?;

        let preferred = supported_configs.find(|config| {
            config.channels() == 2
                && config.min_sample_rate().0 <= 44100
                && config.max_sample_rate().0 >= 44100
                && config.sample_format() == SampleFormat::F32
        });

        if let Some(supported_config) = preferred {
            let sample_format = supported_config.sample_format();
            let config = supported_config
                .with_sample_rate(cpal::SampleRate(44100))
                .config();
            return Ok((config, sample_format));
        }

        // Fallback: use default config
        let supported_config = device
            .default_output_config()
            .map_err(|e| Error::AudioOutput(format!("Failed to get default config: {}", e)))?;

        let sample_format = supported_config.sample_format();
        let config = supported_config.config();
        Ok((config, sample_format))
    }

    /// Start audio playback.
    ///
    /// `fill` runs on the real-time audio thread once per device callback;
    /// it must not block and should write `AudioFrame::zero()` into slots
    /// for which no audio is available.
    pub fn start<F>(&mut self, fill: F) -> Result<()>
    where
        F: FnMut(&mut [AudioFrame]) + Send + 'static,
    {
        info!("Starting audio stream");

        let channels = self.config.channels as usize;
        let mut fill = fill;
        // Scratch buffer reused across callbacks; resize only runs when the
        // device changes its buffer size.
        let mut frames: Vec<AudioFrame> = Vec::new();

        let stream = match self.sample_format {
            SampleFormat::F32 => self
                .device
                .build_output_stream(
                    &self.config,
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        frames.resize(data.len() / channels, AudioFrame::zero());
                        fill(&mut frames);
                        write_frames_f32(data, &frames, channels);
                    },
                    |err| error!("Audio stream error: {}", err),
                    None,
                ),
            SampleFormat::I16 => self
                .device
                .build_output_stream(
                    &self.config,
                    move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                        frames.resize(data.len() / channels, AudioFrame::zero());
                        fill(&mut frames);
                        write_frames_i16(data, &frames, channels);
                    },
                    |err| error!("Audio stream error: {}", err),
                    None,
                ),
            sample_format => {
                return Err(Error::AudioOutput(format!(
                    "Unsupported sample format: {:?}",
                    sample_format
                )));
            }
        }
        .map_err(|e| Error::AudioOutput(format!("Failed to build stream: {}", e)))?;

        stream
            .play()
            .map_err(|e| Error::AudioOutput(format!("Failed to start stream: {}", e)))?;

        self.stream = Some(stream);

        info!("Audio stream started successfully");
        Ok(())
    }

    /// Stop audio playback.
    pub fn stop(&mut self) -> Result<()> {
        info!("Stopping audio stream");

        if let Some(stream) = self.stream.take() {
            stream
                .pause()
                .map_err(|e| Error::AudioOutput(format!("Failed to pause stream: {}", e)))?;
            drop(stream);
        }

        Ok(())
    }

    /// Get device name.
    pub fn device_name(&self) -> String {
        self.device.name().unwrap_or_else(|_| "Unknown".to_string())
    }

    /// Get sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }
}

impl Drop for AudioOutput {
    fn drop(&mut self) {
        // Ensure stream is stopped on drop
        let _ = self.stop();
    }
}

/// Interleave stereo frames into an f32 device buffer, clamped to [-1, 1].
fn write_frames_f32(data: &mut [f32], frames: &[AudioFrame], channels: usize) {
    for (slot, frame) in data.chunks_mut(channels).zip(frames) {
        let mut frame = *frame;
        frame.clamp();
        slot[0] = frame.left;
        if channels > 1 {
            slot[1] = frame.right;
        }
    }
}

/// Interleave stereo frames into an i16 device buffer, clamped to [-1, 1].
fn write_frames_i16(data: &mut [i16], frames: &[AudioFrame], channels: usize) {
    for (slot, frame) in data.chunks_mut(channels).zip(frames) {
        let mut frame = *frame;
        frame.clamp();
        slot[0] = (frame.left * i16::MAX as f32) as i16;
        if channels > 1 {
            slot[1] = (frame.right * i16::MAX as f32) as i16;
        }
    }
}
