//! Audio resampling using rubato
//!
//! Converts decoded segments to the output device's sample rate so the
//! playout timeline can be kept in device frames.

use crate::error::{Error, Result};
use rubato::{FastFixedIn, Resampler as RubatoResampler};
use tracing::debug;

/// Audio resampler using rubato for sample rate conversion.
pub struct Resampler;

impl Resampler {
    /// Resample interleaved stereo audio to the output rate.
    ///
    /// `index` is the segment index, carried only for error context.
    /// If input is already at the output rate, returns the input unchanged.
    pub fn resample(
        index: u32,
        input: Vec<f32>,
        input_rate: u32,
        output_rate: u32,
    ) -> Result<Vec<f32>> {
        if input_rate == output_rate {
            debug!("Segment {} already at {}Hz, skipping resample", index, output_rate);
            return Ok(input);
        }

        if input.is_empty() {
            return Ok(input);
        }

        debug!(
            "Resampling segment {} from {}Hz to {}Hz",
            index, input_rate, output_rate
        );

        // De-interleave samples for rubato (which expects planar format)
        let planar_input = Self::deinterleave(&input);
        let input_frames = planar_input[0].len();

        // Whole segment in one chunk; segments are short enough for this
        let mut resampler = FastFixedIn::<f32>::new(
            output_rate as f64 / input_rate as f64,
            1.0, // max_relative_ratio (no runtime changes)
            rubato::PolynomialDegree::Septic,
            input_frames,
            2,
        )
        .map_err(|e| Error::Decode {
            index,
            reason: format!("Failed to create resampler: {}", e),
        })?;

        let planar_output = resampler
            .process(&planar_input, None)
            .map_err(|e| Error::Decode {
                index,
                reason: format!("Resampling failed: {}", e),
            })?;

        let interleaved_output = Self::interleave(planar_output);

        debug!(
            "Resampled segment {}: {} input frames to {} output frames",
            index,
            input_frames,
            interleaved_output.len() / 2
        );

        Ok(interleaved_output)
    }

    /// Convert interleaved stereo samples to planar format.
    ///
    /// Input:  [L, R, L, R, ...]
    /// Output: [[L, L, ...], [R, R, ...]]
    fn deinterleave(samples: &[f32]) -> Vec<Vec<f32>> {
        let num_frames = samples.len() / 2;
        let mut planar = vec![Vec::with_capacity(num_frames); 2];

        for frame_idx in 0..num_frames {
            planar[0].push(samples[frame_idx * 2]);
            planar[1].push(samples[frame_idx * 2 + 1]);
        }

        planar
    }

    /// Convert planar samples to interleaved format.
    ///
    /// Input:  [[L, L, ...], [R, R, ...]]
    /// Output: [L, R, L, R, ...]
    fn interleave(planar: Vec<Vec<f32>>) -> Vec<f32> {
        if planar.is_empty() {
            return Vec::new();
        }

        let num_channels = planar.len();
        let num_frames = planar[0].len();
        let mut interleaved = Vec::with_capacity(num_frames * num_channels);

        for frame_idx in 0..num_frames {
            for channel in planar.iter() {
                interleaved.push(channel[frame_idx]);
            }
        }

        interleaved
    }
}
