//! Audio decoding using symphonia
//!
//! Decodes a fetched segment's encoded bytes (MP3 or WAV from the synthesis
//! backend) into an interleaved stereo f32 buffer at the output sample rate.
//!
//! # Sample Format
//!
//! - Output: stereo f32 samples (interleaved: [L, R, L, R, ...])
//! - Mono sources: duplicated to stereo
//! - Multi-channel sources: downmixed to stereo

use crate::audio::resampler::Resampler;
use crate::audio::types::SegmentBuffer;
use crate::error::{Error, Result};
use std::io::Cursor;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

/// Decode a segment's encoded bytes and resample to the output rate.
///
/// Returns the fully decoded segment. Recoverable mid-stream decode errors
/// skip the bad packet; a stream that yields no audio at all is an error.
pub fn decode_segment(index: u32, bytes: Vec<u8>, output_rate: u32) -> Result<SegmentBuffer> {
    let (samples, native_rate) = decode_to_stereo_f32(index, bytes)?;

    let resampled = Resampler::resample(index, samples, native_rate, output_rate)?;

    let buffer = SegmentBuffer::new(index, resampled, output_rate);
    debug!(
        "Decoded segment {}: {} frames ({} ms) at {}Hz",
        index,
        buffer.frame_count(),
        buffer.duration_ms(),
        output_rate
    );
    Ok(buffer)
}

/// Decode encoded bytes to interleaved stereo f32 at the source rate.
fn decode_to_stereo_f32(index: u32, bytes: Vec<u8>) -> Result<(Vec<f32>, u32)> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    // No filename available, let the probe sniff the container
    let probed = symphonia::default::get_probe()
        .format(
            &Hint::new(),
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| Error::Decode {
            index,
            reason: format!("Unrecognized audio format: {}", e),
        })?;

    let mut format = probed.format;

    let track = format.default_track().ok_or_else(|| Error::Decode {
        index,
        reason: "No audio track found".to_string(),
    })?;

    let track_id = track.id;
    let codec_params = track.codec_params.clone();
    let native_rate = codec_params.sample_rate.unwrap_or(44100);

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| Error::Decode {
            index,
            reason: format!("Unsupported codec: {}", e),
        })?;

    let mut samples: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break; // EOF
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => {
                return Err(Error::Decode {
                    index,
                    reason: format!("Packet read failed: {}", e),
                });
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                // Bad packet, stream is still usable
                warn!("Segment {}: skipping undecodable packet: {}", index, e);
                continue;
            }
            Err(e) => {
                return Err(Error::Decode {
                    index,
                    reason: format!("Decode failed: {}", e),
                });
            }
        };

        if decoded.frames() == 0 {
            continue;
        }

        let spec = *decoded.spec();
        let mut sample_buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);
        append_as_stereo(&mut samples, sample_buf.samples(), spec.channels.count());
    }

    if samples.is_empty() {
        return Err(Error::Decode {
            index,
            reason: "Stream contained no decodable audio".to_string(),
        });
    }

    Ok((samples, native_rate))
}

/// Append interleaved source samples to `out` as stereo pairs.
fn append_as_stereo(out: &mut Vec<f32>, interleaved: &[f32], channels: usize) {
    match channels {
        0 => {}
        1 => {
            // Mono: duplicate to both channels
            out.reserve(interleaved.len() * 2);
            for &sample in interleaved {
                out.push(sample);
                out.push(sample);
            }
        }
        2 => {
            out.extend_from_slice(interleaved);
        }
        _ => {
            // Multi-channel: average even channels into left, odd into right
            let frames = interleaved.len() / channels;
            out.reserve(frames * 2);
            let half = (channels as f32 / 2.0).max(1.0);
            for frame_idx in 0..frames {
                let mut left_sum = 0.0f32;
                let mut right_sum = 0.0f32;
                for ch_idx in 0..channels {
                    let sample = interleaved[frame_idx * channels + ch_idx];
                    if ch_idx % 2 == 0 {
                        left_sum += sample;
                    } else {
                        right_sum += sample;
                    }
                }
                out.push(left_sum / half);
                out.push(right_sum / half);
            }
        }
    }
}
