//! PCM16 wire codec.
//!
//! The provider expects mono 16-bit signed little-endian PCM, base64 wrapped
//! inside JSON text frames. Encoding packs samples little-endian and base64s
//! the raw bytes. Decoding returns raw bytes without checking sample
//! alignment; odd byte counts are rejected by the player.

use base64::prelude::*;
use thiserror::Error;

use super::AudioError;

/// Errors produced while decoding provider audio payloads.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    /// The payload was not valid standard base64
    #[error("Malformed audio payload: {0}")]
    MalformedPayload(String),
}

/// Encode 16-bit samples as base64 little-endian PCM.
pub fn encode(samples: &[i16]) -> String {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for sample in samples {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    BASE64_STANDARD.encode(bytes)
}

/// Decode a base64 audio payload into raw bytes.
pub fn decode(payload: &str) -> Result<Vec<u8>, CodecError> {
    BASE64_STANDARD
        .decode(payload)
        .map_err(|e| CodecError::MalformedPayload(e.to_string()))
}

/// Convert normalized float samples (-1.0..=1.0) to PCM16.
///
/// Values are clamped first. Negative values scale by 0x8000 and positive
/// values by 0x7FFF so both extremes map onto the full i16 range.
pub fn float_to_pcm16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| {
            let s = s.clamp(-1.0, 1.0);
            if s < 0.0 {
                (s * 32768.0) as i16
            } else {
                (s * 32767.0) as i16
            }
        })
        .collect()
}

/// Reassemble little-endian PCM16 bytes into samples.
pub fn pcm16_to_samples(bytes: &[u8]) -> Result<Vec<i16>, AudioError> {
    if bytes.len() % 2 != 0 {
        return Err(AudioError::MisalignedChunk(bytes.len()));
    }
    Ok(bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect())
}

/// Convert PCM16 samples to floats for output devices.
pub fn pcm16_to_float(samples: &[i16]) -> Vec<f32> {
    samples.iter().map(|&s| s as f32 / 32768.0).collect()
}
