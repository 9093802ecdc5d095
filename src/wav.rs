//! WAV header parsing and PCM decode for streamed audio.
//!
//! Streaming responses carry a single canonical 44-byte header followed by
//! raw little-endian 16-bit PCM. The parser reads the three format fields
//! from their fixed offsets and does not validate the RIFF/WAVE/fmt tags —
//! the server always emits the canonical layout. Complete (non-streamed)
//! responses go through `hound` instead for a strict parse.

use crate::defaults::{PCM_I16_SCALE, WAV_HEADER_LEN};
use crate::error::{Result, TtscastError};

/// Byte offset of the sample rate field (u32, little-endian).
const SAMPLE_RATE_OFFSET: usize = 24;
/// Byte offset of the channel count field (u16, little-endian).
const CHANNELS_OFFSET: usize = 22;
/// Byte offset of the bits-per-sample field (u16, little-endian).
const BITS_PER_SAMPLE_OFFSET: usize = 34;

/// Minimum first-chunk length required to read all three format fields.
const MIN_HEADER_BYTES: usize = 36;

/// PCM format description parsed once per streaming session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
}

impl WavFormat {
    /// Bytes of PCM payload per second of audio.
    pub fn bytes_per_second(&self) -> u32 {
        self.sample_rate * u32::from(self.channels) * u32::from(self.bits_per_sample) / 8
    }

    /// Playable duration of a PCM payload of `payload_len` bytes.
    pub fn payload_duration_secs(&self, payload_len: usize) -> f64 {
        let bps = self.bytes_per_second();
        if bps == 0 {
            return 0.0;
        }
        payload_len as f64 / f64::from(bps)
    }
}

/// Parse the canonical WAV header from the first chunk of a stream.
///
/// Only the fixed-offset fields are read; tags are not validated and the
/// byte order is always little-endian. A chunk too short to contain the
/// format fields is rejected rather than yielding garbage.
pub fn parse_header(chunk: &[u8]) -> Result<WavFormat> {
    if chunk.len() < MIN_HEADER_BYTES {
        return Err(TtscastError::WavHeader {
            message: format!("first chunk too short ({} bytes)", chunk.len()),
        });
    }

    let sample_rate = u32::from_le_bytes([
        chunk[SAMPLE_RATE_OFFSET],
        chunk[SAMPLE_RATE_OFFSET + 1],
        chunk[SAMPLE_RATE_OFFSET + 2],
        chunk[SAMPLE_RATE_OFFSET + 3],
    ]);
    let channels = u16::from_le_bytes([chunk[CHANNELS_OFFSET], chunk[CHANNELS_OFFSET + 1]]);
    let bits_per_sample = u16::from_le_bytes([
        chunk[BITS_PER_SAMPLE_OFFSET],
        chunk[BITS_PER_SAMPLE_OFFSET + 1],
    ]);

    Ok(WavFormat {
        sample_rate,
        channels,
        bits_per_sample,
    })
}

/// Strip the 44-byte header from the first chunk, returning the first
/// slice of raw PCM payload (empty if the chunk is header-only).
pub fn strip_header(chunk: &[u8]) -> &[u8] {
    if chunk.len() <= WAV_HEADER_LEN {
        &[]
    } else {
        &chunk[WAV_HEADER_LEN..]
    }
}

/// Decode complete little-endian i16 samples into normalized f32.
///
/// A trailing odd byte is ignored; callers that receive arbitrary chunk
/// boundaries carry it over themselves (see the live sink).
pub fn decode_pcm16(payload: &[u8]) -> Vec<f32> {
    payload
        .chunks_exact(2)
        .map(|pair| f32::from(i16::from_le_bytes([pair[0], pair[1]])) / PCM_I16_SCALE)
        .collect()
}

/// Build a canonical 44-byte header with the given format fields.
/// Shared fixture helper for the playback test modules.
#[cfg(test)]
pub(crate) fn make_header(sample_rate: u32, channels: u16, bits_per_sample: u16) -> Vec<u8> {
    let mut header = vec![0u8; WAV_HEADER_LEN];
    header[..4].copy_from_slice(b"RIFF");
    header[8..12].copy_from_slice(b"WAVE");
    header[12..16].copy_from_slice(b"fmt ");
    header[CHANNELS_OFFSET..CHANNELS_OFFSET + 2].copy_from_slice(&channels.to_le_bytes());
    header[SAMPLE_RATE_OFFSET..SAMPLE_RATE_OFFSET + 4].copy_from_slice(&sample_rate.to_le_bytes());
    header[BITS_PER_SAMPLE_OFFSET..BITS_PER_SAMPLE_OFFSET + 2]
        .copy_from_slice(&bits_per_sample.to_le_bytes());
    header[36..40].copy_from_slice(b"data");
    header
}
