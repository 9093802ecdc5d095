//! Playback of a complete, non-streamed WAV response.
//!
//! Unlike the streaming paths, the whole body is in hand before playback
//! starts, so the WAV container goes through `hound` for a strict parse
//! instead of the fixed-offset header reader.

use crate::defaults::PCM_I16_SCALE;
use crate::error::{Result, TtscastError};
use crate::playback::chained::{AudioClip, SegmentOutput};
use crate::wav::WavFormat;
use std::io::Cursor;

/// Decode a complete WAV body into a clip of normalized samples.
///
/// Only 16-bit integer PCM is accepted; the synthesis server emits
/// nothing else.
pub fn decode_wav(bytes: &[u8]) -> Result<AudioClip> {
    let reader = hound::WavReader::new(Cursor::new(bytes)).map_err(|e| {
        TtscastError::AudioDecode {
            message: format!("invalid WAV data: {}", e),
        }
    })?;

    let spec = reader.spec();
    if spec.sample_format != hound::SampleFormat::Int || spec.bits_per_sample != 16 {
        return Err(TtscastError::AudioDecode {
            message: format!(
                "unsupported sample format: {:?} at {} bits",
                spec.sample_format, spec.bits_per_sample
            ),
        });
    }

    let samples = reader
        .into_samples::<i16>()
        .map(|sample| sample.map(|v| f32::from(v) / PCM_I16_SCALE))
        .collect::<std::result::Result<Vec<f32>, _>>()
        .map_err(|e| TtscastError::AudioDecode {
            message: format!("failed to read samples: {}", e),
        })?;

    Ok(AudioClip {
        format: WavFormat {
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            bits_per_sample: spec.bits_per_sample,
        },
        samples,
    })
}

/// Play a complete WAV body start to finish and wait for it to end.
///
/// The segment path has no per-sample gain stage, so volume is capped
/// at 1.0 like the chained fallback.
pub async fn play_buffered(output: &dyn SegmentOutput, wav_bytes: &[u8], volume: f32) -> Result<()> {
    let clip = decode_wav(wav_bytes)?;
    let segment = output.prepare(clip, 0.0, volume.min(1.0)).await?;
    segment.start();
    segment.ended().await;
    Ok(())
}
