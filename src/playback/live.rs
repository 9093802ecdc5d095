//! Low-latency streaming playback sink.
//!
//! Decodes 16-bit PCM as it arrives into a growable ring buffer and lets
//! the audio output callback drain it at the device clock's pace. Chunks
//! and volume changes reach the sink as messages; the output callback
//! never blocks and emits silence whenever the ring runs dry.

use crate::error::Result;
use crate::playback::StreamSink;
use crate::playback::ring_buffer::PcmRing;
use crate::wav::{self, WavFormat};
use async_trait::async_trait;

/// Destination for decoded-on-arrival PCM payload bytes.
///
/// This trait allows swapping implementations (real audio sink vs mock).
pub trait PcmSink: Send {
    fn push_pcm(&mut self, bytes: &[u8]);
}

/// Decoder state between the byte stream and the ring buffer.
///
/// Chunk boundaries are arbitrary and not sample-aligned: a trailing odd
/// byte is held back and prepended to the next chunk before decoding.
/// Samples are scaled by the current volume on the way out, so volume
/// changes apply to already-buffered audio too.
#[derive(Debug)]
pub struct PcmFeeder {
    ring: PcmRing,
    carry: Option<u8>,
    volume: f32,
}

impl PcmFeeder {
    pub fn new(volume: f32) -> Self {
        Self {
            ring: PcmRing::new(),
            carry: None,
            volume,
        }
    }

    /// Decode a chunk of raw payload bytes into the ring buffer.
    pub fn push_pcm(&mut self, bytes: &[u8]) {
        let mut data = Vec::with_capacity(bytes.len() + 1);
        if let Some(carried) = self.carry.take() {
            data.push(carried);
        }
        data.extend_from_slice(bytes);
        if data.len() % 2 == 1 {
            self.carry = data.pop();
        }
        let samples = wav::decode_pcm16(&data);
        self.ring.push(&samples);
    }

    /// Update the volume multiplier. The owner clamps before calling.
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
    }

    /// Unread samples still waiting in the ring.
    pub fn buffered(&self) -> usize {
        self.ring.unread()
    }

    /// Fill an output buffer with scaled samples, padding with silence
    /// when fewer are available. Returns how many real samples were
    /// emitted. Never blocks.
    pub fn pull(&mut self, out: &mut [f32]) -> usize {
        let n = self.ring.read_into(out);
        for sample in &mut out[..n] {
            *sample *= self.volume;
        }
        out[n..].fill(0.0);
        n
    }
}

/// Streaming-session front end: parses the WAV header off the first
/// chunk, constructs the PCM sink for that format, and forwards payload.
pub struct WavStreamSink<S, F> {
    factory: F,
    sink: Option<S>,
    format: Option<WavFormat>,
}

impl<S, F> WavStreamSink<S, F>
where
    S: PcmSink,
    F: FnMut(WavFormat) -> Result<S> + Send,
{
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            sink: None,
            format: None,
        }
    }

    /// Format parsed from the first chunk, if any chunk arrived yet.
    pub fn format(&self) -> Option<WavFormat> {
        self.format
    }

    /// Hand back the constructed sink for draining/teardown.
    pub fn into_inner(self) -> Option<S> {
        self.sink
    }
}

#[async_trait]
impl<S, F> StreamSink for WavStreamSink<S, F>
where
    S: PcmSink,
    F: FnMut(WavFormat) -> Result<S> + Send,
{
    async fn on_chunk(&mut self, chunk: &[u8]) -> Result<()> {
        match self.sink {
            None => {
                let format = wav::parse_header(chunk)?;
                let mut sink = (self.factory)(format)?;
                sink.push_pcm(wav::strip_header(chunk));
                self.format = Some(format);
                self.sink = Some(sink);
            }
            Some(ref mut sink) => sink.push_pcm(chunk),
        }
        Ok(())
    }
}

#[cfg(feature = "cpal-audio")]
pub use real::{LiveSink, SinkMessage};

#[cfg(feature = "cpal-audio")]
mod real {
    use super::{PcmFeeder, PcmSink};
    use crate::defaults::DRAIN_POLL_INTERVAL_MS;
    use crate::error::Result;
    use crate::playback::output::{self, OutputHandle};
    use crate::wav::WavFormat;
    use crossbeam_channel::Sender;
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::Duration;

    /// Message types accepted by the live sink's worker.
    pub enum SinkMessage {
        Pcm(Vec<u8>),
        Volume(f32),
    }

    /// Low-latency playback sink bound to one output stream.
    ///
    /// A worker thread applies incoming messages to the feeder; the
    /// output stream's callback pulls from the same feeder. There is no
    /// end-of-stream message — the sink plays silence once drained until
    /// stopped.
    pub struct LiveSink {
        tx: Sender<SinkMessage>,
        feeder: Arc<Mutex<PcmFeeder>>,
        output: OutputHandle,
    }

    impl LiveSink {
        /// Open an output stream at the parsed sample rate and start the
        /// message worker.
        pub fn start(format: WavFormat, volume: f32) -> Result<Self> {
            let feeder = Arc::new(Mutex::new(PcmFeeder::new(volume)));

            let cb_feeder = Arc::clone(&feeder);
            let output =
                output::spawn_output_stream(format.sample_rate, format.channels, move |data| {
                    match cb_feeder.lock() {
                        Ok(mut feeder) => {
                            feeder.pull(data);
                        }
                        Err(_) => data.fill(0.0),
                    }
                })?;

            let (tx, rx) = crossbeam_channel::unbounded::<SinkMessage>();
            let worker_feeder = Arc::clone(&feeder);
            thread::spawn(move || {
                while let Ok(message) = rx.recv() {
                    let Ok(mut feeder) = worker_feeder.lock() else {
                        break;
                    };
                    match message {
                        SinkMessage::Pcm(bytes) => feeder.push_pcm(&bytes),
                        SinkMessage::Volume(volume) => feeder.set_volume(volume),
                    }
                }
            });

            Ok(Self { tx, feeder, output })
        }

        pub fn push_pcm(&self, bytes: &[u8]) {
            let _ = self.tx.send(SinkMessage::Pcm(bytes.to_vec()));
        }

        /// Forward a volume change. The caller clamps to [0, 2].
        pub fn set_volume(&self, volume: f32) {
            let _ = self.tx.send(SinkMessage::Volume(volume));
        }

        /// Wait until every queued message is applied and the ring has
        /// been played out.
        pub async fn drain(&self) {
            let poll = Duration::from_millis(DRAIN_POLL_INTERVAL_MS);
            loop {
                let queued = !self.tx.is_empty();
                let buffered = self
                    .feeder
                    .lock()
                    .map(|feeder| feeder.buffered())
                    .unwrap_or(0);
                if !queued && buffered == 0 {
                    break;
                }
                tokio::time::sleep(poll).await;
            }
            // Let the device play out its own internal buffer
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        /// Tear down the output stream and the message worker.
        pub fn stop(self) {
            drop(self.tx);
            self.output.stop();
        }
    }

    impl PcmSink for LiveSink {
        fn push_pcm(&mut self, bytes: &[u8]) {
            LiveSink::push_pcm(self, bytes);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TtscastError;
    use crate::playback::{SessionHandle, pump_stream};
    use futures_util::stream;

    /// PCM sink recording every payload it receives.
    struct RecordingSink {
        payloads: Vec<Vec<u8>>,
    }

    impl PcmSink for RecordingSink {
        fn push_pcm(&mut self, bytes: &[u8]) {
            self.payloads.push(bytes.to_vec());
        }
    }

    fn sample_bytes(samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    // ── feeder ─────────────────────────────────────────────────────────

    #[test]
    fn feeder_decodes_and_scales_by_volume() {
        let mut feeder = PcmFeeder::new(0.5);
        feeder.push_pcm(&sample_bytes(&[16384, -16384]));

        let mut out = [0.0f32; 2];
        assert_eq!(feeder.pull(&mut out), 2);
        assert!((out[0] - 0.25).abs() < 1e-6);
        assert!((out[1] + 0.25).abs() < 1e-6);
    }

    #[test]
    fn feeder_carries_odd_byte_across_chunks() {
        let mut feeder = PcmFeeder::new(1.0);
        let bytes = sample_bytes(&[100, 200, 300]);

        // Split mid-sample: 3 bytes now, 3 bytes later
        feeder.push_pcm(&bytes[..3]);
        assert_eq!(feeder.buffered(), 1);
        feeder.push_pcm(&bytes[3..]);
        assert_eq!(feeder.buffered(), 3);

        let mut out = [0.0f32; 3];
        feeder.pull(&mut out);
        assert!((out[0] - 100.0 / 32768.0).abs() < 1e-6);
        assert!((out[1] - 200.0 / 32768.0).abs() < 1e-6);
        assert!((out[2] - 300.0 / 32768.0).abs() < 1e-6);
    }

    #[test]
    fn feeder_carry_survives_consecutive_odd_chunks() {
        let mut feeder = PcmFeeder::new(1.0);
        let bytes = sample_bytes(&[1, 2, 3]);

        feeder.push_pcm(&bytes[..1]);
        feeder.push_pcm(&bytes[1..2]);
        feeder.push_pcm(&bytes[2..5]);
        feeder.push_pcm(&bytes[5..]);

        assert_eq!(feeder.buffered(), 3);
    }

    #[test]
    fn feeder_emits_silence_when_empty() {
        let mut feeder = PcmFeeder::new(1.0);
        let mut out = [7.0f32; 4];
        assert_eq!(feeder.pull(&mut out), 0);
        assert_eq!(out, [0.0; 4]);
    }

    #[test]
    fn feeder_pads_partial_pull_with_silence() {
        let mut feeder = PcmFeeder::new(1.0);
        feeder.push_pcm(&sample_bytes(&[32767]));

        let mut out = [5.0f32; 4];
        assert_eq!(feeder.pull(&mut out), 1);
        assert!(out[0] > 0.99);
        assert_eq!(&out[1..], &[0.0; 3]);
    }

    #[test]
    fn feeder_volume_change_applies_to_buffered_samples() {
        let mut feeder = PcmFeeder::new(1.0);
        feeder.push_pcm(&sample_bytes(&[16384]));
        feeder.set_volume(2.0);

        let mut out = [0.0f32; 1];
        feeder.pull(&mut out);
        assert!((out[0] - 1.0).abs() < 1e-6);
    }

    // ── header-then-payload session front end ──────────────────────────

    #[tokio::test]
    async fn wav_stream_sink_parses_header_and_strips_it() {
        let mut first = crate::wav::make_header(24000, 1, 16);
        first.extend_from_slice(&sample_bytes(&[1, 2]));
        let second = sample_bytes(&[3, 4]);

        let mut sink = WavStreamSink::new(|_format| {
            Ok(RecordingSink {
                payloads: Vec::new(),
            })
        });
        let handle = SessionHandle::new();
        let chunks: Vec<std::result::Result<Vec<u8>, String>> =
            vec![Ok(first), Ok(second.clone())];

        pump_stream(stream::iter(chunks), &mut sink, &handle)
            .await
            .unwrap();

        assert_eq!(
            sink.format(),
            Some(WavFormat {
                sample_rate: 24000,
                channels: 1,
                bits_per_sample: 16
            })
        );
        let inner = sink.into_inner().unwrap();
        assert_eq!(inner.payloads.len(), 2);
        assert_eq!(inner.payloads[0], sample_bytes(&[1, 2]));
        assert_eq!(inner.payloads[1], second);
    }

    #[tokio::test]
    async fn wav_stream_sink_rejects_short_first_chunk() {
        let mut sink = WavStreamSink::new(|_format| {
            Ok(RecordingSink {
                payloads: Vec::new(),
            })
        });

        let result = sink.on_chunk(&[0u8; 10]).await;
        assert!(matches!(result, Err(TtscastError::WavHeader { .. })));
    }

    #[tokio::test]
    async fn wav_stream_sink_propagates_factory_error() {
        let mut sink: WavStreamSink<RecordingSink, _> = WavStreamSink::new(|_format| {
            Err(TtscastError::AudioOutput {
                message: "no output device".to_string(),
            })
        });

        let header = crate::wav::make_header(24000, 1, 16);
        let result = sink.on_chunk(&header).await;
        assert!(matches!(result, Err(TtscastError::AudioOutput { .. })));
    }
}
