//! Chained-segment fallback playback.
//!
//! Used when the low-latency output path is unavailable. Every received
//! chunk produces a cumulative snapshot of all bytes so far, decoded as a
//! complete clip; each snapshot is seeked past the audio already covered
//! by its predecessor and started the moment the predecessor ends. The
//! result is gapless-enough playback out of whole-clip primitives.

use crate::defaults::{SPLIT_CHUNK_LEN, WAV_HEADER_LEN};
use crate::error::Result;
use crate::playback::StreamSink;
use crate::wav::{self, WavFormat};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// A fully decoded audio clip: format plus normalized samples.
#[derive(Debug, Clone)]
pub struct AudioClip {
    pub format: WavFormat,
    pub samples: Vec<f32>,
}

impl AudioClip {
    /// Total playable duration of the clip.
    pub fn duration_secs(&self) -> f64 {
        self.format.payload_duration_secs(self.samples.len() * 2)
    }
}

/// Factory for playable segments.
///
/// `prepare` takes a decoded clip, the offset to seek to before playback,
/// and a volume multiplier, and returns a segment that stays silent until
/// started. Implementations: the real audio device output and
/// [`MockSegmentOutput`].
#[async_trait]
pub trait SegmentOutput: Send + Sync {
    async fn prepare(
        &self,
        clip: AudioClip,
        start_at_secs: f64,
        volume: f32,
    ) -> Result<Arc<dyn Segment>>;
}

/// One prepared playback segment.
#[async_trait]
pub trait Segment: Send + Sync {
    /// Duration of the underlying clip.
    fn duration_secs(&self) -> f64;

    /// Begin playback from the prepared seek offset.
    fn start(&self);

    fn has_ended(&self) -> bool;

    /// Resolves when playback reaches the end of the clip.
    async fn ended(&self);
}

/// Chunks that must not produce a snapshot.
///
/// A 44-byte chunk is a bare header with no payload; 65529 bytes is the
/// transfer size at which the server splits the body, and such a chunk is
/// immediately followed by its remainder. Snapshotting either would cut a
/// segment at a bad boundary.
pub fn should_skip_chunk(len: usize) -> bool {
    len == WAV_HEADER_LEN || len == SPLIT_CHUNK_LEN
}

/// Stream sink that plays chunks through chained cumulative snapshots.
pub struct ChainedSink {
    output: Arc<dyn SegmentOutput>,
    bytes: Vec<u8>,
    volume: f32,
    watermark: f64,
    current: Option<Arc<dyn Segment>>,
    chain_tasks: Vec<JoinHandle<()>>,
}

impl ChainedSink {
    /// The fallback path has no per-sample gain stage, so volume is
    /// capped at 1.0 here.
    pub fn new(output: Arc<dyn SegmentOutput>, volume: f32) -> Self {
        Self {
            output,
            bytes: Vec::new(),
            volume: volume.min(1.0),
            watermark: 0.0,
            current: None,
            chain_tasks: Vec::new(),
        }
    }

    /// Seconds of audio already covered by prepared segments.
    pub fn watermark_secs(&self) -> f64 {
        self.watermark
    }

    /// Wait for every chained segment to finish playing.
    pub async fn finished(mut self) -> Result<()> {
        for task in self.chain_tasks.drain(..) {
            let _ = task.await;
        }
        if let Some(current) = self.current.take() {
            current.ended().await;
        }
        Ok(())
    }
}

#[async_trait]
impl StreamSink for ChainedSink {
    async fn on_chunk(&mut self, chunk: &[u8]) -> Result<()> {
        // Every byte accumulates, even when the chunk itself is skipped
        self.bytes.extend_from_slice(chunk);
        if should_skip_chunk(chunk.len()) {
            return Ok(());
        }

        let format = wav::parse_header(&self.bytes)?;
        let samples = wav::decode_pcm16(wav::strip_header(&self.bytes));
        let clip = AudioClip { format, samples };
        let duration = clip.duration_secs();

        let segment = self
            .output
            .prepare(clip, self.watermark, self.volume)
            .await?;
        self.watermark = duration;

        match self.current.take() {
            None => segment.start(),
            Some(previous) => {
                let next = Arc::clone(&segment);
                self.chain_tasks.push(tokio::spawn(async move {
                    previous.ended().await;
                    next.start();
                }));
            }
        }
        self.current = Some(segment);
        Ok(())
    }
}

// ── mock implementations ───────────────────────────────────────────────

/// Arguments recorded for one `prepare` call on the mock output.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedClip {
    pub duration_secs: f64,
    pub start_at_secs: f64,
    pub volume: f32,
}

/// In-memory segment for tests and audio-less builds. Playback never
/// ends on its own; tests drive it with [`MockSegment::finish`].
pub struct MockSegment {
    duration: f64,
    started: std::sync::atomic::AtomicBool,
    ended_tx: tokio::sync::watch::Sender<bool>,
    ended_rx: tokio::sync::watch::Receiver<bool>,
}

impl MockSegment {
    fn new(duration: f64) -> Self {
        let (ended_tx, ended_rx) = tokio::sync::watch::channel(false);
        Self {
            duration,
            started: std::sync::atomic::AtomicBool::new(false),
            ended_tx,
            ended_rx,
        }
    }

    pub fn was_started(&self) -> bool {
        self.started.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// Simulate playback reaching the end of the clip.
    pub fn finish(&self) {
        let _ = self.ended_tx.send(true);
    }
}

#[async_trait]
impl Segment for MockSegment {
    fn duration_secs(&self) -> f64 {
        self.duration
    }

    fn start(&self) {
        self.started.store(true, std::sync::atomic::Ordering::SeqCst);
    }

    fn has_ended(&self) -> bool {
        *self.ended_rx.borrow()
    }

    async fn ended(&self) {
        let mut rx = self.ended_rx.clone();
        let _ = rx.wait_for(|ended| *ended).await;
    }
}

/// Segment output that records every `prepare` call and hands out
/// [`MockSegment`]s for the test to drive.
#[derive(Default)]
pub struct MockSegmentOutput {
    prepared: std::sync::Mutex<Vec<PreparedClip>>,
    segments: std::sync::Mutex<Vec<Arc<MockSegment>>>,
}

impl MockSegmentOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prepared_calls(&self) -> Vec<PreparedClip> {
        self.prepared
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    pub fn segment(&self, index: usize) -> Option<Arc<MockSegment>> {
        self.segments
            .lock()
            .ok()
            .and_then(|segments| segments.get(index).cloned())
    }

    pub fn segment_count(&self) -> usize {
        self.segments.lock().map(|s| s.len()).unwrap_or(0)
    }
}

#[async_trait]
impl SegmentOutput for MockSegmentOutput {
    async fn prepare(
        &self,
        clip: AudioClip,
        start_at_secs: f64,
        volume: f32,
    ) -> Result<Arc<dyn Segment>> {
        let segment = Arc::new(MockSegment::new(clip.duration_secs()));
        if let Ok(mut calls) = self.prepared.lock() {
            calls.push(PreparedClip {
                duration_secs: clip.duration_secs(),
                start_at_secs,
                volume,
            });
        }
        if let Ok(mut segments) = self.segments.lock() {
            segments.push(Arc::clone(&segment));
        }
        Ok(segment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wav::make_header;
    use std::time::Duration;

    fn payload(len: usize) -> Vec<u8> {
        vec![0u8; len]
    }

    async fn settle() {
        // Let spawned chain tasks observe the ended signal
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    // ── skip heuristic ─────────────────────────────────────────────────

    #[test]
    fn header_only_chunk_is_skipped() {
        assert!(should_skip_chunk(44));
        assert!(!should_skip_chunk(43));
        assert!(!should_skip_chunk(45));
    }

    #[test]
    fn split_boundary_chunk_is_skipped() {
        assert!(should_skip_chunk(65529));
        assert!(!should_skip_chunk(65528));
        assert!(!should_skip_chunk(65530));
    }

    // ── clip ───────────────────────────────────────────────────────────

    #[test]
    fn clip_duration_from_sample_count() {
        let clip = AudioClip {
            format: WavFormat {
                sample_rate: 24000,
                channels: 1,
                bits_per_sample: 16,
            },
            samples: vec![0.0; 24000],
        };
        assert!((clip.duration_secs() - 1.0).abs() < 1e-9);
    }

    // ── chained sink ───────────────────────────────────────────────────

    #[tokio::test]
    async fn snapshots_are_cumulative_and_seeked_past_watermark() {
        let output = Arc::new(MockSegmentOutput::new());
        let mut sink = ChainedSink::new(Arc::clone(&output) as Arc<dyn SegmentOutput>, 1.0);

        // 24000 Hz mono 16-bit: 48000 payload bytes per second
        let mut first = make_header(24000, 1, 16);
        first.extend_from_slice(&payload(48000));
        sink.on_chunk(&first).await.unwrap();
        sink.on_chunk(&payload(48000)).await.unwrap();

        let calls = output.prepared_calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].start_at_secs, 0.0);
        assert!((calls[0].duration_secs - 1.0).abs() < 1e-9);
        // Second snapshot decodes all bytes so far and seeks past the first
        assert!((calls[1].duration_secs - 2.0).abs() < 1e-9);
        assert!((calls[1].start_at_secs - 1.0).abs() < 1e-9);
        assert!((sink.watermark_secs() - 2.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn next_segment_starts_only_after_previous_ends() {
        let output = Arc::new(MockSegmentOutput::new());
        let mut sink = ChainedSink::new(Arc::clone(&output) as Arc<dyn SegmentOutput>, 1.0);

        let mut first = make_header(24000, 1, 16);
        first.extend_from_slice(&payload(4800));
        sink.on_chunk(&first).await.unwrap();
        sink.on_chunk(&payload(4800)).await.unwrap();

        let seg1 = output.segment(0).unwrap();
        let seg2 = output.segment(1).unwrap();
        assert!(seg1.was_started());
        assert!(!seg2.was_started());

        seg1.finish();
        settle().await;
        assert!(seg2.was_started());

        seg2.finish();
        sink.finished().await.unwrap();
    }

    #[tokio::test]
    async fn header_then_two_payload_chunks_yield_two_chained_snapshots() {
        let output = Arc::new(MockSegmentOutput::new());
        let mut sink = ChainedSink::new(Arc::clone(&output) as Arc<dyn SegmentOutput>, 1.0);

        sink.on_chunk(&make_header(24000, 1, 16)).await.unwrap();
        sink.on_chunk(&payload(5000)).await.unwrap();
        sink.on_chunk(&payload(5000)).await.unwrap();

        let calls = output.prepared_calls();
        assert_eq!(calls.len(), 2);
        assert!((calls[0].duration_secs - 5000.0 / 48000.0).abs() < 1e-9);
        assert!((calls[1].start_at_secs - calls[0].duration_secs).abs() < 1e-9);
        assert!((calls[1].duration_secs - 10000.0 / 48000.0).abs() < 1e-9);

        let seg1 = output.segment(0).unwrap();
        let seg2 = output.segment(1).unwrap();
        assert!(seg1.was_started());
        assert!(!seg2.was_started());

        seg1.finish();
        settle().await;
        assert!(seg2.was_started());

        seg2.finish();
        sink.finished().await.unwrap();
    }

    #[tokio::test]
    async fn skipped_chunks_accumulate_without_snapshots() {
        let output = Arc::new(MockSegmentOutput::new());
        let mut sink = ChainedSink::new(Arc::clone(&output) as Arc<dyn SegmentOutput>, 1.0);

        // Bare header is skipped but its bytes count toward later snapshots
        sink.on_chunk(&make_header(24000, 1, 16)).await.unwrap();
        assert_eq!(output.segment_count(), 0);

        sink.on_chunk(&payload(65529)).await.unwrap();
        assert_eq!(output.segment_count(), 0);

        sink.on_chunk(&payload(471)).await.unwrap();
        assert_eq!(output.segment_count(), 1);

        // 65529 + 471 = 66000 payload bytes over the 44-byte header
        let calls = output.prepared_calls();
        assert!((calls[0].duration_secs - 66000.0 / 48000.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn fallback_volume_is_capped_at_unity() {
        let output = Arc::new(MockSegmentOutput::new());
        let mut sink = ChainedSink::new(Arc::clone(&output) as Arc<dyn SegmentOutput>, 1.8);

        let mut first = make_header(24000, 1, 16);
        first.extend_from_slice(&payload(4800));
        sink.on_chunk(&first).await.unwrap();

        assert_eq!(output.prepared_calls()[0].volume, 1.0);
    }

    #[tokio::test]
    async fn finished_resolves_with_no_segments() {
        let output = Arc::new(MockSegmentOutput::new());
        let sink = ChainedSink::new(output as Arc<dyn SegmentOutput>, 1.0);
        sink.finished().await.unwrap();
    }
}
