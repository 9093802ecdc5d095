//! Growable ring buffer of normalized PCM samples.
//!
//! Hand-off point between the network side (writer) and the audio output
//! callback (reader) of the low-latency playback path. Exclusively owned
//! by one sink per streaming session.

use crate::defaults::RING_INITIAL_CAPACITY;

/// Circular f32 sample buffer with independent read and write cursors.
///
/// Invariant: the write cursor never overwrites unread samples. When a
/// write would wrap into unread territory the buffer is reallocated at
/// double capacity, unread samples are copied in logical order starting
/// at index 0, and cursors are reset (read = 0, write = unread count).
#[derive(Debug)]
pub struct PcmRing {
    buf: Vec<f32>,
    read: usize,
    write: usize,
    unread: usize,
}

impl PcmRing {
    pub fn new() -> Self {
        Self::with_capacity(RING_INITIAL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: vec![0.0; capacity.max(1)],
            read: 0,
            write: 0,
            unread: 0,
        }
    }

    /// Number of written-but-unread samples.
    pub fn unread(&self) -> usize {
        self.unread
    }

    pub fn is_empty(&self) -> bool {
        self.unread == 0
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Append samples, growing the buffer if they would overwrite
    /// unread data.
    pub fn push(&mut self, samples: &[f32]) {
        if self.unread + samples.len() > self.buf.len() {
            self.grow(self.unread + samples.len());
        }

        for &sample in samples {
            self.buf[self.write] = sample;
            self.write = (self.write + 1) % self.buf.len();
        }
        self.unread += samples.len();
    }

    /// Read up to `out.len()` samples into `out`, returning how many were
    /// written. The remainder of `out` is untouched; callers emit silence
    /// for it.
    pub fn read_into(&mut self, out: &mut [f32]) -> usize {
        let n = out.len().min(self.unread);
        for slot in out.iter_mut().take(n) {
            *slot = self.buf[self.read];
            self.read = (self.read + 1) % self.buf.len();
        }
        self.unread -= n;
        n
    }

    /// Reallocate at doubled capacity (repeatedly, until `needed` fits),
    /// compacting unread samples to the front.
    fn grow(&mut self, needed: usize) {
        let mut capacity = self.buf.len() * 2;
        while capacity < needed {
            capacity *= 2;
        }

        let mut next = vec![0.0; capacity];
        for slot in next.iter_mut().take(self.unread) {
            *slot = self.buf[self.read];
            self.read = (self.read + 1) % self.buf.len();
        }

        self.buf = next;
        self.read = 0;
        self.write = self.unread;
    }
}

impl Default for PcmRing {
    fn default() -> Self {
        Self::new()
    }
}
