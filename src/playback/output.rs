//! Audio device output using CPAL (Cross-Platform Audio Library).
//!
//! The `cpal::Stream` type is not `Send`, so every stream is owned by a
//! dedicated thread that builds it, starts it, and holds it alive until
//! the stop flag flips. Build errors are reported back through a channel
//! before the caller proceeds.

/// True when a playable output device is present.
///
/// Decides whether the low-latency streaming path can run; when false,
/// sessions downgrade to the chained-segment fallback.
#[cfg(feature = "cpal-audio")]
pub fn live_output_available() -> bool {
    real::with_suppressed_stderr(|| cpal::default_host().default_output_device().is_some())
}

#[cfg(not(feature = "cpal-audio"))]
pub fn live_output_available() -> bool {
    false
}

#[cfg(feature = "cpal-audio")]
use cpal::traits::HostTrait;

#[cfg(feature = "cpal-audio")]
pub use real::{CpalSegmentOutput, OutputHandle, spawn_output_stream, suppress_audio_warnings};

#[cfg(feature = "cpal-audio")]
mod real {
    use crate::error::{Result, TtscastError};
    use crate::playback::chained::{AudioClip, Segment, SegmentOutput};
    use async_trait::async_trait;
    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, mpsc};
    use std::thread;
    use std::time::Duration;

    /// Run a closure with stderr temporarily redirected to /dev/null.
    ///
    /// This suppresses noisy ALSA/JACK/PipeWire messages that CPAL triggers
    /// when probing audio backends. The messages are harmless but confusing
    /// to users.
    ///
    /// # Safety
    /// Uses `libc::dup`/`libc::dup2` to save and restore file descriptor 2
    /// (stderr). Safe as long as no other thread is concurrently
    /// manipulating fd 2.
    pub(super) fn with_suppressed_stderr<F, R>(f: F) -> R
    where
        F: FnOnce() -> R,
    {
        unsafe {
            let saved_fd = libc::dup(2);
            let devnull = libc::open(c"/dev/null".as_ptr(), libc::O_WRONLY);
            if saved_fd >= 0 && devnull >= 0 {
                libc::dup2(devnull, 2);
                libc::close(devnull);
            }

            let result = f();

            if saved_fd >= 0 {
                libc::dup2(saved_fd, 2);
                libc::close(saved_fd);
            }

            result
        }
    }

    /// Suppress noisy JACK/ALSA error messages that occur during audio
    /// backend probing.
    ///
    /// # Safety
    /// This modifies environment variables which is safe when called before
    /// spawning threads.
    pub fn suppress_audio_warnings() {
        // SAFETY: Called at startup before any threads are spawned
        unsafe {
            std::env::set_var("JACK_NO_START_SERVER", "1");
            std::env::set_var("JACK_NO_AUDIO_RESERVATION", "1");
            std::env::set_var("PIPEWIRE_DEBUG", "0");
            std::env::set_var("ALSA_DEBUG", "0");
            std::env::set_var("PW_LOG", "0");
        }
    }

    /// Handle to a running output stream thread.
    pub struct OutputHandle {
        running: Arc<AtomicBool>,
        join: Option<thread::JoinHandle<()>>,
    }

    impl OutputHandle {
        /// Stop the stream and wait for its thread to exit.
        pub fn stop(mut self) {
            self.running.store(false, Ordering::SeqCst);
            if let Some(join) = self.join.take() {
                let _ = join.join();
            }
        }
    }

    impl Drop for OutputHandle {
        fn drop(&mut self) {
            self.running.store(false, Ordering::SeqCst);
        }
    }

    fn build_stream<F>(sample_rate: u32, channels: u16, mut pull: F) -> Result<cpal::Stream>
    where
        F: FnMut(&mut [f32]) + Send + 'static,
    {
        let host = cpal::default_host();
        let device =
            host.default_output_device()
                .ok_or_else(|| TtscastError::AudioOutput {
                    message: "No default audio output device available".to_string(),
                })?;

        let config = cpal::StreamConfig {
            channels,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _| pull(data),
                |err| eprintln!("Audio output error: {}", err),
                None,
            )
            .map_err(|e| TtscastError::AudioOutput {
                message: format!("Failed to build output stream: {}", e),
            })
    }

    /// Spawn a thread that owns an f32 output stream fed by `pull`.
    ///
    /// The callback must never block; it fills whatever the pull source
    /// provides and pads with silence. Returns once the stream is built
    /// and playing, or with the build error.
    pub fn spawn_output_stream<F>(sample_rate: u32, channels: u16, pull: F) -> Result<OutputHandle>
    where
        F: FnMut(&mut [f32]) + Send + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let thread_running = Arc::clone(&running);
        let (ready_tx, ready_rx) = mpsc::channel::<Result<()>>();

        let join = thread::spawn(move || {
            let stream = with_suppressed_stderr(|| -> Result<cpal::Stream> {
                let stream = build_stream(sample_rate, channels, pull)?;
                stream.play().map_err(|e| TtscastError::AudioOutput {
                    message: format!("Failed to start output stream: {}", e),
                })?;
                Ok(stream)
            });

            match stream {
                Ok(stream) => {
                    let _ = ready_tx.send(Ok(()));
                    while thread_running.load(Ordering::SeqCst) {
                        thread::sleep(Duration::from_millis(50));
                    }
                    drop(stream);
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                }
            }
        });

        ready_rx
            .recv()
            .map_err(|_| TtscastError::AudioOutput {
                message: "Output stream thread exited before reporting readiness".to_string(),
            })??;

        Ok(OutputHandle {
            running,
            join: Some(join),
        })
    }

    /// Shared state between a prepared segment and its stream callback.
    struct SegmentState {
        samples: Vec<f32>,
        pos: AtomicUsize,
        started: AtomicBool,
        volume: f32,
    }

    /// One clip playing on the audio device, gated until started.
    ///
    /// The stream runs from `prepare` on but emits silence until `start`
    /// flips the gate, which makes starting effectively instantaneous when
    /// the previous segment ends.
    pub struct CpalSegment {
        duration: f64,
        state: Arc<SegmentState>,
        ended_rx: tokio::sync::watch::Receiver<bool>,
        output: std::sync::Mutex<Option<OutputHandle>>,
    }

    #[async_trait]
    impl Segment for CpalSegment {
        fn duration_secs(&self) -> f64 {
            self.duration
        }

        fn start(&self) {
            self.state.started.store(true, Ordering::SeqCst);
        }

        fn has_ended(&self) -> bool {
            *self.ended_rx.borrow()
        }

        async fn ended(&self) {
            let mut rx = self.ended_rx.clone();
            let _ = rx.wait_for(|ended| *ended).await;
            if let Ok(mut output) = self.output.lock()
                && let Some(handle) = output.take()
            {
                handle.stop();
            }
        }
    }

    impl Drop for CpalSegment {
        fn drop(&mut self) {
            if let Ok(mut output) = self.output.lock()
                && let Some(handle) = output.take()
            {
                handle.stop();
            }
        }
    }

    /// Segment factory backed by the default audio output device.
    #[derive(Default)]
    pub struct CpalSegmentOutput;

    impl CpalSegmentOutput {
        pub fn new() -> Self {
            Self
        }
    }

    #[async_trait]
    impl SegmentOutput for CpalSegmentOutput {
        async fn prepare(
            &self,
            clip: AudioClip,
            start_at_secs: f64,
            volume: f32,
        ) -> Result<Arc<dyn Segment>> {
            let format = clip.format;
            let duration = clip.duration_secs();

            // Seek by frame so multi-channel clips stay aligned
            let frame = usize::from(format.channels.max(1));
            let start_frame = (start_at_secs * f64::from(format.sample_rate)).round() as usize;
            let start_index = (start_frame * frame).min(clip.samples.len());

            let state = Arc::new(SegmentState {
                samples: clip.samples,
                pos: AtomicUsize::new(start_index),
                started: AtomicBool::new(false),
                volume,
            });
            let (ended_tx, ended_rx) = tokio::sync::watch::channel(false);

            let cb_state = Arc::clone(&state);
            let output = spawn_output_stream(format.sample_rate, format.channels, move |data| {
                if !cb_state.started.load(Ordering::SeqCst) {
                    data.fill(0.0);
                    return;
                }

                let pos = cb_state.pos.load(Ordering::SeqCst);
                let available = cb_state.samples.len().saturating_sub(pos);
                let n = available.min(data.len());
                for (slot, &sample) in data[..n].iter_mut().zip(&cb_state.samples[pos..pos + n]) {
                    *slot = sample * cb_state.volume;
                }
                data[n..].fill(0.0);
                cb_state.pos.store(pos + n, Ordering::SeqCst);

                if pos + n >= cb_state.samples.len() {
                    let _ = ended_tx.send(true);
                }
            })?;

            Ok(Arc::new(CpalSegment {
                duration,
                state,
                ended_rx,
                output: std::sync::Mutex::new(Some(output)),
            }))
        }
    }
}
