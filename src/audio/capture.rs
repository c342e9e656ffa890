//! Microphone capture via `cpal`.
//!
//! [`CpalCapture`] wraps the cpal host/device/stream lifecycle.  The stream
//! is opened once at startup and runs for the life of the process; a feeder
//! thread downmixes and resamples each hardware buffer and offers it to the
//! shared [`Recorder`], which only accepts samples while a session is
//! recording.  The [`StreamHandle`] is a RAII guard — dropping it stops the
//! underlying cpal stream, so `CpalCapture` must live on the main thread
//! (cpal streams are not `Send` on all platforms).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use thiserror::Error;

use crate::config::AudioConfig;

use super::{downmix_resample, CaptureBuffer};

// ---------------------------------------------------------------------------
// CaptureError
// ---------------------------------------------------------------------------

/// Errors that can occur while setting up or running audio capture.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no input device found on the default audio host")]
    NoDevice,

    #[error("failed to query default input config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to build input stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
}

// ---------------------------------------------------------------------------
// CapturePort
// ---------------------------------------------------------------------------

/// Session-facing capture boundary: arm the recorder, then take the audio.
pub trait CapturePort: Send + Sync {
    /// Begin accepting samples into a fresh buffer.
    fn start(&self);

    /// Stop accepting samples and return everything captured since
    /// [`start`](Self::start), mono f32 at the pipeline rate.
    fn stop(&self) -> Vec<f32>;
}

// ---------------------------------------------------------------------------
// AudioChunk
// ---------------------------------------------------------------------------

/// A single buffer of raw audio as delivered by the cpal callback.
/// Samples are interleaved `f32` in the range `[-1.0, 1.0]`.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

// ---------------------------------------------------------------------------
// Recorder
// ---------------------------------------------------------------------------

/// Shared, thread-safe recording gate and buffer.
///
/// The feeder thread calls [`feed`](Self::feed) continuously; samples are
/// kept only between [`start`](CapturePort::start) and
/// [`stop`](CapturePort::stop).
#[derive(Clone)]
pub struct Recorder {
    inner: Arc<RecorderInner>,
}

struct RecorderInner {
    buffer: Mutex<CaptureBuffer>,
    recording: AtomicBool,
}

impl Recorder {
    pub fn new(config: &AudioConfig) -> Self {
        let capacity = (config.max_recording_secs * config.sample_rate as f32) as usize;
        Self {
            inner: Arc::new(RecorderInner {
                buffer: Mutex::new(CaptureBuffer::new(capacity)),
                recording: AtomicBool::new(false),
            }),
        }
    }

    /// Offer pipeline-rate mono samples; dropped unless recording.
    pub fn feed(&self, samples: &[f32]) {
        if !self.inner.recording.load(Ordering::Acquire) {
            return;
        }
        if let Ok(mut buf) = self.inner.buffer.lock() {
            buf.push_slice(samples);
        }
    }

    pub fn is_recording(&self) -> bool {
        self.inner.recording.load(Ordering::Acquire)
    }
}

impl CapturePort for Recorder {
    fn start(&self) {
        if let Ok(mut buf) = self.inner.buffer.lock() {
            buf.clear();
        }
        self.inner.recording.store(true, Ordering::Release);
    }

    fn stop(&self) -> Vec<f32> {
        self.inner.recording.store(false, Ordering::Release);
        match self.inner.buffer.lock() {
            Ok(mut buf) => buf.drain(),
            Err(_) => Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// StreamHandle / CpalCapture
// ---------------------------------------------------------------------------

/// RAII guard that keeps the cpal stream alive.
pub struct StreamHandle {
    _stream: cpal::Stream,
}

/// Always-on microphone stream feeding a [`Recorder`].
pub struct CpalCapture {
    _handle: StreamHandle,
}

impl CpalCapture {
    /// Open the default input device and start streaming into `recorder`.
    ///
    /// # Errors
    ///
    /// [`CaptureError::NoDevice`] when no input device is available — fatal
    /// at startup, this appliance is useless without a microphone.
    pub fn open(config: &AudioConfig, recorder: Recorder) -> Result<Self, CaptureError> {
        let host = cpal::default_host();
        let device = host.default_input_device().ok_or(CaptureError::NoDevice)?;

        let supported = device.default_input_config()?;
        let channels = supported.channels();
        let native_rate = supported.sample_rate().0;
        let stream_config: cpal::StreamConfig = supported.into();

        log::info!(
            "audio: input device {:?} at {native_rate} Hz, {channels} ch",
            device.name().unwrap_or_else(|_| "<unknown>".into())
        );

        let (tx, rx) = mpsc::channel::<AudioChunk>();
        let target_rate = config.sample_rate;

        // Feeder thread: convert each chunk off the realtime callback.
        thread::Builder::new()
            .name("audio-feeder".into())
            .spawn(move || {
                while let Ok(chunk) = rx.recv() {
                    if !recorder.is_recording() {
                        continue;
                    }
                    let mono = downmix_resample(
                        &chunk.samples,
                        chunk.channels,
                        chunk.sample_rate,
                        target_rate,
                    );
                    recorder.feed(&mono);
                }
                log::debug!("audio: feeder thread exiting");
            })
            .expect("failed to spawn audio feeder thread");

        let stream = device.build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let chunk = AudioChunk {
                    samples: data.to_vec(),
                    sample_rate: native_rate,
                    channels,
                };
                // Ignore send errors; the receiver may have been dropped.
                let _ = tx.send(chunk);
            },
            |err: cpal::StreamError| {
                log::error!("audio: cpal stream error: {err}");
            },
            None, // no timeout
        )?;

        stream.play()?;

        Ok(Self {
            _handle: StreamHandle { _stream: stream },
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
