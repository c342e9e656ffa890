//! Speech recognition via `whisper-rs`.
//!
//! [`AsrPort`] is the pipeline-facing interface.  It is object-safe and
//! `Send + Sync` so it can be held behind an `Arc<dyn AsrPort>` and moved
//! into `spawn_blocking` (Whisper inference pegs a core for seconds; it
//! must never run on the async runtime).
//!
//! [`WhisperAsr`] is the production implementation.  [`MockAsr`] (under
//! `#[cfg(test)]`) scripts responses for controller tests.

use std::path::Path;

use thiserror::Error;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

// ---------------------------------------------------------------------------
// AsrError
// ---------------------------------------------------------------------------

/// Errors from the speech-recognition stage.
#[derive(Debug, Clone, Error)]
pub enum AsrError {
    /// Inference exceeded the configured deadline.  Raised by the session
    /// controller, not by the engine itself.
    #[error("transcription timed out")]
    Timeout,

    /// The GGML model file was not found at the given path.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// whisper-rs failed to initialise or run inference.
    #[error("whisper error: {0}")]
    Model(String),
}

// ---------------------------------------------------------------------------
// AsrPort
// ---------------------------------------------------------------------------

/// Object-safe, thread-safe speech-to-text boundary.
///
/// # Contract
///
/// `audio` is 16 kHz mono f32 PCM; `lang` is an ISO-639-1 code (`"en"`).
/// The returned transcript is trimmed; it may be empty when nothing was
/// recognised.
pub trait AsrPort: Send + Sync {
    fn transcribe(&self, audio: &[f32], lang: &str) -> Result<String, AsrError>;
}

const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn AsrPort>) {}
};

// ---------------------------------------------------------------------------
// WhisperAsr
// ---------------------------------------------------------------------------

/// Production engine wrapping a `whisper_rs::WhisperContext`.
///
/// A fresh `WhisperState` is created per call so the engine can be shared
/// across threads without locking.
pub struct WhisperAsr {
    ctx: WhisperContext,
    n_threads: i32,
}

impl std::fmt::Debug for WhisperAsr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhisperAsr")
            .field("n_threads", &self.n_threads)
            .finish_non_exhaustive()
    }
}

// `WhisperContext` holds a raw pointer internally but declares
// `unsafe impl Send`/`Sync` in whisper-rs — the model weights are read-only
// after loading.
// SAFETY: WhisperContext is Send+Sync as declared by whisper-rs.
unsafe impl Send for WhisperAsr {}
unsafe impl Sync for WhisperAsr {}

impl WhisperAsr {
    /// Load a GGML model from `model_path`.
    ///
    /// # Errors
    ///
    /// - [`AsrError::ModelNotFound`] — `model_path` does not exist.
    /// - [`AsrError::Model`] — whisper-rs failed to load the file.
    pub fn load(model_path: impl AsRef<Path>) -> Result<Self, AsrError> {
        let path = model_path.as_ref();

        if !path.exists() {
            return Err(AsrError::ModelNotFound(path.display().to_string()));
        }

        let path_str = path.to_str().ok_or_else(|| {
            AsrError::ModelNotFound(format!(
                "model path contains non-UTF-8 characters: {}",
                path.display()
            ))
        })?;

        let ctx = WhisperContext::new_with_params(path_str, WhisperContextParameters::default())
            .map_err(|e| AsrError::Model(e.to_string()))?;

        Ok(Self {
            ctx,
            n_threads: optimal_threads(),
        })
    }
}

/// Use the physical cores, capped; Whisper gains nothing past 8 threads on
/// this class of hardware.
fn optimal_threads() -> i32 {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4);
    (cores as i32).clamp(1, 8)
}

impl AsrPort for WhisperAsr {
    fn transcribe(&self, audio: &[f32], lang: &str) -> Result<String, AsrError> {
        let mut fp = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        fp.set_language(Some(lang));
        fp.set_n_threads(self.n_threads);
        fp.set_print_progress(false);
        fp.set_print_realtime(false);

        let mut state = self
            .ctx
            .create_state()
            .map_err(|e| AsrError::Model(e.to_string()))?;

        state
            .full(fp, audio)
            .map_err(|e| AsrError::Model(e.to_string()))?;

        let n_segments = state
            .full_n_segments()
            .map_err(|e| AsrError::Model(e.to_string()))?;

        let mut text = String::new();
        for i in 0..n_segments {
            let seg = state
                .full_get_segment_text(i)
                .map_err(|e| AsrError::Model(format!("segment {i}: {e}")))?;
            text.push_str(&seg);
        }

        Ok(text.trim().to_string())
    }
}

// ---------------------------------------------------------------------------
// MockAsr  (test-only)
// ---------------------------------------------------------------------------

/// Test double with a scripted response, a call counter and an optional
/// artificial delay for timeout tests.
#[cfg(test)]
pub struct MockAsr {
    response: Result<String, AsrError>,
    delay: Option<std::time::Duration>,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockAsr {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            response: Ok(text.into()),
            delay: None,
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn err(error: AsrError) -> Self {
        Self {
            response: Err(error),
            delay: None,
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Sleep this long inside `transcribe` before answering.
    pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
impl AsrPort for MockAsr {
    fn transcribe(&self, _audio: &[f32], _lang: &str) -> Result<String, AsrError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        self.response.clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
