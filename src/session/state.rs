//! Session lifecycle state and failure classification.

use std::time::Instant;

use thiserror::Error;

use crate::asr::AsrError;
use crate::input::Button;
use crate::lang::Direction;
use crate::mt::MtError;
use crate::tts::TtsError;

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Where one translation session currently is.
///
/// Transitions are strictly forward except the terminal return to `Idle`;
/// a cancel or failure from any non-idle state also returns to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Recording,
    Transcribing,
    Translating,
    Synthesizing,
    Playing,
    Failed(FailKind),
}

impl SessionState {
    /// Short label for logging and the display's first line.
    pub fn label(self) -> &'static str {
        match self {
            SessionState::Idle => "Ready",
            SessionState::Recording => "Listening...",
            SessionState::Transcribing => "Transcribing...",
            SessionState::Translating => "Translating...",
            SessionState::Synthesizing => "Speaking...",
            SessionState::Playing => "Speaking...",
            SessionState::Failed(kind) => kind.label(),
        }
    }
}

// ---------------------------------------------------------------------------
// FailReason / FailKind
// ---------------------------------------------------------------------------

/// Why a session failed.  Carries the underlying stage error for logging;
/// [`kind`](Self::kind) flattens it for display and tests.
#[derive(Debug, Error)]
pub enum FailReason {
    /// Recording was too short or the transcript came back empty.
    #[error("nothing to translate")]
    EmptyAudio,

    #[error("transcription failed: {0}")]
    Asr(#[from] AsrError),

    #[error("translation failed: {0}")]
    Mt(#[from] MtError),

    #[error("speech synthesis failed: {0}")]
    Tts(#[from] TtsError),
}

impl FailReason {
    pub fn kind(&self) -> FailKind {
        match self {
            FailReason::EmptyAudio => FailKind::EmptyAudio,
            FailReason::Asr(AsrError::Timeout) => FailKind::AsrTimeout,
            FailReason::Asr(_) => FailKind::Asr,
            FailReason::Mt(MtError::Timeout) => FailKind::MtTimeout,
            FailReason::Mt(_) => FailKind::Mt,
            FailReason::Tts(TtsError::Timeout) => FailKind::TtsTimeout,
            FailReason::Tts(TtsError::ServiceUnavailable) => FailKind::TtsUnavailable,
            FailReason::Tts(_) => FailKind::TtsSynthesis,
        }
    }
}

/// Flat failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailKind {
    EmptyAudio,
    AsrTimeout,
    Asr,
    MtTimeout,
    Mt,
    TtsTimeout,
    TtsUnavailable,
    TtsSynthesis,
}

impl FailKind {
    /// Display label, fits a 16-column line.
    pub fn label(self) -> &'static str {
        match self {
            FailKind::EmptyAudio => "Say again?",
            FailKind::AsrTimeout | FailKind::MtTimeout | FailKind::TtsTimeout => "Timed out",
            FailKind::Asr => "ASR error",
            FailKind::Mt => "MT error",
            FailKind::TtsUnavailable => "Voice offline",
            FailKind::TtsSynthesis => "Voice error",
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One push-to-talk session, created when recording starts.
#[derive(Debug, Clone)]
pub struct Session {
    /// Monotonically increasing id; stale results are detected by comparing
    /// against the gate's current id.
    pub id: u64,
    /// Direction captured at session start; encoder flips later do not
    /// affect a session already in flight.
    pub direction: Direction,
    /// Which button started the session and therefore owns it.
    pub button: Button,
    pub started_at: Instant,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
