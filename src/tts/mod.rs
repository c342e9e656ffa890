//! Text-to-speech via the loopback synthesis microservice.
//!
//! Synthesis runs in a separate process (the Piper service) so a crashing
//! or restarting voice model never takes the appliance down.  This module
//! holds the client side: [`TtsClient`] wraps an HTTP transport with the
//! retry, cooling and warm-up policy; [`TtsPort`] is the seam the session
//! controller talks to.

pub mod client;

use async_trait::async_trait;
use thiserror::Error;

pub use client::{HttpTransport, TransportError, TtsClient, TtsTransport};

// ---------------------------------------------------------------------------
// TtsRequest
// ---------------------------------------------------------------------------

/// One synthesis request.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct TtsRequest {
    /// Text to speak, already in the target language.
    pub text: String,
    /// Piper voice identifier (e.g. `"it_IT-paola-medium"`).
    pub voice: String,
}

// ---------------------------------------------------------------------------
// TtsError
// ---------------------------------------------------------------------------

/// Errors from the synthesis stage, as seen by the session controller.
#[derive(Debug, Clone, Error)]
pub enum TtsError {
    /// Every attempt timed out; the service is up but too slow.
    #[error("speech synthesis timed out")]
    Timeout,

    /// The service cannot be reached.  Subsequent requests short-circuit
    /// until the cooling window elapses or a warm-up probe succeeds.
    #[error("speech service unavailable")]
    ServiceUnavailable,

    /// The service answered but refused or failed the request.  Not
    /// retried: the same text would fail again.
    #[error("speech synthesis failed: {0}")]
    Synthesis(String),
}

// ---------------------------------------------------------------------------
// TtsPort
// ---------------------------------------------------------------------------

/// Session-facing synthesis boundary.
#[async_trait]
pub trait TtsPort: Send + Sync {
    /// Synthesize `req` into WAV bytes.
    async fn synthesize(&self, req: &TtsRequest) -> Result<Vec<u8>, TtsError>;

    /// Probe the service health.  Implementations clear their failure state
    /// on success.  Default: no-op.
    async fn warm_up(&self) {}
}
