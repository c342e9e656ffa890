//! TTS client: HTTP transport plus the retry / cooling / warm-up policy.
//!
//! Policy, in order:
//!
//! 1. Inside a cooling window every request short-circuits to
//!    [`TtsError::ServiceUnavailable`] without touching the network.
//! 2. A request gets up to three attempts.  The second attempt follows the
//!    first failure immediately; the third waits `retry_backoff_ms`.
//! 3. An HTTP status error is terminal on the first attempt: the service is
//!    alive and deterministic, retrying the same text is pointless.
//! 4. Exhausted timeouts classify as [`TtsError::Timeout`] and do not start
//!    cooling (the service is up, just slow).  Exhausted connect failures
//!    classify as [`TtsError::ServiceUnavailable`] and start the cooling
//!    window.
//! 5. A successful health probe ([`TtsClient::warm_up`]) clears the cooling
//!    window early.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use thiserror::Error;

use crate::config::TtsConfig;

use super::{TtsError, TtsPort, TtsRequest};

// ---------------------------------------------------------------------------
// TransportError / TtsTransport
// ---------------------------------------------------------------------------

/// Low-level outcome of one network attempt.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("service returned {status}: {detail}")]
    Status { status: u16, detail: String },
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else {
            TransportError::Connect(e.to_string())
        }
    }
}

/// One wire attempt, no policy.  Split from [`TtsClient`] so the retry and
/// cooling logic is testable against a scripted transport.
#[async_trait]
pub trait TtsTransport: Send + Sync {
    async fn synthesize(&self, req: &TtsRequest) -> Result<Vec<u8>, TransportError>;
    async fn health(&self) -> Result<(), TransportError>;
}

// ---------------------------------------------------------------------------
// HttpTransport
// ---------------------------------------------------------------------------

/// Production transport speaking the Piper service's HTTP API:
/// `POST /synthesize` with `{"text", "voice"}` returning WAV bytes, and
/// `GET /health`.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn from_config(config: &TtsConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: config.base_url.clone(),
        }
    }
}

#[async_trait]
impl TtsTransport for HttpTransport {
    async fn synthesize(&self, req: &TtsRequest) -> Result<Vec<u8>, TransportError> {
        let url = format!("{}/synthesize", self.base_url);
        let response = self.client.post(&url).json(req).send().await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                detail,
            });
        }

        Ok(response.bytes().await?.to_vec())
    }

    async fn health(&self) -> Result<(), TransportError> {
        let url = format!("{}/health", self.base_url);
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                detail: String::new(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TtsClient
// ---------------------------------------------------------------------------

const MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Default)]
struct ClientState {
    cooling_until: Option<Instant>,
    /// Whether the last health probe succeeded.
    warm: bool,
}

/// Policy wrapper around a [`TtsTransport`].
pub struct TtsClient {
    transport: Box<dyn TtsTransport>,
    backoff: Duration,
    cooldown: Duration,
    state: Mutex<ClientState>,
}

impl TtsClient {
    pub fn from_config(config: &TtsConfig) -> Self {
        Self::with_transport(Box::new(HttpTransport::from_config(config)), config)
    }

    pub fn with_transport(transport: Box<dyn TtsTransport>, config: &TtsConfig) -> Self {
        Self {
            transport,
            backoff: Duration::from_millis(config.retry_backoff_ms),
            cooldown: Duration::from_secs(config.cooldown_secs),
            state: Mutex::new(ClientState::default()),
        }
    }

    fn cooling_active(&self) -> bool {
        let state = self.state.lock().unwrap();
        matches!(state.cooling_until, Some(until) if Instant::now() < until)
    }

    fn start_cooling(&self) {
        let mut state = self.state.lock().unwrap();
        state.cooling_until = Some(Instant::now() + self.cooldown);
        state.warm = false;
    }

    fn clear_cooling(&self) {
        let mut state = self.state.lock().unwrap();
        state.cooling_until = None;
        state.warm = true;
    }

    /// Whether the last health probe succeeded.
    pub fn is_warm(&self) -> bool {
        self.state.lock().unwrap().warm
    }
}

#[async_trait]
impl TtsPort for TtsClient {
    async fn synthesize(&self, req: &TtsRequest) -> Result<Vec<u8>, TtsError> {
        if self.cooling_active() {
            log::debug!("tts: cooling, request short-circuited");
            return Err(TtsError::ServiceUnavailable);
        }

        let mut saw_connect_failure = false;
        let mut last_error = TransportError::Timeout;

        for attempt in 1..=MAX_ATTEMPTS {
            match self.transport.synthesize(req).await {
                Ok(wav) => {
                    self.clear_cooling();
                    return Ok(wav);
                }
                Err(TransportError::Status { status, detail }) => {
                    log::warn!("tts: service rejected request ({status}): {detail}");
                    return Err(TtsError::Synthesis(format!("HTTP {status}: {detail}")));
                }
                Err(e) => {
                    log::warn!("tts: attempt {attempt}/{MAX_ATTEMPTS} failed: {e}");
                    if matches!(e, TransportError::Connect(_)) {
                        saw_connect_failure = true;
                    }
                    last_error = e;
                }
            }

            // Immediate second attempt, backoff before the third.
            if attempt == MAX_ATTEMPTS - 1 {
                tokio::time::sleep(self.backoff).await;
            }
        }

        if saw_connect_failure {
            log::error!("tts: service unreachable, cooling for {:?}", self.cooldown);
            self.start_cooling();
            Err(TtsError::ServiceUnavailable)
        } else {
            debug_assert!(matches!(last_error, TransportError::Timeout));
            Err(TtsError::Timeout)
        }
    }

    /// Probe `GET /health`.  Success clears any cooling window so the next
    /// session does not have to wait it out.
    async fn warm_up(&self) {
        match self.transport.health().await {
            Ok(()) => {
                log::info!("tts: service healthy");
                self.clear_cooling();
            }
            Err(e) => {
                log::warn!("tts: health probe failed: {e}");
                self.state.lock().unwrap().warm = false;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
