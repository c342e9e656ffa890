//! Machine translation via an OpenAI-compatible chat endpoint.
//!
//! `ApiTranslator` calls any OpenAI-compatible `/v1/chat/completions`
//! endpoint — Ollama (OpenAI mode), LM Studio, vLLM, llama.cpp server.
//! All connection details come from [`MtConfig`]; nothing is hardcoded.

use async_trait::async_trait;
use thiserror::Error;

use crate::config::MtConfig;

// ---------------------------------------------------------------------------
// MtError
// ---------------------------------------------------------------------------

/// Errors from the translation stage.
#[derive(Debug, Error)]
pub enum MtError {
    /// The request did not complete within the configured timeout.
    #[error("translation request timed out")]
    Timeout,

    /// HTTP transport or connection error.
    #[error("translation request failed: {0}")]
    Request(String),

    /// The response could not be parsed, or carried no usable text.
    #[error("unusable translation response: {0}")]
    Model(String),
}

impl From<reqwest::Error> for MtError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            MtError::Timeout
        } else {
            MtError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// MtPort
// ---------------------------------------------------------------------------

/// Async translation boundary.  `Send + Sync` so it can sit behind an
/// `Arc<dyn MtPort>` shared with the session controller.
///
/// `src` and `tgt` are the human-readable language names; the model gets
/// them verbatim in the prompt.
#[async_trait]
pub trait MtPort: Send + Sync {
    async fn translate(&self, text: &str, src: &str, tgt: &str) -> Result<String, MtError>;
}

// ---------------------------------------------------------------------------
// ApiTranslator
// ---------------------------------------------------------------------------

/// Calls an OpenAI-compatible `/v1/chat/completions` endpoint with a
/// translation prompt.
pub struct ApiTranslator {
    client: reqwest::Client,
    config: MtConfig,
}

impl ApiTranslator {
    /// Build a translator from application config.
    ///
    /// The HTTP client carries the per-request timeout from
    /// `config.timeout_secs`.  A default (no-timeout) client is the
    /// last-resort fallback if the builder fails.
    pub fn from_config(config: &MtConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
        }
    }

    fn system_prompt(src: &str, tgt: &str) -> String {
        format!(
            "You are a translation engine. Translate the user's text from \
             {src} to {tgt}. Reply with the translation only, no quotes, \
             no explanations."
        )
    }
}

#[async_trait]
impl MtPort for ApiTranslator {
    /// Translate `text` through the configured endpoint.
    ///
    /// The `Authorization: Bearer …` header is attached only when
    /// `config.api_key` is a non-empty string — local providers need none.
    async fn translate(&self, text: &str, src: &str, tgt: &str) -> Result<String, MtError> {
        let url = format!("{}/v1/chat/completions", self.config.base_url);

        let body = serde_json::json!({
            "model":       self.config.model,
            "messages": [
                { "role": "system", "content": Self::system_prompt(src, tgt) },
                { "role": "user",   "content": text }
            ],
            "stream":      false,
            "temperature": self.config.temperature,
            "max_tokens":  256
        });

        let mut req = self.client.post(&url).json(&body);

        let key = self.config.api_key.as_deref().unwrap_or("");
        if !key.is_empty() {
            req = req.bearer_auth(key);
        }

        let response = req.send().await?;

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| MtError::Model(e.to_string()))?;

        let translated = json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| MtError::Model("no text in response".into()))?
            .trim()
            .to_string();

        if translated.is_empty() {
            return Err(MtError::Model("empty translation".into()));
        }

        Ok(translated)
    }
}

// ---------------------------------------------------------------------------
// MockMt  (test-only)
// ---------------------------------------------------------------------------

/// Test double with a scripted response and a call log.
#[cfg(test)]
pub struct MockMt {
    response: Result<String, &'static str>,
    calls: std::sync::Mutex<Vec<(String, String, String)>>,
}

#[cfg(test)]
impl MockMt {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            response: Ok(text.into()),
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn timeout() -> Self {
        Self {
            response: Err("timeout"),
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// `(text, src, tgt)` triples in call order.
    pub fn calls(&self) -> Vec<(String, String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl MtPort for MockMt {
    async fn translate(&self, text: &str, src: &str, tgt: &str) -> Result<String, MtError> {
        self.calls
            .lock()
            .unwrap()
            .push((text.into(), src.into(), tgt.into()));
        match &self.response {
            Ok(t) => Ok(t.clone()),
            Err(_) => Err(MtError::Timeout),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
