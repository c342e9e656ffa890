//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// InputConfig
// ---------------------------------------------------------------------------

/// Settings for the GPIO polling loop and press classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Poll tick interval in milliseconds.
    pub poll_interval_ms: u64,
    /// Number of consecutive identical raw readings required before a button
    /// state change is accepted (debounce window = ticks × interval).
    pub debounce_ticks: u32,
    /// Hold duration after which a `LongPress` fires, in milliseconds.
    ///
    /// A LongPress on the recording button aborts the session, so this must
    /// sit comfortably above the longest expected utterance.
    pub long_press_ms: u64,
    /// Quadrature quarter-steps per encoder detent.
    pub encoder_detent_steps: i16,
    /// Whether a pressed button reads as logic-high.
    pub active_high: bool,
    /// GPIO line for button A.
    pub btn_a_pin: u32,
    /// GPIO line for button B.
    pub btn_b_pin: u32,
    /// GPIO line for the encoder CLK output.
    pub enc_clk_pin: u32,
    /// GPIO line for the encoder DT output.
    pub enc_dt_pin: u32,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 10,
            debounce_ticks: 5,
            long_press_ms: 5_000,
            encoder_detent_steps: 4,
            active_high: true,
            btn_a_pin: 29,
            btn_b_pin: 31,
            enc_clk_pin: 32,
            enc_dt_pin: 33,
        }
    }
}

// ---------------------------------------------------------------------------
// AudioConfig
// ---------------------------------------------------------------------------

/// Settings for audio capture and playback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Target sample rate in Hz handed to the ASR engine (must be 16 000).
    pub sample_rate: u32,
    /// Minimum recording length in seconds; shorter recordings fail the
    /// session with `EmptyAudio` instead of invoking ASR.
    pub min_recording_secs: f32,
    /// Maximum recording length in seconds the capture buffer retains.
    pub max_recording_secs: f32,
    /// ALSA playback device passed to `aplay -D` — `None` means the default.
    pub playback_device: Option<String>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            min_recording_secs: 0.5,
            max_recording_secs: 60.0,
            playback_device: None,
        }
    }
}

// ---------------------------------------------------------------------------
// AsrConfig
// ---------------------------------------------------------------------------

/// Settings for the Whisper ASR engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AsrConfig {
    /// GGML model file stem (e.g. `"ggml-base"`).
    pub model: String,
    /// Maximum seconds a transcription may run before it fails with Timeout.
    pub timeout_secs: u64,
}

impl Default for AsrConfig {
    fn default() -> Self {
        Self {
            model: "ggml-base".into(),
            timeout_secs: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// MtConfig
// ---------------------------------------------------------------------------

/// Settings for the machine-translation client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MtConfig {
    /// Base URL of the local OpenAI-compatible endpoint serving the MT model.
    pub base_url: String,
    /// Model identifier sent to the API.
    pub model: String,
    /// API key — `None` for local providers.
    pub api_key: Option<String>,
    /// Sampling temperature; translation wants near-deterministic output.
    pub temperature: f32,
    /// Maximum seconds to wait for a translation before timing out.
    pub timeout_secs: u64,
}

impl Default for MtConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".into(),
            model: "qwen2.5:3b".into(),
            api_key: None,
            temperature: 0.2,
            timeout_secs: 10,
        }
    }
}

// ---------------------------------------------------------------------------
// TtsConfig
// ---------------------------------------------------------------------------

/// Settings for the TTS microservice client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsConfig {
    /// Base URL of the loopback TTS service.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Pause before the third attempt, in milliseconds.
    pub retry_backoff_ms: u64,
    /// Cooling window after the service is classified unavailable, in
    /// seconds.  Requests inside the window short-circuit without any
    /// network attempt.
    pub cooldown_secs: u64,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5005".into(),
            timeout_secs: 5,
            retry_backoff_ms: 300,
            cooldown_secs: 10,
        }
    }
}

// ---------------------------------------------------------------------------
// DisplayConfig
// ---------------------------------------------------------------------------

/// Settings for the character display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Characters per display line.
    pub cols: usize,
    /// How often the second line advances when the text overflows, in
    /// milliseconds.
    pub scroll_interval_ms: u64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            cols: 16,
            scroll_interval_ms: 2_000,
        }
    }
}

// ---------------------------------------------------------------------------
// LangSpec / LangConfig
// ---------------------------------------------------------------------------

/// One side of the translation pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LangSpec {
    /// Human-readable name shown on the display.
    pub name: String,
    /// NLLB-style language code used by the MT model (e.g. `"eng_Latn"`).
    pub code: String,
    /// ISO-639-1 code passed to Whisper (e.g. `"en"`).
    pub whisper: String,
    /// Piper voice identifier used when this language is the target.
    pub voice: String,
}

/// The two fixed languages of the appliance.  Button A speaks `a`, button B
/// speaks `b`; the encoder flips which direction is active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LangConfig {
    pub a: LangSpec,
    pub b: LangSpec,
}

impl Default for LangConfig {
    fn default() -> Self {
        Self {
            a: LangSpec {
                name: "English".into(),
                code: "eng_Latn".into(),
                whisper: "en".into(),
                voice: "en_GB-cori-high".into(),
            },
            b: LangSpec {
                name: "Italian".into(),
                code: "ita_Latn".into(),
                whisper: "it".into(),
                voice: "it_IT-paola-medium".into(),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use speech_translator::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// GPIO polling / debounce / press classification.
    pub input: InputConfig,
    /// Audio capture and playback.
    pub audio: AudioConfig,
    /// Whisper ASR engine.
    pub asr: AsrConfig,
    /// Machine-translation client.
    pub mt: MtConfig,
    /// TTS microservice client.
    pub tts: TtsConfig,
    /// Character display geometry and scrolling.
    pub display: DisplayConfig,
    /// The fixed translation pair.
    pub lang: LangConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// (first-run scenario) so callers never need to special-case a missing
    /// file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Minimum recording length in samples at the configured sample rate.
    pub fn min_recording_samples(&self) -> usize {
        (self.audio.min_recording_secs * self.audio.sample_rate as f32) as usize
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
