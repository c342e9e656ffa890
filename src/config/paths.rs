//! Application paths resolved with the `dirs` crate.
//!
//! Layout on the appliance (Linux):
//!
//!   ~/.config/speech-translator/settings.toml
//!   ~/.local/share/speech-translator/models/   (GGML ASR models)
//!   ~/.local/share/speech-translator/audio/    (synthesized WAV files)

use std::path::PathBuf;

/// Holds all resolved application directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory for `settings.toml`.
    pub config_dir: PathBuf,
    /// Full path to `settings.toml`.
    pub settings_file: PathBuf,
    /// Directory for downloaded GGML model files.
    pub models_dir: PathBuf,
    /// Directory where synthesized WAV files are written before playback.
    pub audio_out_dir: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "speech-translator";

    /// Resolves all paths using the `dirs` crate.
    ///
    /// Falls back to the current directory if the platform cannot provide a
    /// standard path (should be extremely rare in practice).
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let settings_file = config_dir.join("settings.toml");
        let models_dir = data_dir.join("models");
        let audio_out_dir = data_dir.join("audio");

        Self {
            config_dir,
            settings_file,
            models_dir,
            audio_out_dir,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}
