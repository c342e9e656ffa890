//! Configuration module for the speech translator.
//!
//! Provides `AppConfig` (top-level settings), sub-configs for each subsystem,
//! `AppPaths` for data directories, and TOML persistence via
//! `AppConfig::load` / `AppConfig::save`.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{
    AppConfig, AsrConfig, AudioConfig, DisplayConfig, InputConfig, LangConfig, LangSpec, MtConfig,
    TtsConfig,
};
