//! Binary entry point for the speech translator appliance.

use anyhow::Context;

use speech_translator::app;
use speech_translator::config::AppConfig;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("speech-translator starting up");

    // A missing settings file means first run and loads defaults; a file
    // that exists but does not parse is fatal.  Silently running with
    // default pins and URLs over a mis-edited config helps nobody.
    let config = AppConfig::load().context("failed to load settings.toml")?;

    app::run(config)
}
