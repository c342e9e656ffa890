//! Serialized output: the character display and WAV playback.
//!
//! Every user-visible effect of a session funnels through [`OutputSink`],
//! owned exclusively by the session controller.  That single ownership is
//! what serializes output: no interleaved half-updates, and the ordering
//! rule for results (text on the display first, then audio) lives in
//! exactly one place, [`OutputSink::present`].

pub mod display;
pub mod playback;

use std::io;
use std::sync::Arc;

use thiserror::Error;

use crate::config::DisplayConfig;
use crate::session::FailKind;

pub use display::{ConsoleDisplay, ScrollState};
pub use playback::AplayPlayback;

// ---------------------------------------------------------------------------
// DisplayPort / PlaybackPort
// ---------------------------------------------------------------------------

/// A two-line character display.  Writes are fire-and-forget; a display
/// that cannot render is a logging problem, not a session failure.
pub trait DisplayPort: Send + Sync {
    fn write(&self, line1: &str, line2: &str);
}

/// Errors from audio playback.
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("playback I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("playback device error: {0}")]
    Device(String),
}

/// Blocking WAV player.  Called through `spawn_blocking`; returns when the
/// audio has finished.
pub trait PlaybackPort: Send + Sync {
    fn play(&self, wav: &[u8]) -> Result<(), PlaybackError>;
}

// ---------------------------------------------------------------------------
// OutputSink
// ---------------------------------------------------------------------------

/// The controller's single handle on everything the user sees and hears.
pub struct OutputSink {
    display: Box<dyn DisplayPort>,
    playback: Arc<dyn PlaybackPort>,
    cols: usize,
    line1: String,
    line2: ScrollState,
}

impl OutputSink {
    pub fn new(
        display: Box<dyn DisplayPort>,
        playback: Arc<dyn PlaybackPort>,
        config: &DisplayConfig,
    ) -> Self {
        Self {
            display,
            playback,
            cols: config.cols,
            line1: String::new(),
            line2: ScrollState::new("", config.cols),
        }
    }

    fn set(&mut self, line1: &str, line2: &str) {
        self.line1 = line1.to_string();
        self.line2 = ScrollState::new(line2, self.cols);
        self.render();
    }

    fn render(&self) {
        self.display.write(&self.line1, &self.line2.window(self.cols));
    }

    /// Idle screen: `Ready` plus the active language pair.
    pub fn show_ready(&mut self, banner: &str) {
        self.set("Ready", banner);
    }

    /// Recording screen: which way the session will translate.
    pub fn show_recording(&mut self, header: &str) {
        self.set("Listening...", header);
    }

    /// Progress screen for one pipeline stage, second line untouched.
    pub fn show_stage(&mut self, label: &str) {
        self.line1 = label.to_string();
        self.render();
    }

    /// Show a finished translation, then speak it.
    ///
    /// The display update comes strictly first so the user reads the text
    /// while (and even if) the audio plays.  Playback failures are
    /// non-fatal: the translation already reached the user visually.
    pub async fn present(&mut self, header: &str, text: &str, wav: Vec<u8>) {
        self.set(header, text);

        let playback = self.playback.clone();
        let result = tokio::task::spawn_blocking(move || playback.play(&wav)).await;
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => log::warn!("output: playback failed: {e}"),
            Err(e) => log::warn!("output: playback task panicked: {e}"),
        }
    }

    /// Failure screen.
    pub fn show_error(&mut self, kind: FailKind) {
        self.set("Error", kind.label());
    }

    /// Advance the second-line marquee one character.  Called on the
    /// controller's scroll interval; a no-op when the text fits.
    pub fn tick_scroll(&mut self) {
        if self.line2.needs_scrolling() {
            self.line2.step();
            self.render();
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
