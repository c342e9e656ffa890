//! WAV playback through `aplay`.
//!
//! The synthesis service returns complete WAV files; handing them to ALSA's
//! own player keeps format handling out of this process.  Files land in the
//! app's audio directory so the last few utterances can be replayed when
//! debugging.

use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

use super::{PlaybackError, PlaybackPort};

// ---------------------------------------------------------------------------
// AplayPlayback
// ---------------------------------------------------------------------------

/// Blocking `aplay` runner.  Call from `spawn_blocking`; `play` returns
/// when the audio has finished.
pub struct AplayPlayback {
    out_dir: PathBuf,
    device: Option<String>,
}

impl AplayPlayback {
    pub fn new(out_dir: PathBuf, device: Option<String>) -> Self {
        Self { out_dir, device }
    }

    fn next_path(&self) -> PathBuf {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        self.out_dir.join(format!("tts-{millis}.wav"))
    }
}

impl PlaybackPort for AplayPlayback {
    fn play(&self, wav: &[u8]) -> Result<(), PlaybackError> {
        fs::create_dir_all(&self.out_dir)?;
        let path = self.next_path();
        fs::write(&path, wav)?;

        let mut cmd = Command::new("aplay");
        if let Some(device) = &self.device {
            cmd.arg("-D").arg(device);
        }
        cmd.arg("-q").arg(&path);

        let output = cmd.output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(PlaybackError::Device(stderr));
        }

        log::debug!("playback: played {} ({} bytes)", path.display(), wav.len());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
