//! Sysfs GPIO input port.
//!
//! Reads the two button lines and the encoder CLK/DT lines through
//! `/sys/class/gpio`.  Lines are exported and set to input once at
//! construction; export failures are fatal at startup, while transient
//! read failures surface as [`InputError`] and are logged by the poller
//! without killing the tick loop.
//!
//! Quadrature decoding happens here at the raw level: an edge on CLK
//! produces a `+1` quarter-step when DT differs from CLK and `-1` when it
//! matches, the usual reading for the HW-040 style encoder.  The
//! [`Debouncer`](crate::input::Debouncer) accumulates quarter-steps into
//! detents.

use std::fs;
use std::io::{self, Write as _};
use std::path::PathBuf;
use std::time::Instant;

use thiserror::Error;

use crate::config::InputConfig;

use super::{InputPort, RawInputSample};

// ---------------------------------------------------------------------------
// InputError
// ---------------------------------------------------------------------------

/// Errors from the GPIO input hardware.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("failed to export GPIO line {pin}: {source}")]
    Export {
        pin: u32,
        #[source]
        source: io::Error,
    },

    #[error("failed to read GPIO line {pin}: {source}")]
    Read {
        pin: u32,
        #[source]
        source: io::Error,
    },
}

// ---------------------------------------------------------------------------
// Line
// ---------------------------------------------------------------------------

/// One exported GPIO input line.
#[derive(Debug)]
struct Line {
    pin: u32,
    value_path: PathBuf,
}

impl Line {
    const SYSFS_ROOT: &'static str = "/sys/class/gpio";

    fn export(pin: u32) -> Result<Self, InputError> {
        let root = PathBuf::from(Self::SYSFS_ROOT);
        let dir = root.join(format!("gpio{pin}"));

        // Already-exported lines are fine (previous unclean shutdown).
        if !dir.exists() {
            let mut f = fs::OpenOptions::new()
                .write(true)
                .open(root.join("export"))
                .map_err(|source| InputError::Export { pin, source })?;
            write!(f, "{pin}").map_err(|source| InputError::Export { pin, source })?;
        }

        fs::write(dir.join("direction"), "in")
            .map_err(|source| InputError::Export { pin, source })?;

        Ok(Self {
            pin,
            value_path: dir.join("value"),
        })
    }

    fn read_high(&self) -> Result<bool, InputError> {
        let raw = fs::read_to_string(&self.value_path).map_err(|source| InputError::Read {
            pin: self.pin,
            source,
        })?;
        Ok(raw.trim() == "1")
    }
}

// ---------------------------------------------------------------------------
// SysfsGpioPort
// ---------------------------------------------------------------------------

/// Production [`InputPort`] reading sysfs GPIO lines.
pub struct SysfsGpioPort {
    btn_a: Line,
    btn_b: Line,
    enc_clk: Line,
    enc_dt: Line,
    active_high: bool,
    last_clk: Option<bool>,
}

impl SysfsGpioPort {
    /// Export all configured lines and set them to input.
    ///
    /// # Errors
    ///
    /// [`InputError::Export`] when a line cannot be exported or configured —
    /// treated as fatal at startup.
    pub fn new(config: &InputConfig) -> Result<Self, InputError> {
        let port = Self {
            btn_a: Line::export(config.btn_a_pin)?,
            btn_b: Line::export(config.btn_b_pin)?,
            enc_clk: Line::export(config.enc_clk_pin)?,
            enc_dt: Line::export(config.enc_dt_pin)?,
            active_high: config.active_high,
            last_clk: None,
        };
        log::info!(
            "gpio: exported lines a={} b={} clk={} dt={} (active_{})",
            config.btn_a_pin,
            config.btn_b_pin,
            config.enc_clk_pin,
            config.enc_dt_pin,
            if config.active_high { "high" } else { "low" }
        );
        Ok(port)
    }

    fn pressed(&self, level: bool) -> bool {
        if self.active_high {
            level
        } else {
            !level
        }
    }
}

impl InputPort for SysfsGpioPort {
    fn sample(&mut self) -> Result<RawInputSample, InputError> {
        let button_a = self.pressed(self.btn_a.read_high()?);
        let button_b = self.pressed(self.btn_b.read_high()?);

        let clk = self.enc_clk.read_high()?;
        let dt = self.enc_dt.read_high()?;

        let encoder_delta = match self.last_clk {
            Some(last) if clk != last => {
                if dt != clk {
                    1
                } else {
                    -1
                }
            }
            _ => 0,
        };
        self.last_clk = Some(clk);

        Ok(RawInputSample {
            button_a,
            button_b,
            encoder_delta,
            at: Instant::now(),
        })
    }
}
