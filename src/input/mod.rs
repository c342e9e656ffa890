//! Physical input handling — buttons and rotary encoder.
//!
//! # Design
//!
//! The appliance has no interrupt lines available, so inputs are *polled*
//! at a fixed tick (default 10 ms) from a dedicated OS thread:
//!
//! ```text
//! InputPort::sample() ──▶ Debouncer::poll() ──▶ InputEvent
//!   (raw GPIO levels)      (K-consecutive        (ShortPress / LongPress /
//!                           filter + press        Release / EncoderStep)
//!                           timer + detent
//!                           accumulation)
//! ```
//!
//! [`InputPoller`] owns that thread.  It never blocks: session commands go
//! out with `try_send`, direction flips are a single atomic store, and a
//! full channel means the event is dropped, not queued.
//!
//! # Event timing
//!
//! * [`InputEvent::ShortPress`] fires at the **debounced press edge** so
//!   recording starts the instant the user presses, not when they let go.
//! * [`InputEvent::LongPress`] fires once at **threshold crossing** while
//!   the button is still held, so the UI can react without waiting for
//!   release.
//! * [`InputEvent::Release`] fires at the debounced release edge.

pub mod debounce;
pub mod gpio;
pub mod poller;

use std::time::Instant;

pub use debounce::Debouncer;
pub use gpio::{InputError, SysfsGpioPort};
pub use poller::InputPoller;

// ---------------------------------------------------------------------------
// Button / StepDirection / InputEvent
// ---------------------------------------------------------------------------

/// The two push-to-talk buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    A,
    B,
}

/// Rotation sense of one full encoder detent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepDirection {
    Cw,
    Ccw,
}

/// A debounced, semantic input event.  Emitted at most once per physical
/// action and consumed exactly once by the poller's routing logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// Debounced press edge.
    ShortPress(Button),
    /// The button has been held past the long-press threshold.
    LongPress(Button),
    /// Debounced release edge.
    Release(Button),
    /// One full encoder detent was crossed.
    EncoderStep(StepDirection),
}

// ---------------------------------------------------------------------------
// RawInputSample / InputPort
// ---------------------------------------------------------------------------

/// One raw reading of all input lines.  Produced every poll tick; transient.
#[derive(Debug, Clone, Copy)]
pub struct RawInputSample {
    /// Raw (bounce-prone) pressed level of button A.
    pub button_a: bool,
    /// Raw pressed level of button B.
    pub button_b: bool,
    /// Signed quadrature quarter-steps accumulated since the last sample.
    pub encoder_delta: i8,
    /// Monotonic timestamp of the reading.
    pub at: Instant,
}

/// Hardware boundary: something that can read the input lines.
///
/// The production implementation is [`SysfsGpioPort`]; tests script samples
/// directly into the [`Debouncer`].
pub trait InputPort: Send {
    fn sample(&mut self) -> Result<RawInputSample, InputError>;
}
