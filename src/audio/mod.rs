//! Audio capture for the push-to-talk pipeline.
//!
//! ```text
//! cpal stream ──▶ feeder thread ──▶ Recorder (ring buffer, gated by the
//!   (callback)     (downmix +        recording flag) ──▶ Vec<f32> @16 kHz
//!                   resample)
//! ```
//!
//! The cpal stream runs continuously; the [`Recorder`] flag decides whether
//! samples land in the buffer.  Starting a session therefore costs one
//! atomic store, not a device open.

pub mod buffer;
pub mod capture;
pub mod resample;

pub use buffer::CaptureBuffer;
pub use capture::{CaptureError, CapturePort, CpalCapture, Recorder};
pub use resample::downmix_resample;
