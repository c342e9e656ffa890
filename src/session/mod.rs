//! Session lifecycle: the gate, the state model and the controller.
//!
//! ```text
//! poller thread                controller task
//! ─────────────                ───────────────
//! SessionGate CAS  ──try_send──▶ SessionCommand ──▶ capture / asr / mt /
//! (Idle⇄Recording⇄Processing)                       tts ──▶ OutputSink
//! ```
//!
//! The gate enforces at-most-one-session from the poller side; the
//! controller owns every side effect and uses session ids to discard
//! results that outlive a cancel.

pub mod controller;
pub mod state;
pub mod status;

pub use controller::{SessionCommand, SessionController};
pub use state::{FailKind, FailReason, Session, SessionState};
pub use status::{Phase, SessionGate};
