//! Lock-free session gate shared between the input poller and the
//! controller.
//!
//! The gate is the single source of truth for "is a session running, which
//! one, and who owns it".  The poller thread performs the Idle→Recording
//! transition itself (compare-and-swap), so the at-most-one-session rule
//! and input-event dropping never wait on the async runtime.  The
//! controller advances Recording→Processing→Idle and uses the session id
//! to suppress results that belong to a cancelled session.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

use crate::input::Button;

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// Coarse gate phase.  Finer-grained progress (`Transcribing`,
/// `Translating`, ...) lives in the controller; the gate only needs enough
/// resolution to route input events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Recording,
    Processing,
}

impl Phase {
    fn as_u8(self) -> u8 {
        match self {
            Phase::Idle => 0,
            Phase::Recording => 1,
            Phase::Processing => 2,
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            1 => Phase::Recording,
            2 => Phase::Processing,
            _ => Phase::Idle,
        }
    }
}

// ---------------------------------------------------------------------------
// SessionGate
// ---------------------------------------------------------------------------

/// Shared session gate.  All methods are lock-free and callable from any
/// thread.
#[derive(Debug, Default)]
pub struct SessionGate {
    phase: AtomicU8,
    id: AtomicU64,
    button: AtomicU8,
}

impl SessionGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        Phase::from_u8(self.phase.load(Ordering::Acquire))
    }

    /// The button that owns the active session.  Meaningless when idle.
    pub fn active_button(&self) -> Button {
        if self.button.load(Ordering::Acquire) == 0 {
            Button::A
        } else {
            Button::B
        }
    }

    /// Try to start a session: Idle→Recording.  Returns the new session id,
    /// or `None` when a session is already active (the press is dropped).
    pub fn try_begin(&self, button: Button) -> Option<u64> {
        if self
            .phase
            .compare_exchange(
                Phase::Idle.as_u8(),
                Phase::Recording.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return None;
        }
        let id = self.id.fetch_add(1, Ordering::AcqRel) + 1;
        self.button.store(
            match button {
                Button::A => 0,
                Button::B => 1,
            },
            Ordering::Release,
        );
        Some(id)
    }

    /// Recording→Processing on release of the owning button.  Returns the
    /// session id, or `None` if the session was already cancelled.
    pub fn begin_processing(&self) -> Option<u64> {
        if self
            .phase
            .compare_exchange(
                Phase::Recording.as_u8(),
                Phase::Processing.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return None;
        }
        Some(self.id.load(Ordering::Acquire))
    }

    /// Abort an in-flight recording: Recording→Idle, invalidating the
    /// current id so late results are discarded.  Returns the cancelled id.
    pub fn cancel_recording(&self) -> Option<u64> {
        if self
            .phase
            .compare_exchange(
                Phase::Recording.as_u8(),
                Phase::Idle.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return None;
        }
        let cancelled = self.id.load(Ordering::Acquire);
        // Bump the id so anything still computing for `cancelled` fails the
        // is_current check.
        self.id.fetch_add(1, Ordering::AcqRel);
        Some(cancelled)
    }

    /// Invalidate whatever session is current without touching the phase.
    pub fn invalidate_current(&self) -> u64 {
        self.id.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Whether `id` is still the live session.
    pub fn is_current(&self, id: u64) -> bool {
        self.id.load(Ordering::Acquire) == id
    }

    /// Terminal transition back to Idle.  A no-op when `id` is stale (a
    /// cancel already reset the gate and may have started a new session).
    pub fn finish(&self, id: u64) {
        if self.is_current(id) {
            self.phase.store(Phase::Idle.as_u8(), Ordering::Release);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_is_exclusive_until_finish() {
        let gate = SessionGate::new();

        let id = gate.try_begin(Button::A).expect("first begin");
        assert_eq!(gate.phase(), Phase::Recording);
        assert_eq!(gate.active_button(), Button::A);

        // Second press is dropped while the session is active.
        assert!(gate.try_begin(Button::B).is_none());

        let pid = gate.begin_processing().expect("processing");
        assert_eq!(pid, id);
        assert!(gate.try_begin(Button::B).is_none());

        gate.finish(id);
        assert_eq!(gate.phase(), Phase::Idle);
        assert!(gate.try_begin(Button::B).is_some());
    }

    #[test]
    fn session_ids_increase() {
        let gate = SessionGate::new();

        let a = gate.try_begin(Button::A).unwrap();
        gate.begin_processing().unwrap();
        gate.finish(a);

        let b = gate.try_begin(Button::A).unwrap();
        assert!(b > a);
    }

    #[test]
    fn cancel_invalidates_the_session() {
        let gate = SessionGate::new();

        let id = gate.try_begin(Button::A).unwrap();
        assert!(gate.is_current(id));

        let cancelled = gate.cancel_recording().expect("cancel");
        assert_eq!(cancelled, id);
        assert_eq!(gate.phase(), Phase::Idle);
        assert!(!gate.is_current(id));

        // Release arriving after the cancel finds nothing to stop.
        assert!(gate.begin_processing().is_none());
    }

    #[test]
    fn cancel_only_applies_while_recording() {
        let gate = SessionGate::new();
        assert!(gate.cancel_recording().is_none());

        let id = gate.try_begin(Button::A).unwrap();
        gate.begin_processing().unwrap();
        assert!(gate.cancel_recording().is_none());
        assert!(gate.is_current(id));
    }

    #[test]
    fn stale_finish_does_not_close_a_newer_session() {
        let gate = SessionGate::new();

        let old = gate.try_begin(Button::A).unwrap();
        gate.cancel_recording().unwrap();

        let new = gate.try_begin(Button::B).unwrap();
        gate.finish(old);
        assert_eq!(gate.phase(), Phase::Recording, "stale finish must be a no-op");

        gate.begin_processing().unwrap();
        gate.finish(new);
        assert_eq!(gate.phase(), Phase::Idle);
    }

    #[test]
    fn invalidate_current_bumps_the_id() {
        let gate = SessionGate::new();
        let id = gate.try_begin(Button::A).unwrap();
        gate.invalidate_current();
        assert!(!gate.is_current(id));
    }
}
