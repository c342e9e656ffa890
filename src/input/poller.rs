//! The input polling thread.
//!
//! Owns the [`InputPort`], ticks it at the configured interval and routes
//! debounced events.  The loop is deliberately lock-free on its hot path:
//! session transitions go through the [`SessionGate`] atomics and commands
//! reach the controller via `try_send` — when the controller is busy the
//! event is dropped on the floor, never queued for later.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use crate::audio::CapturePort;
use crate::config::InputConfig;
use crate::lang::DirectionSelector;
use crate::session::{Phase, SessionCommand, SessionGate};

use super::{Button, Debouncer, InputEvent, InputPort};

// ---------------------------------------------------------------------------
// Event routing
// ---------------------------------------------------------------------------

/// Map one debounced event to at most one session command, mutating the
/// gate/selector as a side effect.  Split out from the thread loop so the
/// routing rules are testable without a thread or real clock.
fn route_event(
    event: InputEvent,
    gate: &SessionGate,
    selector: &DirectionSelector,
) -> Option<SessionCommand> {
    match event {
        InputEvent::EncoderStep(step) => {
            // Direction changes only apply between sessions.
            if gate.phase() != Phase::Idle {
                log::trace!("input: encoder step dropped (session active)");
                return None;
            }
            let direction = selector.apply(step);
            Some(SessionCommand::DirectionChanged(direction))
        }

        InputEvent::ShortPress(button) => match gate.try_begin(button) {
            Some(id) => Some(SessionCommand::Start { id, button }),
            None => {
                log::trace!("input: press on {button:?} dropped (session active)");
                None
            }
        },

        InputEvent::LongPress(button) => {
            if gate.phase() == Phase::Recording && gate.active_button() == button {
                gate.cancel_recording().map(|id| SessionCommand::Cancel { id })
            } else {
                log::trace!("input: long press on {button:?} ignored");
                None
            }
        }

        InputEvent::Release(button) => {
            if gate.phase() == Phase::Recording && gate.active_button() == button {
                gate.begin_processing().map(|id| SessionCommand::Stop { id })
            } else {
                // Release of the non-owning button, or after a cancel.
                None
            }
        }
    }
}

/// Hand one command to the controller without blocking the tick.
///
/// A full channel drops the command.  A dropped `Cancel` needs local
/// repair: the gate is already Idle by then, so no later command would
/// disarm the recorder — stop it here and discard the audio so capture
/// ends with the gesture.
fn dispatch(
    cmd: SessionCommand,
    commands: &mpsc::Sender<SessionCommand>,
    capture: &Arc<dyn CapturePort>,
) {
    if let Err(e) = commands.try_send(cmd) {
        log::warn!("input: command dropped: {e}");
        if matches!(cmd, SessionCommand::Cancel { .. }) {
            let discarded = capture.stop();
            log::debug!("input: recorder disarmed, {} samples discarded", discarded.len());
        }
    }
}

// ---------------------------------------------------------------------------
// InputPoller
// ---------------------------------------------------------------------------

/// Handle to the polling thread.
pub struct InputPoller {
    handle: Option<JoinHandle<()>>,
    shutdown: std::sync::Arc<std::sync::atomic::AtomicBool>,
}

impl InputPoller {
    /// Spawn the polling thread.
    ///
    /// `port` is sampled every `config.poll_interval_ms`; commands are
    /// pushed into `commands` with `try_send`.
    pub fn spawn(
        mut port: Box<dyn InputPort>,
        config: InputConfig,
        gate: Arc<SessionGate>,
        selector: DirectionSelector,
        capture: Arc<dyn CapturePort>,
        commands: mpsc::Sender<SessionCommand>,
    ) -> Self {
        let shutdown = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
        let stop = shutdown.clone();

        let handle = thread::Builder::new()
            .name("input-poller".into())
            .spawn(move || {
                let tick = Duration::from_millis(config.poll_interval_ms.max(1));
                let mut debouncer = Debouncer::new(&config);
                log::info!("input: polling every {:?}", tick);

                while !stop.load(std::sync::atomic::Ordering::Relaxed) {
                    let started = Instant::now();

                    match port.sample() {
                        Ok(sample) => {
                            for event in debouncer.poll(sample) {
                                if let Some(cmd) = route_event(event, &gate, &selector) {
                                    dispatch(cmd, &commands, &capture);
                                }
                            }
                        }
                        Err(e) => {
                            // Transient read failure; skip this tick.
                            log::warn!("input: sample failed: {e}");
                        }
                    }

                    // Keep the tick cadence steady under jittery reads.
                    let elapsed = started.elapsed();
                    if elapsed < tick {
                        thread::sleep(tick - elapsed);
                    }
                }
                log::debug!("input: poller thread exiting");
            })
            .expect("failed to spawn input poller thread");

        Self {
            handle: Some(handle),
            shutdown,
        }
    }

    /// Ask the thread to stop and wait for it.
    pub fn stop(mut self) {
        self.shutdown
            .store(true, std::sync::atomic::Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for InputPoller {
    fn drop(&mut self) {
        self.shutdown
            .store(true, std::sync::atomic::Ordering::Relaxed);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
