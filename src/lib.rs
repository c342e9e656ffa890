//! Offline two-button speech translator — control core.
//!
//! A user holds one of two push-buttons, speaks, and hears a translated
//! utterance through a speaker while a small character display echoes the
//! translated text.  A rotary encoder flips the translation direction.
//!
//! # Architecture
//!
//! ```text
//! GPIO lines ──▶ InputPoller (OS thread, 10 ms tick)
//!                   │  debounce → ShortPress / LongPress / Release / EncoderStep
//!                   │
//!                   ├─ EncoderStep ──▶ DirectionSelector (atomic snapshot)
//!                   │
//!                   └─ SessionCommand (mpsc, try_send — never blocks the tick)
//!                          │
//!                          ▼
//!                SessionController::run()  ← tokio task
//!                   │
//!                   ├─ Start  → CapturePort::start, state = Recording
//!                   ├─ Cancel → bump session id, back to Idle
//!                   └─ Stop   → drain audio
//!                                 → AsrPort::transcribe   (spawn_blocking)
//!                                 → MtPort::translate     (HTTP, local)
//!                                 → TtsClient::synthesize (HTTP, retry/backoff)
//!                                 → OutputSink: display text, then play audio
//! ```
//!
//! The poller and the pipeline never share a thread of control: a slow
//! ASR/MT/TTS call can never stall button responsiveness.  The two sides
//! hand off through [`session::SessionGate`] (atomics) and a bounded
//! channel; events that arrive while a session is active are dropped,
//! never queued.

pub mod app;
pub mod asr;
pub mod audio;
pub mod config;
pub mod input;
pub mod lang;
pub mod mt;
pub mod output;
pub mod session;
pub mod tts;
