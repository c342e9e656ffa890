//! The session controller: one async task that runs the whole pipeline.
//!
//! Commands arrive from the input poller over a bounded channel.  The
//! pipeline for one session runs inline in the command handler, which is
//! what serializes sessions: while a session is processing, the gate has
//! already stopped the poller from producing new `Start` commands, and any
//! event that slips through waits in the channel.
//!
//! Blocking stages (Whisper inference, `aplay`) go through
//! `spawn_blocking`; the controller itself never blocks the runtime.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::asr::{AsrError, AsrPort};
use crate::audio::CapturePort;
use crate::config::AppConfig;
use crate::input::Button;
use crate::lang::{Direction, DirectionHandle, LanguageTable};
use crate::mt::MtPort;
use crate::output::OutputSink;
use crate::tts::{TtsError, TtsPort, TtsRequest};

use super::state::{FailReason, Session, SessionState};
use super::SessionGate;

// ---------------------------------------------------------------------------
// SessionCommand
// ---------------------------------------------------------------------------

/// What the input poller asks the controller to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    /// A session was opened at the gate; start capturing.
    Start { id: u64, button: Button },
    /// The owning button was released; run the pipeline.
    Stop { id: u64 },
    /// The session was cancelled at the gate; discard the recording.
    Cancel { id: u64 },
    /// The encoder flipped the direction while idle.
    DirectionChanged(Direction),
}

// ---------------------------------------------------------------------------
// SessionController
// ---------------------------------------------------------------------------

/// How many scroll-interval ticks an error screen stays up before the
/// ready banner returns.  Two ticks guarantee at least one full interval
/// of visibility however the timers happen to align.
const ERROR_HOLD_TICKS: u8 = 2;

/// Owns the pipeline stages and the output sink.
pub struct SessionController {
    gate: Arc<SessionGate>,
    capture: Arc<dyn CapturePort>,
    asr: Arc<dyn AsrPort>,
    mt: Arc<dyn MtPort>,
    tts: Arc<dyn TtsPort>,
    sink: OutputSink,
    languages: LanguageTable,
    direction: DirectionHandle,
    state: SessionState,
    current: Option<Session>,
    error_ticks: u8,
    min_samples: usize,
    asr_timeout: Duration,
    scroll_interval: Duration,
}

impl SessionController {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: &AppConfig,
        gate: Arc<SessionGate>,
        capture: Arc<dyn CapturePort>,
        asr: Arc<dyn AsrPort>,
        mt: Arc<dyn MtPort>,
        tts: Arc<dyn TtsPort>,
        sink: OutputSink,
        direction: DirectionHandle,
    ) -> Self {
        Self {
            gate,
            capture,
            asr,
            mt,
            tts,
            sink,
            languages: LanguageTable::new(config.lang.clone()),
            direction,
            state: SessionState::Idle,
            current: None,
            error_ticks: 0,
            min_samples: config.min_recording_samples(),
            asr_timeout: Duration::from_secs(config.asr.timeout_secs),
            scroll_interval: Duration::from_millis(config.display.scroll_interval_ms),
        }
    }

    /// Run until the command channel closes.
    pub async fn run(mut self, mut commands: mpsc::Receiver<SessionCommand>) {
        let mut scroll = tokio::time::interval(self.scroll_interval);
        scroll.set_missed_tick_behavior(MissedTickBehavior::Skip);

        self.sink.show_ready(&self.languages.banner(self.direction.get()));
        log::info!("controller: ready");

        loop {
            tokio::select! {
                cmd = commands.recv() => match cmd {
                    Some(cmd) => self.handle(cmd).await,
                    None => break,
                },
                _ = scroll.tick() => self.tick(),
            }
        }
        log::info!("controller: command channel closed, exiting");
    }

    /// Apply one command.  Public so the routing can be exercised without a
    /// channel and runtime loop.
    pub async fn handle(&mut self, cmd: SessionCommand) {
        match cmd {
            SessionCommand::Start { id, button } => {
                let direction = self.direction.get();
                let route = self.languages.route(direction);
                log::info!(
                    "session {id}: recording ({}, {:?})",
                    route.header(),
                    button
                );

                self.current = Some(Session {
                    id,
                    direction,
                    button,
                    started_at: Instant::now(),
                });
                self.error_ticks = 0;
                self.advance(SessionState::Recording);
                self.capture.start();
                self.sink.show_recording(&route.header());
            }

            SessionCommand::Stop { id } => {
                if !self.gate.is_current(id) {
                    log::debug!("session {id}: stop for a stale session, ignored");
                    return;
                }
                let session = match self.current.take() {
                    Some(s) if s.id == id => s,
                    _ => {
                        log::warn!("session {id}: stop without a matching start");
                        self.gate.finish(id);
                        return;
                    }
                };

                let result = self.run_pipeline(&session).await;
                self.gate.finish(id);
                log::info!(
                    "session {id}: finished after {:?}",
                    session.started_at.elapsed()
                );

                if let Err(reason) = result {
                    log::warn!("session {id}: failed: {reason}");
                    self.advance(SessionState::Failed(reason.kind()));
                    self.react_to_failure(&reason);
                    if self.gate.is_current(id) {
                        self.sink.show_error(reason.kind());
                        self.error_ticks = ERROR_HOLD_TICKS;
                    }
                }
                self.advance(SessionState::Idle);
            }

            SessionCommand::Cancel { id } => {
                log::info!("session {id}: cancelled");
                let discarded = self.capture.stop();
                log::debug!("session {id}: discarded {} samples", discarded.len());
                self.current = None;
                self.error_ticks = 0;
                self.advance(SessionState::Idle);
                self.sink.show_ready(&self.languages.banner(self.direction.get()));
            }

            SessionCommand::DirectionChanged(direction) => {
                log::info!("direction: now {}", self.languages.banner(direction));
                self.error_ticks = 0;
                self.sink.show_ready(&self.languages.banner(direction));
            }
        }
    }

    /// Capture → ASR → MT → TTS → present.  Returns `Ok(())` both on
    /// success and when the session went stale mid-flight (nothing to
    /// show either way).
    async fn run_pipeline(&mut self, session: &Session) -> Result<(), FailReason> {
        let id = session.id;
        let route = self.languages.route(session.direction);

        let audio = self.capture.stop();
        log::debug!("session {id}: captured {} samples", audio.len());
        if audio.len() < self.min_samples {
            return Err(FailReason::EmptyAudio);
        }

        // ASR, off-runtime and under a deadline.
        self.advance(SessionState::Transcribing);
        self.sink.show_stage(SessionState::Transcribing.label());
        let asr = self.asr.clone();
        let lang = route.src.whisper.clone();
        let transcript = match tokio::time::timeout(
            self.asr_timeout,
            tokio::task::spawn_blocking(move || asr.transcribe(&audio, &lang)),
        )
        .await
        {
            Ok(Ok(result)) => result?,
            Ok(Err(join)) => return Err(AsrError::Model(join.to_string()).into()),
            Err(_elapsed) => return Err(AsrError::Timeout.into()),
        };
        if transcript.trim().is_empty() {
            return Err(FailReason::EmptyAudio);
        }
        log::info!("session {id}: transcript: {transcript}");
        if !self.gate.is_current(id) {
            return Ok(());
        }

        // MT.
        self.advance(SessionState::Translating);
        self.sink.show_stage(SessionState::Translating.label());
        let translated = self
            .mt
            .translate(&transcript, &route.src.name, &route.tgt.name)
            .await?;
        log::info!("session {id}: translation: {translated}");
        if !self.gate.is_current(id) {
            return Ok(());
        }

        // TTS.
        self.advance(SessionState::Synthesizing);
        self.sink.show_stage(SessionState::Synthesizing.label());
        let wav = self
            .tts
            .synthesize(&TtsRequest {
                text: translated.clone(),
                voice: route.tgt.voice.clone(),
            })
            .await?;
        if !self.gate.is_current(id) {
            return Ok(());
        }

        // Display first, then speak.  The translation stays on screen.
        self.advance(SessionState::Playing);
        self.sink.present(&route.header(), &translated, wav).await;
        Ok(())
    }

    /// One scroll-interval tick.  An error screen is held for
    /// `ERROR_HOLD_TICKS` and then replaced with the ready banner, unless
    /// a new session has started in the meantime; otherwise the tick just
    /// advances the second-line marquee.
    pub fn tick(&mut self) {
        if self.error_ticks > 0 {
            self.error_ticks -= 1;
            if self.error_ticks == 0 && self.current.is_none() {
                self.sink.show_ready(&self.languages.banner(self.direction.get()));
            }
            return;
        }
        self.sink.tick_scroll();
    }

    fn advance(&mut self, next: SessionState) {
        log::debug!("state: {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Side effects of specific failures.  An unreachable TTS service gets
    /// an opportunistic background health probe so the cooling window can
    /// end early.
    fn react_to_failure(&self, reason: &FailReason) {
        if matches!(reason, FailReason::Tts(TtsError::ServiceUnavailable)) {
            let tts = self.tts.clone();
            tokio::spawn(async move { tts.warm_up().await });
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::asr::MockAsr;
    use crate::config::DisplayConfig;
    use crate::lang::DirectionSelector;
    use crate::mt::MockMt;
    use crate::output::{DisplayPort, PlaybackError, PlaybackPort};
    use crate::session::FailKind;

    // ---- Stubs ----------------------------------------------------------

    struct FixedCapture {
        samples: usize,
        stops: AtomicUsize,
    }

    impl FixedCapture {
        fn seconds(secs: f32) -> Self {
            Self {
                samples: (secs * 16_000.0) as usize,
                stops: AtomicUsize::new(0),
            }
        }
    }

    impl CapturePort for FixedCapture {
        fn start(&self) {}
        fn stop(&self) -> Vec<f32> {
            self.stops.fetch_add(1, Ordering::SeqCst);
            vec![0.01; self.samples]
        }
    }

    struct ScriptedTts {
        response: Result<Vec<u8>, TtsError>,
        calls: AtomicUsize,
        warmups: Arc<AtomicUsize>,
    }

    impl ScriptedTts {
        fn ok(wav: Vec<u8>) -> Self {
            Self {
                response: Ok(wav),
                calls: AtomicUsize::new(0),
                warmups: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn err(e: TtsError) -> Self {
            Self {
                response: Err(e),
                calls: AtomicUsize::new(0),
                warmups: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl TtsPort for ScriptedTts {
        async fn synthesize(&self, _req: &TtsRequest) -> Result<Vec<u8>, TtsError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.response.clone()
        }

        async fn warm_up(&self) {
            self.warmups.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct EventLog(Mutex<Vec<String>>);

    impl EventLog {
        fn lines(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    struct LoggingDisplay(Arc<EventLog>);

    impl DisplayPort for LoggingDisplay {
        fn write(&self, line1: &str, line2: &str) {
            self.0.0.lock().unwrap().push(format!("{line1}|{line2}"));
        }
    }

    struct LoggingPlayback(Arc<EventLog>);

    impl PlaybackPort for LoggingPlayback {
        fn play(&self, wav: &[u8]) -> Result<(), PlaybackError> {
            self.0.0.lock().unwrap().push(format!("play:{}", wav.len()));
            Ok(())
        }
    }

    // ---- Harness --------------------------------------------------------

    struct Harness {
        controller: SessionController,
        gate: Arc<SessionGate>,
        events: Arc<EventLog>,
        asr: Arc<MockAsr>,
        mt: Arc<MockMt>,
        tts: Arc<ScriptedTts>,
        capture: Arc<FixedCapture>,
    }

    fn harness(capture: FixedCapture, asr: MockAsr, mt: MockMt, tts: ScriptedTts) -> Harness {
        harness_with(AppConfig::default(), capture, asr, mt, tts)
    }

    fn harness_with(
        config: AppConfig,
        capture: FixedCapture,
        asr: MockAsr,
        mt: MockMt,
        tts: ScriptedTts,
    ) -> Harness {
        let gate = Arc::new(SessionGate::new());
        let events = Arc::new(EventLog::default());
        let asr = Arc::new(asr);
        let mt = Arc::new(mt);
        let tts = Arc::new(tts);
        let capture = Arc::new(capture);

        let sink = OutputSink::new(
            Box::new(LoggingDisplay(events.clone())),
            Arc::new(LoggingPlayback(events.clone())),
            &DisplayConfig::default(),
        );
        let selector = DirectionSelector::new(Direction::AtoB);

        let controller = SessionController::new(
            &config,
            gate.clone(),
            capture.clone(),
            asr.clone(),
            mt.clone(),
            tts.clone(),
            sink,
            selector.handle(),
        );

        Harness {
            controller,
            gate,
            events,
            asr,
            mt,
            tts,
            capture,
        }
    }

    /// Open a session at the gate and run the `Start` command, as the
    /// poller would.
    async fn start_session(h: &mut Harness) -> u64 {
        let id = h.gate.try_begin(Button::A).expect("gate idle");
        h.controller
            .handle(SessionCommand::Start { id, button: Button::A })
            .await;
        id
    }

    async fn stop_session(h: &mut Harness, id: u64) {
        h.gate.begin_processing().expect("recording");
        h.controller.handle(SessionCommand::Stop { id }).await;
    }

    // ---- End-to-end -----------------------------------------------------

    #[tokio::test]
    async fn successful_session_displays_then_plays() {
        let mut h = harness(
            FixedCapture::seconds(2.0),
            MockAsr::ok("hello"),
            MockMt::ok("ciao"),
            ScriptedTts::ok(vec![9; 44]),
        );

        let id = start_session(&mut h).await;
        stop_session(&mut h, id).await;

        let lines = h.events.lines();
        assert_eq!(
            lines,
            vec![
                "Listening...|eng\u{2192}ita",
                "Transcribing...|eng\u{2192}ita",
                "Translating...|eng\u{2192}ita",
                "Speaking...|eng\u{2192}ita",
                "eng\u{2192}ita|ciao",
                "play:44",
            ]
        );

        // The translator got the transcript with the language names.
        assert_eq!(
            h.mt.calls(),
            vec![("hello".into(), "English".into(), "Italian".into())]
        );
        assert_eq!(h.tts.calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.gate.phase(), crate::session::Phase::Idle);
    }

    #[tokio::test]
    async fn tts_timeout_shows_the_error_screen() {
        let mut h = harness(
            FixedCapture::seconds(2.0),
            MockAsr::ok("hello"),
            MockMt::ok("ciao"),
            ScriptedTts::err(TtsError::Timeout),
        );

        let id = start_session(&mut h).await;
        stop_session(&mut h, id).await;

        let lines = h.events.lines();
        assert_eq!(lines.last().unwrap(), "Error|Timed out");
        assert!(lines.iter().all(|l| !l.starts_with("play:")));
        assert_eq!(h.gate.phase(), crate::session::Phase::Idle);
    }

    #[tokio::test]
    async fn mt_timeout_shows_the_error_screen() {
        let mut h = harness(
            FixedCapture::seconds(2.0),
            MockAsr::ok("hello"),
            MockMt::timeout(),
            ScriptedTts::ok(vec![1]),
        );

        let id = start_session(&mut h).await;
        stop_session(&mut h, id).await;

        assert_eq!(h.events.lines().last().unwrap(), "Error|Timed out");
        assert_eq!(h.tts.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn tts_unavailable_triggers_a_warm_up_probe() {
        let mut h = harness(
            FixedCapture::seconds(2.0),
            MockAsr::ok("hello"),
            MockMt::ok("ciao"),
            ScriptedTts::err(TtsError::ServiceUnavailable),
        );
        let warmups = h.tts.warmups.clone();

        let id = start_session(&mut h).await;
        stop_session(&mut h, id).await;

        assert_eq!(
            h.events.lines().last().unwrap(),
            &format!("Error|{}", FailKind::TtsUnavailable.label())
        );

        // The probe runs on a spawned task.
        tokio::task::yield_now().await;
        assert_eq!(warmups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn slow_asr_hits_the_deadline() {
        let mut config = AppConfig::default();
        config.asr.timeout_secs = 0;

        let mut h = harness_with(
            config,
            FixedCapture::seconds(2.0),
            MockAsr::ok("late").with_delay(Duration::from_millis(50)),
            MockMt::ok("unused"),
            ScriptedTts::ok(vec![1]),
        );

        let id = start_session(&mut h).await;
        stop_session(&mut h, id).await;

        assert!(h.mt.calls().is_empty());
        assert_eq!(h.events.lines().last().unwrap(), "Error|Timed out");
        assert_eq!(h.gate.phase(), crate::session::Phase::Idle);
    }

    #[tokio::test]
    async fn too_short_recording_never_reaches_asr() {
        let mut h = harness(
            FixedCapture::seconds(0.2),
            MockAsr::ok("should not run"),
            MockMt::ok("nor this"),
            ScriptedTts::ok(vec![1]),
        );

        let id = start_session(&mut h).await;
        stop_session(&mut h, id).await;

        assert_eq!(h.asr.calls(), 0);
        assert!(h.mt.calls().is_empty());
        assert_eq!(h.events.lines().last().unwrap(), "Error|Say again?");
    }

    #[tokio::test]
    async fn empty_transcript_counts_as_empty_audio() {
        let mut h = harness(
            FixedCapture::seconds(2.0),
            MockAsr::ok("   "),
            MockMt::ok("unused"),
            ScriptedTts::ok(vec![1]),
        );

        let id = start_session(&mut h).await;
        stop_session(&mut h, id).await;

        assert!(h.mt.calls().is_empty());
        assert_eq!(h.events.lines().last().unwrap(), "Error|Say again?");
    }

    #[tokio::test]
    async fn error_screen_reverts_to_ready_after_a_moment() {
        let mut h = harness(
            FixedCapture::seconds(2.0),
            MockAsr::ok("hello"),
            MockMt::ok("ciao"),
            ScriptedTts::err(TtsError::Timeout),
        );

        let id = start_session(&mut h).await;
        stop_session(&mut h, id).await;
        assert_eq!(h.events.lines().last().unwrap(), "Error|Timed out");

        // Held through the first tick, cleared on the second.
        h.controller.tick();
        assert_eq!(h.events.lines().last().unwrap(), "Error|Timed out");
        h.controller.tick();
        assert_eq!(h.events.lines().last().unwrap(), "Ready|English>Italian");
    }

    #[tokio::test]
    async fn error_screen_never_overwrites_a_new_session() {
        let mut h = harness(
            FixedCapture::seconds(0.2),
            MockAsr::ok("unused"),
            MockMt::ok("unused"),
            ScriptedTts::ok(vec![1]),
        );

        // Too-short recording puts the error screen up.
        let id = start_session(&mut h).await;
        stop_session(&mut h, id).await;
        assert_eq!(h.events.lines().last().unwrap(), "Error|Say again?");

        // A new press before the hold expires takes the screen; the ready
        // banner must not reappear underneath it.
        let id = start_session(&mut h).await;
        h.controller.tick();
        h.controller.tick();
        assert_eq!(
            h.events.lines().last().unwrap(),
            "Listening...|eng\u{2192}ita"
        );
        assert!(h.gate.is_current(id));
    }

    #[tokio::test]
    async fn cancel_discards_the_recording() {
        let mut h = harness(
            FixedCapture::seconds(2.0),
            MockAsr::ok("should not run"),
            MockMt::ok("nor this"),
            ScriptedTts::ok(vec![1]),
        );

        let id = start_session(&mut h).await;
        h.gate.cancel_recording().expect("recording");
        h.controller.handle(SessionCommand::Cancel { id }).await;

        assert_eq!(h.capture.stops.load(Ordering::SeqCst), 1);
        assert_eq!(h.asr.calls(), 0);
        assert_eq!(h.events.lines().last().unwrap(), "Ready|English>Italian");

        // The release that trails the long press must find nothing to do.
        h.controller.handle(SessionCommand::Stop { id }).await;
        assert_eq!(h.asr.calls(), 0);
    }

    #[tokio::test]
    async fn stale_stop_is_ignored() {
        let mut h = harness(
            FixedCapture::seconds(2.0),
            MockAsr::ok("hello"),
            MockMt::ok("ciao"),
            ScriptedTts::ok(vec![1]),
        );

        let id = start_session(&mut h).await;
        h.gate.invalidate_current();
        h.controller.handle(SessionCommand::Stop { id }).await;

        // Pipeline never ran, no error and no result on screen.
        assert_eq!(h.asr.calls(), 0);
        assert_eq!(h.events.lines().last().unwrap(), "Listening...|eng\u{2192}ita");
    }

    #[tokio::test]
    async fn direction_change_updates_the_ready_screen() {
        let mut h = harness(
            FixedCapture::seconds(2.0),
            MockAsr::ok(""),
            MockMt::ok(""),
            ScriptedTts::ok(vec![]),
        );

        h.controller
            .handle(SessionCommand::DirectionChanged(Direction::BtoA))
            .await;
        assert_eq!(h.events.lines().last().unwrap(), "Ready|Italian>English");
    }
}
