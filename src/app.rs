//! Application wiring.
//!
//! # Startup sequence
//!
//! 1. Resolve data paths and open the microphone (fatal if absent).
//! 2. Load the Whisper model (fatal if absent — there is no degraded mode
//!    for an appliance whose only job is translating speech).
//! 3. Build the MT and TTS clients from config.
//! 4. Create the tokio runtime and warm every stage up so the first real
//!    session does not pay the cold-start cost.
//! 5. Export the GPIO lines and spawn the input poller thread.
//! 6. Run the session controller until Ctrl-C.
//!
//! The cpal stream handle is not `Send`, so all hardware setup happens
//! here on the main thread; only `Send` handles cross into the runtime.

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::mpsc;

use crate::asr::{AsrPort, WhisperAsr};
use crate::audio::{CapturePort, CpalCapture, Recorder};
use crate::config::{AppConfig, AppPaths};
use crate::input::{InputPoller, SysfsGpioPort};
use crate::lang::{Direction, DirectionSelector};
use crate::mt::{ApiTranslator, MtPort};
use crate::output::{AplayPlayback, ConsoleDisplay, OutputSink, PlaybackPort};
use crate::session::{SessionCommand, SessionController, SessionGate};
use crate::tts::{TtsClient, TtsPort};

// ---------------------------------------------------------------------------
// Warm-up
// ---------------------------------------------------------------------------

/// Push a dummy request through every stage.  Whisper's first inference
/// JIT-compiles compute graphs, the MT server loads its model on first use,
/// and the TTS probe clears any stale cooling state.  Failures here are
/// logged but not fatal: the services may still come up later.
async fn warm_up(config: &AppConfig, asr: Arc<dyn AsrPort>, mt: Arc<dyn MtPort>, tts: Arc<dyn TtsPort>) {
    log::info!("warm-up: starting");

    let silence = vec![0.0f32; config.audio.sample_rate as usize];
    let lang = config.lang.a.whisper.clone();
    match tokio::task::spawn_blocking(move || asr.transcribe(&silence, &lang)).await {
        Ok(Ok(_)) => log::info!("warm-up: asr ready"),
        Ok(Err(e)) => log::warn!("warm-up: asr failed: {e}"),
        Err(e) => log::warn!("warm-up: asr task failed: {e}"),
    }

    match mt
        .translate("hello", &config.lang.a.name, &config.lang.b.name)
        .await
    {
        Ok(_) => log::info!("warm-up: mt ready"),
        Err(e) => log::warn!("warm-up: mt failed: {e}"),
    }

    tts.warm_up().await;
    log::info!("warm-up: done");
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

/// Bring the appliance up and run until Ctrl-C.
pub fn run(config: AppConfig) -> anyhow::Result<()> {
    let paths = AppPaths::new();

    // Microphone: the stream runs for the life of the process.
    let recorder = Recorder::new(&config.audio);
    let _capture_stream = CpalCapture::open(&config.audio, recorder.clone())
        .context("failed to open the microphone")?;

    // ASR model.
    let model_path = paths.models_dir.join(format!("{}.bin", config.asr.model));
    let asr: Arc<dyn AsrPort> = Arc::new(
        WhisperAsr::load(&model_path)
            .with_context(|| format!("failed to load ASR model {}", model_path.display()))?,
    );

    // Translation and synthesis clients.
    let mt: Arc<dyn MtPort> = Arc::new(ApiTranslator::from_config(&config.mt));
    let tts: Arc<dyn TtsPort> = Arc::new(TtsClient::from_config(&config.tts));

    // Output.
    let playback: Arc<dyn PlaybackPort> = Arc::new(AplayPlayback::new(
        paths.audio_out_dir.clone(),
        config.audio.playback_device.clone(),
    ));
    let sink = OutputSink::new(Box::new(ConsoleDisplay), playback, &config.display);

    // Session plumbing.
    let gate = Arc::new(SessionGate::new());
    let selector = DirectionSelector::new(Direction::default());
    let direction = selector.handle();
    let (cmd_tx, cmd_rx) = mpsc::channel::<SessionCommand>(16);

    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    rt.block_on(warm_up(&config, asr.clone(), mt.clone(), tts.clone()));

    // Input hardware last, so buttons only become live once the pipeline
    // behind them exists.
    let capture: Arc<dyn CapturePort> = Arc::new(recorder);
    let gpio = SysfsGpioPort::new(&config.input).context("failed to set up GPIO input")?;
    let poller = InputPoller::spawn(
        Box::new(gpio),
        config.input.clone(),
        gate.clone(),
        selector,
        capture.clone(),
        cmd_tx,
    );

    let controller =
        SessionController::new(&config, gate, capture, asr, mt, tts, sink, direction);

    rt.block_on(async {
        tokio::select! {
            _ = controller.run(cmd_rx) => {}
            _ = tokio::signal::ctrl_c() => log::info!("app: shutdown requested"),
        }
    });

    poller.stop();
    log::info!("app: stopped");
    Ok(())
}
