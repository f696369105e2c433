//! Spelstem - a voice-driven Dutch spelling assistant.
//!
//! Listens for the question "Hoe schrijf je <klank>?", speaks the answer with
//! a Dutch Piper voice, and shows the written form on the terminal. Voice
//! activity detection (Silero VAD) and speech recognition (Whisper) run
//! locally via sherpa.

mod audio;
mod config;
mod interpreter;
mod stt;
mod tts;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Result;
use parking_lot::Mutex;
use tokio::signal;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::LocalTime;

use audio::{Capturer, Player};
use config::AppConfig;
use interpreter::{Interpreter, Phase, PhaseTracker, Reply, Spelling};
use stt::Recognizer;
use tts::Synthesizer;

/// Idle poll interval for the pipeline tasks (allows shutdown checks).
const TASK_POLL: Duration = Duration::from_millis(100);

/// Configuration for the speaking task.
struct SpeakTaskConfig {
    synthesizer: Arc<Mutex<Synthesizer>>, // TTS synthesizer
    player: Arc<Player>,                  // Audio player
    capturer_running: Arc<AtomicBool>,    // Microphone mute flag
    phases: PhaseTracker,                 // Interaction phase
    post_delay_ms: u64,                   // Delay before re-opening the mic (ms)
    shutdown: Arc<AtomicBool>,            // Shutdown flag
}

/// Spawn the transcription task.
///
/// Receives completed utterances from the VAD and transcribes them with
/// Whisper, event-driven via the segment channel.
fn spawn_transcription_task(
    transcript_tx: mpsc::Sender<String>,
    mut segment_rx: mpsc::Receiver<Vec<f32>>,
    recognizer: Arc<Recognizer>,
    shutdown: Arc<AtomicBool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while !shutdown.load(Ordering::Relaxed) {
            let samples = match tokio::time::timeout(TASK_POLL, segment_rx.recv()).await {
                Ok(Some(samples)) => samples,
                Ok(None) => {
                    debug!("Segment channel closed");
                    break;
                }
                // Timeout; loop around for the shutdown check
                Err(_) => continue,
            };

            if let Some(text) = recognizer.transcribe_segment(&samples)
                && transcript_tx.send(text).await.is_err()
            {
                debug!("Transcript channel closed");
                break;
            }
        }
    })
}

/// Spawn the interpreter task that turns transcripts into replies.
///
/// A transcript that arrives while an answer is still playing is dropped;
/// follow-up questions are not queued.
fn spawn_interpret_task(
    mut transcript_rx: mpsc::Receiver<String>,
    reply_tx: mpsc::Sender<Reply>,
    phases: PhaseTracker,
    shutdown: Arc<AtomicBool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interpreter = Interpreter::new();

        while !shutdown.load(Ordering::Relaxed) {
            let transcript = tokio::select! {
                Some(transcript) = transcript_rx.recv() => transcript,
                _ = tokio::time::sleep(TASK_POLL) => continue,
            };

            if phases.is_speaking() {
                info!("🔇 Busy speaking, dropped \"{}\"", transcript);
                continue;
            }

            phases.set(Phase::Processing);
            info!("🧠 Processing: \"{}\"", transcript);

            if reply_tx.send(interpreter.respond(&transcript)).await.is_err() {
                debug!("Reply channel closed");
                break;
            }
        }
    })
}

/// Spawn the speaking task: synthesis, playback, and terminal display.
///
/// The microphone stays muted for the duration of the answer and re-opens
/// after a short delay, so the assistant never answers itself.
fn spawn_speak_task(mut reply_rx: mpsc::Receiver<Reply>, config: SpeakTaskConfig) -> JoinHandle<()> {
    let SpeakTaskConfig { synthesizer, player, capturer_running, phases, post_delay_ms, shutdown } = config;

    tokio::spawn(async move {
        while !shutdown.load(Ordering::Relaxed) {
            let reply = tokio::select! {
                Some(reply) = reply_rx.recv() => reply,
                _ = tokio::time::sleep(TASK_POLL) => continue,
            };

            phases.set(Phase::Speaking);
            capturer_running.store(false, Ordering::SeqCst);
            debug!("Microphone muted for playback");

            let Reply { message, spelling, continuation } = reply;
            let (first_label, second_label) = match spelling {
                Some(Spelling::Single(label)) => (Some(label), None),
                Some(Spelling::Ambiguous(first, second)) => (Some(first), Some(second)),
                None => (None, None),
            };

            info!("💬 {}", message);
            if let Some(label) = first_label {
                info!("✏️ {}", label);
            }
            speak(&synthesizer, &player, &message);

            // Ambiguous sounds get a second written form after a follow-up phrase
            if let (Some(phrase), Some(label)) = (continuation, second_label) {
                info!("💬 {}", phrase);
                info!("✏️ {}", label);
                speak(&synthesizer, &player, &phrase);
            }

            tokio::time::sleep(Duration::from_millis(post_delay_ms)).await;
            capturer_running.store(true, Ordering::SeqCst);
            phases.set(Phase::Listening);
            debug!("Microphone re-opened");
        }
    })
}

/// Synthesize one utterance and play it to completion.
///
/// Failures are logged and end the interaction; the user simply asks again.
fn speak(synthesizer: &Arc<Mutex<Synthesizer>>, player: &Player, text: &str) {
    let samples = match synthesizer.lock().synthesize(text) {
        Ok(samples) => samples,
        Err(e) => {
            error!("❌ TTS error: {}", e);
            return;
        }
    };

    if !samples.is_empty() && !player.play(&samples) {
        warn!("Playback did not run to completion");
    }
}

/// Wait for Ctrl+C or SIGTERM, then raise the shutdown flag.
async fn wait_for_shutdown(shutdown: Arc<AtomicBool>) {
    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to register SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = signal::ctrl_c() => info!("🛑 Received Ctrl+C, shutting down..."),
        _ = terminate => info!("🛑 Received SIGTERM, shutting down..."),
    }

    shutdown.store(true, Ordering::SeqCst);
}

/// Join a pipeline task, giving it a moment to notice the shutdown flag.
async fn join_with_timeout(handle: JoinHandle<()>, name: &str) {
    tokio::select! {
        _ = handle => debug!("{} task finished gracefully", name),
        _ = tokio::time::sleep(Duration::from_millis(500)) => debug!("{} task didn't finish in time", name),
    }
}

fn init_logging(verbose: bool) {
    // Respect RUST_LOG, fall back to the verbose flag, default to info
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| if verbose { EnvFilter::try_new("debug") } else { EnvFilter::try_new("info") })
        .unwrap();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_timer(LocalTime::new(time::macros::format_description!("[hour]:[minute]:[second]")))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::from_args();
    init_logging(config.verbose);

    info!("🎤 Spelstem v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = config.validate() {
        error!("❌ Configuration error: {}", e);
        error!("See README.md for the expected model layout under {}", config.model_dir.display());
        std::process::exit(1);
    }

    // Build the pipeline components
    let (recognizer, segment_rx) = Recognizer::new(&config)?;
    let synthesizer = Synthesizer::new(&config)?;
    let voice_rate = synthesizer.sample_rate();

    let recognizer = Arc::new(recognizer);
    let synthesizer = Arc::new(Mutex::new(synthesizer));
    let player = Arc::new(Player::new(voice_rate)?);

    // The capture callback feeds the VAD directly
    let recognizer_for_audio = recognizer.clone();
    let mut capturer = Capturer::new(config.sample_rate, move |samples: &[f32]| {
        recognizer_for_audio.accept_waveform(samples);
    })?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let capturer_running = capturer.running_flag();
    let phases = PhaseTracker::new();

    info!("Starting spelling assistant...");
    config.log_config();

    capturer.start()?;
    phases.set(Phase::Listening);
    info!("Vraag maar: \"Hoe schrijf je ...?\"");

    // Channels between the pipeline stages
    let (transcript_tx, transcript_rx) = mpsc::channel::<String>(10);
    let (reply_tx, reply_rx) = mpsc::channel::<Reply>(10);

    // Keep one sender per channel here so dropping them closes the pipeline
    let transcription_handle = spawn_transcription_task(transcript_tx.clone(), segment_rx, recognizer.clone(), shutdown.clone());
    let interpret_handle = spawn_interpret_task(transcript_rx, reply_tx.clone(), phases.clone(), shutdown.clone());
    let speak_handle = spawn_speak_task(
        reply_rx,
        SpeakTaskConfig {
            synthesizer,
            player,
            capturer_running,
            phases: phases.clone(),
            post_delay_ms: config.post_playback_delay_ms,
            shutdown: shutdown.clone(),
        },
    );

    wait_for_shutdown(shutdown).await;
    phases.set(Phase::Idle);

    // Stop the microphone first, then close the channels to wake the tasks
    capturer.shutdown();
    drop(transcript_tx);
    drop(reply_tx);

    join_with_timeout(transcription_handle, "Transcription").await;
    join_with_timeout(interpret_handle, "Interpreter").await;
    join_with_timeout(speak_handle, "Speaking").await;

    info!("✅ Spelling assistant stopped");
    Ok(())
}
