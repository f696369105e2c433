//! Speech recognizer combining VAD and Whisper STT.
//!
//! Silero VAD delimits one utterance per question; Whisper turns the
//! completed segment into a transcript for the interpreter.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use parking_lot::Mutex;
use sherpa_rs::silero_vad::{SileroVad, SileroVadConfig};
use sherpa_rs::whisper::{WhisperConfig, WhisperRecognizer};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::AppConfig;

/// Minimum speech duration in seconds to be considered valid.
const MIN_SPEECH_DURATION: f32 = 0.1;

/// Maximum speech duration in seconds (prevent runaway segments).
const MAX_SPEECH_DURATION: f32 = 30.0;

/// VAD window size in samples (512 samples = 32ms at 16kHz).
const VAD_WINDOW_SIZE: i32 = 512;

/// Seconds of audio the VAD may buffer.
const VAD_BUFFER_SIZE_SECONDS: f32 = 60.0;

/// Capacity of the completed-utterance channel.
const SEGMENT_QUEUE: usize = 5;

/// State the audio callback touches. Kept apart from Whisper so the fast VAD
/// path never waits on a slow transcription.
struct VadState {
    vad: SileroVad,
    was_speaking: bool,
    speech_start: Option<Instant>,
}

/// Speech recognizer combining VAD and Whisper.
/// Separate mutexes for VAD (fast) and Whisper (slow) prevent audio glitches.
pub struct Recognizer {
    vad_state: Arc<Mutex<VadState>>,
    whisper: Mutex<WhisperRecognizer>,
    segment_tx: mpsc::Sender<Vec<f32>>,
    sample_rate: u32,
}

impl Recognizer {
    /// Create a recognizer with event-driven segment delivery.
    ///
    /// Completed utterances arrive on the returned channel as soon as the
    /// VAD closes them.
    ///
    /// # Errors
    /// Fails when VAD or Whisper initialization fails, typically because
    /// model files are missing or invalid.
    pub fn new(config: &AppConfig) -> Result<(Self, mpsc::Receiver<Vec<f32>>)> {
        let provider = config.effective_stt_provider();
        info!("Initializing speech recognizer with {} provider", provider);

        let vad = build_vad(config)?;
        let whisper = build_whisper(config)?;

        let (segment_tx, segment_rx) = mpsc::channel(SEGMENT_QUEUE);

        let recognizer = Self {
            vad_state: Arc::new(Mutex::new(VadState { vad, was_speaking: false, speech_start: None })),
            whisper: Mutex::new(whisper),
            segment_tx,
            sample_rate: config.sample_rate,
        };

        Ok((recognizer, segment_rx))
    }

    /// Feed captured audio to the VAD and ship completed utterances.
    ///
    /// Called from the capture thread; safe to call concurrently with
    /// `transcribe_segment`.
    pub fn accept_waveform(&self, samples: &[f32]) {
        let mut state = self.vad_state.lock();
        state.vad.accept_waveform(samples.to_vec());

        // Edge-detect the speaking state for logging
        let is_speech = state.vad.is_speech();
        if is_speech && !state.was_speaking {
            state.speech_start = Some(Instant::now());
            info!("🎤 Speech started");
        } else if !is_speech
            && state.was_speaking
            && let Some(start) = state.speech_start.take()
        {
            info!("🎤 Speech ended ({:.1}s)", start.elapsed().as_secs_f32());
        }
        state.was_speaking = is_speech;

        if state.vad.is_empty() {
            return;
        }

        let segment = state.vad.front();
        state.vad.pop();
        if segment.samples.is_empty() {
            return;
        }

        debug!("Utterance completed: {} samples", segment.samples.len());

        // Clone out of the segment, then release the VAD lock before sending
        let utterance = segment.samples.clone();
        drop(state);

        // try_send keeps the capture thread from ever blocking
        if let Err(e) = self.segment_tx.try_send(utterance) {
            warn!("Failed to queue utterance (channel full): {}", e);
        }
    }

    /// Transcribe one completed utterance.
    ///
    /// Returns `None` for empty segments or empty transcriptions.
    pub fn transcribe_segment(&self, samples: &[f32]) -> Option<String> {
        if samples.is_empty() {
            debug!("Empty speech segment");
            return None;
        }

        debug!("Transcribing {} samples", samples.len());

        let mut whisper = self.whisper.lock();
        let result = whisper.transcribe(self.sample_rate, samples);
        drop(whisper);

        let text = result.text.trim().to_string();
        if text.is_empty() {
            debug!("Empty transcription result");
            return None;
        }

        info!("🗣️ Heard: {}", text);
        Some(text)
    }
}

fn build_vad(config: &AppConfig) -> Result<SileroVad> {
    let provider = config.effective_stt_provider();

    let vad_config = SileroVadConfig {
        model: config.vad_model_path().to_string_lossy().to_string(),
        threshold: config.vad_threshold,
        sample_rate: config.sample_rate,
        min_silence_duration: config.vad_silence_duration,
        min_speech_duration: MIN_SPEECH_DURATION,
        max_speech_duration: MAX_SPEECH_DURATION,
        window_size: VAD_WINDOW_SIZE,
        provider: Some(provider.as_sherpa_provider().to_string()),
        num_threads: Some(config.vad_threads.try_into().unwrap_or(1)),
        debug: config.verbose,
    };

    let vad = SileroVad::new(vad_config, VAD_BUFFER_SIZE_SECONDS).map_err(|e| anyhow::anyhow!("Failed to initialize Silero VAD: {}", e))?;
    debug!("VAD initialized");
    Ok(vad)
}

fn build_whisper(config: &AppConfig) -> Result<WhisperRecognizer> {
    let provider = config.effective_stt_provider();
    let language = config.effective_stt_language().to_string();
    info!("STT language: {}", if language.is_empty() { "auto" } else { &language });

    let whisper_config = WhisperConfig {
        encoder: config.whisper_encoder_path().to_string_lossy().to_string(),
        decoder: config.whisper_decoder_path().to_string_lossy().to_string(),
        tokens: config.whisper_tokens_path().to_string_lossy().to_string(),
        language,
        provider: Some(provider.as_sherpa_provider().to_string()),
        num_threads: Some(config.stt_threads.try_into().unwrap_or(2)),
        debug: config.verbose,
        ..Default::default()
    };

    let whisper = WhisperRecognizer::new(whisper_config).map_err(|e| anyhow::anyhow!("Failed to initialize Whisper: {}", e))?;
    debug!("Whisper recognizer initialized");
    Ok(whisper)
}
