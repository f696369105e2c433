//! Text-to-speech synthesizer using Piper (VITS) voices.

use anyhow::Result;
use sherpa_rs::OnnxConfig;
use sherpa_rs::tts::{VitsTts, VitsTtsConfig};
use tracing::{debug, info};

use crate::config::AppConfig;

/// Text-to-speech synthesizer for Dutch Piper voices.
pub struct Synthesizer {
    tts: VitsTts,
    sample_rate: u32, // Output sample rate of the voice model
    speaker_id: i32,
    speed: f32,
}

impl Synthesizer {
    /// Create a new TTS synthesizer for the configured voice.
    ///
    /// # Errors
    /// Returns an error if TTS initialization fails (e.g., missing model files).
    pub fn new(config: &AppConfig) -> Result<Self> {
        let provider = config.effective_tts_provider();

        info!("Initializing Piper TTS synthesizer with {} provider", provider);
        info!("TTS voice: {} (speaker ID: {})", config.tts_voice, config.tts_speaker_id);

        let tts_config = VitsTtsConfig {
            model: config.tts_model_path().to_string_lossy().to_string(),
            tokens: config.tts_tokens_path().to_string_lossy().to_string(),
            data_dir: config.tts_data_dir().to_string_lossy().to_string(),
            length_scale: 1.0 / config.tts_speed, // length_scale is inverse of speed
            onnx_config: OnnxConfig {
                provider: provider.as_sherpa_provider().to_string(),
                num_threads: config.tts_threads.try_into().unwrap_or(2),
                debug: config.verbose,
            },
            ..Default::default()
        };

        let tts = VitsTts::new(tts_config);

        let sample_rate = config.tts_sample_rate();
        info!("TTS sample rate: {} Hz", sample_rate);

        Ok(Self { tts, sample_rate, speaker_id: config.tts_speaker_id, speed: config.tts_speed })
    }

    /// Synthesize one utterance.
    ///
    /// # Errors
    /// Returns an error if TTS generation fails.
    pub fn synthesize(&mut self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        debug!("Synthesizing: \"{}\"", text);

        let audio = self.tts.create(text, self.speaker_id, self.speed).map_err(|e| anyhow::anyhow!("TTS generation failed: {}", e))?;

        debug!("🎵 Generated speech ({} samples)", audio.samples.len());
        Ok(audio.samples)
    }

    /// Get the sample rate of the synthesized audio.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}
