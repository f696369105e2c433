//! Application configuration and CLI argument parsing.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::voices;

/// Hardware acceleration provider for the ONNX models.
/// Auto-detected per platform when not given on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// CPU inference (always available)
    #[default]
    Cpu,
    /// NVIDIA CUDA acceleration (Linux, requires the CUDA toolkit)
    Cuda,
    /// Apple CoreML acceleration (macOS, uses the Neural Engine)
    #[value(name = "coreml")]
    CoreMl,
}

impl Provider {
    /// Provider string as sherpa-rs expects it.
    pub fn as_sherpa_provider(&self) -> &'static str {
        match self {
            Provider::Cpu => "cpu",
            Provider::Cuda => "cuda",
            Provider::CoreMl => "coreml",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_sherpa_provider())
    }
}

/// Spelling assistant application configuration.
#[derive(Parser, Debug, Clone, Serialize, Deserialize)]
#[command(name = "spelstem")]
#[command(version, about = "A voice-driven Dutch spelling assistant", long_about = None)]
pub struct AppConfig {
    /// List the available TTS voices and exit
    #[arg(long)]
    pub list_voices: bool,

    /// Show details for one voice and exit
    #[arg(long)]
    pub voice_info: Option<String>,

    /// Directory with the model files (Whisper, VAD, Piper voice)
    #[arg(long, short = 'd', env = "MODEL_DIR", default_value_os_t = default_model_dir())]
    pub model_dir: PathBuf,

    /// Microphone sample rate for speech recognition
    #[arg(long, default_value = "16000")]
    pub sample_rate: u32,

    /// Voice activity threshold (0.0 - 1.0)
    #[arg(long, default_value = "0.5")]
    pub vad_threshold: f32,

    /// Seconds of silence before a question counts as finished
    #[arg(long, default_value = "0.8")]
    pub vad_silence_duration: f32,

    /// STT language code ("nl" for Dutch, "auto" for automatic detection)
    #[arg(long, default_value = "nl")]
    pub stt_language: String,

    /// TTS voice name (a Dutch Piper voice, see --list-voices)
    #[arg(long, default_value = voices::DEFAULT_VOICE)]
    pub tts_voice: String,

    /// TTS speaker ID within the voice model (0 for single-speaker voices)
    #[arg(long, default_value = "0")]
    pub tts_speaker_id: i32,

    /// Text-to-speech speed multiplier (slightly below 1.0 suits spelling out sounds)
    #[arg(long, default_value = "0.95")]
    pub tts_speed: f32,

    /// Hardware acceleration provider (auto-detected when omitted)
    #[arg(long, value_enum)]
    pub provider: Option<Provider>,

    /// Provider override for speech recognition
    #[arg(long, value_enum)]
    pub stt_provider: Option<Provider>,

    /// Provider override for speech synthesis
    #[arg(long, value_enum)]
    pub tts_provider: Option<Provider>,

    /// Enable verbose logging
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// Milliseconds to wait before re-opening the microphone after an answer
    #[arg(long, default_value = "300")]
    pub post_playback_delay_ms: u64,

    /// Threads for all models (0 = derive from CPU cores)
    #[arg(long, default_value = "0")]
    pub num_threads: usize,

    /// VAD threads (0 = derive; the VAD needs just one)
    #[arg(long, default_value = "0")]
    pub vad_threads: usize,

    /// STT threads (0 = use num_threads)
    #[arg(long, default_value = "0")]
    pub stt_threads: usize,

    /// TTS threads (0 = use num_threads)
    #[arg(long, default_value = "0")]
    pub tts_threads: usize,
}

impl AppConfig {
    /// Parse configuration from command line arguments.
    pub fn from_args() -> Self {
        let mut config = Self::parse();

        if config.list_voices {
            voices::print_voices();
            std::process::exit(0);
        }
        if let Some(ref name) = config.voice_info {
            if let Err(e) = voices::print_voice_info(name) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
            std::process::exit(0);
        }

        config.resolve_voice();
        config.normalize_thread_counts();
        config
    }

    /// Resolve the requested TTS voice against the catalog once at startup.
    /// Unknown names fall back to the catalog default.
    fn resolve_voice(&mut self) {
        let (name, _) = voices::select_voice(&self.tts_voice);
        if name != self.tts_voice {
            warn!("Voice '{}' not found, falling back to '{}'", self.tts_voice, name);
            self.tts_voice = name.to_string();
        }
    }

    /// Fill in zero thread counts from the CPU core count and provider.
    ///
    /// With CUDA the GPU handles parallelism internally, so a single CPU
    /// thread per model avoids resource contention and CUDA allocation
    /// failures. On CPU, cores/3 leaves headroom and prevents
    /// oversubscription.
    fn normalize_thread_counts(&mut self) {
        let cores = num_cpus::get();
        let stt_cuda = self.effective_stt_provider() == Provider::Cuda;
        let tts_cuda = self.effective_tts_provider() == Provider::Cuda;

        if self.num_threads == 0 {
            self.num_threads = if stt_cuda || tts_cuda { 1 } else { (cores / 3).max(1) };
        }
        if self.vad_threads == 0 {
            self.vad_threads = 1; // VAD is lightweight
        }
        if self.stt_threads == 0 {
            self.stt_threads = if stt_cuda { 1 } else { self.num_threads };
        }
        if self.tts_threads == 0 {
            self.tts_threads = if tts_cuda { 1 } else { self.num_threads };
        }

        if self.verbose {
            info!(
                "CPU cores: {}, Provider: STT={}, TTS={}, Thread counts: VAD={}, STT={}, TTS={}",
                cores,
                self.effective_stt_provider(),
                self.effective_tts_provider(),
                self.vad_threads,
                self.stt_threads,
                self.tts_threads
            );
        }
    }

    /// Get the effective STT provider.
    pub fn effective_stt_provider(&self) -> Provider {
        self.stt_provider.or(self.provider).unwrap_or_else(detect_provider)
    }

    /// Get the effective TTS provider.
    pub fn effective_tts_provider(&self) -> Provider {
        self.tts_provider.or(self.provider).unwrap_or_else(detect_provider)
    }

    fn whisper_dir(&self) -> PathBuf {
        self.model_dir.join("whisper")
    }

    /// Path to the Whisper encoder model (multilingual).
    pub fn whisper_encoder_path(&self) -> PathBuf {
        self.whisper_dir().join("whisper-small-encoder.int8.onnx")
    }

    /// Path to the Whisper decoder model (multilingual).
    pub fn whisper_decoder_path(&self) -> PathBuf {
        self.whisper_dir().join("whisper-small-decoder.int8.onnx")
    }

    /// Path to the Whisper tokens file.
    pub fn whisper_tokens_path(&self) -> PathBuf {
        self.whisper_dir().join("whisper-small-tokens.txt")
    }

    /// Effective STT language code for Whisper; empty string triggers
    /// auto-detection.
    pub fn effective_stt_language(&self) -> &str {
        if self.stt_language.eq_ignore_ascii_case("auto") { "" } else { &self.stt_language }
    }

    /// Path to the Silero VAD model.
    pub fn vad_model_path(&self) -> PathBuf {
        self.model_dir.join("silero_vad.onnx")
    }

    /// Directory holding the Piper bundle for the configured voice.
    fn tts_voice_dir(&self) -> PathBuf {
        self.model_dir.join("tts").join(format!("vits-piper-{}", self.tts_voice))
    }

    /// Path to the Piper TTS model.
    pub fn tts_model_path(&self) -> PathBuf {
        self.tts_voice_dir().join(format!("{}.onnx", self.tts_voice))
    }

    /// Path to the TTS tokens file.
    pub fn tts_tokens_path(&self) -> PathBuf {
        self.tts_voice_dir().join("tokens.txt")
    }

    /// Path to the espeak-ng data directory bundled with the voice.
    pub fn tts_data_dir(&self) -> PathBuf {
        self.tts_voice_dir().join("espeak-ng-data")
    }

    /// Output sample rate of the configured voice.
    pub fn tts_sample_rate(&self) -> u32 {
        voices::get_voice(&self.tts_voice).map_or(22050, |voice| voice.sample_rate)
    }

    /// Validate model files and numeric ranges.
    ///
    /// # Errors
    /// Returns the first missing model file or out-of-range value.
    pub fn validate(&self) -> Result<()> {
        if !self.model_dir.exists() {
            anyhow::bail!("Model directory does not exist: {}", self.model_dir.display());
        }

        for path in [
            self.whisper_encoder_path(),
            self.whisper_decoder_path(),
            self.whisper_tokens_path(),
            self.vad_model_path(),
            self.tts_model_path(),
            self.tts_tokens_path(),
        ] {
            if !path.exists() {
                anyhow::bail!("Required model file not found: {}", path.display());
            }
        }

        if !(0.0..=1.0).contains(&self.vad_threshold) {
            anyhow::bail!("VAD threshold must be between 0.0 and 1.0");
        }
        if self.tts_speed <= 0.0 {
            anyhow::bail!("TTS speed must be positive");
        }

        Ok(())
    }

    /// Log the current configuration.
    pub fn log_config(&self) {
        info!("Configuration:");
        info!("  Model directory: {}", self.model_dir.display());
        info!("  Sample rate: {} Hz", self.sample_rate);
        info!("  VAD threshold: {}", self.vad_threshold);
        info!("  STT language: {}", self.stt_language);
        info!("  STT provider: {}", self.effective_stt_provider());
        info!("  TTS voice: {}", self.tts_voice);
        info!("  TTS speed: {}", self.tts_speed);
        info!("  TTS provider: {}", self.effective_tts_provider());
        info!("  Post-playback delay: {}ms", self.post_playback_delay_ms);
    }
}

/// Default model directory (~/.spelstem/models).
fn default_model_dir() -> PathBuf {
    dirs::home_dir().map_or_else(|| PathBuf::from("models"), |home| home.join(".spelstem").join("models"))
}

/// Auto-detect the best hardware acceleration provider.
fn detect_provider() -> Provider {
    #[cfg(target_os = "macos")]
    {
        info!("macOS detected, using CoreML provider");
        Provider::CoreMl
    }

    #[cfg(target_os = "linux")]
    {
        if has_nvidia_gpu() {
            info!("NVIDIA GPU detected, using CUDA provider");
            Provider::Cuda
        } else {
            info!("No GPU detected, using CPU provider");
            Provider::Cpu
        }
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    {
        info!("Using CPU provider");
        Provider::Cpu
    }
}

/// Check if an NVIDIA GPU is available (Linux only).
#[cfg(target_os = "linux")]
fn has_nvidia_gpu() -> bool {
    use std::path::Path;

    // Device files for discrete GPUs and Jetson boards
    let markers = [
        "/dev/nvidia0",
        "/dev/nvidiactl",
        "/dev/nvidia-uvm",
        "/dev/nvhost-ctrl",
        "/dev/nvhost-ctrl-gpu",
        "/etc/nv_tegra_release",
    ];

    markers.iter().any(|path| Path::new(path).exists())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        AppConfig::command().debug_assert();
    }

    #[test]
    fn tts_paths_follow_the_piper_bundle_layout() {
        let config = AppConfig::parse_from(["spelstem", "--model-dir", "/tmp/models", "--tts-voice", "nl_NL-pim-medium"]);
        assert_eq!(config.tts_model_path(), PathBuf::from("/tmp/models/tts/vits-piper-nl_NL-pim-medium/nl_NL-pim-medium.onnx"));
        assert_eq!(config.tts_tokens_path(), PathBuf::from("/tmp/models/tts/vits-piper-nl_NL-pim-medium/tokens.txt"));
        assert_eq!(config.tts_sample_rate(), 22050);
    }

    #[test]
    fn auto_language_maps_to_empty_string() {
        let mut config = AppConfig::parse_from(["spelstem"]);
        assert_eq!(config.effective_stt_language(), "nl");
        config.stt_language = "AUTO".to_string();
        assert_eq!(config.effective_stt_language(), "");
    }
}
