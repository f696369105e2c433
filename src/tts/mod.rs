//! Text-to-speech module using sherpa-rs.
//!
//! Provides Dutch speech synthesis using Piper (VITS) voices.

mod synthesizer;

pub use synthesizer::Synthesizer;
