//! Audio resampling built on rubato's FFT resampler.
//!
//! The capture path resamples streaming chunks as the device delivers them;
//! the playback path resamples whole synthesized answers in one batch.

use std::sync::Arc;

use anyhow::{Context, Result};
use audioadapter_buffers::direct::InterleavedSlice;
use parking_lot::Mutex;
use rubato::{Fft, FixedSync, Resampler};

/// FFT chunk size: a good quality/latency balance for speech.
const CHUNK_SIZE: usize = 1024;

/// Sub-chunks per FFT chunk (more = better quality, more CPU).
const SUB_CHUNKS: usize = 2;

fn make_resampler(from_rate: u32, to_rate: u32) -> Result<Fft<f32>> {
    Fft::<f32>::new(from_rate as usize, to_rate as usize, CHUNK_SIZE, SUB_CHUNKS, 1, FixedSync::Input).context("Failed to create resampler")
}

/// Streaming resampler state shared with an audio callback.
///
/// Device callbacks deliver arbitrary chunk sizes; input is buffered until a
/// full FFT chunk is available.
pub struct ResamplerState {
    resampler: Fft<f32>,
    pending: Vec<f32>,
    output: Vec<f32>,
    output_max: usize,
}

impl ResamplerState {
    /// Create streaming state for a fixed rate conversion.
    ///
    /// # Errors
    /// Fails when rubato rejects the rate combination.
    pub fn new(from_rate: u32, to_rate: u32) -> Result<Arc<Mutex<Self>>> {
        let resampler = make_resampler(from_rate, to_rate)?;
        let output_max = resampler.output_frames_max();

        Ok(Arc::new(Mutex::new(Self {
            resampler,
            pending: Vec::with_capacity(CHUNK_SIZE * 2),
            output: vec![0.0f32; output_max],
            output_max,
        })))
    }

    /// Feed samples; returns resampled audio once a full chunk is ready.
    pub fn process_samples(&mut self, samples: &[f32]) -> Option<Vec<f32>> {
        self.pending.extend_from_slice(samples);
        if self.pending.len() < CHUNK_SIZE {
            return None;
        }

        let chunk: Vec<f32> = self.pending.drain(..CHUNK_SIZE).collect();
        let input = InterleavedSlice::new(&chunk, 1, CHUNK_SIZE).ok()?;
        let mut output = InterleavedSlice::new_mut(&mut self.output, 1, self.output_max).ok()?;

        let (_, written) = self.resampler.process_into_buffer(&input, &mut output, None).ok()?;
        if written > 0 { Some(self.output[..written].to_vec()) } else { None }
    }
}

/// Resample a whole buffer from one sample rate to another.
///
/// # Errors
/// Fails when rubato rejects the rate combination or a chunk fails to
/// process.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    if from_rate == to_rate {
        return Ok(samples.to_vec());
    }

    let mut resampler = make_resampler(from_rate, to_rate)?;
    let output_max = resampler.output_frames_max();
    let mut scratch = vec![0.0f32; output_max];

    let expected_len = (samples.len() as f64 * to_rate as f64 / from_rate as f64) as usize;
    let mut output = Vec::with_capacity(expected_len + CHUNK_SIZE);

    for chunk in samples.chunks(CHUNK_SIZE) {
        // The final chunk is zero-padded up to the FFT size
        let padded;
        let chunk = if chunk.len() == CHUNK_SIZE {
            chunk
        } else {
            padded = {
                let mut buf = chunk.to_vec();
                buf.resize(CHUNK_SIZE, 0.0);
                buf
            };
            &padded[..]
        };

        let input = InterleavedSlice::new(chunk, 1, CHUNK_SIZE).context("Failed to create input adapter")?;
        let mut out = InterleavedSlice::new_mut(&mut scratch, 1, output_max).context("Failed to create output adapter")?;

        let (_, written) = resampler.process_into_buffer(&input, &mut out, None).map_err(|e| anyhow::anyhow!("Resampling error: {}", e))?;
        output.extend_from_slice(&scratch[..written]);
    }

    // Drop most of the padding the final chunk introduced
    output.truncate(expected_len + 100);
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_rates_pass_through() {
        let samples = vec![0.5f32; 1000];
        assert_eq!(resample(&samples, 22050, 22050).unwrap(), samples);
    }

    #[test]
    fn upsampling_scales_the_length() {
        // 22.05kHz voice output to a 44.1kHz device (2x)
        let samples = vec![0.0; 22050]; // 1 second
        let result = resample(&samples, 22050, 44100).unwrap();
        assert!(result.len() >= 44100 && result.len() <= 44200, "got {}", result.len());
    }

    #[test]
    fn downsampling_scales_the_length() {
        // 48kHz microphone to the 16kHz recognition rate (1/3x)
        let samples = vec![0.0; 48000]; // 1 second
        let result = resample(&samples, 48000, 16000).unwrap();
        assert!(result.len() >= 15900 && result.len() <= 16100, "got {}", result.len());
    }
}
