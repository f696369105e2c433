//! Shared audio utilities for capture and playback.

use anyhow::Result;
use cpal::traits::DeviceTrait;
use cpal::{Device, SampleFormat, SupportedStreamConfig, SupportedStreamConfigRange};

/// Get a human-readable device name.
pub fn get_device_name(device: &Device) -> String {
    device.description().ok().map(|desc| desc.name().to_string()).unwrap_or_else(|| "Unknown".to_string())
}

/// Pick the best matching stream configuration: F32 samples, at most two
/// channels, at the target sample rate when the device supports it and the
/// nearest supported rate otherwise.
///
/// # Errors
/// Fails when the device offers no F32 configuration at all.
pub fn find_best_config(configs: impl Iterator<Item = SupportedStreamConfigRange>, target_rate: u32) -> Result<SupportedStreamConfig> {
    let candidates: Vec<SupportedStreamConfigRange> = configs.filter(|c| c.channels() <= 2 && c.sample_format() == SampleFormat::F32).collect();

    if candidates.is_empty() {
        anyhow::bail!("No F32 audio configuration found - this is unexpected on modern hardware");
    }

    if let Some(exact) = candidates.iter().find(|c| target_rate >= c.min_sample_rate() && target_rate <= c.max_sample_rate()) {
        return Ok((*exact).with_sample_rate(target_rate));
    }

    // No range covers the target; clamp to the nearest edge of the first one
    let fallback = &candidates[0];
    let rate = if target_rate < fallback.min_sample_rate() { fallback.min_sample_rate() } else { fallback.max_sample_rate() };
    Ok((*fallback).with_sample_rate(rate))
}

/// Mix interleaved samples down to mono.
///
/// Mono input is copied; multi-channel frames are averaged.
pub fn mix_to_mono(data: &[f32], channels: usize) -> Vec<f32> {
    if channels == 1 {
        data.to_vec()
    } else {
        data.chunks(channels).map(|frame| frame.iter().sum::<f32>() / channels as f32).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mono_passes_through() {
        let data = vec![0.25f32, -0.5, 1.0];
        assert_eq!(mix_to_mono(&data, 1), data);
    }

    #[test]
    fn stereo_averages_channels() {
        let data = vec![0.5f32, 1.0, -0.5, -1.0];
        let result = mix_to_mono(&data, 2);
        assert_eq!(result, vec![0.75, -0.75]);
    }
}
