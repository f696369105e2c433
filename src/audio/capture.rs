//! Microphone capture using cpal.
//!
//! The cpal callback pushes mono samples into a lock-free ring buffer; a
//! drain thread pops them and hands them to the consumer callback (the VAD).
//! Resampling is applied when the device cannot run at the recognition rate.
//! A `muted` flag silences capture while an answer is playing, so the
//! assistant never hears itself (half-duplex).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Stream, StreamConfig};
use ringbuf::HeapRb;
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use tracing::{debug, info, warn};

use super::resampler::ResamplerState;
use super::util::{find_best_config, get_device_name, mix_to_mono};

/// Ring buffer capacity: ~4 seconds of audio at 16kHz.
const CAPTURE_RING_SIZE: usize = 65536;

/// Read chunk for the drain thread.
const DRAIN_CHUNK: usize = 2048;

/// Streams microphone samples to a consumer callback.
pub struct Capturer {
    stream: Stream,
    running: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
    drain_handle: Option<JoinHandle<()>>,
}

impl Capturer {
    /// Open the default input device and wire it to `callback`.
    ///
    /// Capture stays paused until [`Capturer::start`] is called.
    ///
    /// # Errors
    /// Fails when no input device exists, when the device reports no usable
    /// F32 configuration, or when the stream cannot be built.
    pub fn new<F>(sample_rate: u32, callback: F) -> Result<Self>
    where
        F: Fn(&[f32]) + Send + 'static,
    {
        let host = cpal::default_host();
        let device = host.default_input_device().context("No input device available")?;
        info!("Using input device: {}", get_device_name(&device));

        let supported = device.supported_input_configs().context("Failed to get supported input configs")?;
        let config = find_best_config(supported, sample_rate)?;
        let device_rate = config.sample_rate();
        let channels = config.channels() as usize;

        if device_rate != sample_rate {
            info!("Resampling microphone input {} Hz -> {} Hz", device_rate, sample_rate);
        }
        debug!("Capture config: {} Hz, {} channels, {:?}", device_rate, channels, config.sample_format());

        let ring = HeapRb::<f32>::new(CAPTURE_RING_SIZE);
        let (mut producer, mut ring_consumer) = ring.split();

        let resampler = if device_rate == sample_rate { None } else { Some(ResamplerState::new(device_rate, sample_rate)?) };

        let running = Arc::new(AtomicBool::new(false));
        let shutdown = Arc::new(AtomicBool::new(false));

        let running_for_stream = running.clone();
        let stream_config: StreamConfig = config.config();

        let stream = device.build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                if !running_for_stream.load(Ordering::Relaxed) {
                    return;
                }

                let mono = mix_to_mono(data, channels);
                let ready = match &resampler {
                    Some(state) => state.lock().process_samples(&mono),
                    None => Some(mono),
                };

                if let Some(samples) = ready {
                    let written = producer.push_slice(&samples);
                    if written < samples.len() {
                        // Consumer fell behind; count drops and log sparsely
                        static DROPPED: AtomicU64 = AtomicU64::new(0);
                        let dropped = DROPPED.fetch_add(1, Ordering::Relaxed);
                        if dropped.is_multiple_of(100) {
                            warn!("Capture ring full, dropped {} chunks so far", dropped + 1);
                        }
                    }
                }
            },
            |err| tracing::error!("Audio capture error: {}", err),
            None,
        )?;

        // Drain thread: pop the ring and hand samples to the VAD callback.
        // The VAD path is fast, so one thread keeps up comfortably.
        let drain_running = running.clone();
        let drain_shutdown = shutdown.clone();
        let drain_handle = std::thread::spawn(move || {
            let mut buffer = vec![0.0f32; DRAIN_CHUNK];

            while !drain_shutdown.load(Ordering::Relaxed) {
                if !drain_running.load(Ordering::Relaxed) {
                    // Muted while an answer plays
                    std::thread::sleep(Duration::from_millis(10));
                    continue;
                }

                let available = ring_consumer.occupied_len();
                if available == 0 {
                    // Short sleep keeps latency low without spinning
                    std::thread::sleep(Duration::from_micros(100));
                    continue;
                }

                let take = available.min(buffer.len());
                let read = ring_consumer.pop_slice(&mut buffer[..take]);
                if read > 0 {
                    callback(&buffer[..read]);
                }
            }
            debug!("Capture drain thread exiting");
        });

        info!("Audio capture configured: device {} Hz -> output {} Hz", device_rate, sample_rate);

        Ok(Self { stream, running, shutdown, drain_handle: Some(drain_handle) })
    }

    /// Start (or resume) capturing audio.
    pub fn start(&mut self) -> Result<()> {
        self.running.store(true, Ordering::SeqCst);
        self.stream.play().context("Failed to start audio stream")?;
        info!("Audio capture started");
        Ok(())
    }

    /// Permanently stop capture and join the drain thread.
    pub fn shutdown(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
        let _ = self.stream.pause();

        if let Some(handle) = self.drain_handle.take() {
            if let Err(e) = handle.join() {
                warn!("Failed to join capture drain thread: {:?}", e);
            }
        }

        info!("Audio capture stopped");
    }

    /// Clone of the running flag, used to mute the microphone during playback.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }
}

impl Drop for Capturer {
    fn drop(&mut self) {
        self.shutdown();
    }
}
