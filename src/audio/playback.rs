//! Speaker playback using cpal.
//!
//! Answers are queued into a lock-free ring buffer that the cpal callback
//! drains; [`Player::play`] blocks until the queue is empty, so the spoken
//! message and its follow-up phrase come out strictly in order. When the
//! device runs at a different rate than the voice model, the samples are
//! resampled up front.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex as StdMutex};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Stream, StreamConfig};
use parking_lot::Mutex;
use ringbuf::HeapRb;
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use tracing::{debug, info, warn};

use super::resampler::resample;
use super::util::{find_best_config, get_device_name};

/// Ring buffer capacity: ~5 seconds at 48kHz, plenty for one spoken answer.
const ANSWER_RING_SIZE: usize = 262144;

/// How long to wait on the completion condvar per iteration.
const COMPLETION_POLL: Duration = Duration::from_millis(50);

/// Plays mono audio through the default output device.
pub struct Player {
    /// Kept alive to maintain the audio stream
    _stream: Stream,
    device_rate: u32,
    voice_rate: u32,
    /// Queue side of the ring buffer (mutex serializes writers)
    queue: Mutex<ringbuf::HeapProd<f32>>,
    /// Set on drop; the callback then emits silence
    stopped: Arc<AtomicBool>,
    playing: Arc<AtomicBool>,
    /// Condvar signaled by the callback when the queue drains
    done_lock: Arc<StdMutex<()>>,
    done: Arc<Condvar>,
}

impl Player {
    /// Open the default output device for samples at `voice_rate`.
    ///
    /// # Errors
    /// Fails when no output device exists, when the device reports no usable
    /// F32 configuration, or when the stream cannot be built.
    pub fn new(voice_rate: u32) -> Result<Self> {
        let host = cpal::default_host();
        let device = host.default_output_device().context("No output device available")?;
        info!("Using output device: {}", get_device_name(&device));

        // Run the device at its preferred rate and resample into it
        let device_rate = match device.default_output_config() {
            Ok(preferred) => preferred.sample_rate(),
            Err(_) => {
                let supported = device.supported_output_configs().context("Failed to get supported output configs")?;
                find_best_config(supported, 48000)?.sample_rate()
            }
        };

        let supported = device.supported_output_configs().context("Failed to get supported output configs")?;
        let config = find_best_config(supported, device_rate)?;
        let channels = config.channels() as usize;
        let stream_config: StreamConfig = config.config();

        if device_rate != voice_rate {
            info!("Resampling playback {} Hz -> {} Hz", voice_rate, device_rate);
        }
        debug!("Playback config: {} Hz, {} channels, {:?}", device_rate, channels, config.sample_format());

        let ring = HeapRb::<f32>::new(ANSWER_RING_SIZE);
        let (producer, mut ring_consumer) = ring.split();

        let stopped = Arc::new(AtomicBool::new(false));
        let playing = Arc::new(AtomicBool::new(false));
        let done_lock = Arc::new(StdMutex::new(()));
        let done = Arc::new(Condvar::new());

        let stopped_cb = stopped.clone();
        let playing_cb = playing.clone();
        let done_lock_cb = done_lock.clone();
        let done_cb = done.clone();

        let stream = device.build_output_stream(
            &stream_config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let silenced = stopped_cb.load(Ordering::Relaxed);

                for frame in data.chunks_mut(channels) {
                    let sample = if silenced { 0.0 } else { ring_consumer.try_pop().unwrap_or(0.0) };
                    // Mono fan-out to every channel
                    frame.fill(sample);
                }

                if ring_consumer.is_empty() || silenced {
                    playing_cb.store(false, Ordering::SeqCst);
                    let _guard = done_lock_cb.lock().unwrap();
                    done_cb.notify_all();
                }
            },
            |err| tracing::error!("Audio playback error: {}", err),
            None,
        )?;

        stream.play().context("Failed to start playback stream")?;

        Ok(Self {
            _stream: stream,
            device_rate,
            voice_rate,
            queue: Mutex::new(producer),
            stopped,
            playing,
            done_lock,
            done,
        })
    }

    /// Queue samples and block until they have been played.
    ///
    /// Returns `true` when playback ran to completion, `false` on timeout or
    /// shutdown.
    pub fn play(&self, samples: &[f32]) -> bool {
        if samples.is_empty() {
            return true;
        }

        let queued = self.prepare(samples);
        {
            let mut queue = self.queue.lock();
            let written = queue.push_slice(&queued);
            if written < queued.len() {
                warn!("Playback queue overflow, dropped {} samples", queued.len() - written);
            }
        }
        self.playing.store(true, Ordering::SeqCst);
        debug!("Playing {} samples at {} Hz", queued.len(), self.device_rate);

        // Deadline guards against a stalled device
        let duration = Duration::from_secs_f64(queued.len() as f64 / self.device_rate as f64);
        let deadline = Instant::now() + duration + Duration::from_secs(1);

        while self.playing.load(Ordering::Relaxed) {
            if self.stopped.load(Ordering::Relaxed) {
                debug!("Playback stopped during shutdown");
                return false;
            }
            if Instant::now() > deadline {
                warn!("Playback timeout exceeded");
                return false;
            }

            let guard = self.done_lock.lock().unwrap();
            let _unused = self.done.wait_timeout(guard, COMPLETION_POLL).unwrap();
        }

        debug!("Playback completed");
        true
    }

    /// Resample to the device rate when needed.
    fn prepare(&self, samples: &[f32]) -> Vec<f32> {
        if self.device_rate == self.voice_rate {
            return samples.to_vec();
        }
        match resample(samples, self.voice_rate, self.device_rate) {
            Ok(resampled) => resampled,
            Err(e) => {
                tracing::error!("Resampling failed: {}, playing without resampling", e);
                samples.to_vec()
            }
        }
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.playing.store(false, Ordering::SeqCst);
    }
}
