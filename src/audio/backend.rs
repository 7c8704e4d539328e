use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Audio sample data (16-bit PCM, interleaved)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

/// Configuration for an audio input
#[derive(Debug, Clone)]
pub struct InputConfig {
    /// Sample rate in Hz (STT services expect 16kHz)
    pub sample_rate: u32,
    /// Number of channels (1 = mono, 2 = stereo)
    pub channels: u16,
    /// Frame size in milliseconds (affects latency)
    pub frame_duration_ms: u64,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
            frame_duration_ms: 100,
        }
    }
}

/// Audio input device trait
///
/// Device acquisition failure is the one way a capture session can fail
/// before any network resource is allocated, so `start` is fallible and the
/// controller maps its error to `DeviceUnavailable`.
#[async_trait::async_trait]
pub trait AudioInput: Send + Sync {
    /// Acquire the device and start capturing.
    ///
    /// Returns a channel receiver that will receive audio frames.
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>>;

    /// Release the device and stop capturing.
    async fn stop(&mut self) -> Result<()>;

    /// Check if the input is currently capturing
    fn is_capturing(&self) -> bool;

    /// Input name for logging
    fn name(&self) -> &str;
}

/// Audio input source type
#[derive(Debug, Clone)]
pub enum InputSource {
    /// Physical capture device (platform integration lives behind this seam)
    Device,
    /// Generated tone, for tests and offline runs
    Synthetic { freq_hz: f32 },
}

/// Audio input factory
pub struct AudioInputFactory;

impl AudioInputFactory {
    pub fn create(source: InputSource, config: InputConfig) -> Result<Box<dyn AudioInput>> {
        match source {
            InputSource::Device => {
                anyhow::bail!("no audio capture device is available on this build")
            }
            InputSource::Synthetic { freq_hz } => {
                Ok(Box::new(SyntheticInput::new(config, freq_hz)))
            }
        }
    }
}

/// Generated sine-tone input.
///
/// Emits one frame every `frame_duration_ms` of wall time, so capture timing
/// behaves like a real device.
pub struct SyntheticInput {
    config: InputConfig,
    freq_hz: f32,
    running: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl SyntheticInput {
    pub fn new(config: InputConfig, freq_hz: f32) -> Self {
        Self {
            config,
            freq_hz,
            running: Arc::new(AtomicBool::new(false)),
            task: None,
        }
    }
}

#[async_trait::async_trait]
impl AudioInput for SyntheticInput {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.running.swap(true, Ordering::SeqCst) {
            anyhow::bail!("synthetic input already started");
        }

        let (tx, rx) = mpsc::channel(32);
        let config = self.config.clone();
        let freq_hz = self.freq_hz;
        let running = Arc::clone(&self.running);

        self.task = Some(tokio::spawn(async move {
            let samples_per_frame = (config.sample_rate as u64 * config.frame_duration_ms
                / 1000) as usize
                * config.channels as usize;

            let mut ticker =
                tokio::time::interval(Duration::from_millis(config.frame_duration_ms));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            let mut timestamp_ms = 0u64;
            let mut phase = 0usize;

            while running.load(Ordering::SeqCst) {
                ticker.tick().await;

                let mut samples = Vec::with_capacity(samples_per_frame);
                for i in 0..samples_per_frame {
                    let t = (phase + i) as f32 / config.sample_rate as f32;
                    let value = (t * freq_hz * 2.0 * std::f32::consts::PI).sin();
                    samples.push((value * i16::MAX as f32 * 0.3) as i16);
                }
                phase += samples_per_frame;

                let frame = AudioFrame {
                    samples,
                    sample_rate: config.sample_rate,
                    channels: config.channels,
                    timestamp_ms,
                };
                timestamp_ms += config.frame_duration_ms;

                if tx.send(frame).await.is_err() {
                    break;
                }
            }
        }));

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        self.running.store(false, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}
