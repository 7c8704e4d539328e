use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::audio::{AudioFrame, AudioInput, ChunkBuffer};
use crate::capture::sequencer::{SequencerConfig, UploadSequencer};
use crate::upload::ChunkSink;

/// Capture lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureState {
    Idle,
    Recording,
    Paused,
    Stopping,
    Completed,
    Aborted,
    /// Device acquisition or finalize failed; only cancel is valid from here.
    Error,
}

/// Client-side capture failure
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("audio input unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("invalid {op} from capture state {from:?}")]
    InvalidTransition { from: CaptureState, op: &'static str },

    #[error("failed to start session: {0}")]
    SessionStart(String),

    #[error("finalize failed: {0}")]
    Finalize(String),
}

/// Capture controller tuning
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// One encoded chunk is emitted per interval while recording.
    pub chunk_interval: Duration,
    /// Hard session ceiling; reaching it auto-triggers the stop path.
    pub max_duration: Duration,
    /// Upload queue tuning.
    pub sequencer: SequencerConfig,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            chunk_interval: Duration::from_secs(10),
            max_duration: Duration::from_secs(60 * 60),
            sequencer: SequencerConfig::default(),
        }
    }
}

/// Snapshot of capture progress
#[derive(Debug, Clone, Serialize)]
pub struct CaptureStatus {
    pub state: CaptureState,
    pub session_id: Option<String>,
    pub chunks_emitted: usize,
    pub chunks_delivered: usize,
    pub chunks_failed: usize,
    pub elapsed_secs: f64,
}

enum Shutdown {
    Stop,
    Cancel,
}

/// Drives one dictation attempt: a finite-state recording lifecycle that
/// buffers PCM frames, emits one encoded chunk per interval into the upload
/// sequencer, and on stop flushes trailing audio, drains the queue, and
/// finalizes the session for the transcript.
///
/// One controller handles one attempt; after a terminal state a fresh
/// controller is the retry path.
pub struct CaptureController {
    config: CaptureConfig,
    sink: Arc<dyn ChunkSink>,
    input: Mutex<Option<Box<dyn AudioInput>>>,
    state: Arc<Mutex<CaptureState>>,
    paused: Arc<AtomicBool>,
    chunks_emitted: Arc<AtomicUsize>,
    session_id: Mutex<Option<String>>,
    sequencer: Mutex<Option<Arc<UploadSequencer>>>,
    driver: Mutex<Option<JoinHandle<()>>>,
    shutdown_tx: Mutex<Option<oneshot::Sender<Shutdown>>>,
    outcome: Arc<Mutex<Option<Result<String, CaptureError>>>>,
    transcript: Arc<Mutex<Option<String>>>,
    started_at: Mutex<Option<DateTime<Utc>>>,
}

impl CaptureController {
    pub fn new(
        config: CaptureConfig,
        input: Box<dyn AudioInput>,
        sink: Arc<dyn ChunkSink>,
    ) -> Self {
        Self {
            config,
            sink,
            input: Mutex::new(Some(input)),
            state: Arc::new(Mutex::new(CaptureState::Idle)),
            paused: Arc::new(AtomicBool::new(false)),
            chunks_emitted: Arc::new(AtomicUsize::new(0)),
            session_id: Mutex::new(None),
            sequencer: Mutex::new(None),
            driver: Mutex::new(None),
            shutdown_tx: Mutex::new(None),
            outcome: Arc::new(Mutex::new(None)),
            transcript: Arc::new(Mutex::new(None)),
            started_at: Mutex::new(None),
        }
    }

    /// Start the session and acquire the audio device.
    ///
    /// The session is started first so an entitlement denial never touches
    /// the device; a device failure after that cancels the session
    /// best-effort and leaves the controller in `Error`.
    pub async fn start(&self) -> Result<String, CaptureError> {
        {
            let state = self.state.lock().await;
            if *state != CaptureState::Idle {
                return Err(CaptureError::InvalidTransition {
                    from: *state,
                    op: "start",
                });
            }
        }

        let session_id = self
            .sink
            .start_session(None)
            .await
            .map_err(|e| CaptureError::SessionStart(e.to_string()))?;

        let mut input = self.input.lock().await.take().ok_or_else(|| {
            CaptureError::SessionStart("controller already consumed its audio input".to_string())
        })?;

        let frames = match input.start().await {
            Ok(frames) => frames,
            Err(e) => {
                *self.state.lock().await = CaptureState::Error;
                let sink = Arc::clone(&self.sink);
                let id = session_id.clone();
                tokio::spawn(async move {
                    if let Err(e) = sink.cancel(&id).await {
                        warn!(session = %id, "failed to cancel session after device error: {}", e);
                    }
                });
                return Err(CaptureError::DeviceUnavailable(e.to_string()));
            }
        };

        info!(session = %session_id, input = input.name(), "capture started");

        let sequencer = Arc::new(UploadSequencer::new(
            Arc::clone(&self.sink),
            session_id.clone(),
            self.config.sequencer.clone(),
        ));

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        *self.shutdown_tx.lock().await = Some(shutdown_tx);
        *self.session_id.lock().await = Some(session_id.clone());
        *self.sequencer.lock().await = Some(Arc::clone(&sequencer));
        *self.started_at.lock().await = Some(Utc::now());
        *self.state.lock().await = CaptureState::Recording;

        let driver = Driver {
            session_id: session_id.clone(),
            chunk_interval: self.config.chunk_interval,
            max_duration: self.config.max_duration,
            input,
            frames,
            sequencer,
            sink: Arc::clone(&self.sink),
            state: Arc::clone(&self.state),
            paused: Arc::clone(&self.paused),
            chunks_emitted: Arc::clone(&self.chunks_emitted),
            outcome: Arc::clone(&self.outcome),
            transcript: Arc::clone(&self.transcript),
            shutdown: shutdown_rx,
        };
        *self.driver.lock().await = Some(tokio::spawn(driver.run()));

        Ok(session_id)
    }

    /// Suspend chunk emission and frame buffering without releasing the
    /// device.
    pub async fn pause(&self) -> Result<(), CaptureError> {
        let mut state = self.state.lock().await;
        if *state != CaptureState::Recording {
            return Err(CaptureError::InvalidTransition {
                from: *state,
                op: "pause",
            });
        }
        *state = CaptureState::Paused;
        self.paused.store(true, Ordering::SeqCst);
        info!("capture paused");
        Ok(())
    }

    pub async fn resume(&self) -> Result<(), CaptureError> {
        let mut state = self.state.lock().await;
        if *state != CaptureState::Paused {
            return Err(CaptureError::InvalidTransition {
                from: *state,
                op: "resume",
            });
        }
        *state = CaptureState::Recording;
        self.paused.store(false, Ordering::SeqCst);
        info!("capture resumed");
        Ok(())
    }

    /// Stop recording: flush trailing audio, drain the upload queue, and
    /// finalize the session. Returns the assembled transcript.
    pub async fn stop(&self) -> Result<String, CaptureError> {
        {
            let mut state = self.state.lock().await;
            match *state {
                CaptureState::Recording | CaptureState::Paused => {
                    *state = CaptureState::Stopping;
                }
                from => {
                    return Err(CaptureError::InvalidTransition { from, op: "stop" });
                }
            }
        }

        if let Some(tx) = self.shutdown_tx.lock().await.take() {
            let _ = tx.send(Shutdown::Stop);
        }
        if let Some(driver) = self.driver.lock().await.take() {
            if let Err(e) = driver.await {
                error!("capture driver panicked: {}", e);
            }
        }

        match self.outcome.lock().await.take() {
            Some(outcome) => outcome,
            None => Err(CaptureError::Finalize(
                "capture ended without a finalize outcome".to_string(),
            )),
        }
    }

    /// Abandon the attempt: immediate and non-blocking. Queued and in-flight
    /// deliveries are dropped, the device is released by the driver, and the
    /// server-side cancel is fired without awaiting settlement.
    pub async fn cancel(&self) -> Result<(), CaptureError> {
        {
            let mut state = self.state.lock().await;
            match *state {
                CaptureState::Completed | CaptureState::Aborted => {
                    return Err(CaptureError::InvalidTransition {
                        from: *state,
                        op: "cancel",
                    });
                }
                _ => *state = CaptureState::Aborted,
            }
        }

        if let Some(sequencer) = self.sequencer.lock().await.as_ref() {
            sequencer.abort();
        }
        if let Some(tx) = self.shutdown_tx.lock().await.take() {
            let _ = tx.send(Shutdown::Cancel);
        }

        if let Some(session_id) = self.session_id.lock().await.clone() {
            let sink = Arc::clone(&self.sink);
            tokio::spawn(async move {
                if let Err(e) = sink.cancel(&session_id).await {
                    warn!(session = %session_id, "server-side cancel failed: {}", e);
                }
            });
        }

        info!("capture cancelled");
        Ok(())
    }

    pub async fn status(&self) -> CaptureStatus {
        let state = *self.state.lock().await;
        let session_id = self.session_id.lock().await.clone();
        let elapsed_secs = match *self.started_at.lock().await {
            Some(started_at) => {
                Utc::now().signed_duration_since(started_at).num_milliseconds() as f64 / 1000.0
            }
            None => 0.0,
        };
        let (chunks_delivered, chunks_failed) = match self.sequencer.lock().await.as_ref() {
            Some(sequencer) => (sequencer.delivered(), sequencer.failed()),
            None => (0, 0),
        };

        CaptureStatus {
            state,
            session_id,
            chunks_emitted: self.chunks_emitted.load(Ordering::SeqCst),
            chunks_delivered,
            chunks_failed,
            elapsed_secs,
        }
    }

    /// Transcript from a completed attempt, retained for auto-stopped
    /// sessions whose caller never went through `stop()`.
    pub async fn transcript(&self) -> Option<String> {
        self.transcript.lock().await.clone()
    }
}

/// The single event-driven task behind a recording: selects over incoming
/// frames, the chunk ticker, the max-duration deadline, capacity signals,
/// and shutdown commands.
struct Driver {
    session_id: String,
    chunk_interval: Duration,
    max_duration: Duration,
    input: Box<dyn AudioInput>,
    frames: mpsc::Receiver<AudioFrame>,
    sequencer: Arc<UploadSequencer>,
    sink: Arc<dyn ChunkSink>,
    state: Arc<Mutex<CaptureState>>,
    paused: Arc<AtomicBool>,
    chunks_emitted: Arc<AtomicUsize>,
    outcome: Arc<Mutex<Option<Result<String, CaptureError>>>>,
    transcript: Arc<Mutex<Option<String>>>,
    shutdown: oneshot::Receiver<Shutdown>,
}

impl Driver {
    async fn run(self) {
        let Driver {
            session_id,
            chunk_interval,
            max_duration,
            mut input,
            mut frames,
            sequencer,
            sink,
            state,
            paused,
            chunks_emitted,
            outcome,
            transcript,
            mut shutdown,
        } = self;

        let mut buffer = ChunkBuffer::new();
        let mut ticker = tokio::time::interval_at(
            tokio::time::Instant::now() + chunk_interval,
            chunk_interval,
        );
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let deadline = tokio::time::sleep(max_duration);
        tokio::pin!(deadline);
        let mut capacity = sequencer.capacity_watch();
        let mut capacity_open = true;

        let finalize = loop {
            tokio::select! {
                command = &mut shutdown => match command {
                    Ok(Shutdown::Cancel) => break false,
                    // Stop, or the controller was dropped mid-recording.
                    _ => break true,
                },
                _ = &mut deadline => {
                    info!(session = %session_id, "maximum session duration reached, stopping");
                    break true;
                }
                changed = capacity.changed(), if capacity_open => match changed {
                    Ok(()) if *capacity.borrow() => {
                        warn!(session = %session_id, "part capacity reached, stopping");
                        break true;
                    }
                    Ok(()) => {}
                    Err(_) => capacity_open = false,
                },
                frame = frames.recv() => match frame {
                    Some(frame) => {
                        if !paused.load(Ordering::SeqCst) {
                            buffer.push_frame(&frame);
                        }
                    }
                    None => {
                        warn!(session = %session_id, "audio input stream ended, stopping");
                        break true;
                    }
                },
                _ = ticker.tick() => {
                    if !paused.load(Ordering::SeqCst) {
                        emit_chunk(&mut buffer, &sequencer, &chunks_emitted, &session_id).await;
                    }
                }
            }
        };

        if finalize {
            *state.lock().await = CaptureState::Stopping;

            // Flush buffered-but-not-yet-emitted audio as a final chunk.
            emit_chunk(&mut buffer, &sequencer, &chunks_emitted, &session_id).await;
            sequencer.drain().await;

            if let Err(e) = input.stop().await {
                warn!(session = %session_id, "failed to release audio input: {}", e);
            }

            match sink.finalize(&session_id).await {
                Ok(text) => {
                    info!(session = %session_id, chars = text.len(), "capture finalized");
                    *transcript.lock().await = Some(text.clone());
                    *outcome.lock().await = Some(Ok(text));
                    *state.lock().await = CaptureState::Completed;
                }
                Err(e) => {
                    error!(session = %session_id, "finalize failed: {}", e);
                    *outcome.lock().await = Some(Err(CaptureError::Finalize(e.to_string())));
                    *state.lock().await = CaptureState::Error;
                }
            }
        } else {
            // Cancelled: discard everything, just release the device.
            if let Err(e) = input.stop().await {
                warn!(session = %session_id, "failed to release audio input: {}", e);
            }
        }
    }
}

async fn emit_chunk(
    buffer: &mut ChunkBuffer,
    sequencer: &UploadSequencer,
    chunks_emitted: &AtomicUsize,
    session_id: &str,
) {
    match buffer.take_chunk() {
        Ok(Some(chunk)) => {
            debug!(
                session = session_id,
                duration_ms = chunk.duration_ms,
                samples = chunk.samples,
                "chunk encoded"
            );
            chunks_emitted.fetch_add(1, Ordering::SeqCst);
            if sequencer.enqueue(chunk).await.is_err() {
                warn!(session = session_id, "upload queue is gone, dropping chunk");
            }
        }
        Ok(None) => {}
        Err(e) => error!(session = session_id, "failed to encode chunk: {}", e),
    }
}
