use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch, Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::audio::EncodedChunk;
use crate::error::SessionError;
use crate::upload::{ChunkSink, SinkError};

/// Upload sequencer tuning
#[derive(Debug, Clone)]
pub struct SequencerConfig {
    /// Bounded queue depth; enqueue backpressures beyond this.
    pub queue_depth: usize,
    /// Per-delivery timeout; an expired delivery counts as failed.
    pub delivery_timeout: Duration,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            queue_depth: 16,
            delivery_timeout: Duration::from_secs(30),
        }
    }
}

enum Job {
    Deliver(EncodedChunk),
    Flush(oneshot::Sender<()>),
}

/// Ordered chunk uploader: a bounded single-consumer queue with one worker
/// task that awaits each delivery to settlement before starting the next.
///
/// This makes the server-observed append order structurally equal to the
/// enqueue order, no matter how individual network calls jitter. A failed
/// delivery is logged and skipped; losing one chunk degrades that segment of
/// the transcript instead of aborting the whole session.
pub struct UploadSequencer {
    tx: mpsc::Sender<Job>,
    abort: Arc<Notify>,
    delivered: Arc<AtomicUsize>,
    failed: Arc<AtomicUsize>,
    capacity_rx: watch::Receiver<bool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl UploadSequencer {
    pub fn new(sink: Arc<dyn ChunkSink>, session_id: String, config: SequencerConfig) -> Self {
        let (tx, mut rx) = mpsc::channel::<Job>(config.queue_depth);
        let (capacity_tx, capacity_rx) = watch::channel(false);
        let abort = Arc::new(Notify::new());
        let delivered = Arc::new(AtomicUsize::new(0));
        let failed = Arc::new(AtomicUsize::new(0));

        let worker = tokio::spawn({
            let abort = Arc::clone(&abort);
            let delivered = Arc::clone(&delivered);
            let failed = Arc::clone(&failed);
            let delivery_timeout = config.delivery_timeout;

            async move {
                debug!(session = %session_id, "upload worker started");

                loop {
                    let job = tokio::select! {
                        _ = abort.notified() => break,
                        job = rx.recv() => match job {
                            Some(job) => job,
                            None => break,
                        },
                    };

                    match job {
                        Job::Flush(done) => {
                            let _ = done.send(());
                        }
                        Job::Deliver(chunk) => {
                            let delivery = tokio::time::timeout(
                                delivery_timeout,
                                sink.append(&session_id, chunk.bytes, chunk.encoding),
                            );

                            // Abort drops the in-flight delivery future.
                            let settled = tokio::select! {
                                _ = abort.notified() => break,
                                settled = delivery => settled,
                            };

                            match settled {
                                Ok(Ok(index)) => {
                                    delivered.fetch_add(1, Ordering::SeqCst);
                                    debug!(session = %session_id, index, "chunk delivered");
                                }
                                Ok(Err(SinkError::Rejected(
                                    SessionError::CapacityExceeded(_),
                                ))) => {
                                    failed.fetch_add(1, Ordering::SeqCst);
                                    warn!(
                                        session = %session_id,
                                        "server rejected chunk: session is at part capacity"
                                    );
                                    let _ = capacity_tx.send(true);
                                }
                                Ok(Err(e)) => {
                                    failed.fetch_add(1, Ordering::SeqCst);
                                    warn!(
                                        session = %session_id,
                                        "chunk delivery failed, continuing: {}",
                                        e
                                    );
                                }
                                Err(_) => {
                                    failed.fetch_add(1, Ordering::SeqCst);
                                    warn!(
                                        session = %session_id,
                                        "chunk delivery timed out after {:?}, continuing",
                                        delivery_timeout
                                    );
                                }
                            }
                        }
                    }
                }

                debug!(session = %session_id, "upload worker stopped");
            }
        });

        Self {
            tx,
            abort,
            delivered,
            failed,
            capacity_rx,
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Queue one chunk for ordered delivery. Backpressures when the queue is
    /// full; fails only if the worker is gone.
    pub async fn enqueue(&self, chunk: EncodedChunk) -> anyhow::Result<()> {
        self.tx
            .send(Job::Deliver(chunk))
            .await
            .map_err(|_| anyhow::anyhow!("upload worker is no longer running"))
    }

    /// Resolve once every previously enqueued delivery has settled,
    /// successfully or not. Must run before finalize, otherwise trailing
    /// chunks could be silently missing from the transcript.
    pub async fn drain(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(Job::Flush(done_tx)).await.is_err() {
            return;
        }
        let _ = done_rx.await;
    }

    /// Stop immediately: queued jobs and the in-flight delivery are dropped.
    pub fn abort(&self) {
        self.abort.notify_one();
    }

    /// Wait for the worker task to exit (after abort or channel close).
    pub async fn join(&self) {
        if let Some(worker) = self.worker.lock().await.take() {
            let _ = worker.await;
        }
    }

    pub fn delivered(&self) -> usize {
        self.delivered.load(Ordering::SeqCst)
    }

    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    /// Whether the server reported the session at part capacity.
    pub fn capacity_reached(&self) -> bool {
        *self.capacity_rx.borrow()
    }

    /// Watch flipping to `true` when capacity is reached, so the capture
    /// controller can auto-stop.
    pub fn capacity_watch(&self) -> watch::Receiver<bool> {
        self.capacity_rx.clone()
    }
}
