//! Fixed-size pool of workers draining a shared FIFO of track work.
//!
//! All jobs share the same pool. Each worker runs one track to completion
//! before popping the next, so at most `workers` tracks are ever in flight.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::pipeline::{TrackPipeline, TrackWork};
use crate::server::metrics;

pub const MIN_WORKERS: usize = 1;
pub const MAX_WORKERS: usize = 8;
pub const DEFAULT_WORKERS: usize = 3;

/// Clamp a configured pool size into `[MIN_WORKERS, MAX_WORKERS]`.
pub fn clamp_workers(requested: usize) -> usize {
    requested.clamp(MIN_WORKERS, MAX_WORKERS)
}

type SharedQueue = Arc<AsyncMutex<mpsc::UnboundedReceiver<TrackWork>>>;

pub struct WorkerPool {
    workers: usize,
    sender: mpsc::UnboundedSender<TrackWork>,
    queued: Arc<AtomicUsize>,
    active_workers: Arc<AtomicUsize>,
    cancellation_token: CancellationToken,
    tasks: parking_lot::Mutex<Option<JoinSet<()>>>,
}

impl WorkerPool {
    /// Spawn `workers` (clamped) long-lived workers on the current runtime.
    pub fn start(workers: usize, pipeline: Arc<TrackPipeline>) -> Self {
        let workers = clamp_workers(workers);
        let (sender, receiver) = mpsc::unbounded_channel();
        let queue: SharedQueue = Arc::new(AsyncMutex::new(receiver));
        let queued = Arc::new(AtomicUsize::new(0));
        let active_workers = Arc::new(AtomicUsize::new(0));
        let cancellation_token = CancellationToken::new();

        info!("Starting playlist worker pool with {} workers", workers);

        let mut join_set = JoinSet::new();
        for i in 0..workers {
            let queue = queue.clone();
            let pipeline = pipeline.clone();
            let queued = queued.clone();
            let active_workers = active_workers.clone();
            let cancellation_token = cancellation_token.clone();

            join_set.spawn(async move {
                debug!("Playlist worker {} started", i);
                loop {
                    let next = tokio::select! {
                        _ = cancellation_token.cancelled() => None,
                        work = async { queue.lock().await.recv().await } => work,
                    };
                    let Some(work) = next else {
                        break;
                    };
                    queued.fetch_sub(1, Ordering::SeqCst);

                    active_workers.fetch_add(1, Ordering::SeqCst);
                    let busy = metrics::worker_busy();

                    pipeline.run(&work).await;

                    drop(busy);
                    active_workers.fetch_sub(1, Ordering::SeqCst);
                }
                debug!("Playlist worker {} stopped", i);
            });
        }

        Self {
            workers,
            sender,
            queued,
            active_workers,
            cancellation_token,
            tasks: parking_lot::Mutex::new(Some(join_set)),
        }
    }

    /// Enqueue track work. Items are served first in, first out.
    pub fn submit(&self, work: TrackWork) {
        self.queued.fetch_add(1, Ordering::SeqCst);
        if self.sender.send(work).is_err() {
            self.queued.fetch_sub(1, Ordering::SeqCst);
            warn!("Worker pool is stopped, dropping track work");
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Workers currently running a track.
    pub fn active_workers(&self) -> usize {
        self.active_workers.load(Ordering::SeqCst)
    }

    /// Work items waiting for a worker.
    pub fn queued(&self) -> usize {
        self.queued.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        !self.cancellation_token.is_cancelled()
    }

    /// Stop pulling new work and wait for the workers to exit.
    ///
    /// A worker in the middle of a track finishes it first.
    pub async fn shutdown(&self) {
        info!("Stopping playlist worker pool");
        self.cancellation_token.cancel();

        let join_set = self.tasks.lock().take();
        if let Some(mut join_set) = join_set {
            while join_set.join_next().await.is_some() {}
        }

        info!("Playlist worker pool stopped");
    }
}
