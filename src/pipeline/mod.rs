//! Update pipeline: a bounded job queue drained by a pool of workers.
//!
//! Producers enqueue without blocking; each worker takes the next run of
//! jobs (up to [`BATCH_MAX`]) and issues a single `batch_update`, so one
//! changeset-mutex acquisition covers the whole run. On stop the queue
//! closes, workers drain what remains, then exit.

/// Thin ingestion façade over the pipeline.
pub mod view;

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{MayflyError, Result};
use crate::index::EventIndex;
use crate::metrics;
use crate::types::EventTuple;

pub use view::IndexView;

/// Jobs drained per worker wakeup.
const BATCH_MAX: usize = 256;

/// One ingestion job: every tuple derived from a single document.
#[derive(Debug)]
pub struct UpdateJob {
    pub tuples: Vec<EventTuple>,
}

/// Fixed pool of workers behind a bounded queue.
pub struct UpdatePipeline {
    sender: Mutex<Option<mpsc::Sender<UpdateJob>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    queue_size: usize,
}

impl UpdatePipeline {
    /// Start `worker_count` workers over a queue of `queue_size` jobs.
    #[must_use]
    pub fn start(index: Arc<EventIndex>, worker_count: usize, queue_size: usize) -> Self {
        let (tx, rx) = mpsc::channel::<UpdateJob>(queue_size);
        let rx = Arc::new(tokio::sync::Mutex::new(rx));

        let workers = (0..worker_count.max(1))
            .map(|worker_id| {
                let index = index.clone();
                let rx = rx.clone();
                tokio::spawn(async move {
                    worker_loop(worker_id, index, rx).await;
                })
            })
            .collect();

        info!(worker_count, queue_size, "update pipeline started");
        Self {
            sender: Mutex::new(Some(tx)),
            workers: Mutex::new(workers),
            queue_size,
        }
    }

    /// Hand a job to the queue without blocking.
    ///
    /// Fails with [`MayflyError::QueueFull`] under back-pressure (the caller
    /// may retry) and [`MayflyError::PipelineStopped`] after `stop`.
    pub fn enqueue(&self, job: UpdateJob) -> Result<()> {
        let guard = self.sender.lock().expect("pipeline sender lock");
        let Some(tx) = guard.as_ref() else {
            return Err(MayflyError::PipelineStopped);
        };
        match tx.try_send(job) {
            Ok(()) => {
                metrics::UPDATE_QUEUE_DEPTH
                    .set((self.queue_size - tx.capacity()) as i64);
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(_)) => Err(MayflyError::QueueFull),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(MayflyError::PipelineStopped),
        }
    }

    /// Jobs currently waiting in the queue.
    #[must_use]
    pub fn queue_depth(&self) -> usize {
        let guard = self.sender.lock().expect("pipeline sender lock");
        guard
            .as_ref()
            .map(|tx| self.queue_size - tx.capacity())
            .unwrap_or(0)
    }

    /// Close the queue and wait for workers to drain it and exit. Further
    /// enqueues are rejected.
    pub async fn stop(&self) {
        let sender = self.sender.lock().expect("pipeline sender lock").take();
        drop(sender);

        let workers = std::mem::take(&mut *self.workers.lock().expect("pipeline workers lock"));
        for (worker_id, handle) in workers.into_iter().enumerate() {
            if let Err(e) = handle.await {
                warn!(worker_id, error = %e, "update worker join failed");
            }
        }
        metrics::UPDATE_QUEUE_DEPTH.set(0);
        info!("update pipeline stopped");
    }
}

/// Worker body: take the next run of jobs, stage them in one batch.
async fn worker_loop(
    worker_id: usize,
    index: Arc<EventIndex>,
    rx: Arc<tokio::sync::Mutex<mpsc::Receiver<UpdateJob>>>,
) {
    loop {
        let mut jobs: Vec<UpdateJob> = Vec::new();
        let received = {
            let mut rx = rx.lock().await;
            rx.recv_many(&mut jobs, BATCH_MAX).await
        };
        if received == 0 {
            // Queue closed and fully drained.
            break;
        }

        let tuples: Vec<EventTuple> = jobs
            .iter()
            .flat_map(|job| job.tuples.iter().copied())
            .collect();
        let staged = index.batch_update(&tuples);
        debug!(worker_id, jobs = received, staged, "staged update batch");
    }
    debug!(worker_id, "update worker exited");
}
