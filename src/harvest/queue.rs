//! Bounded FIFO of fetch jobs shared between the producer and the workers.
//!
//! The producer half blocks when the buffer is full. The consumer half can be
//! cloned freely; each job is handed to exactly one consumer. Once every
//! [`JobSender`] is dropped (or the queue is closed from the consumer side)
//! and the buffer is drained, [`JobReceiver::pop`] returns `None`.

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};

use crate::model::FetchJob;

#[derive(Error, Debug, PartialEq, Eq)]
#[error("job queue is closed")]
pub struct QueueClosed(pub FetchJob);

/// Creates a queue that buffers at most `capacity` jobs (minimum 1).
pub fn bounded(capacity: usize) -> (JobSender, JobReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        JobSender { tx },
        JobReceiver {
            rx: Arc::new(Mutex::new(rx)),
        },
    )
}

/// Producer half. Dropping it (or calling [`JobSender::close`]) closes the queue.
#[derive(Debug)]
pub struct JobSender {
    tx: mpsc::Sender<FetchJob>,
}

impl JobSender {
    /// Enqueues `job`, waiting while the buffer is full.
    pub async fn push(&self, job: FetchJob) -> Result<(), QueueClosed> {
        self.tx.send(job).await.map_err(|e| QueueClosed(e.0))
    }

    /// Signals that no more jobs will be produced.
    pub fn close(self) {
        drop(self);
    }
}

/// Consumer half, shared by all workers.
#[derive(Debug, Clone)]
pub struct JobReceiver {
    rx: Arc<Mutex<mpsc::Receiver<FetchJob>>>,
}

impl JobReceiver {
    /// Takes the next job, waiting while the queue is empty but open.
    /// Returns `None` once the queue is closed and drained.
    ///
    /// The consumer lock is held while waiting, so [`JobReceiver::abort`] only
    /// runs once the waiting consumer gets a job or the producer closes.
    pub async fn pop(&self) -> Option<FetchJob> {
        self.rx.lock().await.recv().await
    }

    /// Closes the queue from the consumer side and discards buffered jobs.
    /// A producer blocked in [`JobSender::push`] wakes up with [`QueueClosed`].
    /// Returns the number of jobs discarded.
    pub async fn abort(&self) -> usize {
        let mut rx = self.rx.lock().await;
        rx.close();
        let mut discarded = 0;
        while rx.try_recv().is_ok() {
            discarded += 1;
        }
        discarded
    }
}
