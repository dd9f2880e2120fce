use tokio::sync::mpsc::{self, Receiver, Sender, error::TryRecvError, error::TrySendError};

use crate::stats::Job;

/// Creates the bounded FIFO between the flush step and the worker.
///
/// `capacity` is clamped to at least 1.
pub fn job_queue(capacity: usize) -> (JobSender, JobReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (JobSender { tx }, JobReceiver { rx })
}

/// Producer half. Never waits for room.
#[derive(Clone)]
pub struct JobSender {
    tx: Sender<Job>,
}

impl JobSender {
    /// Enqueues `job` if there is room. `false` means the job was not
    /// accepted (queue full or worker gone) and has been dropped.
    pub fn offer(&self, job: Job) -> bool {
        match self.tx.try_send(job) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) | Err(TrySendError::Closed(_)) => false,
        }
    }

    /// Jobs currently waiting.
    pub fn depth(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }
}

/// Consumer half, owned by the worker loop.
pub struct JobReceiver {
    rx: Receiver<Job>,
}

impl JobReceiver {
    /// Pulls up to `max` jobs without waiting.
    pub fn poll_batch(&mut self, max: usize) -> Vec<Job> {
        let mut out = Vec::with_capacity(max.min(self.rx.len()));
        while out.len() < max {
            match self.rx.try_recv() {
                Ok(job) => out.push(job),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        out
    }
}
