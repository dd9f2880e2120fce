//! Single consumer of the job queue.
//!
//! Applies jobs to the repository one at a time, so this subsystem never has
//! more than one write in flight. Every job is isolated: an error or a panic
//! inside the repository is logged and counted, and the loop moves on.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tracing::{debug, error, info};

use common::logger::warn_if_slow;

use crate::engine::lifecycle::{WorkerState, WorkerStatus};
use crate::engine::queue::JobReceiver;
use crate::metrics::counters::Counters;
use crate::persistence::StatisticsRepository;
use crate::stats::Job;

pub struct Worker {
    repo: Arc<dyn StatisticsRepository>,
    counters: Counters,
    status: Arc<WorkerStatus>,
    batch_size: usize,
    idle_sleep: Duration,
    slow_apply_threshold: Duration,
}

impl Worker {
    pub fn new(
        repo: Arc<dyn StatisticsRepository>,
        counters: Counters,
        status: Arc<WorkerStatus>,
        batch_size: usize,
        idle_sleep: Duration,
        slow_apply_threshold: Duration,
    ) -> Self {
        Self {
            repo,
            counters,
            status,
            batch_size: batch_size.max(1),
            idle_sleep,
            slow_apply_threshold,
        }
    }

    /// Worker loop.
    ///
    /// Runs until a drain has been requested and a poll issued after seeing
    /// the request comes back empty. Reading the flag *before* polling matters:
    /// everything enqueued ahead of the request is then guaranteed visible to
    /// that poll.
    pub async fn run(self, mut rx: JobReceiver) {
        self.status.mark_started();
        info!(component = "worker", batch_size = self.batch_size, event = "startup");

        loop {
            let draining = self.status.is_draining();
            let batch = rx.poll_batch(self.batch_size);

            if batch.is_empty() {
                if draining {
                    break;
                }
                tokio::time::sleep(self.idle_sleep).await;
                continue;
            }

            debug!(jobs = batch.len(), draining, "applying batch");

            for job in &batch {
                self.apply(job).await;
            }
        }

        self.status.set(WorkerState::Stopped);
        info!(component = "worker", event = "stopped", "queue drained; worker exiting");
    }

    /// Applies one job. Returns whether it was persisted.
    pub async fn apply(&self, job: &Job) -> bool {
        let write = self
            .repo
            .apply_delta(&job.entity_id, job.kind.id(), job.value);

        let outcome = warn_if_slow(
            "apply_delta",
            self.slow_apply_threshold,
            AssertUnwindSafe(write).catch_unwind(),
        )
        .await;

        match outcome {
            Ok(Ok(())) => {
                Counters::bump(&self.counters.processed_jobs);
                true
            }
            Ok(Err(e)) => {
                Counters::bump(&self.counters.failed_jobs);
                error!(
                    error = ?e,
                    entity_id = %job.entity_id,
                    kind = %job.kind,
                    value = job.value,
                    "unable to apply statistic delta"
                );
                false
            }
            Err(_) => {
                Counters::bump(&self.counters.failed_jobs);
                error!(
                    entity_id = %job.entity_id,
                    kind = %job.kind,
                    value = job.value,
                    "repository panicked while applying statistic delta"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::queue::job_queue;
    use crate::stats::CounterKind;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::atomic::Ordering;
    use uuid::Uuid;

    /// Records applied jobs; fails (or panics) for chosen entities.
    #[derive(Default)]
    struct FlakyRepo {
        applied: Mutex<Vec<(Uuid, u16, f64)>>,
        fail_for: Option<Uuid>,
        panic_for: Option<Uuid>,
    }

    #[async_trait]
    impl StatisticsRepository for FlakyRepo {
        async fn apply_delta(&self, entity_id: &Uuid, kind_id: u16, amount: f64) -> anyhow::Result<()> {
            if self.fail_for == Some(*entity_id) {
                return Err(anyhow::anyhow!("disk I/O error"));
            }
            if self.panic_for == Some(*entity_id) {
                panic!("driver bug");
            }
            self.applied.lock().push((*entity_id, kind_id, amount));
            Ok(())
        }
    }

    fn job(n: u128) -> Job {
        Job {
            entity_id: Uuid::from_u128(n),
            kind: CounterKind::FoodConsumed,
            value: 1.0,
        }
    }

    fn worker(repo: Arc<FlakyRepo>, counters: Counters, status: Arc<WorkerStatus>) -> Worker {
        Worker::new(
            repo,
            counters,
            status,
            4,
            Duration::from_millis(5),
            Duration::from_secs(1),
        )
    }

    #[tokio::test]
    async fn one_failing_job_does_not_stop_the_batch() {
        let repo = Arc::new(FlakyRepo {
            fail_for: Some(Uuid::from_u128(3)),
            ..Default::default()
        });
        let counters = Counters::default();
        let status = Arc::new(WorkerStatus::new());

        let (tx, rx) = job_queue(16);
        for n in 1..=6 {
            assert!(tx.offer(job(n)));
        }
        status.request_drain();

        worker(repo.clone(), counters.clone(), status.clone()).run(rx).await;

        assert_eq!(repo.applied.lock().len(), 5);
        assert_eq!(counters.processed_jobs.load(Ordering::Relaxed), 5);
        assert_eq!(counters.failed_jobs.load(Ordering::Relaxed), 1);
        assert_eq!(status.get(), WorkerState::Stopped);
    }

    #[tokio::test]
    async fn panicking_repository_is_contained() {
        let repo = Arc::new(FlakyRepo {
            panic_for: Some(Uuid::from_u128(1)),
            ..Default::default()
        });
        let counters = Counters::default();
        let w = worker(repo.clone(), counters.clone(), Arc::new(WorkerStatus::new()));

        assert!(!w.apply(&job(1)).await);
        assert!(w.apply(&job(2)).await);

        assert_eq!(counters.failed_jobs.load(Ordering::Relaxed), 1);
        assert_eq!(counters.processed_jobs.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn jobs_are_applied_in_queue_order() {
        let repo = Arc::new(FlakyRepo::default());
        let status = Arc::new(WorkerStatus::new());
        let (tx, rx) = job_queue(16);
        for n in 1..=9 {
            assert!(tx.offer(job(n)));
        }
        status.request_drain();

        worker(repo.clone(), Counters::default(), status).run(rx).await;

        let order: Vec<u128> = repo.applied.lock().iter().map(|(id, _, _)| id.as_u128()).collect();
        assert_eq!(order, (1..=9).collect::<Vec<_>>());
    }

    #[tokio::test(start_paused = true)]
    async fn idle_worker_keeps_polling_until_drain_requested() {
        let repo = Arc::new(FlakyRepo::default());
        let status = Arc::new(WorkerStatus::new());
        let (tx, rx) = job_queue(16);

        let handle = tokio::spawn(worker(repo.clone(), Counters::default(), status.clone()).run(rx));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(status.get(), WorkerState::Running);

        assert!(tx.offer(job(1)));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(repo.applied.lock().len(), 1);

        status.request_drain();
        handle.await.unwrap();
        assert_eq!(status.get(), WorkerState::Stopped);
    }
}
