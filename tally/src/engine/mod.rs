//! Counters aggregation engine.
//!
//! Data flow:
//! caller -> [`CoalescingMap`] (merge) -> flush scheduler (fixed cadence)
//! -> bounded job queue -> worker -> [`StatisticsRepository`].
//!
//! Guarantees:
//! - `increment` never blocks on I/O and never fails loudly.
//! - Increments to the same identity between two flushes are fully summed.
//! - Memory is bounded by the queue capacity; overflow drops jobs (counted).
//! - `shutdown` returns only after every admitted increment was applied or
//!   individually failed.

pub mod coalescing;
pub mod flush;
pub mod lifecycle;
pub mod queue;
pub mod worker;

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::RejectReason;
use crate::metrics::counters::{Counters, Diagnostics};
use crate::persistence::StatisticsRepository;
use crate::stats::{CounterIdentity, CounterKind};

use coalescing::CoalescingMap;
use flush::{FlushReport, flush_pending, run_flush_scheduler};
use lifecycle::{Lifecycle, LifecycleState, WorkerState, WorkerStatus};
use queue::{JobSender, job_queue};
use worker::Worker;

struct Shared {
    lifecycle: Lifecycle,
    worker: Arc<WorkerStatus>,
    pending: Arc<CoalescingMap>,
    queue: JobSender,
    counters: Counters,
    config: EngineConfig,

    flush_stop: Arc<Notify>,
    tasks: Mutex<Option<EngineTasks>>,
}

struct EngineTasks {
    flush: JoinHandle<()>,
    worker: JoinHandle<()>,
}

impl Drop for Shared {
    // Last handle gone without `shutdown()`: stop the background tasks. The
    // worker still drains what is already queued; unflushed deltas are lost.
    fn drop(&mut self) {
        self.flush_stop.notify_one();
        self.worker.request_drain();
    }
}

/// Handle to a running aggregation engine.
///
/// Cheap to clone; all clones drive the same engine. Construct it once in the
/// composition root and pass it to whatever reports events.
#[derive(Clone)]
pub struct StatsEngine {
    shared: Arc<Shared>,
}

impl StatsEngine {
    /// Spawns the flush scheduler and the worker on the current tokio runtime
    /// and returns a running engine.
    ///
    /// # Panics
    /// When called outside a tokio runtime.
    pub fn start(repo: Arc<dyn StatisticsRepository>, config: EngineConfig) -> Self {
        let counters = Counters::default();
        let (queue, rx) = job_queue(config.queue_capacity);
        let worker_status = Arc::new(WorkerStatus::new());
        let pending = Arc::new(CoalescingMap::new());
        let flush_stop = Arc::new(Notify::new());

        let shared = Arc::new(Shared {
            lifecycle: Lifecycle::new(),
            worker: worker_status.clone(),
            pending: pending.clone(),
            queue: queue.clone(),
            counters: counters.clone(),
            config: config.clone(),
            flush_stop: flush_stop.clone(),
            tasks: Mutex::new(None),
        });

        let worker = Worker::new(
            repo,
            counters.clone(),
            worker_status,
            config.batch_size,
            config.idle_sleep,
            config.slow_apply_threshold,
        );

        let worker_task = tokio::spawn(worker.run(rx));
        let flush_task = tokio::spawn(run_flush_scheduler(
            pending,
            queue,
            counters,
            config.flush_interval,
            flush_stop,
        ));

        *shared.tasks.lock() = Some(EngineTasks {
            flush: flush_task,
            worker: worker_task,
        });
        shared.lifecycle.set(LifecycleState::Running);

        info!(
            flush_interval_ms = config.flush_interval.as_millis() as u64,
            queue_capacity = config.queue_capacity,
            batch_size = config.batch_size,
            "stats engine started"
        );

        Self { shared }
    }

    /// Adds `amount` to the pending delta of `(entity_id, kind)`.
    ///
    /// Fire-and-forget: invalid input and calls made once shutdown has begun
    /// are dropped (and counted), never reported to the caller.
    pub fn increment(&self, entity_id: Uuid, kind: CounterKind, amount: f64) {
        if let Err(reason) = self.try_increment(entity_id, kind, amount) {
            self.reject(entity_id, Some(kind), amount, reason);
        }
    }

    /// [`increment`](Self::increment) for callers holding a raw kind id.
    /// Unknown ids are dropped like any other invalid input.
    pub fn increment_by_id(&self, entity_id: Uuid, kind_id: u16, amount: f64) {
        match CounterKind::from_id(kind_id) {
            Some(kind) => self.increment(entity_id, kind, amount),
            None => self.reject(entity_id, None, amount, RejectReason::UnknownKind(kind_id)),
        }
    }

    /// Counts one occurrence of `kind` for `entity_id`.
    pub fn record(&self, entity_id: Uuid, kind: CounterKind) {
        self.increment(entity_id, kind, 1.0);
    }

    fn try_increment(&self, entity_id: Uuid, kind: CounterKind, amount: f64) -> Result<(), RejectReason> {
        if entity_id.is_nil() {
            return Err(RejectReason::NilEntity);
        }
        if !amount.is_finite() {
            return Err(RejectReason::NonFiniteAmount);
        }

        // The state check happens under the merge guard: shutdown flips the
        // state before taking the final swap, so anything admitted here is
        // captured by that swap at the latest.
        let guard = self.shared.pending.writer();
        if !self.shared.lifecycle.is_running() {
            return Err(RejectReason::NotRunning);
        }
        guard.merge(CounterIdentity::new(entity_id, kind), amount);

        Ok(())
    }

    fn reject(&self, entity_id: Uuid, kind: Option<CounterKind>, amount: f64, reason: RejectReason) {
        Counters::bump(&self.shared.counters.rejected_increments);

        let kind = kind.map(|k| k.name()).unwrap_or("unknown");
        match reason {
            RejectReason::NotRunning => warn!(
                %entity_id,
                kind,
                amount,
                state = ?self.shared.lifecycle.get(),
                "increment rejected; engine is not running"
            ),
            _ => debug!(%entity_id, kind, amount, %reason, "invalid increment ignored"),
        }
    }

    /// Flushes right now instead of waiting for the next tick.
    pub fn flush_now(&self) -> FlushReport {
        flush_pending(
            &self.shared.pending,
            &self.shared.queue,
            &self.shared.counters,
        )
    }

    /// Stops accepting increments, flushes what is pending and waits until the
    /// worker has applied (or failed) every queued job.
    ///
    /// The drain itself runs as its own task, started by whichever caller wins
    /// the `Running -> ShuttingDown` transition; every caller only waits for
    /// `Stopped`. Dropping or timing out this future therefore never leaves
    /// the engine half shut down, and a later call picks up the wait.
    ///
    /// There is no timeout: a repository that never returns keeps this future
    /// pending forever.
    #[instrument(skip(self), target = "engine")]
    pub async fn shutdown(&self) {
        let shared = &self.shared;

        match shared
            .lifecycle
            .transition(LifecycleState::Running, LifecycleState::ShuttingDown)
        {
            Ok(()) => {
                tokio::spawn(drain_and_stop(shared.clone()));
            }
            Err(LifecycleState::ShuttingDown) => {
                debug!("shutdown already in progress; waiting for drain");
            }
            Err(state) => {
                debug!(?state, "shutdown called on an engine that is not running");
                return;
            }
        }

        while shared.lifecycle.get() != LifecycleState::Stopped {
            tokio::time::sleep(shared.config.drain_poll_interval).await;
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.shared.lifecycle.get()
    }

    pub fn diagnostics(&self) -> Diagnostics {
        self.shared.counters.snapshot(self.shared.queue.depth())
    }

    /// Delta merged for `(entity_id, kind)` since the last flush, if any.
    pub fn pending_delta(&self, entity_id: Uuid, kind: CounterKind) -> Option<f64> {
        self.shared
            .pending
            .pending(&CounterIdentity::new(entity_id, kind))
    }
}

/// Shutdown sequence after the `ShuttingDown` transition: stop the flush
/// scheduler, flush once more, drain the worker, then enter `Stopped`.
async fn drain_and_stop(shared: Arc<Shared>) {
    info!(
        pending = shared.pending.len(),
        queue_depth = shared.queue.depth(),
        "shutting down stats engine"
    );

    let (flush_task, worker_task) = shared
        .tasks
        .lock()
        .take()
        .map(|t| (t.flush, t.worker))
        .unzip();

    // No scheduled flush may race the final one.
    shared.flush_stop.notify_one();
    if let Some(h) = flush_task {
        if let Err(e) = h.await {
            error!(error = ?e, "flush scheduler task failed");
        }
    }

    let report = flush_pending(&shared.pending, &shared.queue, &shared.counters);
    debug!(?report, "final flush");

    shared.worker.request_drain();
    while shared.worker.get() != WorkerState::Stopped {
        if worker_task.as_ref().is_some_and(|h| h.is_finished()) {
            error!("worker exited without draining the queue");
            break;
        }
        tokio::time::sleep(shared.config.drain_poll_interval).await;
    }
    if let Some(h) = worker_task {
        if let Err(e) = h.await {
            error!(error = ?e, "worker task failed");
        }
    }

    shared.lifecycle.set(LifecycleState::Stopped);

    let d = shared.counters.snapshot(shared.queue.depth());
    info!(
        processed_jobs = d.processed_jobs,
        failed_jobs = d.failed_jobs,
        dropped_jobs = d.dropped_jobs,
        "stats engine stopped"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::time::Duration;
    use tracing_test::traced_test;

    struct NullRepo;

    #[async_trait]
    impl StatisticsRepository for NullRepo {
        async fn apply_delta(&self, _: &Uuid, _: u16, _: f64) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn engine() -> StatsEngine {
        StatsEngine::start(
            Arc::new(NullRepo),
            EngineConfig {
                flush_interval: Duration::from_secs(3_600),
                idle_sleep: Duration::from_millis(1),
                drain_poll_interval: Duration::from_millis(1),
                ..EngineConfig::default()
            },
        )
    }

    #[tokio::test]
    async fn rejection_reasons() {
        let e = engine();
        let a = Uuid::new_v4();

        assert_eq!(
            e.try_increment(Uuid::nil(), CounterKind::Jumped, 1.0),
            Err(RejectReason::NilEntity)
        );
        assert_eq!(
            e.try_increment(a, CounterKind::Jumped, f64::NAN),
            Err(RejectReason::NonFiniteAmount)
        );
        assert_eq!(e.try_increment(a, CounterKind::Jumped, 1.0), Ok(()));

        e.shutdown().await;

        assert_eq!(
            e.try_increment(a, CounterKind::Jumped, 1.0),
            Err(RejectReason::NotRunning)
        );
    }

    #[tokio::test]
    #[traced_test]
    async fn post_shutdown_increment_is_logged_as_warning() {
        let e = engine();
        e.shutdown().await;

        e.record(Uuid::new_v4(), CounterKind::IdleKicks);

        assert!(logs_contain("increment rejected; engine is not running"));
        assert_eq!(e.diagnostics().rejected_increments, 1);
    }

    #[tokio::test]
    async fn start_enters_running_and_shutdown_stops() {
        let e = engine();
        assert_eq!(e.state(), LifecycleState::Running);

        e.record(Uuid::new_v4(), CounterKind::EnderPearlUsed);
        e.shutdown().await;

        assert_eq!(e.state(), LifecycleState::Stopped);
        assert_eq!(e.diagnostics().processed_jobs, 1);
    }
}
