use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

use crate::engine::coalescing::CoalescingMap;
use crate::engine::queue::JobSender;
use crate::metrics::counters::Counters;
use crate::stats::Job;

/// Outcome of one flush.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub offered: usize,
    pub enqueued: usize,
    pub dropped: usize,
}

/// Turns everything pending into jobs and hands them to the queue.
///
/// Never blocks: a job that does not fit is dropped and counted as failed.
#[instrument(skip_all, target = "flush")]
pub fn flush_pending(pending: &CoalescingMap, queue: &JobSender, counters: &Counters) -> FlushReport {
    let drained = pending.take();
    if drained.is_empty() {
        return FlushReport::default();
    }

    Counters::bump(&counters.flushes);

    let mut report = FlushReport::default();

    for (identity, value) in drained {
        report.offered += 1;

        if queue.offer(Job::new(identity, value)) {
            report.enqueued += 1;
            continue;
        }

        report.dropped += 1;
        Counters::bump(&counters.failed_jobs);
        Counters::bump(&counters.dropped_jobs);

        warn!(
            entity_id = %identity.entity_id,
            kind = %identity.kind,
            value,
            queue_capacity = queue.capacity(),
            "job queue full; dropping job"
        );
    }

    debug!(
        offered = report.offered,
        enqueued = report.enqueued,
        dropped = report.dropped,
        queue_depth = queue.depth(),
        "flush complete"
    );

    report
}

/// Flush loop (fixed cadence, independent of load).
///
/// The first flush happens one full `interval` after start. Returns once
/// `stop` is notified; a flush in progress always completes first.
pub async fn run_flush_scheduler(
    pending: Arc<CoalescingMap>,
    queue: JobSender,
    counters: Counters,
    interval: Duration,
    stop: Arc<Notify>,
) {
    info!(interval_ms = interval.as_millis() as u64, "flush scheduler started");

    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = stop.notified() => break,
            _ = ticker.tick() => {
                flush_pending(&pending, &queue, &counters);
            }
        }
    }

    info!("flush scheduler stopped");
}
