use std::sync::atomic::{AtomicU8, Ordering};

/// Engine lifecycle: `Stopped -> Running -> ShuttingDown -> Stopped`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum LifecycleState {
    Stopped = 0,
    Running = 1,
    ShuttingDown = 2,
}

impl LifecycleState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => LifecycleState::Running,
            2 => LifecycleState::ShuttingDown,
            _ => LifecycleState::Stopped,
        }
    }
}

/// Worker loop lifecycle: `NotStarted -> Running -> Draining -> Stopped`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkerState {
    NotStarted = 0,
    Running = 1,
    Draining = 2,
    Stopped = 3,
}

impl WorkerState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => WorkerState::Running,
            2 => WorkerState::Draining,
            3 => WorkerState::Stopped,
            _ => WorkerState::NotStarted,
        }
    }
}

pub struct Lifecycle(AtomicU8);

impl Lifecycle {
    pub fn new() -> Self {
        Self(AtomicU8::new(LifecycleState::Stopped as u8))
    }

    pub fn get(&self) -> LifecycleState {
        LifecycleState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn is_running(&self) -> bool {
        self.get() == LifecycleState::Running
    }

    pub fn set(&self, s: LifecycleState) {
        self.0.store(s as u8, Ordering::Release);
    }

    /// Atomic `from -> to`. Returns the observed state on failure.
    pub fn transition(&self, from: LifecycleState, to: LifecycleState) -> Result<(), LifecycleState> {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(LifecycleState::from_u8)
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

pub struct WorkerStatus(AtomicU8);

impl WorkerStatus {
    pub fn new() -> Self {
        Self(AtomicU8::new(WorkerState::NotStarted as u8))
    }

    pub fn get(&self) -> WorkerState {
        WorkerState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn set(&self, s: WorkerState) {
        self.0.store(s as u8, Ordering::Release);
    }

    /// `NotStarted -> Running`; a drain requested before the worker got
    /// scheduled is left in place.
    pub fn mark_started(&self) {
        let _ = self.0.compare_exchange(
            WorkerState::NotStarted as u8,
            WorkerState::Running as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    pub fn is_draining(&self) -> bool {
        self.get() == WorkerState::Draining
    }

    /// Asks the worker to drain and exit.
    ///
    /// Also covers a worker that has not been polled yet: it will observe
    /// `Draining` on its first iteration.
    pub fn request_drain(&self) {
        let _ = self.0.fetch_update(Ordering::AcqRel, Ordering::Acquire, |v| {
            match WorkerState::from_u8(v) {
                WorkerState::NotStarted | WorkerState::Running => {
                    Some(WorkerState::Draining as u8)
                }
                WorkerState::Draining | WorkerState::Stopped => None,
            }
        });
    }
}

impl Default for WorkerStatus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_only_from_expected_state() {
        let l = Lifecycle::new();
        assert_eq!(
            l.transition(LifecycleState::Running, LifecycleState::ShuttingDown),
            Err(LifecycleState::Stopped)
        );

        l.set(LifecycleState::Running);
        assert!(l.is_running());
        assert_eq!(
            l.transition(LifecycleState::Running, LifecycleState::ShuttingDown),
            Ok(())
        );
        assert_eq!(l.get(), LifecycleState::ShuttingDown);
    }

    #[test]
    fn drain_request_is_sticky_and_never_resurrects_stopped() {
        let w = WorkerStatus::new();
        w.request_drain();
        assert_eq!(w.get(), WorkerState::Draining);

        w.set(WorkerState::Stopped);
        w.request_drain();
        assert_eq!(w.get(), WorkerState::Stopped);
    }
}
