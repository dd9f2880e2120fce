use dashmap::DashMap;
use parking_lot::{RwLock, RwLockReadGuard};

use crate::stats::CounterIdentity;

/// Pending deltas keyed by identity, merged in place between flushes.
///
/// Writers share the outer lock and merge through a single `DashMap` entry
/// upsert, so concurrent increments only contend on the shard holding their
/// key. `take` grabs the outer lock exclusively just long enough to swap in an
/// empty map: every merge either completed before the swap (and is in the
/// returned map) or starts after it (and lands in the fresh one).
#[derive(Default)]
pub struct CoalescingMap {
    live: RwLock<DashMap<CounterIdentity, f64>>,
}

/// Shared access to the live map. Held for the duration of one merge.
pub struct MergeGuard<'a> {
    map: RwLockReadGuard<'a, DashMap<CounterIdentity, f64>>,
}

impl MergeGuard<'_> {
    pub fn merge(&self, identity: CounterIdentity, amount: f64) {
        *self.map.entry(identity).or_insert(0.0) += amount;
    }
}

impl CoalescingMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pins the current map against a concurrent swap.
    pub fn writer(&self) -> MergeGuard<'_> {
        MergeGuard {
            map: self.live.read(),
        }
    }

    pub fn merge(&self, identity: CounterIdentity, amount: f64) {
        self.writer().merge(identity, amount);
    }

    /// Swaps the live map for an empty one and returns everything pending.
    pub fn take(&self) -> DashMap<CounterIdentity, f64> {
        std::mem::take(&mut *self.live.write())
    }

    pub fn pending(&self, identity: &CounterIdentity) -> Option<f64> {
        self.live.read().get(identity).map(|v| *v)
    }

    pub fn len(&self) -> usize {
        self.live.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
