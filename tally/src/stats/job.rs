use uuid::Uuid;

use crate::stats::identity::CounterIdentity;
use crate::stats::kind::CounterKind;

/// One already-summed unit of work: add `value` to the stored total of
/// `(entity_id, kind)`.
///
/// Built by the flush step from a single coalescing-map entry and never merged
/// again afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct Job {
    pub entity_id: Uuid,
    pub kind: CounterKind,
    pub value: f64,
}

impl Job {
    pub fn new(identity: CounterIdentity, value: f64) -> Self {
        Self {
            entity_id: identity.entity_id,
            kind: identity.kind,
            value,
        }
    }

    pub fn identity(&self) -> CounterIdentity {
        CounterIdentity::new(self.entity_id, self.kind)
    }
}
