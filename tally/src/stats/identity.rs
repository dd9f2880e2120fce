use uuid::Uuid;

use crate::stats::kind::CounterKind;

/// Key a pending delta is aggregated against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CounterIdentity {
    pub entity_id: Uuid,
    pub kind: CounterKind,
}

impl CounterIdentity {
    pub fn new(entity_id: Uuid, kind: CounterKind) -> Self {
        Self { entity_id, kind }
    }
}
