use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

/// Storage side of the engine.
///
/// `apply_delta` must behave as one atomic "insert with `amount`, or add
/// `amount` to the stored value" keyed by `(entity_id, kind_id)`. The engine
/// calls it from a single task, one job at a time.
#[async_trait]
pub trait StatisticsRepository: Send + Sync {
    async fn apply_delta(&self, entity_id: &Uuid, kind_id: u16, amount: f64) -> Result<()>;
}
