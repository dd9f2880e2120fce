use anyhow::{Context, anyhow};
use async_trait::async_trait;
use sqlx::{AnyPool, Row};
use uuid::Uuid;

use crate::persistence::repository::StatisticsRepository;
use crate::stats::CounterKind;

/// SQLx-backed implementation of StatisticsRepository.
/// Responsible only for persistence and row mapping.
pub struct SqlxStatisticsRepository {
    pool: AnyPool,
}

/// One persisted total.
#[derive(Clone, Debug, PartialEq)]
pub struct StatisticRow {
    pub kind: CounterKind,
    pub value: f64,
}

impl SqlxStatisticsRepository {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }

    /// Stored total for one identity, `None` if nothing was ever applied.
    pub async fn fetch_value(
        &self,
        entity_id: &Uuid,
        kind: CounterKind,
    ) -> anyhow::Result<Option<f64>> {
        let row = sqlx::query(
            r#"
SELECT value
FROM player_statistics
WHERE player_uuid = ? AND statistic_type = ?;
"#,
        )
        .bind(entity_id.to_string())
        .bind(i64::from(kind.id()))
        .fetch_optional(&self.pool)
        .await
        .context("fetch statistic value")?;

        Ok(row.map(|r| r.get::<f64, _>("value")))
    }

    /// All stored totals for one entity, ordered by kind id.
    pub async fn fetch_for_entity(&self, entity_id: &Uuid) -> anyhow::Result<Vec<StatisticRow>> {
        let rows = sqlx::query(
            r#"
SELECT statistic_type, value
FROM player_statistics
WHERE player_uuid = ?
ORDER BY statistic_type;
"#,
        )
        .bind(entity_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("fetch statistics for entity")?;

        let mut out = Vec::with_capacity(rows.len());
        for r in rows {
            match row_to_statistic(&r) {
                Ok(s) => out.push(s),
                Err(e) => {
                    // rows written by a newer release may carry kinds we don't know
                    tracing::warn!(error = %e, %entity_id, "skipping unreadable statistic row");
                }
            }
        }

        Ok(out)
    }
}

#[async_trait]
impl StatisticsRepository for SqlxStatisticsRepository {
    async fn apply_delta(&self, entity_id: &Uuid, kind_id: u16, amount: f64) -> anyhow::Result<()> {
        sqlx::query(
            r#"
INSERT INTO player_statistics (player_uuid, statistic_type, value, updated_at)
VALUES (?, ?, ?, CURRENT_TIMESTAMP)
ON CONFLICT (player_uuid, statistic_type)
DO UPDATE SET
  value = value + excluded.value,
  updated_at = CURRENT_TIMESTAMP;
"#,
        )
        .bind(entity_id.to_string())
        .bind(i64::from(kind_id))
        .bind(amount)
        .execute(&self.pool)
        .await
        .with_context(|| format!("apply delta {amount} to kind {kind_id} for {entity_id}"))?;

        Ok(())
    }
}

/* =========================
Row mapping
========================= */

fn row_to_statistic(r: &sqlx::any::AnyRow) -> anyhow::Result<StatisticRow> {
    let raw: i64 = r.try_get("statistic_type")?;
    let id = u16::try_from(raw).map_err(|_| anyhow!("statistic_type out of range: {raw}"))?;
    let kind = CounterKind::from_id(id).ok_or_else(|| anyhow!("unknown statistic_type: {id}"))?;

    Ok(StatisticRow {
        kind,
        value: r.try_get::<f64, _>("value")?,
    })
}
