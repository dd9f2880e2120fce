use sqlx::AnyPool;

pub async fn migrate(pool: &AnyPool) -> anyhow::Result<()> {
    // Per-entity totals, one row per (entity, kind id)
    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS player_statistics (
  player_uuid TEXT NOT NULL,
  statistic_type INTEGER NOT NULL,
  value REAL NOT NULL DEFAULT 0,
  updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
  PRIMARY KEY (player_uuid, statistic_type)
);
"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"CREATE INDEX IF NOT EXISTS idx_player_statistics_type ON player_statistics(statistic_type);"#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
