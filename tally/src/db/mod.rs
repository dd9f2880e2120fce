pub mod schema;

use anyhow::Context;
use sqlx::AnyPool;
use sqlx::any::AnyPoolOptions;

use crate::persistence::SqlxStatisticsRepository;

/// Connection pool for the statistics store.
#[derive(Clone)]
pub struct Db {
    pub pool: AnyPool,
}

impl Db {
    /// Connects and brings the schema up to date.
    ///
    /// The engine's worker is the only writer, so a small pool is plenty.
    pub async fn open(database_url: &str) -> anyhow::Result<Self> {
        let pool = AnyPoolOptions::new()
            .max_connections(4)
            .connect(database_url)
            .await
            .with_context(|| format!("connect to {database_url}"))?;

        let db = Self { pool };
        db.migrate().await.context("run migrations")?;

        Ok(db)
    }

    /// Idempotent.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        schema::migrate(&self.pool).await
    }

    pub fn statistics_repository(&self) -> SqlxStatisticsRepository {
        SqlxStatisticsRepository::new(self.pool.clone())
    }
}
