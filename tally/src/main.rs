use std::sync::Arc;
use std::time::Duration;

use tally::{
    config::AppConfig,
    db::Db,
    engine::{StatsEngine, lifecycle::LifecycleState},
    persistence::SqlxStatisticsRepository,
};

/// Opens the DB (migrations included) and constructs the repository.
async fn init_repository(cfg: &AppConfig) -> anyhow::Result<Arc<SqlxStatisticsRepository>> {
    let db = Db::open(&cfg.database_url).await?;
    Ok(Arc::new(db.statistics_repository()))
}

/// Periodically logs the engine's diagnostics until the engine stops.
fn start_diagnostics_loop(engine: StatsEngine, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;

        loop {
            ticker.tick().await;

            if engine.state() != LifecycleState::Running {
                break;
            }

            let d = engine.diagnostics();
            tracing::info!(
                processed_jobs = d.processed_jobs,
                failed_jobs = d.failed_jobs,
                dropped_jobs = d.dropped_jobs,
                rejected_increments = d.rejected_increments,
                flushes = d.flushes,
                queue_depth = d.queue_depth,
                "stats engine diagnostics"
            );
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    sqlx::any::install_default_drivers();

    let cfg = AppConfig::from_env()?;
    common::logger::init_logger("tally", cfg.json_logs);

    tracing::info!("Starting tally...");

    let repo = init_repository(&cfg).await?;

    let engine = StatsEngine::start(repo, cfg.engine.clone());

    start_diagnostics_loop(engine.clone(), cfg.diagnostics_interval);

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    engine.shutdown().await;

    Ok(())
}
