use std::time::Duration;

use crate::error::ConfigError;

/// Tuning knobs of the aggregation engine.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Fixed cadence at which pending deltas are turned into jobs.
    ///
    /// Independent of load. Shorter intervals mean fresher totals in storage
    /// but smaller coalescing windows and therefore more writes.
    pub flush_interval: Duration,

    /// Capacity of the bounded job queue between the flush step and the worker.
    ///
    /// Acts as backpressure:
    /// - a full queue drops the job instead of blocking the flush
    /// - bounds memory regardless of how far storage falls behind
    ///
    /// Should absorb one typical flush burst (distinct identities touched
    /// per interval).
    pub queue_capacity: usize,

    /// Maximum number of jobs the worker pulls per poll cycle.
    pub batch_size: usize,

    /// How long the worker sleeps after a poll cycle that found no jobs.
    pub idle_sleep: Duration,

    /// How often `shutdown()` checks whether the worker has finished draining.
    pub drain_poll_interval: Duration,

    /// Repository calls slower than this emit a performance warning.
    pub slow_apply_threshold: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            flush_interval: Duration::from_millis(5_000),
            queue_capacity: 10_000,
            batch_size: 100,
            idle_sleep: Duration::from_millis(50),
            drain_poll_interval: Duration::from_millis(10),
            slow_apply_threshold: Duration::from_millis(50),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.flush_interval.is_zero() {
            return Err(ConfigError::Zero("flush_interval"));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::Zero("queue_capacity"));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::Zero("batch_size"));
        }
        if self.idle_sleep.is_zero() {
            return Err(ConfigError::Zero("idle_sleep"));
        }
        if self.drain_poll_interval.is_zero() {
            return Err(ConfigError::Zero("drain_poll_interval"));
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Database connection string.
    pub database_url: String,

    /// Emit logs as JSON (production) instead of the pretty format.
    pub json_logs: bool,

    /// How often the binary logs a diagnostics snapshot.
    pub diagnostics_interval: Duration,

    pub engine: EngineConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://tally_dev.db?mode=rwc".to_string());

        let json_logs = std::env::var("APP_ENV").unwrap_or_default() == "production";

        let defaults = EngineConfig::default();

        let engine = EngineConfig {
            flush_interval: env_ms("TALLY_FLUSH_INTERVAL_MS", defaults.flush_interval)?,
            queue_capacity: env_usize("TALLY_QUEUE_CAPACITY", defaults.queue_capacity)?,
            batch_size: env_usize("TALLY_BATCH_SIZE", defaults.batch_size)?,
            idle_sleep: env_ms("TALLY_IDLE_SLEEP_MS", defaults.idle_sleep)?,
            drain_poll_interval: env_ms("TALLY_DRAIN_POLL_MS", defaults.drain_poll_interval)?,
            slow_apply_threshold: defaults.slow_apply_threshold,
        };
        engine.validate()?;

        Ok(Self {
            database_url,
            json_logs,
            diagnostics_interval: env_ms(
                "TALLY_DIAGNOSTICS_INTERVAL_MS",
                Duration::from_millis(60_000),
            )?,
            engine,
        })
    }
}

fn env_ms(var: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => parse_u64(var, &raw).map(Duration::from_millis),
        Err(_) => Ok(default),
    }
}

fn env_usize(var: &'static str, default: usize) -> Result<usize, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => parse_u64(var, &raw).map(|v| v as usize),
        Err(_) => Ok(default),
    }
}

fn parse_u64(var: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim().parse::<u64>().map_err(|_| ConfigError::Invalid {
        var,
        value: raw.to_string(),
    })
}
