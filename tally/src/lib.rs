pub mod config;
pub mod db;
pub mod engine;
pub mod metrics;
pub mod persistence;
pub mod stats;

pub mod error;
