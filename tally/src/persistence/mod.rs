pub mod repository;
pub mod repository_sqlx;

pub use repository::StatisticsRepository;
pub use repository_sqlx::SqlxStatisticsRepository;
