pub mod postgres;
pub mod migrations;
pub mod repositories;

pub use postgres::{PostgresPool, create_postgres_pool, health_check as postgres_health_check};
pub use repositories::*;

use anyhow::Result;
use bomgraph_utils::DatabaseConfig;

/// Connects the pool and, when enabled, brings the schema up to date.
pub async fn initialize_database(config: &DatabaseConfig) -> Result<PostgresPool> {
    let pool = create_postgres_pool(config).await?;

    if config.run_migrations {
        migrations::run_postgres_migrations(&pool).await?;
    }

    Ok(pool)
}
