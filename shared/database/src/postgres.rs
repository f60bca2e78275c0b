use anyhow::{Context, Result};
use sqlx::{Pool, Postgres};
use std::time::Duration;

use bomgraph_utils::DatabaseConfig;

pub type PostgresPool = Pool<Postgres>;

pub async fn create_postgres_pool(config: &DatabaseConfig) -> Result<PostgresPool> {
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.connection_timeout_seconds))
        .connect(&config.postgres_url)
        .await
        .context("Failed to connect to PostgreSQL")?;

    tracing::info!(max_connections = config.max_connections, "Connected to PostgreSQL database");
    Ok(pool)
}

pub async fn health_check(pool: &PostgresPool) -> Result<()> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await?;
    Ok(())
}
