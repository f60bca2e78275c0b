use anyhow::{Context, Result};
use sqlx::PgPool;

pub async fn run_postgres_migrations(pool: &PgPool) -> Result<()> {
    tracing::info!("Running PostgreSQL migrations");

    // Part type catalog
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS part_types (
            id BIGSERIAL PRIMARY KEY,
            part_number VARCHAR(64) NOT NULL UNIQUE,
            name VARCHAR(200) NOT NULL,
            description TEXT,
            category VARCHAR(32) NOT NULL,
            unit_of_measure VARCHAR(16) NOT NULL DEFAULT 'EA',
            unit_cost NUMERIC(18, 4) NOT NULL DEFAULT 0,
            scenario_id BIGINT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await
    .context("Failed to create part_types")?;

    // BOM versions
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS bom_headers (
            id BIGSERIAL PRIMARY KEY,
            part_type_id BIGINT NOT NULL REFERENCES part_types(id) ON DELETE CASCADE,
            version INTEGER NOT NULL,
            is_active BOOLEAN NOT NULL DEFAULT TRUE,
            effective_date TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            expiration_date TIMESTAMPTZ,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            CHECK (version >= 1),
            CHECK (expiration_date IS NULL OR expiration_date >= effective_date)
        )
        "#,
    )
    .execute(pool)
    .await
    .context("Failed to create bom_headers")?;

    // Component edges
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS bom_items (
            id BIGSERIAL PRIMARY KEY,
            bom_header_id BIGINT NOT NULL REFERENCES bom_headers(id) ON DELETE CASCADE,
            component_part_type_id BIGINT NOT NULL REFERENCES part_types(id),
            quantity NUMERIC(18, 6) NOT NULL CHECK (quantity > 0),
            unit_of_measure VARCHAR(16) NOT NULL DEFAULT 'EA',
            sequence INTEGER NOT NULL,
            notes TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await
    .context("Failed to create bom_items")?;

    // Create indexes
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_bom_headers_part_type_version ON bom_headers(part_type_id, version DESC, id DESC)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_bom_items_header_sequence ON bom_items(bom_header_id, sequence)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_bom_items_component ON bom_items(component_part_type_id)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_part_types_scenario ON part_types(scenario_id)")
        .execute(pool)
        .await?;

    tracing::info!("PostgreSQL migrations completed successfully");
    Ok(())
}
