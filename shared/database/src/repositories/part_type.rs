//! Part Type Repository
//!
//! Catalog reads for the engine and inserts used when seeding a database.

use chrono::Utc;
use sqlx::PgPool;

use bomgraph_models::{PartType, PartTypeId, ScenarioId};
use bomgraph_utils::{validate_model, BomResult};

use super::queries::{self, PartTypeRow, PART_TYPE_COLUMNS};

#[derive(Clone)]
pub struct PartTypeRepository {
    pool: PgPool,
}

impl PartTypeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find part type by ID
    pub async fn find_by_id(&self, id: PartTypeId) -> BomResult<Option<PartType>> {
        let mut conn = self.pool.acquire().await?;
        queries::part_type(&mut conn, id).await
    }

    /// Find part type by its unique part number
    pub async fn find_by_part_number(&self, part_number: &str) -> BomResult<Option<PartType>> {
        let mut conn = self.pool.acquire().await?;
        queries::part_type_by_number(&mut conn, part_number).await
    }

    /// Part types visible from `scenario_id` (see `PartType::is_visible_in`),
    /// by part number. `None` lists every part type.
    pub async fn find_all(&self, scenario_id: Option<ScenarioId>) -> BomResult<Vec<PartType>> {
        let mut conn = self.pool.acquire().await?;
        queries::part_types(&mut conn, scenario_id).await
    }

    /// Create new part type. A duplicate part number is a referential violation.
    pub async fn create(&self, part: PartType) -> BomResult<PartType> {
        validate_model(&part)?;
        let now = Utc::now();

        let sql = format!(
            r#"
            INSERT INTO part_types
                (part_number, name, description, category, unit_of_measure,
                 unit_cost, scenario_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            PART_TYPE_COLUMNS
        );
        let row: PartTypeRow = sqlx::query_as(&sql)
            .bind(&part.part_number)
            .bind(&part.name)
            .bind(&part.description)
            .bind(part.category.as_str())
            .bind(&part.unit_of_measure)
            .bind(part.unit_cost)
            .bind(part.scenario_id)
            .bind(now)
            .bind(now)
            .fetch_one(&self.pool)
            .await?;

        let created: PartType = row.into();
        tracing::info!(part_type_id = created.id, part_number = %created.part_number, "created part type");
        Ok(created)
    }
}
