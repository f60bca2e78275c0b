//! SQL shared by the pooled repositories and the guarded insert transaction.
//!
//! Every helper takes a bare connection so the same statements run against a
//! pooled connection or inside an open transaction.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection};

use bomgraph_models::{
    next_sequence, BomHeader, BomHeaderId, BomItem, BomItemId, ComponentSummary, NewBomHeader,
    NewBomItem, PartCategory, PartType, PartTypeId, ScenarioId,
};
use bomgraph_utils::{BomError, BomResult};

pub(crate) const PART_TYPE_COLUMNS: &str = r#"
    id, part_number, name, description, category, unit_of_measure,
    unit_cost, scenario_id, created_at, updated_at
"#;

const HEADER_COLUMNS: &str = r#"
    id, part_type_id, version, is_active, effective_date, expiration_date,
    created_at, updated_at
"#;

const ITEM_SELECT: &str = r#"
    SELECT i.id, i.bom_header_id, i.component_part_type_id, i.quantity,
           i.unit_of_measure, i.sequence, i.notes, i.created_at,
           p.part_number AS component_part_number,
           p.name AS component_name,
           p.category AS component_category,
           p.unit_of_measure AS component_unit_of_measure
    FROM bom_items i
    JOIN part_types p ON p.id = i.component_part_type_id
"#;

pub(crate) async fn part_type(conn: &mut PgConnection, id: PartTypeId) -> BomResult<Option<PartType>> {
    let sql = format!("SELECT {} FROM part_types WHERE id = $1", PART_TYPE_COLUMNS);
    let row: Option<PartTypeRow> = sqlx::query_as(&sql).bind(id).fetch_optional(conn).await?;
    Ok(row.map(Into::into))
}

pub(crate) async fn part_type_by_number(
    conn: &mut PgConnection,
    part_number: &str,
) -> BomResult<Option<PartType>> {
    let sql = format!("SELECT {} FROM part_types WHERE part_number = $1", PART_TYPE_COLUMNS);
    let row: Option<PartTypeRow> = sqlx::query_as(&sql)
        .bind(part_number)
        .fetch_optional(conn)
        .await?;
    Ok(row.map(Into::into))
}

/// Every part when `scenario_id` is `None`; otherwise global parts plus the
/// parts of that scenario.
pub(crate) async fn part_types(
    conn: &mut PgConnection,
    scenario_id: Option<ScenarioId>,
) -> BomResult<Vec<PartType>> {
    let rows: Vec<PartTypeRow> = match scenario_id {
        None => {
            let sql = format!("SELECT {} FROM part_types ORDER BY part_number", PART_TYPE_COLUMNS);
            sqlx::query_as(&sql).fetch_all(conn).await?
        }
        Some(scenario_id) => {
            let sql = format!(
                r#"
                SELECT {} FROM part_types
                WHERE scenario_id IS NULL OR scenario_id = $1
                ORDER BY part_number
                "#,
                PART_TYPE_COLUMNS
            );
            sqlx::query_as(&sql).bind(scenario_id).fetch_all(conn).await?
        }
    };
    Ok(rows.into_iter().map(Into::into).collect())
}

pub(crate) async fn header(conn: &mut PgConnection, id: BomHeaderId) -> BomResult<Option<BomHeader>> {
    let sql = format!("SELECT {} FROM bom_headers WHERE id = $1", HEADER_COLUMNS);
    let row: Option<HeaderRow> = sqlx::query_as(&sql).bind(id).fetch_optional(&mut *conn).await?;
    with_items(conn, row).await
}

/// Highest version, ties broken by the newest header.
pub(crate) async fn current_header(
    conn: &mut PgConnection,
    part_type_id: PartTypeId,
    active_only: bool,
) -> BomResult<Option<BomHeader>> {
    let sql = format!(
        r#"
        SELECT {} FROM bom_headers
        WHERE part_type_id = $1 AND (NOT $2 OR is_active)
        ORDER BY version DESC, id DESC
        LIMIT 1
        "#,
        HEADER_COLUMNS
    );
    let row: Option<HeaderRow> = sqlx::query_as(&sql)
        .bind(part_type_id)
        .bind(active_only)
        .fetch_optional(&mut *conn)
        .await?;
    with_items(conn, row).await
}

/// Id of the current header under the same rule as [`current_header`].
pub(crate) async fn current_header_id(
    conn: &mut PgConnection,
    part_type_id: PartTypeId,
) -> BomResult<Option<BomHeaderId>> {
    let id = sqlx::query_scalar(
        r#"
        SELECT id FROM bom_headers
        WHERE part_type_id = $1 AND is_active
        ORDER BY version DESC, id DESC
        LIMIT 1
        "#,
    )
    .bind(part_type_id)
    .fetch_optional(conn)
    .await?;
    Ok(id)
}

pub(crate) async fn header_owner(conn: &mut PgConnection, header_id: BomHeaderId) -> BomResult<Option<PartTypeId>> {
    let owner = sqlx::query_scalar("SELECT part_type_id FROM bom_headers WHERE id = $1")
        .bind(header_id)
        .fetch_optional(conn)
        .await?;
    Ok(owner)
}

pub(crate) async fn insert_header(conn: &mut PgConnection, new_header: NewBomHeader) -> BomResult<BomHeader> {
    let now = Utc::now();
    let id: BomHeaderId = sqlx::query_scalar(
        r#"
        INSERT INTO bom_headers
            (part_type_id, version, is_active, effective_date, expiration_date,
             created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id
        "#,
    )
    .bind(new_header.part_type_id)
    .bind(new_header.version)
    .bind(new_header.is_active)
    .bind(new_header.effective_date)
    .bind(new_header.expiration_date)
    .bind(now)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;

    header(conn, id)
        .await?
        .ok_or_else(|| BomError::internal(format!("BOM header {} vanished after insert", id)))
}

/// `Conflict` when the header already lists the component.
pub(crate) async fn ensure_not_listed(
    conn: &mut PgConnection,
    header_id: BomHeaderId,
    component_part_type_id: PartTypeId,
) -> BomResult<()> {
    let listed: Option<String> = sqlx::query_scalar(
        r#"
        SELECT p.part_number
        FROM bom_items i
        JOIN part_types p ON p.id = i.component_part_type_id
        WHERE i.bom_header_id = $1 AND i.component_part_type_id = $2
        LIMIT 1
        "#,
    )
    .bind(header_id)
    .bind(component_part_type_id)
    .fetch_optional(conn)
    .await?;

    match listed {
        Some(part_number) => Err(BomError::conflict(format!(
            "{} is already in BOM {}",
            part_number, header_id
        ))),
        None => Ok(()),
    }
}

async fn with_items(conn: &mut PgConnection, row: Option<HeaderRow>) -> BomResult<Option<BomHeader>> {
    let Some(row) = row else {
        return Ok(None);
    };
    let mut header: BomHeader = row.into();
    header.items = items(conn, header.id).await?;
    Ok(Some(header))
}

pub(crate) async fn items(conn: &mut PgConnection, header_id: BomHeaderId) -> BomResult<Vec<BomItem>> {
    let sql = format!(
        "{} WHERE i.bom_header_id = $1 ORDER BY i.sequence, p.part_number",
        ITEM_SELECT
    );
    let rows: Vec<ItemRow> = sqlx::query_as(&sql).bind(header_id).fetch_all(conn).await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

async fn item(conn: &mut PgConnection, id: BomItemId) -> BomResult<Option<BomItem>> {
    let sql = format!("{} WHERE i.id = $1", ITEM_SELECT);
    let row: Option<ItemRow> = sqlx::query_as(&sql).bind(id).fetch_optional(conn).await?;
    Ok(row.map(Into::into))
}

/// Parents whose current header lists the part. Uses the same selection as
/// [`current_header`] with `active_only = true`.
pub(crate) async fn where_used(conn: &mut PgConnection, part_type_id: PartTypeId) -> BomResult<Vec<PartType>> {
    let sql = format!(
        r#"
        SELECT {} FROM part_types
        WHERE id IN (
            SELECT h.part_type_id
            FROM bom_headers h
            JOIN bom_items i ON i.bom_header_id = h.id
            WHERE i.component_part_type_id = $1
              AND h.id = (
                  SELECT c.id FROM bom_headers c
                  WHERE c.part_type_id = h.part_type_id AND c.is_active
                  ORDER BY c.version DESC, c.id DESC
                  LIMIT 1
              )
        )
        ORDER BY part_number
        "#,
        PART_TYPE_COLUMNS
    );
    let rows: Vec<PartTypeRow> = sqlx::query_as(&sql).bind(part_type_id).fetch_all(conn).await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

pub(crate) async fn touch_header(conn: &mut PgConnection, header_id: BomHeaderId) -> BomResult<()> {
    sqlx::query("UPDATE bom_headers SET updated_at = $2 WHERE id = $1")
        .bind(header_id)
        .bind(Utc::now())
        .execute(conn)
        .await?;
    Ok(())
}

/// Inserts with sequence `max + 10`. Callers run this inside a transaction
/// so the max and the insert see the same rows.
pub(crate) async fn insert_item(
    conn: &mut PgConnection,
    header_id: BomHeaderId,
    new_item: NewBomItem,
) -> BomResult<BomItem> {
    let current_max: Option<i32> =
        sqlx::query_scalar("SELECT MAX(sequence) FROM bom_items WHERE bom_header_id = $1")
            .bind(header_id)
            .fetch_one(&mut *conn)
            .await?;
    let sequence = next_sequence(current_max).ok_or_else(|| {
        BomError::validation("sequence", format!("BOM {} has run out of sequence numbers", header_id))
    })?;

    let id: BomItemId = sqlx::query_scalar(
        r#"
        INSERT INTO bom_items
            (bom_header_id, component_part_type_id, quantity, unit_of_measure,
             sequence, notes, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id
        "#,
    )
    .bind(header_id)
    .bind(new_item.component_part_type_id)
    .bind(new_item.quantity)
    .bind(&new_item.unit_of_measure)
    .bind(sequence)
    .bind(&new_item.notes)
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await?;

    touch_header(&mut *conn, header_id).await?;

    item(conn, id)
        .await?
        .ok_or_else(|| BomError::internal(format!("BOM item {} vanished after insert", id)))
}

#[derive(Debug, FromRow)]
pub(crate) struct PartTypeRow {
    id: i64,
    part_number: String,
    name: String,
    description: Option<String>,
    category: String,
    unit_of_measure: String,
    unit_cost: Decimal,
    scenario_id: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PartTypeRow> for PartType {
    fn from(row: PartTypeRow) -> Self {
        Self {
            id: row.id,
            part_number: row.part_number,
            name: row.name,
            description: row.description,
            category: PartCategory::parse(&row.category).unwrap_or(PartCategory::Component),
            unit_of_measure: row.unit_of_measure,
            unit_cost: row.unit_cost,
            scenario_id: row.scenario_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct HeaderRow {
    id: i64,
    part_type_id: i64,
    version: i32,
    is_active: bool,
    effective_date: DateTime<Utc>,
    expiration_date: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<HeaderRow> for BomHeader {
    fn from(row: HeaderRow) -> Self {
        Self {
            id: row.id,
            part_type_id: row.part_type_id,
            version: row.version,
            is_active: row.is_active,
            effective_date: row.effective_date,
            expiration_date: row.expiration_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
            items: Vec::new(),
        }
    }
}

#[derive(Debug, FromRow)]
struct ItemRow {
    id: i64,
    bom_header_id: i64,
    component_part_type_id: i64,
    quantity: Decimal,
    unit_of_measure: String,
    sequence: i32,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    component_part_number: String,
    component_name: String,
    component_category: String,
    component_unit_of_measure: String,
}

impl From<ItemRow> for BomItem {
    fn from(row: ItemRow) -> Self {
        Self {
            id: row.id,
            bom_header_id: row.bom_header_id,
            component_part_type_id: row.component_part_type_id,
            quantity: row.quantity,
            unit_of_measure: row.unit_of_measure,
            sequence: row.sequence,
            notes: row.notes,
            created_at: row.created_at,
            component: Some(ComponentSummary {
                part_number: row.component_part_number,
                name: row.component_name,
                category: PartCategory::parse(&row.component_category).unwrap_or(PartCategory::Component),
                unit_of_measure: row.component_unit_of_measure,
            }),
        }
    }
}
