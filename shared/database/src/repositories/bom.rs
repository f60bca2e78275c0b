//! BOM Repository
//!
//! PostgreSQL implementation of the engine's store traits. Guarded writes
//! (component inserts, first-version creation, header updates and deletes)
//! run their checks and the write in one transaction holding a
//! transaction-scoped advisory lock, so no two guarded writes interleave.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tokio::sync::Mutex;

use bomgraph_engine::{cycle_reason, cyclic_component, BomStore, CompositionGraph};
use bomgraph_models::{
    BomHeader, BomHeaderId, BomHeaderUpdate, BomItem, BomItemId, BomItemUpdate, NewBomHeader,
    NewBomItem, PartType, PartTypeId,
};
use bomgraph_utils::{BomError, BomResult};

use super::queries;

/// Advisory lock key serialising guarded writes ("BOMGRAPH").
const COMPOSITION_LOCK_KEY: i64 = 0x424f_4d47_5241_5048;

#[derive(Clone)]
pub struct PgBomStore {
    pool: PgPool,
}

impl PgBomStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn begin_guarded(&self) -> BomResult<Transaction<'static, Postgres>> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(COMPOSITION_LOCK_KEY)
            .execute(&mut *tx)
            .await?;
        Ok(tx)
    }
}

/// Runs the cycle guard for parent→child inside `tx`. Rolls back and returns
/// `CycleRejected` when the edge would close a loop.
async fn guard_edge(
    tx: Transaction<'static, Postgres>,
    parent: PartTypeId,
    child: PartTypeId,
) -> BomResult<Transaction<'static, Postgres>> {
    let graph = TxGraph { tx: Mutex::new(tx) };
    let reason = cycle_reason(&graph, parent, child).await?;
    let tx = graph.tx.into_inner();

    if let Some(reason) = reason {
        tracing::warn!(parent, child, %reason, "rejected composition edge");
        tx.rollback().await?;
        return Err(BomError::cycle_rejected(parent, child, reason.to_string()));
    }
    Ok(tx)
}

/// Re-checks the part's composition after a header write when its current
/// header is no longer `current_before`.
async fn guard_current(
    mut tx: Transaction<'static, Postgres>,
    part_type_id: PartTypeId,
    current_before: Option<BomHeaderId>,
) -> BomResult<Transaction<'static, Postgres>> {
    if queries::current_header_id(&mut tx, part_type_id).await? == current_before {
        return Ok(tx);
    }

    let graph = TxGraph { tx: Mutex::new(tx) };
    let cyclic = cyclic_component(&graph, part_type_id).await?;
    let tx = graph.tx.into_inner();

    if let Some((child, reason)) = cyclic {
        tracing::warn!(parent = part_type_id, child, %reason, "rejected change of current BOM");
        tx.rollback().await?;
        return Err(BomError::cycle_rejected(part_type_id, child, reason.to_string()));
    }
    Ok(tx)
}

/// Composition graph read through an open transaction.
struct TxGraph {
    tx: Mutex<Transaction<'static, Postgres>>,
}

#[async_trait]
impl CompositionGraph for TxGraph {
    async fn part_type(&self, id: PartTypeId) -> BomResult<Option<PartType>> {
        let mut tx = self.tx.lock().await;
        queries::part_type(&mut **tx, id).await
    }

    async fn header_for_part_type(
        &self,
        part_type_id: PartTypeId,
        active_only: bool,
    ) -> BomResult<Option<BomHeader>> {
        let mut tx = self.tx.lock().await;
        queries::current_header(&mut **tx, part_type_id, active_only).await
    }

    async fn items(&self, header_id: BomHeaderId) -> BomResult<Vec<BomItem>> {
        let mut tx = self.tx.lock().await;
        queries::items(&mut **tx, header_id).await
    }

    async fn where_used(&self, part_type_id: PartTypeId) -> BomResult<Vec<PartType>> {
        let mut tx = self.tx.lock().await;
        queries::where_used(&mut **tx, part_type_id).await
    }
}

#[async_trait]
impl CompositionGraph for PgBomStore {
    async fn part_type(&self, id: PartTypeId) -> BomResult<Option<PartType>> {
        let mut conn = self.pool.acquire().await?;
        queries::part_type(&mut conn, id).await
    }

    async fn header_for_part_type(
        &self,
        part_type_id: PartTypeId,
        active_only: bool,
    ) -> BomResult<Option<BomHeader>> {
        let mut conn = self.pool.acquire().await?;
        queries::current_header(&mut conn, part_type_id, active_only).await
    }

    async fn items(&self, header_id: BomHeaderId) -> BomResult<Vec<BomItem>> {
        let mut conn = self.pool.acquire().await?;
        queries::items(&mut conn, header_id).await
    }

    async fn where_used(&self, part_type_id: PartTypeId) -> BomResult<Vec<PartType>> {
        let mut conn = self.pool.acquire().await?;
        queries::where_used(&mut conn, part_type_id).await
    }
}

#[async_trait]
impl BomStore for PgBomStore {
    async fn header_by_id(&self, id: BomHeaderId) -> BomResult<Option<BomHeader>> {
        let mut conn = self.pool.acquire().await?;
        queries::header(&mut conn, id).await
    }

    async fn create_header(&self, header: NewBomHeader) -> BomResult<BomHeader> {
        let mut conn = self.pool.acquire().await?;
        queries::insert_header(&mut conn, header).await
    }

    async fn create_initial_header(&self, part_type_id: PartTypeId) -> BomResult<BomHeader> {
        let mut tx = self.begin_guarded().await?;
        if queries::current_header_id(&mut tx, part_type_id).await?.is_some() {
            return Err(BomError::conflict(format!("Part type {} already has a BOM", part_type_id)));
        }

        let header = queries::insert_header(&mut tx, NewBomHeader::initial(part_type_id)).await?;
        tx.commit().await?;
        Ok(header)
    }

    async fn update_header(&self, update: BomHeaderUpdate) -> BomResult<bool> {
        let mut tx = self.begin_guarded().await?;
        let Some(part_type_id) = queries::header_owner(&mut tx, update.id).await? else {
            return Ok(false);
        };
        let current_before = queries::current_header_id(&mut tx, part_type_id).await?;

        sqlx::query(
            r#"
            UPDATE bom_headers SET
                version = $2,
                is_active = $3,
                effective_date = $4,
                expiration_date = $5,
                updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(update.id)
        .bind(update.version)
        .bind(update.is_active)
        .bind(update.effective_date)
        .bind(update.expiration_date)
        .bind(chrono::Utc::now())
        .execute(&mut *tx)
        .await?;

        let tx = guard_current(tx, part_type_id, current_before).await?;
        tx.commit().await?;
        Ok(true)
    }

    async fn delete_header(&self, id: BomHeaderId) -> BomResult<bool> {
        let mut tx = self.begin_guarded().await?;
        let Some(part_type_id) = queries::header_owner(&mut tx, id).await? else {
            return Ok(false);
        };
        let current_before = queries::current_header_id(&mut tx, part_type_id).await?;

        sqlx::query("DELETE FROM bom_items WHERE bom_header_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM bom_headers WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let tx = guard_current(tx, part_type_id, current_before).await?;
        tx.commit().await?;
        Ok(true)
    }

    async fn add_item(&self, header_id: BomHeaderId, item: NewBomItem) -> BomResult<BomItem> {
        let mut tx = self.pool.begin().await?;
        let added = queries::insert_item(&mut tx, header_id, item).await?;
        tx.commit().await?;
        Ok(added)
    }

    async fn add_item_checked(&self, header_id: BomHeaderId, item: NewBomItem) -> BomResult<BomItem> {
        let mut tx = self.begin_guarded().await?;
        let parent = queries::header_owner(&mut tx, header_id)
            .await?
            .ok_or_else(|| BomError::referential(format!("BOM header {} does not exist", header_id)))?;
        let child = item.component_part_type_id;

        queries::ensure_not_listed(&mut tx, header_id, child).await?;
        let mut tx = guard_edge(tx, parent, child).await?;

        let added = queries::insert_item(&mut tx, header_id, item).await?;
        tx.commit().await?;
        Ok(added)
    }

    async fn add_component_checked(&self, parent: PartTypeId, item: NewBomItem) -> BomResult<BomItem> {
        let mut tx = self.begin_guarded().await?;
        let child = item.component_part_type_id;

        let current = queries::current_header_id(&mut tx, parent).await?;
        if let Some(header_id) = current {
            queries::ensure_not_listed(&mut tx, header_id, child).await?;
        }
        let mut tx = guard_edge(tx, parent, child).await?;

        let header_id = match current {
            Some(header_id) => header_id,
            None => {
                let header = queries::insert_header(&mut tx, NewBomHeader::initial(parent)).await?;
                tracing::info!(bom_id = header.id, part_type_id = parent, "created BOM");
                header.id
            }
        };

        let added = queries::insert_item(&mut tx, header_id, item).await?;
        tx.commit().await?;
        Ok(added)
    }

    async fn update_item(&self, update: BomItemUpdate) -> BomResult<bool> {
        let mut tx = self.pool.begin().await?;
        let header_id: Option<BomHeaderId> = sqlx::query_scalar(
            r#"
            UPDATE bom_items SET
                quantity = $2,
                unit_of_measure = $3,
                sequence = $4,
                notes = $5
            WHERE id = $1
            RETURNING bom_header_id
            "#,
        )
        .bind(update.id)
        .bind(update.quantity)
        .bind(&update.unit_of_measure)
        .bind(update.sequence)
        .bind(&update.notes)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(header_id) = header_id else {
            return Ok(false);
        };
        queries::touch_header(&mut tx, header_id).await?;
        tx.commit().await?;
        Ok(true)
    }

    async fn remove_item(&self, id: BomItemId) -> BomResult<bool> {
        let mut tx = self.pool.begin().await?;
        let header_id: Option<BomHeaderId> =
            sqlx::query_scalar("DELETE FROM bom_items WHERE id = $1 RETURNING bom_header_id")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some(header_id) = header_id else {
            return Ok(false);
        };
        queries::touch_header(&mut tx, header_id).await?;
        tx.commit().await?;
        Ok(true)
    }

    async fn clear_items(&self, header_id: BomHeaderId) -> BomResult<u64> {
        let mut tx = self.pool.begin().await?;
        let removed = sqlx::query("DELETE FROM bom_items WHERE bom_header_id = $1")
            .bind(header_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if removed > 0 {
            queries::touch_header(&mut tx, header_id).await?;
        }
        tx.commit().await?;
        Ok(removed)
    }
}
