use std::collections::HashSet;
use std::sync::Arc;

use rust_decimal::Decimal;

use bomgraph_models::{
    BomHeader, BomHeaderId, BomHeaderUpdate, BomItem, BomItemId, BomItemUpdate, ExplosionLine,
    NewBomHeader, NewBomItem, PartType, PartTypeId,
};
use bomgraph_utils::validation::{validate_model, validate_quantity};
use bomgraph_utils::{BomError, BomResult, EngineConfig};

use crate::guard::{self, CycleReason};
use crate::store::BomStore;
use crate::{closure, explosion, resolver};

/// Facade over a [`BomStore`] exposing every BOM operation with the
/// validation and error mapping callers expect.
#[derive(Clone)]
pub struct BomEngine {
    store: Arc<dyn BomStore>,
    config: EngineConfig,
}

impl BomEngine {
    pub fn new(store: Arc<dyn BomStore>, config: EngineConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &dyn BomStore {
        self.store.as_ref()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // Part types

    pub async fn part_type(&self, id: PartTypeId) -> BomResult<Option<PartType>> {
        self.store.part_type(id).await
    }

    async fn require_part_type(&self, id: PartTypeId) -> BomResult<PartType> {
        self.store
            .part_type(id)
            .await?
            .ok_or_else(|| BomError::not_found(format!("Part type {}", id)))
    }

    async fn require_header(&self, id: BomHeaderId) -> BomResult<BomHeader> {
        self.store
            .header_by_id(id)
            .await?
            .ok_or_else(|| BomError::not_found(format!("BOM {}", id)))
    }

    // Headers

    pub async fn get_bom(&self, id: BomHeaderId) -> BomResult<Option<BomHeader>> {
        self.store.header_by_id(id).await
    }

    /// Current BOM of a part type.
    pub async fn get_bom_for_part(&self, part_type_id: PartTypeId) -> BomResult<Option<BomHeader>> {
        resolver::resolve_current(self.store(), part_type_id).await
    }

    pub async fn resolve(&self, part_type_id: PartTypeId, active_only: bool) -> BomResult<Option<BomHeader>> {
        resolver::resolve(self.store(), part_type_id, active_only).await
    }

    /// Creates version 1 of a part type's BOM, active and effective now.
    pub async fn create_bom(&self, part_type_id: PartTypeId) -> BomResult<BomHeader> {
        self.require_bom_owner(part_type_id).await?;

        let header = self.store.create_initial_header(part_type_id).await?;
        tracing::info!(bom_id = header.id, part_type_id, "created BOM");
        Ok(header)
    }

    async fn require_bom_owner(&self, part_type_id: PartTypeId) -> BomResult<PartType> {
        let part = self.require_part_type(part_type_id).await?;
        if !part.can_have_bom() {
            return Err(BomError::validation(
                "part_type_id",
                format!("{} is a {} and cannot have a BOM", part.part_number, part.category),
            ));
        }
        Ok(part)
    }

    /// Creates an explicit header version. The caller owns version numbering.
    pub async fn create_header(&self, header: NewBomHeader) -> BomResult<BomHeader> {
        validate_model(&header)?;
        self.require_part_type(header.part_type_id).await?;

        let header = self.store.create_header(header).await?;
        tracing::info!(
            bom_id = header.id,
            part_type_id = header.part_type_id,
            version = header.version,
            "created BOM header"
        );
        Ok(header)
    }

    /// Updates a header. Rejected with `CycleRejected` when the update makes
    /// a header current whose components would close a loop.
    pub async fn save_bom(&self, update: BomHeaderUpdate) -> BomResult<BomHeader> {
        validate_model(&update)?;
        if !self.store.update_header(update.clone()).await? {
            return Err(BomError::not_found(format!("BOM {}", update.id)));
        }
        self.require_header(update.id).await
    }

    pub async fn delete_bom(&self, id: BomHeaderId) -> BomResult<()> {
        if !self.store.delete_header(id).await? {
            return Err(BomError::not_found(format!("BOM {}", id)));
        }
        tracing::info!(bom_id = id, "deleted BOM");
        Ok(())
    }

    // Items

    pub async fn items(&self, header_id: BomHeaderId) -> BomResult<Vec<BomItem>> {
        self.require_header(header_id).await?;
        self.store.items(header_id).await
    }

    /// Adds a component to a BOM. The duplicate check, the cycle check and
    /// the insert are atomic.
    pub async fn add_item(&self, header_id: BomHeaderId, item: NewBomItem) -> BomResult<BomItem> {
        validate_model(&item)?;
        let header = self.require_header(header_id).await?;
        let component = self.require_part_type(item.component_part_type_id).await?;

        let added = self.store.add_item_checked(header_id, item).await?;
        tracing::info!(
            bom_id = header_id,
            parent = header.part_type_id,
            child = component.id,
            sequence = added.sequence,
            "added BOM item"
        );
        Ok(added)
    }

    pub async fn update_item(&self, update: BomItemUpdate) -> BomResult<()> {
        validate_model(&update)?;
        if !self.store.update_item(update.clone()).await? {
            return Err(BomError::not_found(format!("BOM item {}", update.id)));
        }
        Ok(())
    }

    pub async fn remove_item(&self, id: BomItemId) -> BomResult<()> {
        if !self.store.remove_item(id).await? {
            return Err(BomError::not_found(format!("BOM item {}", id)));
        }
        Ok(())
    }

    pub async fn clear_items(&self, header_id: BomHeaderId) -> BomResult<u64> {
        self.require_header(header_id).await?;
        self.store.clear_items(header_id).await
    }

    // Composition

    /// Adds `child` to the current BOM of `parent` as one atomic
    /// check-and-insert, creating the parent's first BOM when it has none.
    pub async fn try_add_component(
        &self,
        parent: PartTypeId,
        child: PartTypeId,
        quantity: Decimal,
        unit_of_measure: Option<String>,
    ) -> BomResult<BomItem> {
        self.require_bom_owner(parent).await?;

        let unit = unit_of_measure.unwrap_or_else(|| self.config.default_unit_of_measure.clone());
        let item = NewBomItem::new(child, quantity).with_unit(unit);
        validate_model(&item)?;
        self.require_part_type(child).await?;

        let added = self.store.add_component_checked(parent, item).await?;
        tracing::info!(
            bom_id = added.bom_header_id,
            parent,
            child,
            sequence = added.sequence,
            "added BOM item"
        );
        Ok(added)
    }

    /// Checks that `child` exists and could be added under `parent` without
    /// closing a loop. Nothing is written.
    pub async fn validate_add_component(&self, parent: PartTypeId, child: PartTypeId) -> BomResult<()> {
        self.require_part_type(child).await?;
        match guard::cycle_reason(self.store(), parent, child).await? {
            Some(reason) => Err(BomError::cycle_rejected(parent, child, reason.to_string())),
            None => Ok(()),
        }
    }

    pub async fn where_used(&self, part_type_id: PartTypeId) -> BomResult<Vec<PartType>> {
        closure::where_used(self.store(), part_type_id).await
    }

    pub async fn ancestor_ids(&self, part_type_id: PartTypeId) -> BomResult<HashSet<PartTypeId>> {
        closure::ancestor_ids(self.store(), part_type_id).await
    }

    pub async fn descendant_ids(&self, part_type_id: PartTypeId) -> BomResult<HashSet<PartTypeId>> {
        closure::descendant_ids(self.store(), part_type_id).await
    }

    pub async fn would_create_cycle(&self, parent: PartTypeId, child: PartTypeId) -> BomResult<bool> {
        guard::would_create_cycle(self.store(), parent, child).await
    }

    pub async fn cycle_reason(&self, parent: PartTypeId, child: PartTypeId) -> BomResult<Option<CycleReason>> {
        guard::cycle_reason(self.store(), parent, child).await
    }

    pub async fn explode(&self, part_type_id: PartTypeId, quantity: Decimal) -> BomResult<Vec<ExplosionLine>> {
        validate_quantity(quantity)?;
        self.require_part_type(part_type_id).await?;
        explosion::explode(self.store(), part_type_id, quantity, self.config.max_explosion_depth).await
    }
}
