//! In-memory BOM store
//!
//! Backs unit tests and embedded use. Reads take the shared lock for the
//! duration of one call; guarded inserts and header writes hold the exclusive
//! lock across the cycle check and the write.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use bomgraph_models::{
    next_sequence, BomHeader, BomHeaderId, BomHeaderUpdate, BomItem, BomItemId, BomItemUpdate,
    ComponentSummary, NewBomHeader, NewBomItem, PartType, PartTypeId,
};
use bomgraph_utils::{BomError, BomResult};

use crate::guard;
use crate::store::{BomStore, CompositionGraph};

#[derive(Clone, Default)]
pub struct MemoryBomStore {
    state: Arc<RwLock<MemoryState>>,
}

#[derive(Default)]
struct MemoryState {
    part_types: BTreeMap<PartTypeId, PartType>,
    /// Stored without items; items are joined on read.
    headers: BTreeMap<BomHeaderId, BomHeader>,
    items: BTreeMap<BomItemId, BomItem>,
    last_part_type_id: PartTypeId,
    last_header_id: BomHeaderId,
    last_item_id: BomItemId,
}

impl MemoryState {
    fn resolve(&self, part_type_id: PartTypeId, active_only: bool) -> Option<&BomHeader> {
        self.headers
            .values()
            .filter(|h| h.part_type_id == part_type_id && (!active_only || h.is_active))
            .max_by_key(|h| (h.version, h.id))
    }

    fn items(&self, header_id: BomHeaderId) -> Vec<BomItem> {
        let mut items: Vec<BomItem> = self
            .items
            .values()
            .filter(|i| i.bom_header_id == header_id)
            .map(|i| {
                let mut item = i.clone();
                item.component = self.part_types.get(&i.component_part_type_id).map(|p| ComponentSummary {
                    part_number: p.part_number.clone(),
                    name: p.name.clone(),
                    category: p.category,
                    unit_of_measure: p.unit_of_measure.clone(),
                });
                item
            })
            .collect();

        items.sort_by(|a, b| {
            let a_number = a.component.as_ref().map(|c| c.part_number.as_str());
            let b_number = b.component.as_ref().map(|c| c.part_number.as_str());
            a.sequence.cmp(&b.sequence).then_with(|| a_number.cmp(&b_number))
        });
        items
    }

    fn with_items(&self, header: &BomHeader) -> BomHeader {
        let mut header = header.clone();
        header.items = self.items(header.id);
        header
    }

    fn where_used(&self, part_type_id: PartTypeId) -> Vec<PartType> {
        let parents: BTreeSet<PartTypeId> = self.headers.values().map(|h| h.part_type_id).collect();

        let mut used_by: Vec<PartType> = parents
            .into_iter()
            .filter_map(|parent| self.resolve(parent, true))
            .filter(|header| {
                self.items
                    .values()
                    .any(|i| i.bom_header_id == header.id && i.component_part_type_id == part_type_id)
            })
            .filter_map(|header| self.part_types.get(&header.part_type_id).cloned())
            .collect();

        used_by.sort_by(|a, b| a.part_number.cmp(&b.part_number));
        used_by
    }

    fn touch_header(&mut self, header_id: BomHeaderId) {
        if let Some(header) = self.headers.get_mut(&header_id) {
            header.updated_at = Utc::now();
        }
    }

    fn insert_item(&mut self, header_id: BomHeaderId, item: NewBomItem) -> BomResult<BomItem> {
        if !self.headers.contains_key(&header_id) {
            return Err(BomError::referential(format!("BOM header {} does not exist", header_id)));
        }
        if !self.part_types.contains_key(&item.component_part_type_id) {
            return Err(BomError::referential(format!(
                "Component part type {} does not exist",
                item.component_part_type_id
            )));
        }

        let current_max = self
            .items
            .values()
            .filter(|i| i.bom_header_id == header_id)
            .map(|i| i.sequence)
            .max();
        let sequence = next_sequence(current_max).ok_or_else(|| {
            BomError::validation("sequence", format!("BOM {} has run out of sequence numbers", header_id))
        })?;

        self.last_item_id += 1;
        let stored = BomItem {
            id: self.last_item_id,
            bom_header_id: header_id,
            component_part_type_id: item.component_part_type_id,
            quantity: item.quantity,
            unit_of_measure: item.unit_of_measure,
            sequence,
            notes: item.notes,
            created_at: Utc::now(),
            component: None,
        };
        self.items.insert(stored.id, stored.clone());
        self.touch_header(header_id);

        Ok(self
            .items(header_id)
            .into_iter()
            .find(|i| i.id == stored.id)
            .unwrap_or(stored))
    }

    fn insert_header(&mut self, header: NewBomHeader) -> BomResult<BomHeader> {
        if !self.part_types.contains_key(&header.part_type_id) {
            return Err(BomError::referential(format!(
                "Part type {} does not exist",
                header.part_type_id
            )));
        }

        self.last_header_id += 1;
        let now = Utc::now();
        let created = BomHeader {
            id: self.last_header_id,
            part_type_id: header.part_type_id,
            version: header.version,
            is_active: header.is_active,
            effective_date: header.effective_date,
            expiration_date: header.expiration_date,
            created_at: now,
            updated_at: now,
            items: Vec::new(),
        };
        self.headers.insert(created.id, created.clone());
        Ok(created)
    }

    fn current_header_id(&self, part_type_id: PartTypeId) -> Option<BomHeaderId> {
        self.resolve(part_type_id, true).map(|h| h.id)
    }

    fn part_label(&self, part_type_id: PartTypeId) -> String {
        self.part_types
            .get(&part_type_id)
            .map(|p| p.part_number.clone())
            .unwrap_or_else(|| format!("Part type {}", part_type_id))
    }

    fn ensure_not_listed(&self, header_id: BomHeaderId, child: PartTypeId) -> BomResult<()> {
        let listed = self
            .headers
            .get(&header_id)
            .map(|h| self.with_items(h))
            .is_some_and(|h| h.contains_component(child));
        if listed {
            return Err(BomError::conflict(format!(
                "{} is already in BOM {}",
                self.part_label(child),
                header_id
            )));
        }
        Ok(())
    }

    async fn check_edge(&self, parent: PartTypeId, child: PartTypeId) -> BomResult<()> {
        if let Some(reason) = guard::cycle_reason(&LockedView(self), parent, child).await? {
            tracing::warn!(parent, child, %reason, "rejected composition edge");
            return Err(BomError::cycle_rejected(parent, child, reason.to_string()));
        }
        Ok(())
    }

    /// Re-checks the part's composition when its current header is no longer
    /// `current_before`.
    async fn check_current_edges(
        &self,
        part_type_id: PartTypeId,
        current_before: Option<BomHeaderId>,
    ) -> BomResult<()> {
        if self.current_header_id(part_type_id) == current_before {
            return Ok(());
        }
        if let Some((child, reason)) = guard::cyclic_component(&LockedView(self), part_type_id).await? {
            tracing::warn!(parent = part_type_id, child, %reason, "rejected change of current BOM");
            return Err(BomError::cycle_rejected(part_type_id, child, reason.to_string()));
        }
        Ok(())
    }
}

/// Read view over already-locked state, used inside guarded writes.
struct LockedView<'a>(&'a MemoryState);

#[async_trait]
impl<'a> CompositionGraph for LockedView<'a> {
    async fn part_type(&self, id: PartTypeId) -> BomResult<Option<PartType>> {
        Ok(self.0.part_types.get(&id).cloned())
    }

    async fn header_for_part_type(
        &self,
        part_type_id: PartTypeId,
        active_only: bool,
    ) -> BomResult<Option<BomHeader>> {
        Ok(self.0.resolve(part_type_id, active_only).map(|h| self.0.with_items(h)))
    }

    async fn items(&self, header_id: BomHeaderId) -> BomResult<Vec<BomItem>> {
        Ok(self.0.items(header_id))
    }

    async fn where_used(&self, part_type_id: PartTypeId) -> BomResult<Vec<PartType>> {
        Ok(self.0.where_used(part_type_id))
    }
}

impl MemoryBomStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the catalog. Assigns an id when `part.id` is 0; part numbers
    /// must be unique.
    pub async fn insert_part_type(&self, mut part: PartType) -> BomResult<PartType> {
        let mut state = self.state.write().await;

        if state.part_types.values().any(|p| p.part_number == part.part_number) {
            return Err(BomError::referential(format!(
                "Duplicate part number {}",
                part.part_number
            )));
        }

        if part.id == 0 {
            state.last_part_type_id += 1;
            part.id = state.last_part_type_id;
        } else {
            state.last_part_type_id = state.last_part_type_id.max(part.id);
        }

        state.part_types.insert(part.id, part.clone());
        Ok(part)
    }
}

#[async_trait]
impl CompositionGraph for MemoryBomStore {
    async fn part_type(&self, id: PartTypeId) -> BomResult<Option<PartType>> {
        let state = self.state.read().await;
        LockedView(&state).part_type(id).await
    }

    async fn header_for_part_type(
        &self,
        part_type_id: PartTypeId,
        active_only: bool,
    ) -> BomResult<Option<BomHeader>> {
        let state = self.state.read().await;
        LockedView(&state).header_for_part_type(part_type_id, active_only).await
    }

    async fn items(&self, header_id: BomHeaderId) -> BomResult<Vec<BomItem>> {
        let state = self.state.read().await;
        Ok(state.items(header_id))
    }

    async fn where_used(&self, part_type_id: PartTypeId) -> BomResult<Vec<PartType>> {
        let state = self.state.read().await;
        Ok(state.where_used(part_type_id))
    }
}

#[async_trait]
impl BomStore for MemoryBomStore {
    async fn header_by_id(&self, id: BomHeaderId) -> BomResult<Option<BomHeader>> {
        let state = self.state.read().await;
        Ok(state.headers.get(&id).map(|h| state.with_items(h)))
    }

    async fn create_header(&self, header: NewBomHeader) -> BomResult<BomHeader> {
        let mut state = self.state.write().await;
        state.insert_header(header)
    }

    async fn create_initial_header(&self, part_type_id: PartTypeId) -> BomResult<BomHeader> {
        let mut state = self.state.write().await;
        if state.current_header_id(part_type_id).is_some() {
            return Err(BomError::conflict(format!(
                "{} already has a BOM",
                state.part_label(part_type_id)
            )));
        }
        state.insert_header(NewBomHeader::initial(part_type_id))
    }

    async fn update_header(&self, update: BomHeaderUpdate) -> BomResult<bool> {
        let mut state = self.state.write().await;
        let Some(previous) = state.headers.get(&update.id).cloned() else {
            return Ok(false);
        };
        let part_type_id = previous.part_type_id;
        let current_before = state.current_header_id(part_type_id);

        if let Some(header) = state.headers.get_mut(&update.id) {
            header.version = update.version;
            header.is_active = update.is_active;
            header.effective_date = update.effective_date;
            header.expiration_date = update.expiration_date;
            header.updated_at = Utc::now();
        }

        let checked = state.check_current_edges(part_type_id, current_before).await;
        if let Err(e) = checked {
            state.headers.insert(previous.id, previous);
            return Err(e);
        }
        Ok(true)
    }

    async fn delete_header(&self, id: BomHeaderId) -> BomResult<bool> {
        let mut state = self.state.write().await;
        let Some(part_type_id) = state.headers.get(&id).map(|h| h.part_type_id) else {
            return Ok(false);
        };
        let current_before = state.current_header_id(part_type_id);

        // Items stay until the check passes; without their header they are
        // invisible to every read.
        let removed = state.headers.remove(&id);
        let checked = state.check_current_edges(part_type_id, current_before).await;
        if let Err(e) = checked {
            if let Some(header) = removed {
                state.headers.insert(id, header);
            }
            return Err(e);
        }

        state.items.retain(|_, item| item.bom_header_id != id);
        Ok(true)
    }

    async fn add_item(&self, header_id: BomHeaderId, item: NewBomItem) -> BomResult<BomItem> {
        let mut state = self.state.write().await;
        state.insert_item(header_id, item)
    }

    async fn add_item_checked(&self, header_id: BomHeaderId, item: NewBomItem) -> BomResult<BomItem> {
        let mut state = self.state.write().await;
        let parent = state
            .headers
            .get(&header_id)
            .map(|h| h.part_type_id)
            .ok_or_else(|| BomError::referential(format!("BOM header {} does not exist", header_id)))?;
        let child = item.component_part_type_id;

        state.ensure_not_listed(header_id, child)?;
        state.check_edge(parent, child).await?;
        state.insert_item(header_id, item)
    }

    async fn add_component_checked(&self, parent: PartTypeId, item: NewBomItem) -> BomResult<BomItem> {
        let mut state = self.state.write().await;
        let child = item.component_part_type_id;
        if !state.part_types.contains_key(&child) {
            return Err(BomError::referential(format!("Component part type {} does not exist", child)));
        }

        let current = state.current_header_id(parent);
        if let Some(header_id) = current {
            state.ensure_not_listed(header_id, child)?;
        }
        state.check_edge(parent, child).await?;

        let header_id = match current {
            Some(header_id) => header_id,
            None => {
                let header = state.insert_header(NewBomHeader::initial(parent))?;
                tracing::info!(bom_id = header.id, part_type_id = parent, "created BOM");
                header.id
            }
        };
        state.insert_item(header_id, item)
    }

    async fn update_item(&self, update: BomItemUpdate) -> BomResult<bool> {
        let mut state = self.state.write().await;
        let Some(item) = state.items.get_mut(&update.id) else {
            return Ok(false);
        };
        item.quantity = update.quantity;
        item.unit_of_measure = update.unit_of_measure;
        item.sequence = update.sequence;
        item.notes = update.notes;
        let header_id = item.bom_header_id;
        state.touch_header(header_id);
        Ok(true)
    }

    async fn remove_item(&self, id: BomItemId) -> BomResult<bool> {
        let mut state = self.state.write().await;
        match state.items.remove(&id) {
            Some(item) => {
                state.touch_header(item.bom_header_id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn clear_items(&self, header_id: BomHeaderId) -> BomResult<u64> {
        let mut state = self.state.write().await;
        let before = state.items.len();
        state.items.retain(|_, item| item.bom_header_id != header_id);
        let removed = (before - state.items.len()) as u64;
        if removed > 0 {
            state.touch_header(header_id);
        }
        Ok(removed)
    }
}
