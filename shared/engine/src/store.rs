//! Store traits
//!
//! [`CompositionGraph`] is the read side the resolver, closure engine and
//! cycle guard run against. [`BomStore`] adds the versioned BOM writes.
//! Each call acquires its own store scope and releases it before returning.
//!
//! Writes that can add a live edge to the composition graph are guarded: the
//! cycle check and the write share one critical section, serialised against
//! every other guarded write.

use async_trait::async_trait;

use bomgraph_models::{
    BomHeader, BomHeaderId, BomHeaderUpdate, BomItem, BomItemId, BomItemUpdate, NewBomHeader,
    NewBomItem, PartType, PartTypeId,
};
use bomgraph_utils::BomResult;

#[async_trait]
pub trait CompositionGraph: Send + Sync {
    /// Catalog lookup; `None` when the id is unknown.
    async fn part_type(&self, id: PartTypeId) -> BomResult<Option<PartType>>;

    /// Highest-version header of a part type, optionally restricted to
    /// active headers, with its items loaded. Equal versions resolve to the
    /// most recently created header.
    async fn header_for_part_type(
        &self,
        part_type_id: PartTypeId,
        active_only: bool,
    ) -> BomResult<Option<BomHeader>>;

    /// Items of a header ordered by (sequence, component part number).
    async fn items(&self, header_id: BomHeaderId) -> BomResult<Vec<BomItem>>;

    /// Distinct part types whose current header lists `part_type_id` as a
    /// component, ordered by part number. "Current" is the same rule as
    /// `header_for_part_type(_, true)`.
    async fn where_used(&self, part_type_id: PartTypeId) -> BomResult<Vec<PartType>>;
}

#[async_trait]
pub trait BomStore: CompositionGraph {
    async fn header_by_id(&self, id: BomHeaderId) -> BomResult<Option<BomHeader>>;

    async fn create_header(&self, header: NewBomHeader) -> BomResult<BomHeader>;

    /// Creates version 1 of a part type's BOM. Fails with `Conflict` when the
    /// part type already has a current header. Guarded.
    async fn create_initial_header(&self, part_type_id: PartTypeId) -> BomResult<BomHeader>;

    /// Returns `false` when no header has that id. Guarded: when the update
    /// makes a different header current, every item of the new current
    /// header is re-checked and a closing edge rejects the whole update with
    /// `CycleRejected`.
    async fn update_header(&self, update: BomHeaderUpdate) -> BomResult<bool>;

    /// Deletes the header and all of its items. Guarded in the same way as
    /// `update_header`, since deleting the current header promotes an older
    /// one.
    async fn delete_header(&self, id: BomHeaderId) -> BomResult<bool>;

    /// Appends an item with sequence `max + 10`. Performs no cycle check.
    async fn add_item(&self, header_id: BomHeaderId, item: NewBomItem) -> BomResult<BomItem>;

    /// Appends an item after checking that the component is not already in
    /// the header (`Conflict`) and re-running the cycle guard for the
    /// header's part type and `item.component_part_type_id`
    /// (`CycleRejected`). Guarded.
    async fn add_item_checked(&self, header_id: BomHeaderId, item: NewBomItem) -> BomResult<BomItem>;

    /// Like `add_item_checked` against the current header of `parent`,
    /// creating version 1 when it has none. A rejected insert leaves no
    /// header behind.
    async fn add_component_checked(&self, parent: PartTypeId, item: NewBomItem) -> BomResult<BomItem>;

    async fn update_item(&self, update: BomItemUpdate) -> BomResult<bool>;

    async fn remove_item(&self, id: BomItemId) -> BomResult<bool>;

    /// Removes every item of a header, returning how many were removed.
    async fn clear_items(&self, header_id: BomHeaderId) -> BomResult<u64>;
}
