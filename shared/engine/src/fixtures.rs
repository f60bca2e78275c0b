//! Graph builders for engine tests.

use rust_decimal::Decimal;

use bomgraph_models::{
    BomHeaderId, BomItemId, NewBomHeader, NewBomItem, PartCategory, PartType, PartTypeId,
};

use crate::memory::MemoryBomStore;
use crate::store::{BomStore, CompositionGraph};

pub struct GraphBuilder {
    store: MemoryBomStore,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            store: MemoryBomStore::new(),
        }
    }

    pub fn store(&self) -> &MemoryBomStore {
        &self.store
    }

    pub async fn part(&self, part_number: &str) -> PartTypeId {
        self.insert(part_number, PartCategory::SubAssembly).await
    }

    pub async fn raw(&self, part_number: &str) -> PartTypeId {
        self.insert(part_number, PartCategory::RawMaterial).await
    }

    pub async fn parts<const N: usize>(&self, part_numbers: [&str; N]) -> [PartTypeId; N] {
        let mut ids = [0; N];
        for (slot, part_number) in ids.iter_mut().zip(part_numbers) {
            *slot = self.part(part_number).await;
        }
        ids
    }

    async fn insert(&self, part_number: &str, category: PartCategory) -> PartTypeId {
        let name = format!("{} part", part_number);
        self.store
            .insert_part_type(PartType::new(part_number, name, category))
            .await
            .expect("insert part type")
            .id
    }

    pub async fn header(&self, part_type_id: PartTypeId, version: i32, is_active: bool) -> BomHeaderId {
        let mut header = NewBomHeader::initial(part_type_id);
        header.version = version;
        header.is_active = is_active;
        self.store.create_header(header).await.expect("create header").id
    }

    pub async fn item(&self, header_id: BomHeaderId, component: PartTypeId) -> BomItemId {
        self.store
            .add_item(header_id, NewBomItem::new(component, Decimal::ONE))
            .await
            .expect("add item")
            .id
    }

    /// Adds `child` to the current BOM of `parent`, creating version 1 when
    /// the parent has none. No cycle check.
    pub async fn edge(&self, parent: PartTypeId, child: PartTypeId) -> BomItemId {
        self.edge_qty(parent, child, Decimal::ONE).await
    }

    pub async fn edge_qty(&self, parent: PartTypeId, child: PartTypeId, quantity: Decimal) -> BomItemId {
        let header_id = match self.store.header_for_part_type(parent, true).await.expect("resolve") {
            Some(header) => header.id,
            None => self.header(parent, 1, true).await,
        };
        self.store
            .add_item(header_id, NewBomItem::new(child, quantity))
            .await
            .expect("add edge")
            .id
    }

    pub async fn current_header(&self, part_type_id: PartTypeId) -> BomHeaderId {
        self.store
            .header_for_part_type(part_type_id, true)
            .await
            .expect("resolve")
            .expect("part has a current header")
            .id
    }
}
