//! # BOM Graph Engine
//!
//! Hierarchy integrity over versioned bills of materials: which BOM version
//! is current, which part types are (transitively) built from which, and
//! whether a new component edge would close a loop.
//!
//! The engine is generic over a [`CompositionGraph`]; [`MemoryBomStore`]
//! backs tests and embedded use, `bomgraph-database` provides PostgreSQL.

pub mod closure;
pub mod engine;
pub mod explosion;
pub mod guard;
pub mod memory;
pub mod resolver;
pub mod store;

#[cfg(test)]
pub(crate) mod fixtures;


pub use engine::BomEngine;
pub use guard::{cycle_reason, cyclic_component, would_create_cycle, CycleReason};
pub use memory::MemoryBomStore;
pub use store::{BomStore, CompositionGraph};
