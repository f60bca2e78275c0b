//! Repository module for database CRUD operations
//!
//! Part type catalog access and the PostgreSQL BOM store.

pub mod bom;
pub mod part_type;
mod queries;

pub use bom::PgBomStore;
pub use part_type::PartTypeRepository;
