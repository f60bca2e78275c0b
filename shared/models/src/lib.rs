//! # BOM Graph Domain Models
//!
//! Core domain models for the bill-of-materials hierarchy engine.
//! All models implement serde serialization; write payloads carry validation
//! rules through the validator crate.
//!
//! ## Key Models
//!
//! - **PartType**: catalog item, the node of the composition graph
//! - **BomHeader**: one version of a part type's composition, with its items
//! - **BomItem**: component edge with quantity, unit and sequence
//! - **ExplosionLine**: one row of a flattened multi-level BOM explosion
//!
//! ## Validation
//!
//! - Item quantities must be strictly positive
//! - Header expiration dates must not precede the effective date
//! - Units of measure and part numbers have bounded lengths

pub mod part_type;
pub mod bom;


pub use part_type::*;
pub use bom::*;
