pub mod boms;
pub mod graph;
pub mod health;
pub mod parts;

pub use boms::*;
pub use graph::*;
pub use health::*;
pub use parts::*;
