//! Domain layer: entities and the row-to-tree logic
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod builder;
pub mod entities;
pub mod error;
pub mod field;
pub mod row;

pub use builder::{ParentLookup, Relation, TreeBuilder, TreeCursor};
pub use entities::*;
pub use error::{DomainError, DomainResult, PropertyError};
pub use field::{normalize_line_breaks, LINE_BREAK};
