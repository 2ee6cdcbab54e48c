//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on I/O boundary traits (RowSource, TypeRepository, ContentRepository)
//! but are themselves concrete structs, not traits.

mod import;
mod materializer;
mod tree;

pub use import::{ImportJob, ImportOutcome, ImportService, StopSignal};
pub use materializer::{ContentMaterializer, Materialized};
pub use tree::render_tree;
