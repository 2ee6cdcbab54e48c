//! Content materializer
//!
//! Turns a placed row into a persisted content node.

use std::sync::Arc;

use tracing::{debug, error, instrument};

use crate::application::ApplicationResult;
use crate::domain::{ChildOrderRule, ContentRef, DomainError, PlacedNode, PropertyAssignment};
use crate::infrastructure::traits::{ContentRepository, SaveFlags, TypeRepository};

/// Result of materializing one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Materialized {
    pub reference: ContentRef,
    /// Fields that were logged and skipped
    pub field_failures: usize,
}

/// Creates content from placed rows.
pub struct ContentMaterializer {
    types: Arc<dyn TypeRepository>,
    store: Arc<dyn ContentRepository>,
}

impl ContentMaterializer {
    pub fn new(types: Arc<dyn TypeRepository>, store: Arc<dyn ContentRepository>) -> Self {
        Self { types, store }
    }

    /// Create, fill and save the content for `placed`.
    ///
    /// An unknown content type aborts. A field that cannot be parsed or assigned is logged,
    /// counted and skipped; the remaining fields are still applied.
    #[instrument(level = "debug", skip(self, placed), fields(row = placed.record.row, name = %placed.record.name))]
    pub fn materialize(&self, placed: &PlacedNode) -> ApplicationResult<Materialized> {
        let record = &placed.record;
        let content_type = self
            .types
            .load(&record.type_name)
            .ok_or_else(|| DomainError::UnknownType(record.type_name.clone()))?;

        let mut instance = self.store.get_default(placed.parent, content_type.id)?;
        instance.name = record.name.clone();

        let mut field_failures = 0;
        for raw in &record.raw_fields {
            let assigned = PropertyAssignment::parse(raw).and_then(|parsed| match parsed {
                Some(a) => instance
                    .set_property(&a.name, &a.value)
                    .map_err(DomainError::from),
                None => Ok(()),
            });
            if let Err(e) = assigned {
                error!("row {} ({}): {}", record.row, record.name, e);
                field_failures += 1;
            }
        }

        instance.peer_order = Some(placed.order);
        instance.child_order_rule = ChildOrderRule::Index;

        let reference = self.store.save(instance, SaveFlags::IMPORT)?;
        debug!("created {} under {}", reference, placed.parent);

        Ok(Materialized {
            reference,
            field_failures,
        })
    }
}
