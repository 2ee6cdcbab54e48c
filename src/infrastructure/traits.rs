//! I/O boundary traits for testability
//!
//! These traits abstract the spreadsheet source, the content type registry and the content
//! store, allowing services to be tested with mock implementations.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::domain::{Cell, ContentInstance, ContentNode, ContentRef, ContentType, ParentLookup};

/// Errors reported by a content store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("content not found: {0}")]
    NotFound(ContentRef),

    #[error("no content type with id {0}")]
    UnknownTypeId(u32),

    #[error("validation failed for {name}: missing required {missing:?}")]
    Validation { name: String, missing: Vec<String> },
}

/// Errors reading the spreadsheet source.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("cannot open workbook {path}: {message}")]
    Open { path: PathBuf, message: String },

    #[error("workbook has no worksheet: {0}")]
    NoWorksheet(PathBuf),

    #[error("cannot read worksheet {sheet} in {path}: {message}")]
    Sheet {
        path: PathBuf,
        sheet: String,
        message: String,
    },
}

/// Options for [`ContentRepository::save`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SaveFlags {
    /// Do not check required properties
    pub skip_validation: bool,
    /// Make the node published instead of a draft
    pub publish: bool,
}

impl SaveFlags {
    /// Flags used by the importer: skip validation and publish.
    pub const IMPORT: SaveFlags = SaveFlags {
        skip_validation: true,
        publish: true,
    };
}

/// Rows of the first worksheet of a spreadsheet.
pub trait RowSource: Send + Sync {
    /// Where the rows come from, for messages.
    fn location(&self) -> &Path;

    /// Whether there is anything to read. An empty file counts as missing.
    fn exists(&self) -> bool;

    /// Read every row, in sheet order.
    fn read_rows(&self) -> Result<Vec<Vec<Cell>>, SourceError>;
}

/// Content type lookup.
pub trait TypeRepository: Send + Sync {
    /// Resolve a content type by name.
    fn load(&self, name: &str) -> Option<ContentType>;

    /// Resolve a content type by id.
    fn load_by_id(&self, id: u32) -> Option<ContentType>;

    /// All known types, ordered by id.
    fn list(&self) -> Vec<ContentType>;
}

/// Hierarchical content store.
pub trait ContentRepository: Send + Sync {
    /// New, unsaved content of type `type_id` under `parent`.
    fn get_default(&self, parent: ContentRef, type_id: u32) -> Result<ContentInstance, StoreError>;

    /// Persist an instance, returning its reference.
    fn save(&self, instance: ContentInstance, flags: SaveFlags) -> Result<ContentRef, StoreError>;

    /// Fetch a persisted node.
    fn get(&self, reference: ContentRef) -> Option<ContentNode>;

    /// Children of a node, in display order.
    fn children(&self, reference: ContentRef) -> Vec<ContentNode>;
}

impl<T: ContentRepository + ?Sized> ParentLookup for T {
    fn parent_of(&self, node: ContentRef) -> Option<ContentRef> {
        self.get(node).and_then(|n| n.parent)
    }
}
