//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::entities::{ContentRef, PropertyKind};

/// Domain errors represent business rule violations found while turning rows into a tree.
/// These are independent of infrastructure concerns.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("malformed row {row}: {reason}")]
    MalformedRow { row: usize, reason: String },

    #[error("content type not found: {0}")]
    UnknownType(String),

    #[error("field has no ':' delimiter: {0:?}")]
    NoDelimiter(String),

    #[error("cannot resolve parent of {0}")]
    Lookup(ContentRef),

    #[error(transparent)]
    Property(#[from] PropertyError),
}

impl DomainError {
    pub fn malformed(row: usize, reason: impl Into<String>) -> Self {
        Self::MalformedRow {
            row,
            reason: reason.into(),
        }
    }
}

/// Failure to assign a single property on a content instance.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PropertyError {
    #[error("type {type_name} has no property {name}")]
    Unknown { type_name: String, name: String },

    #[error("property {name} expects {kind}, got {value:?}")]
    Coerce {
        name: String,
        kind: PropertyKind,
        value: String,
    },
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
