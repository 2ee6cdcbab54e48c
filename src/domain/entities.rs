//! Domain entities: core data structures

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::error::PropertyError;

/// Opaque identifier of a node in the content store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentRef(pub u64);

impl ContentRef {
    /// Well-known start node every store is seeded with.
    pub const START: ContentRef = ContentRef(1);

    pub fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One spreadsheet cell, already decoded.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl Cell {
    /// Empty cell or text that is only whitespace.
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Cell::Number(n)
    }
}

/// A decoded spreadsheet row.
#[derive(Debug, Clone, PartialEq)]
pub struct RowRecord {
    /// 1-based row number in the source, for messages
    pub row: usize,
    pub type_name: String,
    pub name: String,
    /// Nesting level relative to the preceding row
    pub level: u32,
    /// Non-blank `name:value` strings from column 3 onwards
    pub raw_fields: Vec<String>,
}

/// `name:value` pair parsed from one raw field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyAssignment {
    pub name: String,
    pub value: String,
}

/// A row with its resolved parent and sibling sort key.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedNode {
    pub parent: ContentRef,
    pub record: RowRecord,
    pub order: u32,
}

/// Value kind a content type declares for a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyKind {
    String,
    Xhtml,
    Number,
    Bool,
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PropertyKind::String => "string",
            PropertyKind::Xhtml => "xhtml",
            PropertyKind::Number => "number",
            PropertyKind::Bool => "bool",
        };
        f.write_str(s)
    }
}

impl PropertyKind {
    /// Convert raw spreadsheet text into a typed value.
    pub fn coerce(self, raw: &str) -> Option<PropertyValue> {
        match self {
            PropertyKind::String | PropertyKind::Xhtml => Some(PropertyValue::Text(raw.to_string())),
            PropertyKind::Number => raw.trim().parse::<f64>().ok().map(PropertyValue::Number),
            PropertyKind::Bool => match raw.trim().to_lowercase().as_str() {
                "true" | "yes" | "1" => Some(PropertyValue::Bool(true)),
                "false" | "no" | "0" => Some(PropertyValue::Bool(false)),
                _ => None,
            },
        }
    }
}

/// Typed property value stored on a content node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Bool(b) => write!(f, "{b}"),
            PropertyValue::Number(n) => write!(f, "{n}"),
            PropertyValue::Text(s) => f.write_str(s),
        }
    }
}

/// Content type definition resolved by name.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentType {
    pub id: u32,
    pub name: String,
    pub properties: BTreeMap<String, PropertyKind>,
    pub required: Vec<String>,
}

/// How the children of a node are sorted for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChildOrderRule {
    /// By peer order (the import row counter)
    Index,
    #[default]
    Created,
    Name,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentStatus {
    #[default]
    Draft,
    Published,
}

/// Unsaved content created under a parent; the property bag the importer fills.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentInstance {
    pub parent: ContentRef,
    pub content_type: ContentType,
    pub name: String,
    pub peer_order: Option<u32>,
    pub child_order_rule: ChildOrderRule,
    properties: BTreeMap<String, PropertyValue>,
}

impl ContentInstance {
    pub fn new(parent: ContentRef, content_type: ContentType) -> Self {
        Self {
            parent,
            content_type,
            name: String::new(),
            peer_order: None,
            child_order_rule: ChildOrderRule::default(),
            properties: BTreeMap::new(),
        }
    }

    /// Set a property declared by the content type, coercing the raw text to its kind.
    pub fn set_property(&mut self, name: &str, value: &str) -> Result<(), PropertyError> {
        let kind = *self
            .content_type
            .properties
            .get(name)
            .ok_or_else(|| PropertyError::Unknown {
                type_name: self.content_type.name.clone(),
                name: name.to_string(),
            })?;
        let typed = kind.coerce(value).ok_or_else(|| PropertyError::Coerce {
            name: name.to_string(),
            kind,
            value: value.to_string(),
        })?;
        self.properties.insert(name.to_string(), typed);
        Ok(())
    }

    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    pub fn properties(&self) -> &BTreeMap<String, PropertyValue> {
        &self.properties
    }

    pub fn into_properties(self) -> BTreeMap<String, PropertyValue> {
        self.properties
    }

    /// Required properties of the content type that have no value yet.
    pub fn missing_required(&self) -> Vec<String> {
        self.content_type
            .required
            .iter()
            .filter(|r| !self.properties.contains_key(*r))
            .cloned()
            .collect()
    }
}

/// A persisted node as the store reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentNode {
    pub reference: ContentRef,
    /// Parent link, None only for store roots
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ContentRef>,
    pub type_name: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer_order: Option<u32>,
    #[serde(default)]
    pub child_order_rule: ChildOrderRule,
    #[serde(default)]
    pub status: ContentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyValue>,
}
