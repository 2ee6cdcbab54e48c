//! Row decoding: one spreadsheet row into a `RowRecord`
//!
//! Column layout: `[0]` type name, `[1]` display name, `[2]` level, `[3..]` `name:value` fields.

use tracing::trace;

use crate::domain::entities::{Cell, RowRecord};
use crate::domain::error::{DomainError, DomainResult};

const TYPE_COLUMN: usize = 0;
const NAME_COLUMN: usize = 1;
const LEVEL_COLUMN: usize = 2;
const FIRST_FIELD_COLUMN: usize = 3;

impl RowRecord {
    /// Decode the cells of spreadsheet row number `row` (1-based).
    pub fn decode(row: usize, cells: &[Cell]) -> DomainResult<Self> {
        let type_name = required_text(row, cells, TYPE_COLUMN, "type name")?;
        let name = required_text(row, cells, NAME_COLUMN, "name")?;
        let level = decode_level(row, cells.get(LEVEL_COLUMN))?;

        let raw_fields: Vec<String> = cells
            .iter()
            .skip(FIRST_FIELD_COLUMN)
            .filter_map(|c| match c {
                Cell::Text(s) if !s.trim().is_empty() => Some(s.clone()),
                Cell::Empty | Cell::Text(_) => None,
                other => {
                    trace!("row {}: dropping non-text field cell {:?}", row, other);
                    None
                }
            })
            .collect();

        Ok(Self {
            row,
            type_name,
            name,
            level,
            raw_fields,
        })
    }
}

fn required_text(row: usize, cells: &[Cell], column: usize, what: &str) -> DomainResult<String> {
    match cells.get(column) {
        Some(Cell::Text(s)) if !s.trim().is_empty() => Ok(s.clone()),
        Some(Cell::Text(_)) | Some(Cell::Empty) | None => {
            Err(DomainError::malformed(row, format!("missing {what}")))
        }
        Some(other) => Err(DomainError::malformed(
            row,
            format!("{what} must be text, got {other:?}"),
        )),
    }
}

/// Levels are numeric cells; fractional values truncate toward zero.
fn decode_level(row: usize, cell: Option<&Cell>) -> DomainResult<u32> {
    match cell {
        Some(Cell::Number(n)) if n.is_finite() && *n >= 0.0 && *n < f64::from(u32::MAX) => {
            Ok(n.trunc() as u32)
        }
        Some(Cell::Number(n)) => Err(DomainError::malformed(
            row,
            format!("level out of range: {n}"),
        )),
        Some(other) => Err(DomainError::malformed(
            row,
            format!("level must be numeric, got {other:?}"),
        )),
        None => Err(DomainError::malformed(row, "missing level")),
    }
}
