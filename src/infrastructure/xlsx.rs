//! Spreadsheet source backed by calamine

use std::path::{Path, PathBuf};

use calamine::{open_workbook, Data, Reader, Xlsx, XlsxError};
use tracing::{debug, instrument};

use crate::domain::Cell;
use crate::infrastructure::traits::{RowSource, SourceError};

/// First worksheet of an `.xlsx` workbook.
#[derive(Debug, Clone)]
pub struct XlsxRowSource {
    path: PathBuf,
}

impl XlsxRowSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

/// Convert a calamine cell. Whole numbers stay numbers; dates become text.
pub fn to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => Cell::Text(dt.to_string()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
    }
}

impl RowSource for XlsxRowSource {
    fn location(&self) -> &Path {
        &self.path
    }

    /// Zero-byte files count as missing.
    fn exists(&self) -> bool {
        std::fs::metadata(&self.path)
            .map(|meta| meta.is_file() && meta.len() > 0)
            .unwrap_or(false)
    }

    #[instrument(level = "debug", skip(self), fields(path = %self.path.display()))]
    fn read_rows(&self) -> Result<Vec<Vec<Cell>>, SourceError> {
        let mut workbook: Xlsx<_> =
            open_workbook(&self.path).map_err(|e: XlsxError| SourceError::Open {
                path: self.path.clone(),
                message: e.to_string(),
            })?;

        let sheet = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| SourceError::NoWorksheet(self.path.clone()))?;

        let range = workbook
            .worksheet_range(&sheet)
            .map_err(|e| SourceError::Sheet {
                path: self.path.clone(),
                sheet: sheet.clone(),
                message: e.to_string(),
            })?;

        // The range starts at the first used cell; pad so columns and row numbers stay absolute.
        let (first_row, first_col) = range.start().unwrap_or((0, 0));
        let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); first_row as usize];
        for row in range.rows() {
            let mut cells = vec![Cell::Empty; first_col as usize];
            cells.extend(row.iter().map(to_cell));
            rows.push(cells);
        }

        debug!("read {} rows from sheet {:?}", rows.len(), sheet);
        Ok(rows)
    }
}
