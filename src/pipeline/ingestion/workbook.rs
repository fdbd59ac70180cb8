use csv::ReaderBuilder;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::grid::{Cell, RawGrid};
use crate::error::{HandbookError, Result};

/// A workbook reader: hands out one [`RawGrid`] per sheet name.
///
/// Sheet names are matched literally, including surrounding whitespace.
pub trait WorkbookSource: Send + Sync {
    /// Human-readable identifier used in error messages.
    fn name(&self) -> &str;

    /// Load a sheet, or `Ok(None)` when the workbook has no such sheet.
    fn sheet(&self, sheet: &str) -> Result<Option<RawGrid>>;
}

#[derive(Debug, Deserialize)]
struct WorkbookDocument {
    sheets: BTreeMap<String, Vec<Vec<Cell>>>,
}

/// A workbook held in memory, loaded from a JSON export of the form
/// `{"sheets": {"<name>": [[cell, ...], ...]}}`.
#[derive(Debug, Clone)]
pub struct JsonWorkbook {
    name: String,
    sheets: BTreeMap<String, Vec<Vec<Cell>>>,
}

impl JsonWorkbook {
    pub fn open(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            HandbookError::Workbook(format!("Failed to read '{}': {}", path.display(), e))
        })?;
        let doc: WorkbookDocument = serde_json::from_str(&content)?;
        debug!(path = %path.display(), sheets = doc.sheets.len(), "loaded JSON workbook");
        Ok(Self {
            name: path.display().to_string(),
            sheets: doc.sheets,
        })
    }

    pub fn from_grids(name: impl Into<String>, grids: Vec<RawGrid>) -> Self {
        let sheets = grids
            .into_iter()
            .map(|g| {
                let rows = (0..g.n_rows()).map(|r| g.row(r).to_vec()).collect();
                (g.sheet().to_string(), rows)
            })
            .collect();
        Self {
            name: name.into(),
            sheets,
        }
    }
}

impl WorkbookSource for JsonWorkbook {
    fn name(&self) -> &str {
        &self.name
    }

    fn sheet(&self, sheet: &str) -> Result<Option<RawGrid>> {
        Ok(self
            .sheets
            .get(sheet)
            .map(|rows| RawGrid::new(sheet, rows.clone())))
    }
}

/// A workbook exported as one headerless CSV file per sheet: `<dir>/<sheet>.csv`.
#[derive(Debug, Clone)]
pub struct CsvWorkbook {
    dir: PathBuf,
    name: String,
}

impl CsvWorkbook {
    pub fn open(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(HandbookError::Workbook(format!(
                "'{}' is not a directory of sheet CSV files",
                dir.display()
            )));
        }
        Ok(Self {
            dir: dir.to_path_buf(),
            name: dir.display().to_string(),
        })
    }

    fn parse_field(raw: &str) -> Cell {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Cell::Empty
        } else if let Ok(n) = trimmed.parse::<f64>() {
            Cell::Number(n)
        } else {
            Cell::Text(raw.to_string())
        }
    }
}

impl WorkbookSource for CsvWorkbook {
    fn name(&self) -> &str {
        &self.name
    }

    fn sheet(&self, sheet: &str) -> Result<Option<RawGrid>> {
        let path = self.dir.join(format!("{}.csv", sheet));
        if !path.is_file() {
            return Ok(None);
        }

        let mut rdr = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&path)?;

        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record?;
            rows.push(record.iter().map(Self::parse_field).collect());
        }
        debug!(path = %path.display(), rows = rows.len(), "loaded CSV sheet");
        Ok(Some(RawGrid::new(sheet, rows)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn json_workbook_matches_trailing_space_literally() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"sheets": {{"11 ": [[null, "Particulars"], [1, 2.5]]}}}}"#
        )
        .unwrap();

        let wb = JsonWorkbook::open(file.path()).unwrap();
        assert!(wb.sheet("11").unwrap().is_none());
        let grid = wb.sheet("11 ").unwrap().unwrap();
        assert_eq!(grid.sheet(), "11 ");
        assert_eq!(grid.number(1, 1), Some(2.5));
    }

    #[test]
    fn csv_workbook_reads_one_file_per_sheet() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("2.csv"), "S.No.,Insurer,2022-23\n1,LIC,\"1,234\"\n").unwrap();
        fs::write(dir.path().join("11 .csv"), "a\n").unwrap();

        let wb = CsvWorkbook::open(dir.path()).unwrap();
        let grid = wb.sheet("2").unwrap().unwrap();
        assert_eq!(grid.text(0, 2).as_deref(), Some("2022-23"));
        assert_eq!(grid.cell(1, 0), &Cell::Number(1.0));
        assert_eq!(grid.number(1, 2), Some(1234.0));
        assert!(wb.sheet("3").unwrap().is_none());
        assert!(wb.sheet("11 ").unwrap().is_some());
    }
}
