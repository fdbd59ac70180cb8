use serde::{Deserialize, Serialize};

/// One spreadsheet cell as delivered by a workbook reader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
    #[default]
    Empty,
}

static EMPTY: Cell = Cell::Empty;

impl Cell {
    /// Trimmed, non-empty textual rendering of the cell.
    /// Integral numbers render without a fractional part so `2024.0` reads as `2024`.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Cell::Text(s) => {
                let t = s.trim();
                (!t.is_empty()).then(|| t.to_string())
            }
            Cell::Number(n) if n.is_finite() => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    Some(format!("{}", *n as i64))
                } else {
                    Some(n.to_string())
                }
            }
            _ => None,
        }
    }

    /// Numeric value of the cell. Text is accepted when it parses after
    /// removing thousands separators; dashes and other placeholders yield `None`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) if n.is_finite() => Some(*n),
            Cell::Text(s) => {
                let cleaned: String = s.trim().chars().filter(|c| *c != ',').collect();
                cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
            }
            _ => None,
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Cell::Number(n) if n.is_finite())
    }
}

/// An immutable 2-D grid for one named sheet.
///
/// Rows may be ragged; any out-of-range access reads as [`Cell::Empty`].
#[derive(Debug, Clone, PartialEq)]
pub struct RawGrid {
    sheet: String,
    rows: Vec<Vec<Cell>>,
}

impl RawGrid {
    pub fn new(sheet: impl Into<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self {
            sheet: sheet.into(),
            rows,
        }
    }

    pub fn sheet(&self) -> &str {
        &self.sheet
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Width of the widest row.
    pub fn n_cols(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY)
    }

    pub fn row(&self, row: usize) -> &[Cell] {
        self.rows.get(row).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn text(&self, row: usize, col: usize) -> Option<String> {
        self.cell(row, col).as_text()
    }

    pub fn number(&self, row: usize, col: usize) -> Option<f64> {
        self.cell(row, col).as_number()
    }

    /// All non-empty cells of a row joined with single spaces.
    pub fn row_text(&self, row: usize) -> String {
        self.row(row)
            .iter()
            .filter_map(Cell::as_text)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Index of the first row whose joined text contains any of `needles`
    /// (compared case-insensitively).
    pub fn find_row_containing(&self, needles: &[String]) -> Option<usize> {
        let lowered: Vec<String> = needles.iter().map(|n| n.to_lowercase()).collect();
        (0..self.n_rows()).find(|&r| {
            let text = self.row_text(r).to_lowercase();
            lowered.iter().any(|n| text.contains(n.as_str()))
        })
    }
}
