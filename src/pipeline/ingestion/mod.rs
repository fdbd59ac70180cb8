// Pipeline ingestion: workbook readers and the grid locator

pub mod grid;
pub mod workbook;

pub use grid::{Cell, RawGrid};
pub use workbook::{CsvWorkbook, JsonWorkbook, WorkbookSource};
