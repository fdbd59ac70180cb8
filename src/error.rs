use thiserror::Error;

#[derive(Error, Debug)]
pub enum HandbookError {
    /// A sheet referenced by a table layout is absent from its workbook.
    #[error("{table}: sheet '{sheet}' not found in {workbook}")]
    SheetNotFound {
        table: String,
        sheet: String,
        workbook: String,
    },

    /// An expected header row or column could not be located in a sheet.
    #[error("{table}: sheet '{sheet}' is missing {expected} (row {row}, column {column})")]
    LayoutMismatch {
        table: String,
        sheet: String,
        expected: String,
        row: String,
        column: String,
    },

    #[error("registry '{registry}': variant '{variant}' maps to both '{first}' and '{second}'")]
    RegistryConflict {
        registry: String,
        variant: String,
        first: String,
        second: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Workbook error: {0}")]
    Workbook(String),

    #[error("Metrics error: {0}")]
    Metrics(String),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HandbookError {
    pub fn layout(
        table: &str,
        sheet: &str,
        expected: impl Into<String>,
        row: Option<usize>,
        column: Option<usize>,
    ) -> Self {
        let describe = |idx: Option<usize>| idx.map_or_else(|| "any".to_string(), |i| i.to_string());
        HandbookError::LayoutMismatch {
            table: table.to_string(),
            sheet: sheet.to_string(),
            expected: expected.into(),
            row: describe(row),
            column: describe(column),
        }
    }

    /// True for the fatal class of errors that signal a changed source layout
    /// or an inconsistent static configuration.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            HandbookError::SheetNotFound { .. }
                | HandbookError::LayoutMismatch { .. }
                | HandbookError::RegistryConflict { .. }
                | HandbookError::Config(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, HandbookError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_error_names_sheet_and_row() {
        let err = HandbookError::layout("Part I - Table 28", "28", "year header", Some(3), None);
        let msg = err.to_string();
        assert!(msg.contains("Part I - Table 28"));
        assert!(msg.contains("sheet '28'"));
        assert!(msg.contains("row 3"));
        assert!(msg.contains("column any"));
        assert!(err.is_configuration_error());
    }

    #[test]
    fn io_errors_are_not_configuration_errors() {
        let err: HandbookError = std::io::Error::new(std::io::ErrorKind::Other, "boom").into();
        assert!(!err.is_configuration_error());
    }
}
