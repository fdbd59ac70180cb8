use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{HandbookError, Result};
use crate::pipeline::processing::canonical::normalize_label;

/// Named constants that a handbook revision may change without a code change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// 1 crore = 10,000,000 rupees.
    pub crore_to_base: f64,
    /// Multiplier for counts reported in thousands.
    pub thousands_to_units: f64,
    /// The single fiscal year (ending year) covered by the Part V channel tables.
    pub channel_fiscal_year: i32,
    /// Minimum normalized edit-distance similarity for a fuzzy insurer match.
    pub fuzzy_threshold: f64,
    /// Inclusive range persistency ratios are expected to fall in.
    pub persistency_bounds: (f64, f64),
    /// Labels identifying subtotal, total and section-header rows. Compared
    /// after label normalization on both sides.
    pub aggregate_markers: Vec<String>,
    /// Words that mark an insurer column header as an aggregate block.
    pub aggregate_header_terms: Vec<String>,
    /// Run table extractors on the rayon pool instead of sequentially.
    pub parallel_extraction: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            crore_to_base: 10_000_000.0,
            thousands_to_units: 1_000.0,
            channel_fiscal_year: 2024,
            fuzzy_threshold: 0.92,
            persistency_bounds: (0.0, 100.0),
            aggregate_markers: default_aggregate_markers(),
            aggregate_header_terms: vec!["total".into(), "sector".into(), "grand".into()],
            parallel_extraction: false,
        }
    }
}

/// Aggregate row and column labels observed in the 2023-24 handbook workbooks.
///
/// Section headers ("public sector", "private sector") appear in the insurer
/// column of Tables 2, 3, 12, 21, 23 and 28; "all india" and "s.no." appear in
/// the state column of Tables 6 and 8.
pub fn default_aggregate_markers() -> Vec<String> {
    [
        "total",
        "grand total",
        "industry total",
        "private total",
        "private sector total",
        "public sector total",
        "public sector",
        "private sector",
        "all india",
        "s.no.",
        "particulars",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl PipelineConfig {
    /// Load a config file; keys absent from the file keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            HandbookError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: PipelineConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.fuzzy_threshold) {
            return Err(HandbookError::Config(format!(
                "fuzzy_threshold must lie in [0, 1], got {}",
                self.fuzzy_threshold
            )));
        }
        if self.persistency_bounds.0 > self.persistency_bounds.1 {
            return Err(HandbookError::Config(format!(
                "persistency_bounds lower {} exceeds upper {}",
                self.persistency_bounds.0, self.persistency_bounds.1
            )));
        }
        if self.crore_to_base <= 0.0 || self.thousands_to_units <= 0.0 {
            return Err(HandbookError::Config(
                "unit conversion constants must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// True when `label` normalizes to an aggregate marker, so "Grand-Total",
    /// "Grand Total." and "grand  total" all match "grand total".
    pub fn is_aggregate(&self, label: &str) -> bool {
        let label = normalize_label(label);
        self.aggregate_markers
            .iter()
            .any(|m| normalize_label(m) == label)
    }

    /// Aggregate test for insurer column headers, which also reject any header
    /// containing one of `aggregate_header_terms` as a word.
    pub fn is_aggregate_header(&self, label: &str) -> bool {
        if self.is_aggregate(label) {
            return true;
        }
        let label = normalize_label(label);
        label
            .split(' ')
            .any(|word| self.aggregate_header_terms.iter().any(|t| t == word))
    }
}
