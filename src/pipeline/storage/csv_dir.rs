use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

use super::{data_dictionary, OutputSink, DETAIL_INSURER, DETAIL_SOURCE, DETAIL_YEAR};
use crate::error::Result;
use crate::observability::metrics;
use crate::pipeline::pipeline::RunOutput;
use crate::pipeline::processing::assemble::DetailTable;

pub const FACTS_FILE: &str = "facts.csv";
pub const STATE_BREAKDOWN_FILE: &str = "state_breakdown.csv";
pub const CHECKS_DIR: &str = "checks";
pub const CROSSWALK_FILE: &str = "name_xwalk.csv";
pub const QA_LOG_FILE: &str = "qa_logs.csv";
pub const DICTIONARY_FILE: &str = "data_dictionary.csv";
pub const MANIFEST_FILE: &str = "run_manifest.json";

/// Writes each output table as CSV under one directory:
///
/// ```text
/// <root>/facts.csv
/// <root>/state_breakdown.csv
/// <root>/<detail>.csv          one per detail table, e.g. table_21_detail.csv
/// <root>/run_manifest.json
/// <root>/checks/name_xwalk.csv
/// <root>/checks/qa_logs.csv
/// <root>/checks/data_dictionary.csv
/// ```
#[derive(Debug, Clone)]
pub struct CsvDirectorySink {
    root: PathBuf,
}

impl CsvDirectorySink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<u64> {
        let mut writer = csv::Writer::from_path(path)?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        let bytes = fs::metadata(path)?.len();
        debug!(path = %path.display(), rows = rows.len(), bytes, "wrote CSV");
        Ok(bytes)
    }

    /// Detail tables carry their own label and value column names.
    fn write_detail(&self, detail: &DetailTable) -> Result<u64> {
        let path = self.root.join(format!("{}.csv", detail.name));
        let mut writer = csv::Writer::from_path(&path)?;
        writer.write_record([
            DETAIL_INSURER,
            DETAIL_YEAR,
            detail.label_column.as_str(),
            detail.value_column.as_str(),
            DETAIL_SOURCE,
        ])?;
        for row in &detail.rows {
            writer.serialize((&row.insurer, row.year, &row.label, row.value, &row.source_table))?;
        }
        writer.flush()?;
        let bytes = fs::metadata(&path)?.len();
        debug!(path = %path.display(), rows = detail.rows.len(), bytes, "wrote detail CSV");
        Ok(bytes)
    }
}

impl OutputSink for CsvDirectorySink {
    #[instrument(skip_all, fields(root = %self.root.display()))]
    fn write(&self, output: &RunOutput) -> Result<u64> {
        let checks = self.root.join(CHECKS_DIR);
        fs::create_dir_all(&checks)?;

        let mut bytes = 0;
        bytes += Self::write_csv(&self.root.join(FACTS_FILE), &output.facts)?;
        bytes += Self::write_csv(&self.root.join(STATE_BREAKDOWN_FILE), &output.state_breakdown)?;
        for detail in &output.details {
            bytes += self.write_detail(detail)?;
        }
        bytes += Self::write_csv(&checks.join(CROSSWALK_FILE), &output.crosswalk)?;
        bytes += Self::write_csv(&checks.join(QA_LOG_FILE), &output.findings)?;
        bytes += Self::write_csv(&checks.join(DICTIONARY_FILE), &data_dictionary(&output.details))?;

        let manifest_path = self.root.join(MANIFEST_FILE);
        let json = serde_json::to_string_pretty(&output.manifest)?;
        fs::write(&manifest_path, &json)?;
        bytes += json.len() as u64;

        metrics::run::bytes_written(bytes);
        info!(
            run_id = %output.manifest.run_id,
            facts = output.facts.len(),
            bytes,
            "outputs written"
        );
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::pipeline::pipeline::RunManifest;
    use crate::pipeline::processing::canonical::{
        CrosswalkRecord, MatchMethod, RegistryKind, Resolution,
    };
    use crate::pipeline::processing::extract::{DetailRecord, FactRecord, Kpi};
    use crate::pipeline::processing::quality_gate::QaFinding;
    use chrono::Utc;
    use std::collections::BTreeMap;
    use uuid::Uuid;

    fn output() -> RunOutput {
        let fact = FactRecord {
            insurer: "LIC".to_string(),
            year: 2024,
            l1: None,
            l2: None,
            l3: None,
            individual_group: Some("Not Applicable".to_string()),
            distribution_channel: None,
            state: None,
            kpi: Kpi::TotalPremium,
            value: 20_000_000.0,
            source_table: "Part I - Table 2".to_string(),
        };
        let resolution = Resolution {
            label: "LIC".to_string(),
            method: MatchMethod::Exact,
            score: Some(1.0),
        };
        RunOutput {
            manifest: RunManifest {
                run_id: Uuid::new_v4(),
                started_at: Utc::now(),
                finished_at: Utc::now(),
                rule_version: "v1.0.0".to_string(),
                inputs: Vec::new(),
                tables: Vec::new(),
                fact_count: 1,
                state_breakdown_count: 0,
                crosswalk_count: 1,
                findings: BTreeMap::new(),
                config: PipelineConfig::default(),
                metrics: None,
            },
            facts: vec![fact],
            state_breakdown: Vec::new(),
            details: vec![DetailTable {
                name: "table_23_detail".to_string(),
                label_column: "period".to_string(),
                value_column: "solvency_ratio".to_string(),
                rows: vec![DetailRecord {
                    insurer: "LIC".to_string(),
                    year: 2023,
                    label: "September 2023".to_string(),
                    value: 1.9,
                    source_table: "Part I - Table 23".to_string(),
                }],
            }],
            crosswalk: vec![CrosswalkRecord::new(RegistryKind::Insurer, " LIC ", &resolution)],
            findings: vec![QaFinding::info("summary", "facts", "record_count=1")],
        }
    }

    #[test]
    fn writes_every_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CsvDirectorySink::new(dir.path());
        let bytes = sink.write(&output()).unwrap();
        assert!(bytes > 0);

        for file in [FACTS_FILE, STATE_BREAKDOWN_FILE, MANIFEST_FILE] {
            assert!(dir.path().join(file).is_file(), "{file} missing");
        }
        for file in [CROSSWALK_FILE, QA_LOG_FILE, DICTIONARY_FILE] {
            assert!(dir.path().join(CHECKS_DIR).join(file).is_file(), "{file} missing");
        }
    }

    #[test]
    fn facts_csv_has_header_and_kpi_labels() {
        let dir = tempfile::tempdir().unwrap();
        CsvDirectorySink::new(dir.path()).write(&output()).unwrap();

        let mut rdr = csv::Reader::from_path(dir.path().join(FACTS_FILE)).unwrap();
        let headers = rdr.headers().unwrap().clone();
        assert_eq!(&headers[0], "insurer");
        assert_eq!(&headers[10], "source_table");
        let row = rdr.records().next().unwrap().unwrap();
        assert_eq!(&row[0], "LIC");
        assert_eq!(&row[8], "Total Premium");
        assert_eq!(row[9].parse::<f64>().unwrap(), 20_000_000.0);
    }

    #[test]
    fn detail_tables_use_their_own_column_names() {
        let dir = tempfile::tempdir().unwrap();
        CsvDirectorySink::new(dir.path()).write(&output()).unwrap();

        let mut rdr = csv::Reader::from_path(dir.path().join("table_23_detail.csv")).unwrap();
        let headers = rdr.headers().unwrap().clone();
        assert_eq!(
            headers.iter().collect::<Vec<_>>(),
            vec!["insurer", "year", "period", "solvency_ratio", "source_table"]
        );
        let row = rdr.records().next().unwrap().unwrap();
        assert_eq!(&row[2], "September 2023");
        assert_eq!(row[3].parse::<f64>().unwrap(), 1.9);
    }

    #[test]
    fn manifest_is_json_with_run_id() {
        let dir = tempfile::tempdir().unwrap();
        let out = output();
        CsvDirectorySink::new(dir.path()).write(&out).unwrap();

        let raw = fs::read_to_string(dir.path().join(MANIFEST_FILE)).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["run_id"], out.manifest.run_id.to_string());
        assert_eq!(json["fact_count"], 1);
        assert_eq!(json["config"]["channel_fiscal_year"], 2024);
    }
}
