use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::error::{HandbookError, Result};
use crate::observability::metrics;
use crate::pipeline::ingestion::{RawGrid, WorkbookSource};
use crate::pipeline::processing::assemble::{DetailTable, FactAssembler};
use crate::pipeline::processing::canonical::{CrosswalkRecord, Registries};
use crate::pipeline::processing::extract::layout::Workbook;
use crate::pipeline::processing::extract::{
    builtin_layouts, extract, Extraction, FactRecord, TableLayout,
};
use crate::pipeline::processing::quality_gate::{
    DefaultQualityGate, QaFinding, QualityGate, QualityGateConfig,
};

/// SHA-256 fingerprint of one input file or directory.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct InputDigest {
    pub role: String,
    pub path: String,
    pub sha256: String,
}

impl InputDigest {
    /// Hash a file, or every file of a directory in name order (name then bytes).
    pub fn of_path(role: &str, path: &Path) -> Result<Self> {
        let mut hasher = Sha256::new();
        if path.is_dir() {
            let mut entries: Vec<_> = fs::read_dir(path)?
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.is_file())
                .collect();
            entries.sort();
            for entry in entries {
                if let Some(name) = entry.file_name() {
                    hasher.update(name.to_string_lossy().as_bytes());
                }
                hasher.update(fs::read(&entry)?);
            }
        } else {
            hasher.update(fs::read(path)?);
        }
        Ok(Self {
            role: role.to_string(),
            path: path.display().to_string(),
            sha256: hex::encode(hasher.finalize()),
        })
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TableSummary {
    pub table: String,
    pub sheet: String,
    pub records: usize,
    pub detail_records: usize,
    pub skipped_rows: usize,
}

/// Provenance of one run, written next to the outputs.
#[derive(Debug, Clone, Serialize)]
pub struct RunManifest {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub rule_version: String,
    pub inputs: Vec<InputDigest>,
    pub tables: Vec<TableSummary>,
    pub fact_count: usize,
    pub state_breakdown_count: usize,
    pub crosswalk_count: usize,
    /// Findings per severity.
    pub findings: BTreeMap<String, usize>,
    pub config: PipelineConfig,
    /// Prometheus text snapshot, when a recorder is installed.
    pub metrics: Option<String>,
}

/// Everything a run produces.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub manifest: RunManifest,
    pub facts: Vec<FactRecord>,
    pub state_breakdown: Vec<FactRecord>,
    /// Per-layout detail tables, in layout order.
    pub details: Vec<DetailTable>,
    pub crosswalk: Vec<CrosswalkRecord>,
    pub findings: Vec<QaFinding>,
}

impl RunOutput {
    pub fn has_errors(&self) -> bool {
        self.manifest.findings.get("error").copied().unwrap_or(0) > 0
    }
}

pub struct Pipeline {
    config: PipelineConfig,
    registries: Arc<Registries>,
    layouts: Vec<TableLayout>,
    gate: DefaultQualityGate,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        Self::with_layouts(config, builtin_layouts())
    }

    pub fn with_layouts(config: PipelineConfig, layouts: Vec<TableLayout>) -> Result<Self> {
        config.validate()?;
        let registries = Arc::new(Registries::builtin(&config)?);
        let gate = DefaultQualityGate::with_config(QualityGateConfig::from(&config));
        Ok(Self {
            config,
            registries,
            layouts,
            gate,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn registries(&self) -> &Registries {
        &self.registries
    }

    pub fn layouts(&self) -> &[TableLayout] {
        &self.layouts
    }

    /// Extract every layout, assemble the fact table and validate it.
    #[instrument(skip_all, fields(part_i = %part_i.name(), part_v = %part_v.name()))]
    pub fn run(
        &self,
        part_i: &dyn WorkbookSource,
        part_v: &dyn WorkbookSource,
    ) -> Result<RunOutput> {
        let started_at = Utc::now();
        let run_id = Uuid::new_v4();
        let t_run = Instant::now();
        info!(%run_id, tables = self.layouts.len(), "starting handbook run");

        let grids = self.load_grids(part_i, part_v)?;
        let extractions = self.extract_all(&grids)?;

        let tables: Vec<TableSummary> = extractions
            .iter()
            .zip(&self.layouts)
            .map(|(x, layout)| TableSummary {
                table: x.table.clone(),
                sheet: layout.sheet.clone(),
                records: x.facts.len(),
                detail_records: x.details.len(),
                skipped_rows: x.skipped_rows,
            })
            .collect();

        let assembly = FactAssembler::new(&self.config).assemble(extractions);
        let mut findings = assembly.findings;
        findings.extend(self.gate.validate(&assembly.facts, &assembly.crosswalk));
        findings.extend(self.gate.validate_breakdown(&assembly.state_breakdown));

        let mut by_severity: BTreeMap<String, usize> = BTreeMap::new();
        for finding in &findings {
            *by_severity
                .entry(finding.severity.as_str().to_string())
                .or_default() += 1;
        }

        let secs = t_run.elapsed().as_secs_f64();
        metrics::run::duration(secs);
        info!(
            %run_id,
            facts = assembly.facts.len(),
            findings = findings.len(),
            duration_secs = secs,
            "handbook run complete"
        );

        Ok(RunOutput {
            manifest: RunManifest {
                run_id,
                started_at,
                finished_at: Utc::now(),
                rule_version: self.gate.config.rule_version.clone(),
                inputs: Vec::new(),
                tables,
                fact_count: assembly.facts.len(),
                state_breakdown_count: assembly.state_breakdown.len(),
                crosswalk_count: assembly.crosswalk.len(),
                findings: by_severity,
                config: self.config.clone(),
                metrics: None,
            },
            facts: assembly.facts,
            state_breakdown: assembly.state_breakdown,
            details: assembly.details,
            crosswalk: assembly.crosswalk,
            findings,
        })
    }

    /// All sheets are read before any extractor runs; a missing one fails the run.
    fn load_grids(
        &self,
        part_i: &dyn WorkbookSource,
        part_v: &dyn WorkbookSource,
    ) -> Result<Vec<RawGrid>> {
        self.layouts
            .iter()
            .map(|layout| {
                let source = match layout.workbook {
                    Workbook::PartI => part_i,
                    Workbook::PartV => part_v,
                };
                let grid = source.sheet(&layout.sheet)?.ok_or_else(|| {
                    HandbookError::SheetNotFound {
                        table: layout.table.clone(),
                        sheet: layout.sheet.clone(),
                        workbook: source.name().to_string(),
                    }
                })?;
                debug!(table = %layout.table, rows = grid.n_rows(), cols = grid.n_cols(), "loaded sheet");
                Ok(grid)
            })
            .collect()
    }

    /// Results come back in layout order whichever mode runs them.
    fn extract_all(&self, grids: &[RawGrid]) -> Result<Vec<Extraction>> {
        let registries = self.registries.as_ref();
        let config = &self.config;
        if self.config.parallel_extraction {
            self.layouts
                .par_iter()
                .zip(grids.par_iter())
                .map(|(layout, grid)| extract(layout, grid, registries, config))
                .collect()
        } else {
            self.layouts
                .iter()
                .zip(grids)
                .map(|(layout, grid)| extract(layout, grid, registries, config))
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::*;
    use crate::pipeline::ingestion::{Cell, JsonWorkbook};
    use crate::pipeline::processing::extract::layout::{
        ColumnPlan, ColumnSegment, DataStart, EntityDim, HeaderRow, Metric, RowPlan,
        SeriesMetric, YearSeries,
    };
    use crate::pipeline::processing::extract::{Kpi, SourceUnit};
    use std::io::Write;

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    fn premium_layout(table: &str, sheet: &str) -> TableLayout {
        TableLayout {
            table: table.to_string(),
            sheet: sheet.to_string(),
            workbook: Workbook::PartI,
            segment: SEGMENT_NOT_APPLICABLE.to_string(),
            rows: RowPlan::Entities {
                dim: EntityDim::Insurer,
                label_col: 1,
                start: DataStart::AfterHeader,
                end: None,
                serial_col: None,
            },
            columns: ColumnPlan::YearSeries(YearSeries {
                header: HeaderRow::FirstContaining(vec!["2022-23".to_string()]),
                first_col: 2,
                segments: vec![ColumnSegment { cols: None, l1: None }],
                carry_year: false,
                header_must_contain: None,
                band: None,
                metric: SeriesMetric::Fixed(Metric::new(Kpi::TotalPremium, SourceUnit::Crore)),
                detail: None,
            }),
            rollup_states: false,
        }
    }

    fn premium_grid(sheet: &str) -> RawGrid {
        RawGrid::new(
            sheet,
            vec![
                vec![text("Sl"), text("Insurer"), text("2022-23"), text("2023-24")],
                vec![Cell::Number(1.0), text("LIC"), Cell::Number(2.0), Cell::Number(3.0)],
                vec![Cell::Number(2.0), text("SBI Life"), Cell::Number(1.0), Cell::Empty],
                vec![Cell::Empty, text(" Grand Total "), Cell::Number(3.0), Cell::Number(3.0)],
            ],
        )
    }

    #[test]
    fn run_extracts_assembles_and_validates() {
        let pipeline = Pipeline::with_layouts(
            PipelineConfig::default(),
            vec![premium_layout(TABLE_2, "2")],
        )
        .unwrap();
        let part_i = JsonWorkbook::from_grids("part1", vec![premium_grid("2")]);
        let part_v = JsonWorkbook::from_grids("part5", vec![]);

        let out = pipeline.run(&part_i, &part_v).unwrap();
        assert_eq!(out.facts.len(), 3);
        assert_eq!(out.facts[0].value, 20_000_000.0);
        assert_eq!(out.manifest.tables[0].records, 3);
        assert_eq!(out.manifest.fact_count, 3);
        assert!(out.facts.iter().all(|f| f.insurer != "Grand Total"));
        assert!(!out.has_errors());
    }

    #[test]
    fn aggregate_spellings_never_reach_the_facts() {
        let pipeline = Pipeline::with_layouts(
            PipelineConfig::default(),
            vec![premium_layout(TABLE_2, "2")],
        )
        .unwrap();
        let part_v = JsonWorkbook::from_grids("part5", vec![]);
        for label in ["Grand  Total", "Grand Total.", "Grand-Total", "Industry  Total"] {
            let grid = RawGrid::new(
                "2",
                vec![
                    vec![text("Sl"), text("Insurer"), text("2022-23")],
                    vec![Cell::Number(1.0), text("LIC"), Cell::Number(1.0)],
                    vec![Cell::Empty, text(label), Cell::Number(9.0)],
                ],
            );
            let part_i = JsonWorkbook::from_grids("part1", vec![grid]);
            let out = pipeline.run(&part_i, &part_v).unwrap();
            let insurers: Vec<_> = out.facts.iter().map(|f| f.insurer.as_str()).collect();
            assert_eq!(insurers, vec!["LIC"], "{label}");
            assert_eq!(out.manifest.tables[0].skipped_rows, 1, "{label}");
        }
    }

    #[test]
    fn missing_sheet_is_fatal() {
        let pipeline = Pipeline::with_layouts(
            PipelineConfig::default(),
            vec![premium_layout(TABLE_2, "2")],
        )
        .unwrap();
        let empty = JsonWorkbook::from_grids("part1", vec![]);
        let err = pipeline.run(&empty, &empty).unwrap_err();
        assert!(matches!(err, HandbookError::SheetNotFound { .. }));
        assert!(err.to_string().contains(TABLE_2));
    }

    #[test]
    fn parallel_and_sequential_runs_agree() {
        let layouts = vec![premium_layout(TABLE_2, "2"), premium_layout(TABLE_3, "3")];
        let part_i = JsonWorkbook::from_grids("part1", vec![premium_grid("2"), premium_grid("3")]);
        let part_v = JsonWorkbook::from_grids("part5", vec![]);

        let sequential = Pipeline::with_layouts(PipelineConfig::default(), layouts.clone())
            .unwrap()
            .run(&part_i, &part_v)
            .unwrap();
        let config = PipelineConfig {
            parallel_extraction: true,
            ..PipelineConfig::default()
        };
        let parallel = Pipeline::with_layouts(config, layouts)
            .unwrap()
            .run(&part_i, &part_v)
            .unwrap();

        assert_eq!(sequential.facts, parallel.facts);
        assert_eq!(sequential.crosswalk, parallel.crosswalk);
    }

    #[test]
    fn directory_digest_depends_on_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("2.csv");
        fs::File::create(&path).unwrap().write_all(b"a,b\n").unwrap();
        let first = InputDigest::of_path("part_i", dir.path()).unwrap();
        fs::File::create(&path).unwrap().write_all(b"a,c\n").unwrap();
        let second = InputDigest::of_path("part_i", dir.path()).unwrap();
        assert_ne!(first.sha256, second.sha256);
        assert_eq!(first.sha256.len(), 64);
    }
}
