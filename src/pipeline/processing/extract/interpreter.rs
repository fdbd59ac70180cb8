use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

use super::categories::{match_category, Category};
use super::layout::{
    BlockMetric, ColumnPlan, DataStart, DetailLabel, EntityDim, HeaderRow, InsurerBlocks, Metric,
    RowPlan, SeriesMetric, TableLayout, YearSeries,
};
use super::year::parse_year_cell;
use super::{ExtractedDetail, ExtractedFact, Extraction, FactRecord, Kpi};
use crate::config::PipelineConfig;
use crate::error::{HandbookError, Result};
use crate::observability::metrics;
use crate::pipeline::ingestion::RawGrid;
use crate::pipeline::processing::canonical::{LabelResolver, MatchMethod, Registries, RegistryKind};

static TENOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(\d+)\*?").unwrap());
static LETTER_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\(\s*([A-P])\s*\)").unwrap());

/// Fund band of columns left of the first band heading.
const DEFAULT_BAND: &str = "Total";

/// One value column, with everything the column header decides.
#[derive(Debug, Clone)]
struct ColumnBinding {
    col: usize,
    year: i32,
    insurer: Option<String>,
    metric: Metric,
    l1: Option<String>,
    channel: Option<String>,
    /// False for columns kept only for the detail table.
    fact: bool,
    detail: Option<String>,
}

/// Dimensions a data row decides.
#[derive(Debug, Default)]
struct RowContext {
    insurer: Option<String>,
    state: Option<String>,
    category: Option<&'static Category>,
}

struct Interpreter<'a> {
    layout: &'a TableLayout,
    grid: &'a RawGrid,
    config: &'a PipelineConfig,
    registries: &'a Registries,
    resolver: LabelResolver<'a>,
    facts: Vec<ExtractedFact>,
    details: Vec<ExtractedDetail>,
    skipped_rows: usize,
}

/// Run one table layout over its sheet.
///
/// Fails only on layout errors (a header row that cannot be located or that
/// yields no value columns); everything row-level is skipped and counted.
#[instrument(skip_all, fields(table = %layout.table, sheet = %layout.sheet))]
pub fn extract(
    layout: &TableLayout,
    grid: &RawGrid,
    registries: &Registries,
    config: &PipelineConfig,
) -> Result<Extraction> {
    let started = Instant::now();
    let mut interp = Interpreter {
        layout,
        grid,
        config,
        registries,
        resolver: LabelResolver::new(registries),
        facts: Vec::new(),
        details: Vec::new(),
        skipped_rows: 0,
    };

    let (bindings, header_row) = interp.bind_columns()?;
    debug!(columns = bindings.len(), header_row = ?header_row, "bound value columns");
    interp.read_rows(&bindings, header_row)?;

    let elapsed = started.elapsed().as_secs_f64();
    metrics::extract::records_emitted(&layout.table, interp.facts.len());
    metrics::extract::duration(&layout.table, elapsed);
    info!(
        records = interp.facts.len(),
        details = interp.details.len(),
        skipped_rows = interp.skipped_rows,
        labels = interp.resolver.log().len(),
        "table extracted"
    );

    Ok(Extraction {
        table: layout.table.clone(),
        facts: interp.facts,
        details: interp.details,
        detail_plan: layout.detail().cloned(),
        crosswalk: interp.resolver.into_log(),
        skipped_rows: interp.skipped_rows,
        rollup_states: layout.rollup_states,
    })
}

impl<'a> Interpreter<'a> {
    fn layout_error(&self, expected: &str, row: Option<usize>, column: Option<usize>) -> HandbookError {
        HandbookError::layout(&self.layout.table, &self.layout.sheet, expected, row, column)
    }

    fn skip_row(&mut self, reason: &'static str) {
        self.skipped_rows += 1;
        metrics::extract::row_skipped(&self.layout.table, reason);
    }

    fn bind_columns(&mut self) -> Result<(Vec<ColumnBinding>, Option<usize>)> {
        let layout = self.layout;
        match &layout.columns {
            ColumnPlan::YearSeries(series) => {
                let header_row = self.locate_header(&series.header)?;
                let bindings = self.bind_year_series(series, header_row);
                if !bindings.iter().any(|b| b.fact) {
                    return Err(self.layout_error("year columns", Some(header_row), None));
                }
                Ok((bindings, Some(header_row)))
            }
            ColumnPlan::InsurerBlocks(blocks) => {
                for row in [blocks.insurer_row, blocks.year_row] {
                    if row >= self.grid.n_rows() {
                        return Err(self.layout_error("insurer/year header", Some(row), None));
                    }
                }
                let bindings = self.bind_insurer_blocks(blocks);
                if bindings.is_empty() {
                    return Err(self.layout_error(
                        "insurer/year column blocks",
                        Some(blocks.year_row),
                        None,
                    ));
                }
                Ok((bindings, Some(blocks.year_row)))
            }
            ColumnPlan::ChannelMap { columns } => {
                // The first column of each channel carries its heading.
                let mut headings: HashMap<&str, String> = HashMap::new();
                let mut bindings = Vec::with_capacity(columns.len());
                for c in columns {
                    if !headings.contains_key(c.channel.as_str()) {
                        let heading = self.channel_heading(c.col, &c.channel)?;
                        headings.insert(c.channel.as_str(), heading);
                    }
                    let heading = headings[c.channel.as_str()].clone();
                    bindings.push(self.channel_binding(c.col, &heading, c.metric));
                }
                Ok((bindings, None))
            }
            ColumnPlan::ChannelStride { first_col, channels, metrics } => {
                let mut bindings = Vec::with_capacity(channels.len() * metrics.len());
                for (i, channel) in channels.iter().enumerate() {
                    let block = first_col + i * metrics.len();
                    let heading = self.channel_heading(block, channel)?;
                    for (j, metric) in metrics.iter().enumerate() {
                        bindings.push(self.channel_binding(block + j, &heading, *metric));
                    }
                }
                Ok((bindings, None))
            }
        }
    }

    fn locate_header(&self, header: &HeaderRow) -> Result<usize> {
        match header {
            HeaderRow::Fixed(row) if *row < self.grid.n_rows() => Ok(*row),
            HeaderRow::Fixed(row) => Err(self.layout_error("year header row", Some(*row), None)),
            HeaderRow::FirstContaining(markers) => self
                .grid
                .find_row_containing(markers)
                .ok_or_else(|| {
                    self.layout_error(&format!("header row containing {:?}", markers), None, None)
                }),
        }
    }

    fn bind_year_series(&self, series: &YearSeries, header_row: usize) -> Vec<ColumnBinding> {
        let mut bindings = Vec::new();
        for segment in &series.segments {
            let (lo, hi) = segment.cols.unwrap_or((series.first_col, self.grid.n_cols()));
            let mut current_year = None;
            let mut current_band: Option<String> = None;

            for col in lo..hi {
                let header = self.grid.cell(header_row, col);
                let mut year = parse_year_cell(header);
                if series.carry_year {
                    if year.is_some() {
                        current_year = year;
                    }
                    year = current_year;
                }

                let mut fact = true;
                if let Some(band) = &series.band {
                    if let Some(label) = band.rows.iter().find_map(|&r| self.grid.text(r, col)) {
                        current_band = Some(label);
                    }
                    fact = current_band
                        .as_deref()
                        .map(|b| b.to_lowercase().contains(&band.keep))
                        .unwrap_or(false);
                }

                let header_text = header.as_text().unwrap_or_default();
                if let Some(needle) = &series.header_must_contain {
                    fact = fact && header_text.to_lowercase().contains(needle.as_str());
                }

                let detail = series.detail.as_ref().map(|plan| match plan.label {
                    DetailLabel::Band => current_band
                        .clone()
                        .unwrap_or_else(|| DEFAULT_BAND.to_string()),
                    DetailLabel::Header => header_text.clone(),
                });
                if !fact && detail.is_none() {
                    continue;
                }

                let metric = match &series.metric {
                    SeriesMetric::Fixed(m) => *m,
                    SeriesMetric::Tenor { row } => {
                        let months = self
                            .grid
                            .text(*row, col)
                            .and_then(|t| TENOR.captures(&t).and_then(|c| c[1].parse::<u16>().ok()));
                        match months {
                            Some(months) => Metric::default_for(Kpi::Persistency { months }),
                            None => continue,
                        }
                    }
                };

                let Some(year) = year else { continue };
                bindings.push(ColumnBinding {
                    col,
                    year,
                    insurer: None,
                    metric,
                    l1: segment.l1.clone(),
                    channel: None,
                    fact,
                    detail,
                });
            }
        }
        bindings
    }

    fn bind_insurer_blocks(&mut self, blocks: &InsurerBlocks) -> Vec<ColumnBinding> {
        let mut bindings = Vec::new();
        let mut current_insurer: Option<String> = None;
        let mut current_year = None;

        for col in blocks.first_col..self.grid.n_cols() {
            if let Some(raw) = self.grid.text(blocks.insurer_row, col) {
                current_insurer = if self.config.is_aggregate_header(&raw) {
                    None
                } else {
                    Some(self.resolver.resolve(RegistryKind::Insurer, &raw).label)
                };
            }

            let mut year = parse_year_cell(self.grid.cell(blocks.year_row, col));
            if blocks.carry_year {
                if year.is_some() {
                    current_year = year;
                }
                year = current_year;
            }

            let (Some(insurer), Some(year)) = (current_insurer.clone(), year) else {
                continue;
            };
            if let Some((lo, hi)) = blocks.year_bounds {
                if year < lo || year > hi {
                    continue;
                }
            }

            let metric = match &blocks.metric {
                BlockMetric::Fixed(m) => *m,
                BlockMetric::Row { row, patterns } => {
                    let text = self.grid.text(*row, col).unwrap_or_default().to_lowercase();
                    match patterns.iter().find(|(p, _)| text.contains(p.as_str())) {
                        Some((_, m)) => *m,
                        None => continue,
                    }
                }
            };

            bindings.push(ColumnBinding {
                col,
                year,
                insurer: Some(insurer),
                metric,
                l1: None,
                channel: None,
                fact: true,
                detail: None,
            });
        }
        bindings
    }

    /// Source heading of the channel block starting at `col`: the first cell
    /// above the data rows that names a known channel. A heading naming a
    /// different channel than the layout expects is a layout error; a block
    /// without one falls back to the layout's name.
    fn channel_heading(&self, col: usize, expected: &str) -> Result<String> {
        let channels = self.registries.get(RegistryKind::Channel);
        let expected_label = channels.resolve(expected).label;
        for row in 0..self.data_start().min(self.grid.n_rows()) {
            let Some(text) = self.grid.text(row, col) else { continue };
            let found = channels.resolve(&text);
            if found.method != MatchMethod::Exact {
                continue;
            }
            if found.label != expected_label {
                warn!(row, col, found = %text, expected, "channel heading out of place");
                return Err(self.layout_error(
                    &format!("channel heading '{}', found '{}'", expected, text),
                    Some(row),
                    Some(col),
                ));
            }
            return Ok(text);
        }
        debug!(col, channel = expected, "no channel heading in sheet");
        Ok(expected.to_string())
    }

    /// First data row of a fixed-start row plan; headings live above it.
    fn data_start(&self) -> usize {
        match &self.layout.rows {
            RowPlan::Entities { start: DataStart::Fixed(row), .. } => *row,
            RowPlan::Categories { start, .. } => *start,
            RowPlan::Entities { .. } => 0,
        }
    }

    fn channel_binding(&mut self, col: usize, heading: &str, metric: Metric) -> ColumnBinding {
        let resolved = self.resolver.resolve(RegistryKind::Channel, heading);
        ColumnBinding {
            col,
            year: self.config.channel_fiscal_year,
            insurer: None,
            metric,
            l1: None,
            channel: Some(resolved.label),
            fact: true,
            detail: None,
        }
    }

    fn read_rows(&mut self, bindings: &[ColumnBinding], header_row: Option<usize>) -> Result<()> {
        let layout = self.layout;
        let grid = self.grid;
        match &layout.rows {
            RowPlan::Entities { dim, label_col, start, end, serial_col } => {
                let start = match start {
                    DataStart::Fixed(row) => *row,
                    DataStart::AfterHeader => header_row
                        .map(|h| h + 1)
                        .ok_or_else(|| self.layout_error("header row before data", None, None))?,
                };
                let end = end.unwrap_or(grid.n_rows()).min(grid.n_rows());

                for row in start..end {
                    if let Some(sc) = serial_col {
                        if !grid.cell(row, *sc).is_number() {
                            continue;
                        }
                    }
                    let cell = grid.cell(row, *label_col);
                    if *dim == EntityDim::State && cell.is_number() {
                        continue;
                    }
                    let Some(raw) = cell.as_text() else { continue };
                    if self.config.is_aggregate(&raw) {
                        self.skip_row("aggregate");
                        continue;
                    }
                    // Footnotes and spacer rows carry no values; keep them out of the crosswalk.
                    if !bindings.iter().any(|b| grid.number(row, b.col).is_some()) {
                        continue;
                    }

                    let ctx = match dim {
                        EntityDim::Insurer => RowContext {
                            insurer: Some(self.resolver.resolve(RegistryKind::Insurer, &raw).label),
                            ..RowContext::default()
                        },
                        EntityDim::State => RowContext {
                            state: Some(self.resolver.resolve(RegistryKind::State, &raw).label),
                            ..RowContext::default()
                        },
                    };
                    self.emit_row(row, &ctx, bindings);
                }
            }
            RowPlan::Categories { label_col, start, emit_phrase, skip_contains } => {
                let mut current: Option<&'static Category> = None;
                for row in *start..grid.n_rows() {
                    let Some(raw) = grid.text(row, *label_col) else { continue };
                    let lower = raw.to_lowercase();
                    if let Some(category) = match_category(&raw) {
                        current = Some(category);
                    }
                    if skip_contains.iter().any(|s| lower.contains(s.as_str())) {
                        self.skip_row("aggregate");
                        continue;
                    }
                    if !lower.contains(emit_phrase.as_str()) || !LETTER_MARKER.is_match(&raw) {
                        continue;
                    }
                    let Some(category) = current else {
                        warn!(row, label = %raw, "business-in-force row before any category header");
                        self.skip_row("unmatched_category");
                        continue;
                    };
                    let ctx = RowContext {
                        category: Some(category),
                        ..RowContext::default()
                    };
                    self.emit_row(row, &ctx, bindings);
                }
            }
        }
        Ok(())
    }

    fn emit_row(&mut self, row: usize, ctx: &RowContext, bindings: &[ColumnBinding]) {
        for binding in bindings {
            let Some(value) = self.grid.number(row, binding.col) else { continue };
            let Some(insurer) = ctx.insurer.clone().or_else(|| binding.insurer.clone()) else {
                continue;
            };
            let (l1, l2, l3) = match ctx.category {
                Some(c) => (
                    Some(c.l1.to_string()),
                    c.l2.map(str::to_string),
                    Some(c.l3.to_string()),
                ),
                None => (binding.l1.clone(), None, None),
            };
            let fact = ExtractedFact {
                record: FactRecord {
                    insurer,
                    year: binding.year,
                    l1,
                    l2,
                    l3,
                    individual_group: Some(self.layout.segment.clone()),
                    distribution_channel: binding.channel.clone(),
                    state: ctx.state.clone(),
                    kpi: binding.metric.kpi,
                    value,
                    source_table: self.layout.table.clone(),
                },
                unit: binding.metric.unit,
            };
            if let Some(label) = &binding.detail {
                self.details.push(ExtractedDetail {
                    fact: fact.clone(),
                    label: label.clone(),
                });
            }
            if binding.fact {
                self.facts.push(fact);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::*;
    use crate::pipeline::ingestion::Cell;
    use crate::pipeline::processing::extract::builtin_layouts;
    use crate::pipeline::processing::extract::SourceUnit;

    fn t(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    fn n(v: f64) -> Cell {
        Cell::Number(v)
    }

    fn layout(table: &str) -> TableLayout {
        builtin_layouts().into_iter().find(|l| l.table == table).unwrap()
    }

    fn run(table: &str, rows: Vec<Vec<Cell>>) -> Result<Extraction> {
        let config = PipelineConfig::default();
        let registries = Registries::builtin(&config).unwrap();
        let layout = layout(table);
        let grid = RawGrid::new(layout.sheet.clone(), rows);
        extract(&layout, &grid, &registries, &config)
    }

    #[test]
    fn premium_table_skips_aggregates_and_blanks() {
        let rows = vec![
            vec![t("Table 2"), t("Total Premium")],
            vec![t("S.No."), t("Insurer"), t("2014-15"), t("2023-24")],
            vec![Cell::Empty, t("Public Sector")],
            vec![n(1.0), t("LIC of India"), n(100.0), t("-")],
            vec![n(2.0), t("  GRAND TOTAL "), n(900.0), n(950.0)],
            vec![n(3.0), t("Note: figures in crore")],
        ];
        let out = run(TABLE_2, rows).unwrap();
        assert_eq!(out.facts.len(), 1);
        let f = &out.facts[0];
        assert_eq!(f.record.insurer, "LIC");
        assert_eq!(f.record.year, 2015);
        assert_eq!(f.record.value, 100.0);
        assert_eq!(f.unit, SourceUnit::Crore);
        assert_eq!(f.record.individual_group.as_deref(), Some(SEGMENT_NOT_APPLICABLE));
        assert_eq!(out.crosswalk.len(), 1);
        assert_eq!(out.skipped_rows, 2);
    }

    #[test]
    fn missing_year_header_is_a_layout_error() {
        let err = run(TABLE_3, vec![vec![t("no years here")]]).unwrap_err();
        assert!(err.is_configuration_error());
        assert!(err.to_string().contains("Part I - Table 3"));
    }

    #[test]
    fn persistency_tenors_carry_the_year() {
        let rows = vec![
            vec![],
            vec![],
            vec![],
            vec![Cell::Empty, Cell::Empty, t("2023-24"), Cell::Empty],
            vec![Cell::Empty, t("Insurer"), t("13*"), t("25")],
            vec![n(1.0), t("SBI Life"), n(85.5), n(105.0)],
        ];
        let out = run(TABLE_28, rows).unwrap();
        let kpis: Vec<_> = out.facts.iter().map(|f| f.record.kpi).collect();
        assert_eq!(kpis, vec![Kpi::Persistency { months: 13 }, Kpi::Persistency { months: 25 }]);
        assert!(out.facts.iter().all(|f| f.record.year == 2024));
        assert_eq!(out.facts[1].record.value, 105.0);
    }

    #[test]
    fn category_rows_emit_only_lettered_in_force_rows() {
        let rows = vec![
            vec![],
            vec![],
            vec![t("Particulars"), t("LIC"), Cell::Empty, t("Grand Total")],
            vec![Cell::Empty, t("2022-23"), t("2023-24"), t("2023-24")],
            vec![t("Business in force at end of the financial year (A)"), n(1.0), n(1.0), n(1.0)],
            vec![t("Non Linked - Pension Business")],
            vec![t("Policies issued"), n(5.0), n(6.0), n(9.0)],
            vec![t("Business in force at end of the financial year (C)"), n(10.0), n(12.0), n(99.0)],
            vec![t("Grand Total (A+B+C+D)"), n(50.0), n(60.0), n(500.0)],
        ];
        let out = run(TABLE_10, rows).unwrap();
        assert_eq!(out.facts.len(), 2);
        let f = &out.facts[1];
        assert_eq!(f.record.l1.as_deref(), Some(L1_NON_LINKED));
        assert_eq!(f.record.l2, None);
        assert_eq!(f.record.l3.as_deref(), Some("Pension"));
        assert_eq!(f.record.year, 2024);
        assert_eq!(f.record.value, 12.0);
        assert_eq!(f.unit, SourceUnit::Thousands);
        assert_eq!(out.skipped_rows, 2);
    }

    #[test]
    fn state_blocks_read_metric_row() {
        let rows = vec![
            vec![],
            vec![],
            vec![Cell::Empty, Cell::Empty, t("HDFC Life"), Cell::Empty, t("Grand Total"), Cell::Empty],
            vec![Cell::Empty, Cell::Empty, t("2023-24"), Cell::Empty, t("2023-24"), Cell::Empty],
            vec![Cell::Empty, t("State"), t("No. of Policies"), t("Premium"), t("No. of Policies"), t("Premium")],
            vec![n(1.0), t("Jharkand"), n(10.0), n(2.5), n(99.0), n(99.0)],
            vec![Cell::Empty, t("All India"), n(10.0), n(2.5), n(99.0), n(99.0)],
        ];
        let out = run(TABLE_6, rows).unwrap();
        assert_eq!(out.facts.len(), 2);
        assert!(out.rollup_states);
        let policy = &out.facts[0];
        assert_eq!(policy.record.state.as_deref(), Some("Jharkhand"));
        assert_eq!(policy.record.insurer, "HDFC Life");
        assert_eq!(policy.record.kpi, Kpi::NewBusinessPolicy);
        assert_eq!(policy.unit, SourceUnit::Units);
        assert_eq!(out.facts[1].unit, SourceUnit::Crore);
    }

    #[test]
    fn offices_ignore_dashes_and_years_out_of_bounds() {
        let rows = vec![
            vec![],
            vec![Cell::Empty, Cell::Empty, t("LIC"), Cell::Empty, Cell::Empty],
            vec![Cell::Empty, t("State"), t("2012-13"), t("2022-23"), t("2023-24")],
            vec![n(1.0), t("Orissa"), n(4.0), t("-"), n(7.0)],
        ];
        let out = run(TABLE_29, rows).unwrap();
        assert_eq!(out.facts.len(), 1);
        assert_eq!(out.facts[0].record.state.as_deref(), Some("Odisha"));
        assert_eq!(out.facts[0].record.year, 2024);
    }

    #[test]
    fn channel_stride_uses_configured_year() {
        let mut row = vec![n(1.0), t("Tata AIA Life Insurance Company Ltd")];
        row.extend((0..36).map(|i| n(i as f64)));
        let rows = vec![vec![], vec![], vec![], vec![], vec![t("S.No.")], row];
        let out = run(TABLE_102, rows).unwrap();
        assert_eq!(out.facts.len(), 36);
        let brokers_lives = &out.facts[3 * 3 + 2];
        assert_eq!(brokers_lives.record.distribution_channel.as_deref(), Some("Brokers"));
        assert_eq!(brokers_lives.record.kpi, Kpi::LivesCovered);
        assert_eq!(brokers_lives.record.value, 11.0);
        assert_eq!(brokers_lives.record.year, 2024);
        assert_eq!(brokers_lives.record.insurer, "Tata AIA");
    }

    #[test]
    fn aggregate_insurer_headers_close_their_block() {
        let rows = vec![
            vec![],
            vec![
                Cell::Empty,
                Cell::Empty,
                t("LIC"),
                t("Private Sector Insurers Total"),
                t("Grand-Total"),
            ],
            vec![Cell::Empty, t("State"), t("2023-24"), t("2023-24"), t("2023-24")],
            vec![n(1.0), t("Orissa"), n(4.0), n(50.0), n(99.0)],
        ];
        let out = run(TABLE_29, rows).unwrap();
        assert_eq!(out.facts.len(), 1);
        assert_eq!(out.facts[0].record.insurer, "LIC");
        let insurers: Vec<_> = out
            .crosswalk
            .records()
            .iter()
            .filter(|r| r.registry == RegistryKind::Insurer)
            .map(|r| r.source_label.as_str())
            .collect();
        assert_eq!(insurers, vec!["LIC"]);
    }

    #[test]
    fn fund_bands_outside_grand_total_go_to_detail_only() {
        let rows = vec![
            vec![t("Table 21")],
            vec![],
            vec![],
            vec![Cell::Empty, Cell::Empty, t("Total (Life Fund)"), Cell::Empty, t("Grand Total (All Funds)")],
            vec![],
            vec![t("S.No."), t("Insurer"), t("2021-22"), t("2022-23"), t("2021-22"), t("2022-23")],
            vec![n(1.0), t("LIC"), n(1.0), n(2.0), n(3.0), n(4.0)],
        ];
        let out = run(TABLE_21, rows).unwrap();
        let facts: Vec<_> = out.facts.iter().map(|f| (f.record.year, f.record.value)).collect();
        assert_eq!(facts, vec![(2022, 3.0), (2023, 4.0)]);

        assert_eq!(out.detail_plan.as_ref().map(|p| p.output.as_str()), Some("table_21_detail"));
        let bands: Vec<_> = out.details.iter().map(|d| d.label.as_str()).collect();
        assert_eq!(
            bands,
            vec!["Total (Life Fund)", "Total (Life Fund)", "Grand Total (All Funds)", "Grand Total (All Funds)"]
        );
        assert!(out.details.iter().all(|d| d.fact.unit == SourceUnit::Crore));
    }

    #[test]
    fn solvency_detail_keeps_every_period() {
        let rows = vec![
            vec![t("S.No."), t("Insurer"), t("March 2023"), t("September 2023"), t("March 2024")],
            vec![n(1.0), t("LIC"), n(1.8), n(1.9), n(2.0)],
        ];
        let out = run(TABLE_23, rows).unwrap();
        let facts: Vec<_> = out.facts.iter().map(|f| (f.record.year, f.record.value)).collect();
        assert_eq!(facts, vec![(2023, 1.8), (2024, 2.0)]);
        let periods: Vec<_> = out
            .details
            .iter()
            .map(|d| (d.label.as_str(), d.fact.record.year))
            .collect();
        assert_eq!(
            periods,
            vec![("March 2023", 2023), ("September 2023", 2023), ("March 2024", 2024)]
        );
    }

    fn channel_sheet(headings: &[(usize, &str)]) -> Vec<Vec<Cell>> {
        let mut heading_row = vec![Cell::Empty; 38];
        for &(col, text) in headings {
            heading_row[col] = t(text);
        }
        let mut row = vec![n(1.0), t("SBI Life")];
        row.extend((0..36).map(|i| n(i as f64)));
        vec![vec![], vec![], vec![], heading_row, vec![t("S.No.")], row]
    }

    #[test]
    fn channel_headings_resolve_source_variants() {
        let out = run(TABLE_102, channel_sheet(&[(8, "Others*"), (32, "Point of Sales (POS)")])).unwrap();
        assert_eq!(out.facts.len(), 36);
        let channels: Vec<_> = out
            .crosswalk
            .records()
            .iter()
            .filter(|r| r.registry == RegistryKind::Channel)
            .map(|r| (r.source_label.as_str(), r.resolved_label.as_str()))
            .collect();
        assert!(channels.contains(&("Others*", "Corporate Agents - Others")));
        assert!(channels.contains(&("Point of Sales (POS)", "POS")));
        assert_eq!(out.facts[32].record.distribution_channel.as_deref(), Some("POS"));
    }

    #[test]
    fn misplaced_channel_heading_is_a_layout_error() {
        let err = run(TABLE_102, channel_sheet(&[(2, "Brokers")])).unwrap_err();
        assert!(err.is_configuration_error());
        let message = err.to_string();
        assert!(message.contains("Individual Agents"), "{message}");
        assert!(message.contains("Brokers"), "{message}");
    }
}
