use serde::Serialize;

use super::{Kpi, SourceUnit};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Workbook {
    PartI,
    PartV,
}

/// How to find a header row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderRow {
    Fixed(usize),
    /// First row whose joined text contains any marker, case-insensitively.
    FirstContaining(Vec<String>),
}

/// Where data rows begin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataStart {
    Fixed(usize),
    /// The row after the year header located by the column plan.
    AfterHeader,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityDim {
    Insurer,
    State,
}

/// A KPI together with the scale its column is published in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Metric {
    pub kpi: Kpi,
    pub unit: SourceUnit,
}

impl Metric {
    pub fn new(kpi: Kpi, unit: SourceUnit) -> Self {
        Self { kpi, unit }
    }

    /// The KPI at its class default scale.
    pub fn default_for(kpi: Kpi) -> Self {
        Self::new(kpi, kpi.default_unit())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RowPlan {
    /// One entity (insurer or state) per row, read from `label_col`.
    Entities {
        dim: EntityDim,
        label_col: usize,
        start: DataStart,
        /// Exclusive upper bound; `None` runs to the end of the sheet.
        end: Option<usize>,
        /// When set, rows are kept only if this column holds a number.
        serial_col: Option<usize>,
    },
    /// Category header rows set the current category; rows containing
    /// `emit_phrase` and a lettered marker such as "(A)" emit values.
    Categories {
        label_col: usize,
        start: usize,
        emit_phrase: String,
        skip_contains: Vec<String>,
    },
}

/// A contiguous column range, optionally tagged with an L1 category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSegment {
    /// Half-open range; `None` means from `first_col` to the last column.
    pub cols: Option<(usize, usize)>,
    pub l1: Option<String>,
}

/// Fund-band filter: a band label carried forward across columns, read from
/// the first non-empty of `rows`; only columns whose band contains `keep`
/// are kept.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandFilter {
    pub rows: Vec<usize>,
    pub keep: String,
}

/// Where a detail row takes its label from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetailLabel {
    /// The carried-forward fund band of the column's [`BandFilter`].
    Band,
    /// The column's header text, e.g. a reporting period.
    Header,
}

/// A secondary output keeping every dated column of a year series, including
/// the ones the band and header filters drop from the fact table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailPlan {
    /// Output table name; the directory sink writes `<output>.csv`.
    pub output: String,
    pub label: DetailLabel,
    pub label_column: String,
    pub value_column: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesMetric {
    Fixed(Metric),
    /// Persistency tenor per column, read from `row` as "13", "13*", ...
    Tenor { row: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearSeries {
    pub header: HeaderRow,
    pub first_col: usize,
    pub segments: Vec<ColumnSegment>,
    /// Carry the last parsed year into columns with a blank header.
    pub carry_year: bool,
    /// Keep only columns whose header text contains this (case-insensitive).
    pub header_must_contain: Option<String>,
    pub band: Option<BandFilter>,
    pub metric: SeriesMetric,
    pub detail: Option<DetailPlan>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockMetric {
    Fixed(Metric),
    /// Metric per column chosen by the first pattern its `row` text contains.
    Row { row: usize, patterns: Vec<(String, Metric)> },
}

/// Insurer name in `insurer_row` carried right until the next name; year in
/// `year_row` (optionally carried).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsurerBlocks {
    pub insurer_row: usize,
    pub year_row: usize,
    pub first_col: usize,
    pub carry_year: bool,
    pub year_bounds: Option<(i32, i32)>,
    pub metric: BlockMetric,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelColumn {
    pub col: usize,
    pub channel: String,
    pub metric: Metric,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnPlan {
    YearSeries(YearSeries),
    InsurerBlocks(InsurerBlocks),
    /// Explicit column-to-channel map, all for the configured fiscal year.
    ChannelMap { columns: Vec<ChannelColumn> },
    /// `metrics.len()` consecutive columns per channel starting at `first_col`.
    ChannelStride {
        first_col: usize,
        channels: Vec<String>,
        metrics: Vec<Metric>,
    },
}

/// Declarative description of one source table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableLayout {
    pub table: String,
    pub sheet: String,
    pub workbook: Workbook,
    pub segment: String,
    pub rows: RowPlan,
    pub columns: ColumnPlan,
    pub rollup_states: bool,
}

impl TableLayout {
    pub fn detail(&self) -> Option<&DetailPlan> {
        match &self.columns {
            ColumnPlan::YearSeries(series) => series.detail.as_ref(),
            _ => None,
        }
    }

    /// Every KPI this layout can emit, in column-plan order.
    pub fn kpis(&self) -> Vec<String> {
        let metrics: Vec<Metric> = match &self.columns {
            ColumnPlan::YearSeries(s) => match &s.metric {
                SeriesMetric::Fixed(m) => vec![*m],
                SeriesMetric::Tenor { .. } => return vec!["Persistency (<n>M, Policy)".to_string()],
            },
            ColumnPlan::InsurerBlocks(b) => match &b.metric {
                BlockMetric::Fixed(m) => vec![*m],
                BlockMetric::Row { patterns, .. } => patterns.iter().map(|(_, m)| *m).collect(),
            },
            ColumnPlan::ChannelMap { columns } => columns.iter().map(|c| c.metric).collect(),
            ColumnPlan::ChannelStride { metrics, .. } => metrics.clone(),
        };
        let mut out: Vec<String> = Vec::new();
        for m in metrics {
            let label = m.kpi.to_string();
            if !out.contains(&label) {
                out.push(label);
            }
        }
        out
    }
}
