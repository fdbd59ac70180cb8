//! Layouts of the thirteen handbook tables the pipeline reads.
//!
//! Row and column offsets are zero-based and were read off the 2023-24 Part I
//! and Part V workbooks. When a handbook edition moves a header the
//! interpreter fails with a layout error naming the table, and the fix belongs
//! here.

use super::layout::{
    BandFilter, BlockMetric, ChannelColumn, ColumnPlan, ColumnSegment, DataStart, DetailLabel,
    DetailPlan, EntityDim, HeaderRow, InsurerBlocks, Metric, RowPlan, SeriesMetric, TableLayout,
    Workbook, YearSeries,
};
use super::{Kpi, SourceUnit};
use crate::constants::*;

/// Published channel column order of Part V Tables 100 and 102.
pub const CHANNEL_ORDER: [&str; 12] = [
    "Individual Agents",
    "Corporate Agents - Banks",
    "Corporate Agents - Others",
    "Brokers",
    "Direct Selling",
    "MI Agents",
    "CSCs",
    "Web Aggregators",
    "IMF",
    "Online",
    "POS",
    "Others",
];

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn insurer_rows(start: DataStart) -> RowPlan {
    RowPlan::Entities {
        dim: EntityDim::Insurer,
        label_col: 1,
        start,
        end: None,
        serial_col: None,
    }
}

fn state_rows(start: usize, end: Option<usize>) -> RowPlan {
    RowPlan::Entities {
        dim: EntityDim::State,
        label_col: 1,
        start: DataStart::Fixed(start),
        end,
        serial_col: None,
    }
}

fn category_rows() -> RowPlan {
    RowPlan::Categories {
        label_col: 0,
        start: 4,
        emit_phrase: "business in force at end of the financial year".to_string(),
        skip_contains: strings(&["grand total", "private sector total", "a+b+c+d", "a + b + c + d"]),
    }
}

/// Year-series columns read from `first_col` to the end of the sheet.
fn simple_series(header: HeaderRow, metric: Metric) -> YearSeries {
    YearSeries {
        header,
        first_col: 2,
        segments: vec![ColumnSegment { cols: None, l1: None }],
        carry_year: false,
        header_must_contain: None,
        band: None,
        metric: SeriesMetric::Fixed(metric),
        detail: None,
    }
}

fn layout(
    table: &str,
    sheet: &str,
    workbook: Workbook,
    segment: &str,
    rows: RowPlan,
    columns: ColumnPlan,
) -> TableLayout {
    TableLayout {
        table: table.to_string(),
        sheet: sheet.to_string(),
        workbook,
        segment: segment.to_string(),
        rows,
        columns,
        rollup_states: false,
    }
}

pub fn builtin_layouts() -> Vec<TableLayout> {
    let early_years = || HeaderRow::FirstContaining(strings(&["2014-15", "2015-16"]));
    let crore = |kpi| Metric::new(kpi, SourceUnit::Crore);
    let units = |kpi| Metric::new(kpi, SourceUnit::Units);

    let mut table_6 = layout(
        TABLE_6,
        "6",
        Workbook::PartI,
        SEGMENT_INDIVIDUAL,
        state_rows(5, None),
        ColumnPlan::InsurerBlocks(InsurerBlocks {
            insurer_row: 2,
            year_row: 3,
            first_col: 2,
            carry_year: true,
            year_bounds: None,
            metric: BlockMetric::Row {
                row: 4,
                patterns: vec![
                    ("polic".to_string(), units(Kpi::NewBusinessPolicy)),
                    ("premium".to_string(), crore(Kpi::NewBusinessPremium)),
                ],
            },
        }),
    );
    table_6.rollup_states = true;

    let mut table_8 = layout(
        TABLE_8,
        "8",
        Workbook::PartI,
        SEGMENT_GROUP,
        state_rows(4, None),
        ColumnPlan::InsurerBlocks(InsurerBlocks {
            insurer_row: 1,
            year_row: 2,
            first_col: 2,
            carry_year: true,
            year_bounds: None,
            metric: BlockMetric::Row {
                row: 3,
                patterns: vec![
                    ("scheme".to_string(), units(Kpi::NewBusinessSchemes)),
                    ("lives".to_string(), units(Kpi::LivesCovered)),
                    ("premium".to_string(), crore(Kpi::NewBusinessPremium)),
                ],
            },
        }),
    );
    table_8.rollup_states = true;

    let category_blocks = |metric: Metric| {
        ColumnPlan::InsurerBlocks(InsurerBlocks {
            insurer_row: 2,
            year_row: 3,
            first_col: 1,
            carry_year: false,
            year_bounds: None,
            metric: BlockMetric::Fixed(metric),
        })
    };

    vec![
        layout(
            TABLE_2,
            "2",
            Workbook::PartI,
            SEGMENT_NOT_APPLICABLE,
            insurer_rows(DataStart::AfterHeader),
            ColumnPlan::YearSeries(simple_series(early_years(), crore(Kpi::TotalPremium))),
        ),
        layout(
            TABLE_3,
            "3",
            Workbook::PartI,
            SEGMENT_NOT_APPLICABLE,
            insurer_rows(DataStart::AfterHeader),
            ColumnPlan::YearSeries(simple_series(early_years(), crore(Kpi::NewBusinessPremium))),
        ),
        table_6,
        table_8,
        // Policies in force are published in thousands.
        layout(
            TABLE_10,
            "10",
            Workbook::PartI,
            SEGMENT_INDIVIDUAL,
            category_rows(),
            category_blocks(Metric::new(Kpi::TotalPolicyYearEnd, SourceUnit::Thousands)),
        ),
        layout(
            TABLE_11,
            SHEET_11,
            Workbook::PartI,
            SEGMENT_INDIVIDUAL,
            category_rows(),
            category_blocks(crore(Kpi::SumAssuredYearEnd)),
        ),
        // "e. Total" premium columns of the linked and non-linked sections.
        layout(
            TABLE_12,
            "12",
            Workbook::PartI,
            SEGMENT_NOT_APPLICABLE,
            insurer_rows(DataStart::Fixed(6)),
            ColumnPlan::YearSeries(YearSeries {
                header: HeaderRow::Fixed(4),
                first_col: 2,
                segments: vec![
                    ColumnSegment { cols: Some((42, 52)), l1: Some(L1_LINKED.to_string()) },
                    ColumnSegment { cols: Some((92, 102)), l1: Some(L1_NON_LINKED.to_string()) },
                ],
                carry_year: false,
                header_must_contain: None,
                band: None,
                metric: SeriesMetric::Fixed(crore(Kpi::TotalPremium)),
                detail: None,
            }),
        ),
        layout(
            TABLE_21,
            "21",
            Workbook::PartI,
            SEGMENT_NOT_APPLICABLE,
            insurer_rows(DataStart::AfterHeader),
            ColumnPlan::YearSeries(YearSeries {
                band: Some(BandFilter {
                    rows: vec![3, 4],
                    keep: "grand total".to_string(),
                }),
                detail: Some(DetailPlan {
                    output: "table_21_detail".to_string(),
                    label: DetailLabel::Band,
                    label_column: "fund_type".to_string(),
                    value_column: "aum".to_string(),
                }),
                ..simple_series(
                    HeaderRow::FirstContaining(strings(&["2021", "2022"])),
                    crore(Kpi::AssetsUnderManagement),
                )
            }),
        ),
        layout(
            TABLE_23,
            "23",
            Workbook::PartI,
            SEGMENT_NOT_APPLICABLE,
            insurer_rows(DataStart::AfterHeader),
            ColumnPlan::YearSeries(YearSeries {
                header_must_contain: Some("march".to_string()),
                detail: Some(DetailPlan {
                    output: "table_23_detail".to_string(),
                    label: DetailLabel::Header,
                    label_column: "period".to_string(),
                    value_column: "solvency_ratio".to_string(),
                }),
                ..simple_series(
                    HeaderRow::FirstContaining(strings(&["march"])),
                    Metric::default_for(Kpi::SolvencyRatio),
                )
            }),
        ),
        layout(
            TABLE_28,
            "28",
            Workbook::PartI,
            SEGMENT_INDIVIDUAL,
            insurer_rows(DataStart::Fixed(5)),
            ColumnPlan::YearSeries(YearSeries {
                header: HeaderRow::Fixed(3),
                first_col: 2,
                segments: vec![ColumnSegment { cols: None, l1: None }],
                carry_year: true,
                header_must_contain: None,
                band: None,
                metric: SeriesMetric::Tenor { row: 4 },
                detail: None,
            }),
        ),
        layout(
            TABLE_29,
            "29",
            Workbook::PartI,
            SEGMENT_NOT_APPLICABLE,
            state_rows(3, Some(39)),
            ColumnPlan::InsurerBlocks(InsurerBlocks {
                insurer_row: 1,
                year_row: 2,
                first_col: 2,
                carry_year: false,
                year_bounds: Some((2014, 2025)),
                metric: BlockMetric::Fixed(units(Kpi::NumberOfOffices)),
            }),
        ),
        // Columns 26-27 hold the row total and are not mapped.
        layout(
            TABLE_100,
            "100",
            Workbook::PartV,
            SEGMENT_INDIVIDUAL,
            RowPlan::Entities {
                dim: EntityDim::Insurer,
                label_col: 1,
                start: DataStart::Fixed(5),
                end: None,
                serial_col: Some(0),
            },
            ColumnPlan::ChannelMap {
                columns: CHANNEL_ORDER
                    .iter()
                    .enumerate()
                    .flat_map(|(i, channel)| {
                        let col = 2 + 2 * i;
                        [
                            ChannelColumn {
                                col,
                                channel: channel.to_string(),
                                metric: units(Kpi::NewBusinessPolicy),
                            },
                            ChannelColumn {
                                col: col + 1,
                                channel: channel.to_string(),
                                metric: crore(Kpi::NewBusinessPremium),
                            },
                        ]
                    })
                    .collect(),
            },
        ),
        layout(
            TABLE_102,
            "102",
            Workbook::PartV,
            SEGMENT_GROUP,
            RowPlan::Entities {
                dim: EntityDim::Insurer,
                label_col: 1,
                start: DataStart::Fixed(5),
                end: None,
                serial_col: Some(0),
            },
            ColumnPlan::ChannelStride {
                first_col: 2,
                channels: strings(&CHANNEL_ORDER),
                metrics: vec![
                    units(Kpi::NewBusinessSchemes),
                    crore(Kpi::NewBusinessPremium),
                    units(Kpi::LivesCovered),
                ],
            },
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn thirteen_distinct_tables() {
        let layouts = builtin_layouts();
        assert_eq!(layouts.len(), 13);
        let ids: HashSet<_> = layouts.iter().map(|l| l.table.as_str()).collect();
        assert_eq!(ids.len(), 13);
    }

    #[test]
    fn sheet_11_keeps_trailing_space() {
        let layouts = builtin_layouts();
        let t11 = layouts.iter().find(|l| l.table == TABLE_11).unwrap();
        assert_eq!(t11.sheet, "11 ");
    }

    #[test]
    fn only_state_insurer_tables_roll_up() {
        let rolled: Vec<_> = builtin_layouts()
            .into_iter()
            .filter(|l| l.rollup_states)
            .map(|l| l.table)
            .collect();
        assert_eq!(rolled, vec![TABLE_6.to_string(), TABLE_8.to_string()]);
    }

    #[test]
    fn channel_map_alternates_policies_and_premium() {
        let layouts = builtin_layouts();
        let t100 = layouts.iter().find(|l| l.table == TABLE_100).unwrap();
        let ColumnPlan::ChannelMap { columns } = &t100.columns else {
            panic!("table 100 should use an explicit channel map");
        };
        assert_eq!(columns.len(), 24);
        assert_eq!(columns[0].col, 2);
        assert_eq!(columns[23].col, 25);
        assert_eq!(columns[23].channel, "Others");
        assert_eq!(columns[1].metric.unit, SourceUnit::Crore);
    }

    #[test]
    fn only_aum_and_solvency_keep_detail_tables() {
        let outputs: Vec<_> = builtin_layouts()
            .iter()
            .filter_map(|l| l.detail().map(|d| d.output.clone()))
            .collect();
        assert_eq!(outputs, vec!["table_21_detail", "table_23_detail"]);
    }

    #[test]
    fn layouts_serialize_to_json() {
        let json = serde_json::to_value(builtin_layouts()).unwrap();
        assert_eq!(json[0]["table"], "Part I - Table 2");
        assert_eq!(json[0]["columns"]["kind"], "year_series");
    }
}
