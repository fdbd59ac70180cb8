use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::observability::metrics;
use crate::pipeline::processing::canonical::{CrosswalkLog, CrosswalkRecord};
use crate::pipeline::processing::extract::{
    DetailRecord, ExtractedFact, Extraction, FactKey, FactRecord, KpiClass, SourceUnit,
};
use crate::pipeline::processing::quality_gate::{QaFinding, SCOPE_FACTS, SCOPE_STATE_BREAKDOWN};

/// A secondary output table in base units, with the column names it is
/// published under.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailTable {
    pub name: String,
    pub label_column: String,
    pub value_column: String,
    pub rows: Vec<DetailRecord>,
}

/// The merged output of every extractor.
#[derive(Debug, Clone, Default)]
pub struct Assembly {
    pub facts: Vec<FactRecord>,
    pub state_breakdown: Vec<FactRecord>,
    pub details: Vec<DetailTable>,
    pub crosswalk: Vec<CrosswalkRecord>,
    /// Per-table extraction counts and one finding per dropped duplicate.
    pub findings: Vec<QaFinding>,
}

/// Insertion-ordered table keyed on the identity tuple; first record wins.
#[derive(Debug, Default)]
struct DedupTable {
    records: Vec<FactRecord>,
    index: HashMap<FactKey, usize>,
}

impl DedupTable {
    /// Returns the record already holding this key, if `record` was dropped.
    fn insert(&mut self, record: FactRecord) -> Option<&FactRecord> {
        let key = record.key();
        if let Some(&i) = self.index.get(&key) {
            return Some(&self.records[i]);
        }
        self.index.insert(key, self.records.len());
        self.records.push(record);
        None
    }
}

/// Sums state rows into insurer-level facts, keeping first-appearance order.
#[derive(Debug, Default)]
struct Rollup {
    records: Vec<FactRecord>,
    index: HashMap<FactKey, usize>,
}

impl Rollup {
    fn add(&mut self, state_row: &FactRecord) {
        let mut record = state_row.clone();
        record.state = None;
        let key = record.key();
        match self.index.get(&key) {
            Some(&i) => self.records[i].value += record.value,
            None => {
                self.index.insert(key, self.records.len());
                self.records.push(record);
            }
        }
    }
}

pub struct FactAssembler<'a> {
    config: &'a PipelineConfig,
}

impl<'a> FactAssembler<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self { config }
    }

    /// Convert a source-scale fact to base units. Ratio KPIs are never scaled.
    pub fn scale(&self, fact: ExtractedFact) -> FactRecord {
        let mut record = fact.record;
        if record.kpi.class() == KpiClass::Ratio {
            return record;
        }
        record.value = match fact.unit {
            SourceUnit::Crore => record.value * self.config.crore_to_base,
            SourceUnit::Thousands => record.value * self.config.thousands_to_units,
            SourceUnit::Units | SourceUnit::Percent => record.value,
        };
        record
    }

    /// Merge extractor outputs in the order given. The caller passes them in
    /// layout order so the result does not depend on how extraction was
    /// scheduled.
    pub fn assemble(&self, extractions: Vec<Extraction>) -> Assembly {
        let mut facts = DedupTable::default();
        let mut breakdown = DedupTable::default();
        let mut crosswalk = CrosswalkLog::new();
        let mut findings = Vec::new();
        let mut details = Vec::new();

        for extraction in extractions {
            let table = extraction.table.clone();
            let emitted = extraction.facts.len();
            findings.push(QaFinding::info(
                "extraction",
                &table,
                format!(
                    "{} records extracted, {} rows skipped",
                    emitted, extraction.skipped_rows
                ),
            ));

            if let Some(plan) = &extraction.detail_plan {
                let rows: Vec<DetailRecord> = extraction
                    .details
                    .into_iter()
                    .map(|detail| {
                        let record = self.scale(detail.fact);
                        DetailRecord {
                            insurer: record.insurer,
                            year: record.year,
                            label: detail.label,
                            value: record.value,
                            source_table: record.source_table,
                        }
                    })
                    .collect();
                debug!(table = %table, output = %plan.output, rows = rows.len(), "detail table built");
                details.push(DetailTable {
                    name: plan.output.clone(),
                    label_column: plan.label_column.clone(),
                    value_column: plan.value_column.clone(),
                    rows,
                });
            }

            let mut rollup = Rollup::default();
            let mut state_rows = 0usize;
            for fact in extraction.facts {
                let record = self.scale(fact);
                if record.state.is_some() {
                    state_rows += 1;
                    let dropped = record.clone();
                    match breakdown.insert(record) {
                        Some(kept) => {
                            findings.push(duplicate_finding(SCOPE_STATE_BREAKDOWN, &dropped, kept))
                        }
                        None if extraction.rollup_states => rollup.add(&dropped),
                        None => {}
                    }
                } else {
                    let dropped = record.clone();
                    if let Some(kept) = facts.insert(record) {
                        findings.push(duplicate_finding(SCOPE_FACTS, &dropped, kept));
                    }
                }
            }

            for record in rollup.records {
                let dropped = record.clone();
                if let Some(kept) = facts.insert(record) {
                    findings.push(duplicate_finding(SCOPE_FACTS, &dropped, kept));
                }
            }

            metrics::assemble::breakdown_rows(state_rows);
            debug!(table = %table, emitted, state_rows, "merged extraction");
            crosswalk.merge(extraction.crosswalk);
        }

        metrics::assemble::facts_accepted(facts.records.len());
        info!(
            facts = facts.records.len(),
            state_breakdown = breakdown.records.len(),
            crosswalk = crosswalk.len(),
            "assembly complete"
        );

        Assembly {
            facts: facts.records,
            state_breakdown: breakdown.records,
            details,
            crosswalk: crosswalk.into_records(),
            findings,
        }
    }
}

fn duplicate_finding(scope: &str, dropped: &FactRecord, kept: &FactRecord) -> QaFinding {
    metrics::assemble::duplicate_dropped(&dropped.source_table);
    warn!(key = %dropped.key(), dropped = dropped.value, kept = kept.value, "duplicate fact dropped");
    QaFinding::warning(
        "deduplication",
        scope,
        format!(
            "dropped duplicate {} (value {}, kept {})",
            dropped.key(),
            dropped.value,
            kept.value
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::*;
    use crate::pipeline::processing::extract::layout::DetailLabel;
    use crate::pipeline::processing::extract::{DetailPlan, ExtractedDetail, Kpi};

    fn fact(table: &str, kpi: Kpi, unit: SourceUnit, value: f64, state: Option<&str>) -> ExtractedFact {
        ExtractedFact {
            record: FactRecord {
                insurer: "LIC".to_string(),
                year: 2024,
                l1: None,
                l2: None,
                l3: None,
                individual_group: Some(SEGMENT_INDIVIDUAL.to_string()),
                distribution_channel: None,
                state: state.map(str::to_string),
                kpi,
                value,
                source_table: table.to_string(),
            },
            unit,
        }
    }

    fn extraction(table: &str, facts: Vec<ExtractedFact>, rollup: bool) -> Extraction {
        Extraction {
            table: table.to_string(),
            facts,
            details: Vec::new(),
            detail_plan: None,
            crosswalk: CrosswalkLog::new(),
            skipped_rows: 0,
            rollup_states: rollup,
        }
    }

    #[test]
    fn units_scale_exactly() {
        let config = PipelineConfig::default();
        let asm = FactAssembler::new(&config);
        let crore = asm.scale(fact(TABLE_2, Kpi::TotalPremium, SourceUnit::Crore, 1.0, None));
        assert_eq!(crore.value, 10_000_000.0);
        let thousands = asm.scale(fact(TABLE_10, Kpi::TotalPolicyYearEnd, SourceUnit::Thousands, 1.0, None));
        assert_eq!(thousands.value, 1_000.0);
        let ratio = asm.scale(fact(TABLE_23, Kpi::SolvencyRatio, SourceUnit::Crore, 1.5, None));
        assert_eq!(ratio.value, 1.5);
    }

    #[test]
    fn first_duplicate_wins_with_one_finding_per_drop() {
        let config = PipelineConfig::default();
        let facts = vec![
            fact(TABLE_2, Kpi::TotalPremium, SourceUnit::Units, 1.0, None),
            fact(TABLE_2, Kpi::TotalPremium, SourceUnit::Units, 2.0, None),
            fact(TABLE_2, Kpi::TotalPremium, SourceUnit::Units, 3.0, None),
        ];
        let out = FactAssembler::new(&config).assemble(vec![extraction(TABLE_2, facts, false)]);
        assert_eq!(out.facts.len(), 1);
        assert_eq!(out.facts[0].value, 1.0);
        let drops = out.findings.iter().filter(|f| f.check_name == "deduplication").count();
        assert_eq!(drops, 2);
    }

    #[test]
    fn negative_values_are_preserved() {
        let config = PipelineConfig::default();
        let facts = vec![fact(TABLE_3, Kpi::NewBusinessPremium, SourceUnit::Crore, -2.0, None)];
        let out = FactAssembler::new(&config).assemble(vec![extraction(TABLE_3, facts, false)]);
        assert_eq!(out.facts[0].value, -20_000_000.0);
    }

    #[test]
    fn state_rows_roll_up_into_insurer_facts() {
        let config = PipelineConfig::default();
        let facts = vec![
            fact(TABLE_6, Kpi::NewBusinessPolicy, SourceUnit::Units, 10.0, Some("Goa")),
            fact(TABLE_6, Kpi::NewBusinessPolicy, SourceUnit::Units, 5.0, Some("Assam")),
            fact(TABLE_6, Kpi::NewBusinessPremium, SourceUnit::Crore, 1.0, Some("Goa")),
        ];
        let out = FactAssembler::new(&config).assemble(vec![extraction(TABLE_6, facts, true)]);
        assert_eq!(out.state_breakdown.len(), 3);
        assert_eq!(out.facts.len(), 2);
        assert_eq!(out.facts[0].kpi, Kpi::NewBusinessPolicy);
        assert_eq!(out.facts[0].value, 15.0);
        assert_eq!(out.facts[0].state, None);
        assert_eq!(out.facts[1].value, 10_000_000.0);
    }

    #[test]
    fn detail_rows_are_scaled_and_kept_apart_from_facts() {
        let config = PipelineConfig::default();
        let mut x = extraction(
            TABLE_21,
            vec![fact(TABLE_21, Kpi::AssetsUnderManagement, SourceUnit::Crore, 3.0, None)],
            false,
        );
        x.details = vec![
            ExtractedDetail {
                fact: fact(TABLE_21, Kpi::AssetsUnderManagement, SourceUnit::Crore, 1.0, None),
                label: "Total (Life Fund)".to_string(),
            },
            ExtractedDetail {
                fact: fact(TABLE_21, Kpi::AssetsUnderManagement, SourceUnit::Crore, 3.0, None),
                label: "Grand Total (All Funds)".to_string(),
            },
        ];
        x.detail_plan = Some(DetailPlan {
            output: "table_21_detail".to_string(),
            label: DetailLabel::Band,
            label_column: "fund_type".to_string(),
            value_column: "aum".to_string(),
        });

        let out = FactAssembler::new(&config).assemble(vec![x]);
        assert_eq!(out.facts.len(), 1);
        assert_eq!(out.details.len(), 1);
        let table = &out.details[0];
        assert_eq!(table.name, "table_21_detail");
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].label, "Total (Life Fund)");
        assert_eq!(table.rows[0].value, 10_000_000.0);
    }

    #[test]
    fn office_rows_stay_in_breakdown_only() {
        let config = PipelineConfig::default();
        let facts = vec![fact(TABLE_29, Kpi::NumberOfOffices, SourceUnit::Units, 7.0, Some("Goa"))];
        let out = FactAssembler::new(&config).assemble(vec![extraction(TABLE_29, facts, false)]);
        assert!(out.facts.is_empty());
        assert_eq!(out.state_breakdown.len(), 1);
        assert_eq!(out.findings.iter().filter(|f| f.check_name == "extraction").count(), 1);
    }
}
