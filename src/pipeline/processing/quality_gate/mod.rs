use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::constants::{valid_l1_labels, valid_segments};
use crate::observability::metrics;
use crate::pipeline::processing::canonical::{CrosswalkRecord, MatchMethod};
use crate::pipeline::processing::extract::{FactRecord, Kpi, KpiClass};

pub const SCOPE_FACTS: &str = "facts";
pub const SCOPE_STATE_BREAKDOWN: &str = "state_breakdown";
pub const SCOPE_CROSSWALK: &str = "crosswalk";

/// Severity levels for QA findings
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum QaSeverity {
    /// Informational: counts, summaries and passed checks
    Info,
    /// Notable issue worth flagging; data is kept as-is
    Warning,
    /// Structural problem in the assembled output
    Error,
}

impl QaSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            QaSeverity::Info => "info",
            QaSeverity::Warning => "warning",
            QaSeverity::Error => "error",
        }
    }
}

impl fmt::Display for QaSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of the QA log
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct QaFinding {
    /// Name of the check that produced this finding
    pub check_name: String,
    pub severity: QaSeverity,
    /// Output or table the finding refers to
    pub scope: String,
    /// Human-readable description
    pub detail: String,
}

impl QaFinding {
    pub fn new(check: &str, severity: QaSeverity, scope: &str, detail: impl Into<String>) -> Self {
        let finding = Self {
            check_name: check.to_string(),
            severity,
            scope: scope.to_string(),
            detail: detail.into(),
        };
        metrics::qa::finding(check, severity.as_str());
        finding
    }

    pub fn info(check: &str, scope: &str, detail: impl Into<String>) -> Self {
        Self::new(check, QaSeverity::Info, scope, detail)
    }

    pub fn warning(check: &str, scope: &str, detail: impl Into<String>) -> Self {
        Self::new(check, QaSeverity::Warning, scope, detail)
    }

    pub fn error(check: &str, scope: &str, detail: impl Into<String>) -> Self {
        Self::new(check, QaSeverity::Error, scope, detail)
    }
}

/// Trait for the QA battery run over an assembled fact table
pub trait QualityGate {
    fn validate(&self, facts: &[FactRecord], crosswalk: &[CrosswalkRecord]) -> Vec<QaFinding>;
}

/// Configuration for the QA checks
#[derive(Debug, Clone)]
pub struct QualityGateConfig {
    /// Inclusive range for persistency ratios
    pub persistency_bounds: (f64, f64),
    /// Rule version identifier, recorded in the run manifest
    pub rule_version: String,
}

impl Default for QualityGateConfig {
    fn default() -> Self {
        Self {
            persistency_bounds: (0.0, 100.0),
            rule_version: "v1.0.0".to_string(),
        }
    }
}

impl From<&PipelineConfig> for QualityGateConfig {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            persistency_bounds: config.persistency_bounds,
            ..Self::default()
        }
    }
}

/// The fixed check battery. No check halts the pipeline or modifies a value.
pub struct DefaultQualityGate {
    pub config: QualityGateConfig,
}

impl DefaultQualityGate {
    pub fn new() -> Self {
        Self {
            config: QualityGateConfig::default(),
        }
    }

    pub fn with_config(config: QualityGateConfig) -> Self {
        Self { config }
    }

    /// Completeness, null-count and duplicate-key checks for the state breakdown.
    pub fn validate_breakdown(&self, rows: &[FactRecord]) -> Vec<QaFinding> {
        let mut findings = Vec::new();
        findings.extend(self.column_completeness(rows, SCOPE_STATE_BREAKDOWN, true));
        findings.extend(self.null_counts(rows, SCOPE_STATE_BREAKDOWN));
        findings.extend(self.duplicate_keys(rows, SCOPE_STATE_BREAKDOWN));
        findings
    }

    /// Required dimensions per KPI class. Offices are state-level, and every
    /// breakdown row needs its state.
    fn column_completeness(&self, rows: &[FactRecord], scope: &str, require_state: bool) -> Vec<QaFinding> {
        let check = "column_completeness";
        let mut missing: Vec<(&'static str, usize, String)> = Vec::new();
        let mut bump = |column: &'static str, record: &FactRecord| {
            match missing.iter_mut().find(|(c, _, _)| *c == column) {
                Some(entry) => entry.1 += 1,
                None => missing.push((column, 1, record.key().to_string())),
            }
        };

        for record in rows {
            if record.insurer.trim().is_empty() {
                bump("insurer", record);
            }
            if record.year <= 0 {
                bump("year", record);
            }
            let needs_segment = matches!(record.kpi.class(), KpiClass::Currency | KpiClass::Count)
                && record.kpi != Kpi::NumberOfOffices;
            if needs_segment && is_blank(&record.individual_group) {
                bump("individual_group", record);
            }
            let needs_state = require_state || record.kpi == Kpi::NumberOfOffices;
            if needs_state && is_blank(&record.state) {
                bump("state", record);
            }
        }

        if missing.is_empty() {
            return vec![QaFinding::info(check, scope, "passed: all required dimensions present")];
        }
        missing
            .into_iter()
            .map(|(column, count, example)| {
                QaFinding::error(
                    check,
                    scope,
                    format!("{} records missing required '{}' (first: {})", count, column, example),
                )
            })
            .collect()
    }

    fn null_counts(&self, rows: &[FactRecord], scope: &str) -> Vec<QaFinding> {
        let columns: [(&str, fn(&FactRecord) -> &Option<String>); 6] = [
            ("l1", |r| &r.l1),
            ("l2", |r| &r.l2),
            ("l3", |r| &r.l3),
            ("individual_group", |r| &r.individual_group),
            ("distribution_channel", |r| &r.distribution_channel),
            ("state", |r| &r.state),
        ];
        columns
            .iter()
            .map(|(name, get)| {
                let nulls = rows.iter().filter(|r| is_blank(get(r))).count();
                QaFinding::info(
                    "null_counts",
                    scope,
                    format!("{}: {} of {} null", name, nulls, rows.len()),
                )
            })
            .collect()
    }

    fn value_range(&self, rows: &[FactRecord]) -> Vec<QaFinding> {
        let check = "value_range";
        let (lo, hi) = self.config.persistency_bounds;
        let findings: Vec<QaFinding> = rows
            .iter()
            .filter(|r| r.kpi.is_persistency() && (r.value < lo || r.value > hi))
            .map(|r| {
                QaFinding::warning(
                    check,
                    SCOPE_FACTS,
                    format!("{} = {} outside [{}, {}] for {}", r.kpi, r.value, lo, hi, r.key()),
                )
            })
            .collect();
        if findings.is_empty() {
            return vec![QaFinding::info(
                check,
                SCOPE_FACTS,
                format!("passed: all persistency values within [{}, {}]", lo, hi),
            )];
        }
        findings
    }

    fn duplicate_keys(&self, rows: &[FactRecord], scope: &str) -> Vec<QaFinding> {
        let check = "duplicate_keys";
        let mut seen = HashSet::with_capacity(rows.len());
        let duplicates = rows.iter().filter(|r| !seen.insert(r.key())).count();
        if duplicates > 0 {
            vec![QaFinding::error(
                check,
                scope,
                format!("{} duplicate identity tuples remain after deduplication", duplicates),
            )]
        } else {
            vec![QaFinding::info(check, scope, "passed: identity tuples are unique")]
        }
    }

    fn unresolved_labels(&self, crosswalk: &[CrosswalkRecord]) -> Vec<QaFinding> {
        let check = "unresolved_labels";
        let findings: Vec<QaFinding> = crosswalk
            .iter()
            .filter(|c| c.match_method == MatchMethod::Unresolved)
            .map(|c| {
                let score = c
                    .similarity_score
                    .map(|s| format!(" (best similarity {:.3})", s))
                    .unwrap_or_default();
                QaFinding::warning(
                    check,
                    SCOPE_CROSSWALK,
                    format!("{} label '{}' unresolved{}", c.registry.as_str(), c.source_label, score),
                )
            })
            .collect();
        if findings.is_empty() {
            return vec![QaFinding::info(check, SCOPE_CROSSWALK, "passed: every label resolved")];
        }
        findings
    }

    fn domain_check(
        &self,
        check: &str,
        rows: &[FactRecord],
        get: fn(&FactRecord) -> &Option<String>,
        valid: &[&str],
    ) -> QaFinding {
        let invalid: BTreeSet<&str> = rows
            .iter()
            .filter_map(|r| get(r).as_deref())
            .filter(|v| !v.is_empty() && !valid.contains(v))
            .collect();
        if invalid.is_empty() {
            QaFinding::info(check, SCOPE_FACTS, format!("passed: values within {:?}", valid))
        } else {
            QaFinding::warning(check, SCOPE_FACTS, format!("unexpected values: {:?}", invalid))
        }
    }

    fn negative_values(&self, rows: &[FactRecord]) -> QaFinding {
        let negatives = rows.iter().filter(|r| r.value < 0.0).count();
        QaFinding::info(
            "negative_values",
            SCOPE_FACTS,
            format!("{} negative values retained", negatives),
        )
    }

    fn summary(&self, rows: &[FactRecord]) -> Vec<QaFinding> {
        let insurers: BTreeSet<&str> = rows.iter().map(|r| r.insurer.as_str()).collect();
        let mut kpis: Vec<String> = Vec::new();
        for r in rows {
            let label = r.kpi.to_string();
            if !kpis.contains(&label) {
                kpis.push(label);
            }
        }
        let years = match (
            rows.iter().map(|r| r.year).min(),
            rows.iter().map(|r| r.year).max(),
        ) {
            (Some(lo), Some(hi)) => format!("{} - {}", lo, hi),
            _ => "none".to_string(),
        };

        vec![
            QaFinding::info("record_count", SCOPE_FACTS, format!("Total records: {}", rows.len())),
            QaFinding::info("distinct_insurers", SCOPE_FACTS, format!("Count: {}", insurers.len())),
            QaFinding::info("year_range", SCOPE_FACTS, years),
            QaFinding::info("kpis", SCOPE_FACTS, kpis.join(", ")),
        ]
    }
}

impl QualityGate for DefaultQualityGate {
    fn validate(&self, facts: &[FactRecord], crosswalk: &[CrosswalkRecord]) -> Vec<QaFinding> {
        let mut findings = Vec::new();
        findings.extend(self.column_completeness(facts, SCOPE_FACTS, false));
        findings.extend(self.null_counts(facts, SCOPE_FACTS));
        findings.extend(self.value_range(facts));
        findings.extend(self.duplicate_keys(facts, SCOPE_FACTS));
        findings.extend(self.unresolved_labels(crosswalk));
        findings.push(self.domain_check("l1_domain", facts, |r| &r.l1, &valid_l1_labels()));
        findings.push(self.domain_check(
            "segment_domain",
            facts,
            |r| &r.individual_group,
            &valid_segments(),
        ));
        findings.push(self.negative_values(facts));
        findings.extend(self.summary(facts));

        let warnings = findings.iter().filter(|f| f.severity == QaSeverity::Warning).count();
        let errors = findings.iter().filter(|f| f.severity == QaSeverity::Error).count();
        if errors > 0 {
            warn!(findings = findings.len(), warnings, errors, "QA completed with errors");
        } else {
            info!(findings = findings.len(), warnings, "QA completed");
        }
        findings
    }
}

impl Default for DefaultQualityGate {
    fn default() -> Self {
        Self::new()
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}
