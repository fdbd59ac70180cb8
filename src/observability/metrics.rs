//! Prometheus metrics for the handbook pipeline.
//!
//! Recording goes through the `metrics` facade; when no recorder is installed
//! (unit tests, library embedding) every call is a no-op.

use std::fmt;
use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

use crate::error::{HandbookError, Result};

/// Every metric name the pipeline records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Extraction
    ExtractRecordsEmitted,
    ExtractRowsSkipped,
    ExtractDuration,

    // Canonicalization
    ResolveLabels,

    // Assembly
    AssembleFactsAccepted,
    AssembleDuplicatesDropped,
    AssembleBreakdownRows,

    // QA
    QaFindings,

    // Run
    RunDuration,
    OutputBytesWritten,
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::ExtractRecordsEmitted => "handbook_extract_records_emitted_total",
            MetricName::ExtractRowsSkipped => "handbook_extract_rows_skipped_total",
            MetricName::ExtractDuration => "handbook_extract_duration_seconds",
            MetricName::ResolveLabels => "handbook_resolve_labels_total",
            MetricName::AssembleFactsAccepted => "handbook_assemble_facts_accepted_total",
            MetricName::AssembleDuplicatesDropped => "handbook_assemble_duplicates_dropped_total",
            MetricName::AssembleBreakdownRows => "handbook_assemble_breakdown_rows_total",
            MetricName::QaFindings => "handbook_qa_findings_total",
            MetricName::RunDuration => "handbook_run_duration_seconds",
            MetricName::OutputBytesWritten => "handbook_output_bytes_written_total",
        }
    }
}

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Calling it again is a no-op.
pub fn init() -> Result<()> {
    if METRICS_HANDLE.get().is_some() {
        return Ok(());
    }
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| HandbookError::Metrics(format!("Failed to install Prometheus recorder: {}", e)))?;
    METRICS_HANDLE.set(handle).ok();
    info!("Metrics system initialized");
    Ok(())
}

/// Prometheus text exposition of everything recorded so far, if a recorder
/// was installed through [`init`].
pub fn render() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

pub mod extract {
    use super::MetricName;

    pub fn records_emitted(table: &str, count: usize) {
        ::metrics::counter!(MetricName::ExtractRecordsEmitted.as_str(), "table" => table.to_string())
            .increment(count as u64);
    }

    pub fn row_skipped(table: &str, reason: &'static str) {
        ::metrics::counter!(
            MetricName::ExtractRowsSkipped.as_str(),
            "table" => table.to_string(),
            "reason" => reason
        )
        .increment(1);
    }

    pub fn duration(table: &str, secs: f64) {
        ::metrics::histogram!(MetricName::ExtractDuration.as_str(), "table" => table.to_string())
            .record(secs);
    }
}

pub mod canonical {
    use super::MetricName;

    pub fn label_resolved(registry: &'static str, method: &'static str) {
        ::metrics::counter!(
            MetricName::ResolveLabels.as_str(),
            "registry" => registry,
            "method" => method
        )
        .increment(1);
    }
}

pub mod assemble {
    use super::MetricName;

    pub fn facts_accepted(count: usize) {
        ::metrics::counter!(MetricName::AssembleFactsAccepted.as_str()).increment(count as u64);
    }

    pub fn duplicate_dropped(table: &str) {
        ::metrics::counter!(MetricName::AssembleDuplicatesDropped.as_str(), "table" => table.to_string())
            .increment(1);
    }

    pub fn breakdown_rows(count: usize) {
        ::metrics::counter!(MetricName::AssembleBreakdownRows.as_str()).increment(count as u64);
    }
}

pub mod qa {
    use super::MetricName;

    pub fn finding(check: &str, severity: &'static str) {
        ::metrics::counter!(
            MetricName::QaFindings.as_str(),
            "check" => check.to_string(),
            "severity" => severity
        )
        .increment(1);
    }
}

pub mod run {
    use super::MetricName;

    pub fn duration(secs: f64) {
        ::metrics::histogram!(MetricName::RunDuration.as_str()).record(secs);
    }

    pub fn bytes_written(bytes: u64) {
        ::metrics::counter!(MetricName::OutputBytesWritten.as_str()).increment(bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const ALL: [MetricName; 10] = [
        MetricName::ExtractRecordsEmitted,
        MetricName::ExtractRowsSkipped,
        MetricName::ExtractDuration,
        MetricName::ResolveLabels,
        MetricName::AssembleFactsAccepted,
        MetricName::AssembleDuplicatesDropped,
        MetricName::AssembleBreakdownRows,
        MetricName::QaFindings,
        MetricName::RunDuration,
        MetricName::OutputBytesWritten,
    ];

    #[test]
    fn metric_names_are_unique_and_prefixed() {
        let names: HashSet<&str> = ALL.iter().map(|m| m.as_str()).collect();
        assert_eq!(names.len(), ALL.len());
        assert!(names.iter().all(|n| n.starts_with("handbook_")));
    }

    #[test]
    fn recording_without_recorder_is_a_no_op() {
        extract::records_emitted("Part I - Table 2", 3);
        qa::finding("value_range", "warning");
    }
}
