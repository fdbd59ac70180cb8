use serde::Serialize;
use std::collections::HashSet;

use super::registry::{MatchMethod, RegistryKind, Resolution};

/// Audit row recording how one distinct source label was resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrosswalkRecord {
    pub registry: RegistryKind,
    pub source_label: String,
    pub resolved_label: String,
    pub match_method: MatchMethod,
    pub similarity_score: Option<f64>,
}

impl CrosswalkRecord {
    pub fn new(registry: RegistryKind, source_label: &str, resolution: &Resolution) -> Self {
        Self {
            registry,
            source_label: source_label.trim().to_string(),
            resolved_label: resolution.label.clone(),
            match_method: resolution.method,
            similarity_score: resolution.score,
        }
    }
}

/// Ordered crosswalk with at most one row per source label; the first
/// resolution of a label is the one kept.
#[derive(Debug, Clone, Default)]
pub struct CrosswalkLog {
    records: Vec<CrosswalkRecord>,
    seen: HashSet<String>,
}

impl CrosswalkLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when the label was already logged.
    pub fn record(&mut self, record: CrosswalkRecord) -> bool {
        if !self.seen.insert(record.source_label.clone()) {
            return false;
        }
        self.records.push(record);
        true
    }

    /// Append another log's rows, keeping first-seen order and dedup.
    pub fn merge(&mut self, other: CrosswalkLog) {
        for record in other.records {
            self.record(record);
        }
    }

    pub fn records(&self) -> &[CrosswalkRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<CrosswalkRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exact(label: &str) -> Resolution {
        Resolution {
            label: label.to_string(),
            method: MatchMethod::Exact,
            score: Some(1.0),
        }
    }

    #[test]
    fn first_resolution_of_a_label_wins() {
        let mut log = CrosswalkLog::new();
        assert!(log.record(CrosswalkRecord::new(RegistryKind::Insurer, "LIC ", &exact("LIC"))));
        assert!(!log.record(CrosswalkRecord::new(RegistryKind::Insurer, "LIC", &exact("Other"))));
        assert_eq!(log.len(), 1);
        assert_eq!(log.records()[0].source_label, "LIC");
        assert_eq!(log.records()[0].resolved_label, "LIC");
    }

    #[test]
    fn merge_preserves_order_and_dedups() {
        let mut a = CrosswalkLog::new();
        a.record(CrosswalkRecord::new(RegistryKind::State, "Goa", &exact("Goa")));
        let mut b = CrosswalkLog::new();
        b.record(CrosswalkRecord::new(RegistryKind::State, "Assam", &exact("Assam")));
        b.record(CrosswalkRecord::new(RegistryKind::State, "Goa", &exact("Goa")));

        a.merge(b);
        let labels: Vec<_> = a.records().iter().map(|r| r.source_label.as_str()).collect();
        assert_eq!(labels, vec!["Goa", "Assam"]);
    }
}
