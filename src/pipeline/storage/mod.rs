// Output sinks for a finished run

pub mod csv_dir;
pub mod in_memory;

pub use csv_dir::CsvDirectorySink;
pub use in_memory::InMemorySink;

use serde::Serialize;

use crate::error::Result;
use crate::pipeline::pipeline::RunOutput;
use crate::pipeline::processing::assemble::DetailTable;

/// Destination for the tables a run produces.
pub trait OutputSink: Send + Sync {
    /// Persist every output table and the manifest; returns bytes written.
    fn write(&self, output: &RunOutput) -> Result<u64>;
}

/// One row of `checks/data_dictionary.csv`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DictionaryEntry {
    pub table: String,
    pub column: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub description: &'static str,
}

const FACT_COLUMNS: &[(&str, &str, &str)] = &[
    ("insurer", "string", "Canonical insurer label, or the trimmed source text when unresolved"),
    ("year", "integer", "Fiscal year identified by its ending calendar year"),
    ("l1", "string", "Linked / Non-Linked, when the source table splits by product"),
    ("l2", "string", "VIP for variable insurance products, otherwise empty"),
    ("l3", "string", "Life, Pension, Health or Annuity, when the source table splits by product"),
    ("individual_group", "string", "Individual, Group or Not Applicable"),
    ("distribution_channel", "string", "Canonical channel label for the Part V tables"),
    ("state", "string", "Canonical state label; empty in facts.csv"),
    ("kpi", "string", "Measure name"),
    ("value", "number", "Value in base units: rupees, counts, or percent for ratios"),
    ("source_table", "string", "Handbook table the value was read from"),
];

const CROSSWALK_COLUMNS: &[(&str, &str, &str)] = &[
    ("registry", "string", "insurer, state or channel"),
    ("source_label", "string", "Label as it appeared in the source, trimmed"),
    ("resolved_label", "string", "Canonical label, or the source text when unresolved"),
    ("match_method", "string", "exact, fuzzy or unresolved"),
    ("similarity_score", "number", "Best normalized similarity; empty when no fuzzy lookup ran"),
];

const QA_COLUMNS: &[(&str, &str, &str)] = &[
    ("check_name", "string", "QA check that produced the finding"),
    ("severity", "string", "info, warning or error"),
    ("scope", "string", "Output table or source table the finding refers to"),
    ("detail", "string", "Human-readable description"),
];

/// Column descriptions for every CSV the directory sink writes, including
/// the run's detail tables.
pub fn data_dictionary(details: &[DetailTable]) -> Vec<DictionaryEntry> {
    let tables: [(&'static str, &[(&'static str, &'static str, &'static str)]); 4] = [
        ("facts", FACT_COLUMNS),
        ("state_breakdown", FACT_COLUMNS),
        ("name_xwalk", CROSSWALK_COLUMNS),
        ("qa_logs", QA_COLUMNS),
    ];
    let mut entries: Vec<DictionaryEntry> = tables
        .into_iter()
        .flat_map(|(table, columns)| {
            columns.iter().map(move |&(column, kind, description)| DictionaryEntry {
                table: table.to_string(),
                column: column.to_string(),
                kind,
                description,
            })
        })
        .collect();

    for detail in details {
        let columns = [
            (DETAIL_INSURER, "string", "Canonical insurer label"),
            (DETAIL_YEAR, "integer", "Fiscal year identified by its ending calendar year"),
            (detail.label_column.as_str(), "string", "Column label the value was published under"),
            (detail.value_column.as_str(), "number", "Value in base units, or percent for ratios"),
            (DETAIL_SOURCE, "string", "Handbook table the value was read from"),
        ];
        entries.extend(columns.into_iter().map(|(column, kind, description)| DictionaryEntry {
            table: detail.name.clone(),
            column: column.to_string(),
            kind,
            description,
        }));
    }
    entries
}

pub const DETAIL_INSURER: &str = "insurer";
pub const DETAIL_YEAR: &str = "year";
pub const DETAIL_SOURCE: &str = "source_table";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dictionary_covers_fact_columns_for_both_tables() {
        let dict = data_dictionary(&[]);
        let facts = dict.iter().filter(|e| e.table == "facts").count();
        let breakdown = dict.iter().filter(|e| e.table == "state_breakdown").count();
        assert_eq!(facts, 11);
        assert_eq!(breakdown, 11);
        assert!(dict.iter().any(|e| e.table == "name_xwalk" && e.column == "match_method"));
    }

    #[test]
    fn dictionary_names_detail_columns() {
        let detail = DetailTable {
            name: "table_23_detail".to_string(),
            label_column: "period".to_string(),
            value_column: "solvency_ratio".to_string(),
            rows: Vec::new(),
        };
        let dict = data_dictionary(&[detail]);
        let columns: Vec<_> = dict
            .iter()
            .filter(|e| e.table == "table_23_detail")
            .map(|e| e.column.as_str())
            .collect();
        assert_eq!(columns, vec!["insurer", "year", "period", "solvency_ratio", "source_table"]);
    }
}
