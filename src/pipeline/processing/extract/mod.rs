//! Table extraction: declarative layouts, the interpreter that reads them, and
//! the record types it produces.

pub mod categories;
pub mod interpreter;
pub mod layout;
pub mod tables;
pub mod year;

pub use interpreter::extract;
pub use layout::{DetailPlan, TableLayout};
pub use tables::builtin_layouts;

use serde::{Serialize, Serializer};
use std::fmt;

use super::canonical::CrosswalkLog;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KpiClass {
    Currency,
    Count,
    Ratio,
}

/// The closed set of indicators the fact table carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Kpi {
    TotalPremium,
    NewBusinessPremium,
    NewBusinessPolicy,
    NewBusinessSchemes,
    LivesCovered,
    TotalPolicyYearEnd,
    SumAssuredYearEnd,
    AssetsUnderManagement,
    SolvencyRatio,
    /// Policy-count persistency at a tenor in months (13, 25, 37, 49, 61).
    Persistency { months: u16 },
    NumberOfOffices,
}

impl Kpi {
    pub fn class(&self) -> KpiClass {
        match self {
            Kpi::TotalPremium
            | Kpi::NewBusinessPremium
            | Kpi::SumAssuredYearEnd
            | Kpi::AssetsUnderManagement => KpiClass::Currency,
            Kpi::NewBusinessPolicy
            | Kpi::NewBusinessSchemes
            | Kpi::LivesCovered
            | Kpi::TotalPolicyYearEnd
            | Kpi::NumberOfOffices => KpiClass::Count,
            Kpi::SolvencyRatio | Kpi::Persistency { .. } => KpiClass::Ratio,
        }
    }

    pub fn is_persistency(&self) -> bool {
        matches!(self, Kpi::Persistency { .. })
    }

    /// Scale the source reports this KPI in unless a layout says otherwise.
    pub fn default_unit(&self) -> SourceUnit {
        match self.class() {
            KpiClass::Currency => SourceUnit::Crore,
            KpiClass::Count => SourceUnit::Thousands,
            KpiClass::Ratio => SourceUnit::Percent,
        }
    }
}

impl fmt::Display for Kpi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kpi::TotalPremium => write!(f, "Total Premium"),
            Kpi::NewBusinessPremium => write!(f, "New Business Premium"),
            Kpi::NewBusinessPolicy => write!(f, "New Business Policy"),
            Kpi::NewBusinessSchemes => write!(f, "New Business Schemes"),
            Kpi::LivesCovered => write!(f, "Lives Covered"),
            Kpi::TotalPolicyYearEnd => write!(f, "Total Policy (Year-End)"),
            Kpi::SumAssuredYearEnd => write!(f, "Sum Assured (Year-End)"),
            Kpi::AssetsUnderManagement => write!(f, "Assets Under Management"),
            Kpi::SolvencyRatio => write!(f, "Solvency Ratio"),
            Kpi::Persistency { months } => write!(f, "Persistency ({}M, Policy)", months),
            Kpi::NumberOfOffices => write!(f, "Number of Offices"),
        }
    }
}

impl Serialize for Kpi {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// The scale a source column is published in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceUnit {
    Crore,
    Thousands,
    Units,
    Percent,
}

/// One row of the long-format fact table. `value` is in base units once the
/// assembler has run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactRecord {
    pub insurer: String,
    pub year: i32,
    pub l1: Option<String>,
    pub l2: Option<String>,
    pub l3: Option<String>,
    pub individual_group: Option<String>,
    pub distribution_channel: Option<String>,
    pub state: Option<String>,
    pub kpi: Kpi,
    pub value: f64,
    pub source_table: String,
}

/// Everything in a [`FactRecord`] except the value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FactKey {
    pub insurer: String,
    pub year: i32,
    pub l1: Option<String>,
    pub l2: Option<String>,
    pub l3: Option<String>,
    pub individual_group: Option<String>,
    pub distribution_channel: Option<String>,
    pub state: Option<String>,
    pub kpi: Kpi,
    pub source_table: String,
}

impl FactRecord {
    pub fn key(&self) -> FactKey {
        FactKey {
            insurer: self.insurer.clone(),
            year: self.year,
            l1: self.l1.clone(),
            l2: self.l2.clone(),
            l3: self.l3.clone(),
            individual_group: self.individual_group.clone(),
            distribution_channel: self.distribution_channel.clone(),
            state: self.state.clone(),
            kpi: self.kpi,
            source_table: self.source_table.clone(),
        }
    }
}

impl fmt::Display for FactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let opt = |v: &Option<String>| v.clone().unwrap_or_default();
        write!(
            f,
            "({}, {}, {}, {}, {}, {}, {}, {}, {}, {})",
            self.insurer,
            self.year,
            opt(&self.l1),
            opt(&self.l2),
            opt(&self.l3),
            opt(&self.individual_group),
            opt(&self.distribution_channel),
            opt(&self.state),
            self.kpi,
            self.source_table
        )
    }
}

/// A fact still in source scale.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedFact {
    pub record: FactRecord,
    pub unit: SourceUnit,
}

/// A detail-table value still in source scale, with the column label it
/// was published under.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedDetail {
    pub fact: ExtractedFact,
    pub label: String,
}

/// One row of a detail table such as the Table 21 fund bands.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailRecord {
    pub insurer: String,
    pub year: i32,
    pub label: String,
    pub value: f64,
    pub source_table: String,
}

/// Output of one extractor run.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub table: String,
    pub facts: Vec<ExtractedFact>,
    /// Rows for the layout's detail table, empty when it has none.
    pub details: Vec<ExtractedDetail>,
    pub detail_plan: Option<DetailPlan>,
    pub crosswalk: CrosswalkLog,
    /// Data rows dropped as aggregates, unmatched categories or blank labels.
    pub skipped_rows: usize,
    /// Sum state rows into insurer-level facts during assembly.
    pub rollup_states: bool,
}
