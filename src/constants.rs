//! Source-table identifiers and sheet names used across the codebase.
//!
//! Sheet names mirror the handbook workbooks literally. Sheet `"11 "` carries a
//! trailing space in the published Part I workbook and must not be trimmed.

// Part I workbook
pub const TABLE_2: &str = "Part I - Table 2";
pub const TABLE_3: &str = "Part I - Table 3";
pub const TABLE_6: &str = "Part I - Table 6";
pub const TABLE_8: &str = "Part I - Table 8";
pub const TABLE_10: &str = "Part I - Table 10";
pub const TABLE_11: &str = "Part I - Table 11";
pub const TABLE_12: &str = "Part I - Table 12";
pub const TABLE_21: &str = "Part I - Table 21";
pub const TABLE_23: &str = "Part I - Table 23";
pub const TABLE_28: &str = "Part I - Table 28";
pub const TABLE_29: &str = "Part I - Table 29";

// Part V workbook
pub const TABLE_100: &str = "Part V - Table 100";
pub const TABLE_102: &str = "Part V - Table 102";

pub const SHEET_11: &str = "11 ";

// Business segment labels (Individual_Group column)
pub const SEGMENT_INDIVIDUAL: &str = "Individual";
pub const SEGMENT_GROUP: &str = "Group";
pub const SEGMENT_NOT_APPLICABLE: &str = "Not Applicable";

// Product category level 1 labels
pub const L1_LINKED: &str = "Linked";
pub const L1_NON_LINKED: &str = "Non-Linked";

/// Every L1 value the category tables can emit.
pub fn valid_l1_labels() -> Vec<&'static str> {
    vec![L1_LINKED, L1_NON_LINKED]
}

/// Every Individual_Group value the layouts can emit.
pub fn valid_segments() -> Vec<&'static str> {
    vec![SEGMENT_INDIVIDUAL, SEGMENT_GROUP, SEGMENT_NOT_APPLICABLE]
}
