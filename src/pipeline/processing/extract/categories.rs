//! Product-category phrases for the business-in-force tables (Part I Tables 10
//! and 11, 2023-24 edition).
//!
//! Order matters: the first phrase contained in a row label wins, and a linked
//! phrase is a substring of its non-linked twin once punctuation is folded, so
//! every non-linked phrase precedes the linked ones. Only the VIP blocks carry
//! an L2.

use serde::Serialize;

use crate::constants::{L1_LINKED, L1_NON_LINKED};
use crate::pipeline::processing::canonical::normalize_label;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub l1: &'static str,
    pub l2: Option<&'static str>,
    pub l3: &'static str,
}

const fn cat(l1: &'static str, l2: Option<&'static str>, l3: &'static str) -> Category {
    Category { l1, l2, l3 }
}

pub const CATEGORY_PHRASES: &[(&str, Category)] = &[
    ("non linked life business", cat(L1_NON_LINKED, None, "Life")),
    ("non linked - general annuity business", cat(L1_NON_LINKED, None, "Annuity")),
    ("non linked - pension business", cat(L1_NON_LINKED, None, "Pension")),
    ("non linked health business", cat(L1_NON_LINKED, None, "Health")),
    ("non-linked vip-life business", cat(L1_NON_LINKED, Some("VIP"), "Life")),
    ("non-linked vip-general annuity business", cat(L1_NON_LINKED, Some("VIP"), "Annuity")),
    ("non-linked vip-pension business", cat(L1_NON_LINKED, Some("VIP"), "Pension")),
    ("non-linked vip-health business", cat(L1_NON_LINKED, Some("VIP"), "Health")),
    ("linked business - life business", cat(L1_LINKED, None, "Life")),
    ("linked general annuity business", cat(L1_LINKED, None, "Annuity")),
    ("linked pension business", cat(L1_LINKED, None, "Pension")),
    ("linked health business", cat(L1_LINKED, None, "Health")),
    ("linked vip-life business", cat(L1_LINKED, Some("VIP"), "Life")),
    ("linked vip-general annuity business", cat(L1_LINKED, Some("VIP"), "Annuity")),
    ("linked vip-pension business", cat(L1_LINKED, Some("VIP"), "Pension")),
    ("linked vip-health business", cat(L1_LINKED, Some("VIP"), "Health")),
];

/// Category announced by a row label, if any.
pub fn match_category(label: &str) -> Option<&'static Category> {
    let folded = normalize_label(label);
    CATEGORY_PHRASES
        .iter()
        .find(|(phrase, _)| folded.contains(normalize_label(phrase).as_str()))
        .map(|(_, category)| category)
}
