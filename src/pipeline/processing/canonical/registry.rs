use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

use crate::error::{HandbookError, Result};

/// Which canonical registry a label was resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistryKind {
    Insurer,
    State,
    Channel,
}

impl RegistryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistryKind::Insurer => "insurer",
            RegistryKind::State => "state",
            RegistryKind::Channel => "channel",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    Exact,
    Fuzzy,
    Unresolved,
}

impl MatchMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchMethod::Exact => "exact",
            MatchMethod::Fuzzy => "fuzzy",
            MatchMethod::Unresolved => "unresolved",
        }
    }
}

/// Outcome of resolving one raw label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    pub label: String,
    pub method: MatchMethod,
    pub score: Option<f64>,
}

/// One canonical entity and every normalized spelling that maps to it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalEntity {
    pub canonical_label: String,
    pub source_variants: BTreeSet<String>,
}

/// Lower-case, trim, fold dashes, underscores, periods and commas to spaces,
/// and collapse whitespace. `*`, `&` and parentheses are kept: they
/// distinguish published headings such as "Others*" from "Others".
pub fn normalize_label(raw: &str) -> String {
    let folded: String = raw
        .to_lowercase()
        .chars()
        .map(|c| match c {
            '-' | '\u{2013}' | '\u{2014}' | '_' | '.' | ',' => ' ',
            c => c,
        })
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

static CORPORATE_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\s+(?:ltd|limited|pvt|private|inc|incorporated|company|co))+$").unwrap()
});

/// Drop trailing corporate suffixes from an already normalized label, so
/// "sbi life insurance co ltd" and "sbi life insurance company limited"
/// share the key "sbi life insurance". The first word always survives.
pub fn strip_corporate_suffix(normalized: &str) -> String {
    CORPORATE_SUFFIX.replace(normalized, "").into_owned()
}

/// A closed vocabulary with exact lookup and, for registries that enable it,
/// an edit-distance fallback.
///
/// The variant index is injective: every normalized variant belongs to exactly
/// one entity, enforced at construction.
#[derive(Debug, Clone)]
pub struct CanonicalRegistry {
    kind: RegistryKind,
    entities: Vec<CanonicalEntity>,
    index: HashMap<String, usize>,
    fuzzy_threshold: Option<f64>,
}

impl CanonicalRegistry {
    /// Build from `(variant, canonical)` pairs. Each canonical label is also
    /// registered as a variant of itself.
    pub fn build(
        kind: RegistryKind,
        pairs: &[(&str, &str)],
        fuzzy_threshold: Option<f64>,
    ) -> Result<Self> {
        let mut registry = Self {
            kind,
            entities: Vec::new(),
            index: HashMap::new(),
            fuzzy_threshold,
        };
        let mut by_label: HashMap<String, usize> = HashMap::new();

        for (variant, canonical) in pairs {
            let entity = match by_label.get(*canonical) {
                Some(&i) => i,
                None => {
                    registry.entities.push(CanonicalEntity {
                        canonical_label: canonical.to_string(),
                        source_variants: BTreeSet::new(),
                    });
                    let i = registry.entities.len() - 1;
                    by_label.insert(canonical.to_string(), i);
                    registry.insert_variant(canonical, i)?;
                    i
                }
            };
            registry.insert_variant(variant, entity)?;
        }

        debug!(
            registry = kind.as_str(),
            entities = registry.entities.len(),
            variants = registry.index.len(),
            "built canonical registry"
        );
        Ok(registry)
    }

    /// Lookup keys for a raw label: the normalized form, then for insurers the
    /// suffix-stripped form when it differs.
    fn keys(&self, raw: &str) -> Vec<String> {
        let normalized = normalize_label(raw);
        let mut keys = vec![normalized];
        if self.kind == RegistryKind::Insurer {
            let stripped = strip_corporate_suffix(&keys[0]);
            if !stripped.is_empty() && stripped != keys[0] {
                keys.push(stripped);
            }
        }
        keys
    }

    fn insert_variant(&mut self, raw: &str, entity: usize) -> Result<()> {
        for key in self.keys(raw) {
            self.insert_key(key, entity)?;
        }
        Ok(())
    }

    fn insert_key(&mut self, variant: String, entity: usize) -> Result<()> {
        if variant.is_empty() {
            return Ok(());
        }
        match self.index.get(&variant) {
            Some(&owner) if owner != entity => Err(HandbookError::RegistryConflict {
                registry: self.kind.as_str().to_string(),
                variant,
                first: self.entities[owner].canonical_label.clone(),
                second: self.entities[entity].canonical_label.clone(),
            }),
            Some(_) => Ok(()),
            None => {
                self.index.insert(variant.clone(), entity);
                self.entities[entity].source_variants.insert(variant);
                Ok(())
            }
        }
    }

    pub fn kind(&self) -> RegistryKind {
        self.kind
    }

    pub fn entities(&self) -> &[CanonicalEntity] {
        &self.entities
    }

    /// Resolve a raw label. Pure: identical input always yields identical output.
    ///
    /// Exact match on the normalized form first, then (insurers only) on the
    /// form with corporate suffixes stripped. If both miss and the registry
    /// has a threshold, the best normalized Levenshtein similarity of either
    /// form over all variants wins when it reaches the threshold; equal scores
    /// go to the lexicographically smallest canonical label. Unresolved
    /// insurer labels come back normalized with their best score; other
    /// registries pass the trimmed source text through.
    pub fn resolve(&self, raw: &str) -> Resolution {
        let keys = self.keys(raw);
        if let Some(&i) = keys.iter().find_map(|k| self.index.get(k)) {
            return Resolution {
                label: self.entities[i].canonical_label.clone(),
                method: MatchMethod::Exact,
                score: Some(1.0),
            };
        }

        let Some(threshold) = self.fuzzy_threshold else {
            return Resolution {
                label: raw.trim().to_string(),
                method: MatchMethod::Unresolved,
                score: None,
            };
        };

        let mut best: Option<(f64, &str)> = None;
        for entity in &self.entities {
            let score = entity
                .source_variants
                .iter()
                .flat_map(|v| keys.iter().map(move |k| strsim::normalized_levenshtein(k, v)))
                .fold(0.0_f64, f64::max);
            let label = entity.canonical_label.as_str();
            best = match best {
                None => Some((score, label)),
                Some((top, top_label)) => {
                    if score > top || (score == top && label < top_label) {
                        Some((score, label))
                    } else {
                        Some((top, top_label))
                    }
                }
            };
        }

        let normalized = keys.into_iter().next().unwrap_or_default();
        match best {
            Some((score, label)) if score >= threshold => Resolution {
                label: label.to_string(),
                method: MatchMethod::Fuzzy,
                score: Some(score),
            },
            Some((score, _)) => Resolution {
                label: normalized,
                method: MatchMethod::Unresolved,
                score: Some(score),
            },
            None => Resolution {
                label: normalized,
                method: MatchMethod::Unresolved,
                score: None,
            },
        }
    }
}
