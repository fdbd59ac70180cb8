//! Canonical registries for insurers, states and distribution channels.
//!
//! Resolution itself is pure ([`CanonicalRegistry::resolve`]); logging to the
//! crosswalk is the job of a [`LabelResolver`], which each extractor owns so
//! extractors never share mutable state.

pub mod channels;
pub mod crosswalk;
pub mod insurers;
pub mod registry;
pub mod states;

pub use crosswalk::{CrosswalkLog, CrosswalkRecord};
pub use registry::{
    normalize_label, CanonicalEntity, CanonicalRegistry, MatchMethod, RegistryKind, Resolution,
};

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::observability::metrics;

/// The three registries, built once per run and shared read-only.
#[derive(Debug, Clone)]
pub struct Registries {
    pub insurer: CanonicalRegistry,
    pub state: CanonicalRegistry,
    pub channel: CanonicalRegistry,
}

impl Registries {
    /// Built-in vocabularies. Only the insurer registry gets a fuzzy fallback.
    pub fn builtin(config: &PipelineConfig) -> Result<Self> {
        Ok(Self {
            insurer: CanonicalRegistry::build(
                RegistryKind::Insurer,
                insurers::INSURER_VARIANTS,
                Some(config.fuzzy_threshold),
            )?,
            state: CanonicalRegistry::build(RegistryKind::State, states::STATE_VARIANTS, None)?,
            channel: CanonicalRegistry::build(RegistryKind::Channel, channels::CHANNEL_VARIANTS, None)?,
        })
    }

    pub fn get(&self, kind: RegistryKind) -> &CanonicalRegistry {
        match kind {
            RegistryKind::Insurer => &self.insurer,
            RegistryKind::State => &self.state,
            RegistryKind::Channel => &self.channel,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &CanonicalRegistry> {
        [&self.insurer, &self.state, &self.channel].into_iter()
    }
}

/// Resolves labels against shared registries and records each distinct
/// source label in a private crosswalk.
pub struct LabelResolver<'a> {
    registries: &'a Registries,
    log: CrosswalkLog,
}

impl<'a> LabelResolver<'a> {
    pub fn new(registries: &'a Registries) -> Self {
        Self {
            registries,
            log: CrosswalkLog::new(),
        }
    }

    pub fn resolve(&mut self, kind: RegistryKind, raw: &str) -> Resolution {
        let resolution = self.registries.get(kind).resolve(raw);
        if self.log.record(CrosswalkRecord::new(kind, raw, &resolution)) {
            metrics::canonical::label_resolved(kind.as_str(), resolution.method.as_str());
        }
        resolution
    }

    pub fn log(&self) -> &CrosswalkLog {
        &self.log
    }

    pub fn into_log(self) -> CrosswalkLog {
        self.log
    }
}
