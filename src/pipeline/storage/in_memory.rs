use std::sync::{Arc, Mutex};
use tracing::debug;

use super::OutputSink;
use crate::error::Result;
use crate::pipeline::pipeline::RunOutput;

/// In-memory sink for dry runs and testing
#[derive(Debug, Clone, Default)]
pub struct InMemorySink {
    runs: Arc<Mutex<Vec<RunOutput>>>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every run written so far, oldest first.
    pub fn runs(&self) -> Vec<RunOutput> {
        self.runs.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn last(&self) -> Option<RunOutput> {
        self.runs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .last()
            .cloned()
    }
}

impl OutputSink for InMemorySink {
    fn write(&self, output: &RunOutput) -> Result<u64> {
        let mut runs = self.runs.lock().unwrap_or_else(|e| e.into_inner());
        runs.push(output.clone());
        debug!(run_id = %output.manifest.run_id, stored = runs.len(), "stored run in memory");
        Ok(0)
    }
}
