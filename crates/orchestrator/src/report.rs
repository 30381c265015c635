use std::collections::BTreeMap;

use mirror_market_core::{FetchError, FreshnessRecord, LayerResult, ValidationWarning};
use thiserror::Error;

/// Why a layer produced no result this run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayerError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Persistence failed: {0}")]
    Storage(String),

    /// The layer's task panicked or was cancelled before finishing.
    #[error("Layer task panicked: {0}")]
    Panicked(String),
}

impl LayerError {
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::Fetch(e) => e.category(),
            Self::Storage(_) => "storage",
            Self::Panicked(_) => "panic",
        }
    }
}

/// Outcome of one orchestrator run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub results: BTreeMap<String, LayerResult>,
    pub errors: BTreeMap<String, LayerError>,
    /// Layers not started because the run was stopped, in task order.
    pub skipped: Vec<String>,
    /// Validation warnings from every successful layer, in task order.
    pub warnings: Vec<ValidationWarning>,
    /// Freshness snapshot taken after every layer finished.
    pub freshness: FreshnessRecord,
}

impl RunReport {
    #[must_use]
    pub fn result(&self, layer: &str) -> Option<&LayerResult> {
        self.results.get(layer)
    }

    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.errors.len()
    }

    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{} succeeded, {} failed, {} skipped, {} warnings",
            self.succeeded(),
            self.failed(),
            self.skipped.len(),
            self.warnings.len()
        )
    }
}
