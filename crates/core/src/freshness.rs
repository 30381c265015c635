//! Per-layer record of the last successful update.
//!
//! Written only by the ingestion orchestrator, one key per layer, after that
//! layer completes successfully. Everything else reads a snapshot.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreshnessRecord {
    entries: BTreeMap<String, DateTime<Utc>>,
}

/// Staleness status of one layer at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum LayerStaleness {
    Stale { layer: String, age_days: i64 },
    NeverSucceeded { layer: String },
}

impl LayerStaleness {
    #[must_use]
    pub fn layer(&self) -> &str {
        match self {
            Self::Stale { layer, .. } | Self::NeverSucceeded { layer } => layer,
        }
    }
}

impl FreshnessRecord {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a successful completion of `layer` at `at`.
    pub fn mark_success(&mut self, layer: &str, at: DateTime<Utc>) {
        self.entries.insert(layer.to_string(), at);
    }

    #[must_use]
    pub fn last_success(&self, layer: &str) -> Option<DateTime<Utc>> {
        self.entries.get(layer).copied()
    }

    /// Whole days since the last success, or `None` if the layer never succeeded.
    #[must_use]
    pub fn age_days(&self, layer: &str, now: DateTime<Utc>) -> Option<i64> {
        self.last_success(layer).map(|at| (now - at).num_days())
    }

    #[must_use]
    pub fn layers(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, DateTime<Utc>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Layers that are older than `threshold_days` or have never succeeded.
    ///
    /// `expected` lists every layer the pipeline knows about, so layers absent
    /// from the record are reported rather than silently omitted. Layers that
    /// appear in the record but not in `expected` are checked as well.
    #[must_use]
    pub fn stale_layers(
        &self,
        expected: &[String],
        now: DateTime<Utc>,
        threshold_days: i64,
    ) -> Vec<LayerStaleness> {
        let threshold = Duration::days(threshold_days);
        let mut names: Vec<&str> = expected.iter().map(String::as_str).collect();
        for layer in self.entries.keys() {
            if !names.contains(&layer.as_str()) {
                names.push(layer);
            }
        }

        names
            .into_iter()
            .filter_map(|layer| match self.last_success(layer) {
                None => Some(LayerStaleness::NeverSucceeded {
                    layer: layer.to_string(),
                }),
                Some(at) if now - at > threshold => Some(LayerStaleness::Stale {
                    layer: layer.to_string(),
                    age_days: (now - at).num_days(),
                }),
                Some(_) => None,
            })
            .collect()
    }
}
