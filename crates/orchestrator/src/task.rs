use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mirror_market_core::{IngestionConfig, LayerKind, SourceFetcher};

/// One source layer to ingest: a named fetch operation and the shape it
/// delivers.
#[derive(Clone)]
pub struct LayerTask {
    pub name: String,
    pub kind: LayerKind,
    pub fetcher: Arc<dyn SourceFetcher>,
    /// Environment variable that must be set before the layer may run.
    pub required_credential: Option<String>,
}

impl LayerTask {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: LayerKind, fetcher: Arc<dyn SourceFetcher>) -> Self {
        Self {
            name: name.into(),
            kind,
            fetcher,
            required_credential: None,
        }
    }

    #[must_use]
    pub fn requires_credential(mut self, env_var: impl Into<String>) -> Self {
        self.required_credential = Some(env_var.into());
        self
    }
}

impl fmt::Debug for LayerTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayerTask")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("required_credential", &self.required_credential)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Layers fetched at once; 1 runs them sequentially in task order.
    pub max_concurrency: usize,
    pub fetch_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 1,
            fetch_timeout: Duration::from_secs(30),
        }
    }
}

impl From<&IngestionConfig> for OrchestratorConfig {
    fn from(config: &IngestionConfig) -> Self {
        Self {
            max_concurrency: config.max_concurrency.max(1),
            fetch_timeout: Duration::from_secs(config.fetch_timeout_secs),
        }
    }
}

/// Cooperative cancellation flag shared between a run and its caller.
///
/// Checked before each layer starts; a layer already fetching is left to
/// finish or time out.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_from_ingestion_settings() {
        let ingestion = IngestionConfig {
            max_concurrency: 4,
            fetch_timeout_secs: 12,
            ..IngestionConfig::default()
        };
        let config = OrchestratorConfig::from(&ingestion);
        assert_eq!(config.max_concurrency, 4);
        assert_eq!(config.fetch_timeout, Duration::from_secs(12));
    }

    #[test]
    fn stop_signal_is_shared_between_clones() {
        let signal = StopSignal::new();
        let observer = signal.clone();
        assert!(!observer.is_stopped());
        signal.stop();
        assert!(observer.is_stopped());
    }
}
