//! Ingestion Orchestrator.
//!
//! Runs every layer task independently. A layer that fails, times out or lacks
//! its credential is recorded and the run moves on; only a malformed task list
//! fails the run as a whole. Each layer runs on its own tokio task, so a
//! panicking source is recorded as that layer's failure. Fetches may overlap up
//! to `max_concurrency`, but outcomes are applied to the report and the
//! freshness record one at a time, in task order, once all layers are done.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use futures_util::stream::{self, StreamExt};
use mirror_market_core::{
    ConfigurationError, FetchError, FreshnessRecord, LayerResult, PersistenceStore,
    ValidationWarning,
};
use mirror_market_data::{persist_layer, Normalizer};
use tokio::task::JoinError;
use tracing::{error, info, warn};

use crate::report::{LayerError, RunReport};
use crate::task::{LayerTask, OrchestratorConfig, StopSignal};

enum LayerOutcome {
    Done(LayerResult, Vec<ValidationWarning>),
    Failed(LayerError),
    Skipped,
}

pub struct IngestionOrchestrator {
    config: OrchestratorConfig,
    normalizer: Normalizer,
    store: Option<Arc<dyn PersistenceStore>>,
    stop: StopSignal,
}

/// Everything one spawned layer needs, owned so the task is `'static`.
#[derive(Clone)]
struct LayerWorker {
    fetch_timeout: std::time::Duration,
    normalizer: Arc<Normalizer>,
    store: Option<Arc<dyn PersistenceStore>>,
    stop: StopSignal,
}

impl Default for IngestionOrchestrator {
    fn default() -> Self {
        Self::new(OrchestratorConfig::default())
    }
}

impl IngestionOrchestrator {
    /// Creates an orchestrator without persistence.
    #[must_use]
    pub fn new(config: OrchestratorConfig) -> Self {
        Self {
            config,
            normalizer: Normalizer::default(),
            store: None,
            stop: StopSignal::new(),
        }
    }

    /// Creates an orchestrator that writes every successful layer to `store`.
    #[must_use]
    pub fn with_store(config: OrchestratorConfig, store: Arc<dyn PersistenceStore>) -> Self {
        Self {
            store: Some(store),
            ..Self::new(config)
        }
    }

    #[must_use]
    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Handle for stopping the run between layers.
    #[must_use]
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Runs every task and returns the merged outcome.
    ///
    /// Successful layers get `freshness[name] = fetched_at`; failed, timed-out
    /// and skipped layers leave their entry untouched.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if a task name is empty or repeated. No
    /// layer is fetched in that case.
    pub async fn run(
        &self,
        tasks: Vec<LayerTask>,
        mut freshness: FreshnessRecord,
    ) -> Result<RunReport, ConfigurationError> {
        validate_tasks(&tasks)?;
        info!(
            layers = tasks.len(),
            concurrency = self.config.max_concurrency,
            "starting ingestion run"
        );

        let names: Vec<String> = tasks.iter().map(|t| t.name.clone()).collect();
        let worker = LayerWorker {
            fetch_timeout: self.config.fetch_timeout,
            normalizer: Arc::new(self.normalizer.clone()),
            store: self.store.clone(),
            stop: self.stop.clone(),
        };
        let mut outcomes: BTreeMap<usize, LayerOutcome> = stream::iter(tasks.into_iter().enumerate())
            .map(|(idx, task)| {
                let worker = worker.clone();
                async move {
                    let name = task.name.clone();
                    let outcome = match tokio::spawn(worker.run_layer(task)).await {
                        Ok(outcome) => outcome,
                        Err(e) => {
                            let e = LayerError::Panicked(join_failure(e));
                            error!(layer = %name, category = e.category(), error = %e, "layer failed");
                            LayerOutcome::Failed(e)
                        }
                    };
                    (idx, outcome)
                }
            })
            .buffer_unordered(self.config.max_concurrency.max(1))
            .collect()
            .await;

        let mut report = RunReport::default();
        for (idx, name) in names.into_iter().enumerate() {
            match outcomes.remove(&idx) {
                Some(LayerOutcome::Done(result, warnings)) => {
                    freshness.mark_success(&name, result.fetched_at());
                    report.warnings.extend(warnings);
                    report.results.insert(name, result);
                }
                Some(LayerOutcome::Failed(e)) => {
                    report.errors.insert(name, e);
                }
                Some(LayerOutcome::Skipped) | None => report.skipped.push(name),
            }
        }
        report.freshness = freshness;

        info!(summary = %report.summary(), "ingestion run finished");
        Ok(report)
    }
}

impl LayerWorker {
    async fn run_layer(self, task: LayerTask) -> LayerOutcome {
        if self.stop.is_stopped() {
            warn!(layer = %task.name, "run stopped, layer skipped");
            return LayerOutcome::Skipped;
        }
        info!(layer = %task.name, kind = %task.kind, "fetching layer");

        match self.ingest(&task).await {
            Ok((result, warnings)) => {
                info!(
                    layer = %task.name,
                    entities = result.data().entity_count(),
                    records = result.data().record_count(),
                    warnings = warnings.len(),
                    "layer complete"
                );
                LayerOutcome::Done(result, warnings)
            }
            Err(e) => {
                error!(layer = %task.name, category = e.category(), error = %e, "layer failed");
                LayerOutcome::Failed(e)
            }
        }
    }

    async fn ingest(
        &self,
        task: &LayerTask,
    ) -> Result<(LayerResult, Vec<ValidationWarning>), LayerError> {
        if let Some(var) = &task.required_credential {
            let present = std::env::var(var).map_or(false, |v| !v.trim().is_empty());
            if !present {
                return Err(FetchError::Auth(format!("{var} not set")).into());
            }
        }

        let timeout = self.fetch_timeout;
        let data = tokio::time::timeout(timeout, task.fetcher.fetch())
            .await
            .map_err(|_| FetchError::Timeout(timeout.as_secs()))??;

        if data.is_empty() {
            return Err(FetchError::Parse("returned no data".to_string()).into());
        }
        if !data.matches_kind(task.kind) {
            return Err(FetchError::Parse(format!(
                "payload shape does not fit a {} layer",
                task.kind
            ))
            .into());
        }

        let (clean, warnings) = self.normalizer.normalize_layer(&data);
        let result = LayerResult::new(task.name.clone(), task.kind, clean, Utc::now());

        if let Some(store) = &self.store {
            persist_layer(store.as_ref(), &result).map_err(|e| LayerError::Storage(e.to_string()))?;
        }
        Ok((result, warnings))
    }
}

fn join_failure(e: JoinError) -> String {
    if !e.is_panic() {
        return "layer task cancelled".to_string();
    }
    let payload = e.into_panic();
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

fn validate_tasks(tasks: &[LayerTask]) -> Result<(), ConfigurationError> {
    let mut seen = HashSet::new();
    for task in tasks {
        if task.name.trim().is_empty() {
            return Err(ConfigurationError::EmptyLayerName);
        }
        if !seen.insert(task.name.as_str()) {
            return Err(ConfigurationError::DuplicateLayer(task.name.clone()));
        }
    }
    Ok(())
}
