//! Run command: ingest every configured layer, then compose the briefing.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Args;
use mirror_market_briefing::{default_rules, AnalysisBundle, BriefingComposer, DriverRule};
use mirror_market_core::{
    AppConfig, ConfigLoader, LayerKind, PersistenceStore, PriceBar, PriceSeries, RowFilter,
};
use mirror_market_data::{
    load_series, CsvSource, CsvStorage, FreshnessStore, MemoryStore, Normalizer,
};
use mirror_market_orchestrator::{
    IngestionOrchestrator, LayerTask, MarketDataset, OrchestratorConfig,
};

/// Arguments for the run command.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Config file path
    #[arg(short, long, default_value = "config/Config.toml")]
    pub config: String,

    /// Directory holding the layer files (overrides storage.sources_dir)
    #[arg(short, long, env = "MIRROR_MARKET_SOURCES")]
    pub sources: Option<String>,

    /// Print the briefing as JSON instead of text
    #[arg(long)]
    pub json: bool,

    /// Only evaluate these Market-Drivers rules (comma-separated rule ids)
    #[arg(long, value_delimiter = ',')]
    pub drivers: Vec<String>,

    /// Write each ingested price layer, as cleaned, to `<DIR>/<layer>.csv`
    #[arg(long)]
    pub export_dir: Option<String>,
}

/// One file-backed task per configured layer, in config order.
pub fn build_tasks(config: &AppConfig, sources_dir: &Path) -> Vec<LayerTask> {
    config
        .layers
        .iter()
        .map(|layer| {
            let source = CsvSource::new(sources_dir.join(&layer.file), layer.kind);
            let task = LayerTask::new(&layer.name, layer.kind, Arc::new(source));
            match &layer.required_credential {
                Some(var) => task.requires_credential(var),
                None => task,
            }
        })
        .collect()
}

/// The default rule set, narrowed to `only` when it is non-empty.
///
/// # Errors
/// Returns an error naming the valid ids if `only` holds an unknown rule id.
pub fn select_rules(config: &AppConfig, only: &[String]) -> Result<Vec<Box<dyn DriverRule>>> {
    let rules = default_rules(config);
    if only.is_empty() {
        return Ok(rules);
    }
    let known: Vec<&str> = rules.iter().map(|r| r.id()).collect();
    if let Some(unknown) = only.iter().find(|id| !known.contains(&id.as_str())) {
        bail!("Unknown driver rule '{unknown}' (known: {})", known.join(", "));
    }
    Ok(rules
        .into_iter()
        .filter(|r| only.iter().any(|id| id == r.id()))
        .collect())
}

/// Reads every persisted price layer back from `store` and writes it as CSV.
/// Layers that produced no table this run are skipped. Returns the files written.
///
/// # Errors
/// Returns an error if a table cannot be decoded or a file cannot be written.
pub fn export_prices(
    config: &AppConfig,
    store: &dyn PersistenceStore,
    tables: &[String],
    dir: &Path,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create export directory: {}", dir.display()))?;
    let mut written = Vec::new();
    for layer in config.layers.iter().filter(|l| l.kind == LayerKind::Prices) {
        if !tables.contains(&layer.name) {
            continue;
        }
        let prices: BTreeMap<String, PriceSeries> =
            load_series::<PriceBar>(store, &layer.name, &RowFilter::all())?;
        let path = dir.join(format!("{}.csv", layer.name));
        CsvStorage::write_prices(&path, &prices)?;
        tracing::info!(layer = %layer.name, path = %path.display(), "prices exported");
        written.push(path);
    }
    Ok(written)
}

/// Runs ingestion and prints the briefing.
///
/// A layer failure is reported in the briefing, never as an error here.
///
/// # Errors
/// Returns an error if the config is invalid, the layer list is malformed, or
/// the freshness file cannot be read or written.
pub async fn run_briefing(args: RunArgs) -> Result<()> {
    let config = ConfigLoader::load_from(&args.config)
        .with_context(|| format!("Failed to load config: {}", args.config))?;
    let rules = select_rules(&config, &args.drivers)?;
    let sources_dir = args
        .sources
        .clone()
        .unwrap_or_else(|| config.storage.sources_dir.clone());

    tracing::info!(
        config = %args.config,
        sources = %sources_dir,
        layers = config.layers.len(),
        "starting ingestion run"
    );

    let freshness_store = FreshnessStore::new(&config.storage.freshness_path);
    let previous = freshness_store.load()?;

    let store = Arc::new(MemoryStore::new());
    let orchestrator =
        IngestionOrchestrator::with_store(OrchestratorConfig::from(&config.ingestion), store.clone())
            .with_normalizer(Normalizer::from_config(&config.ingestion));

    let stop = orchestrator.stop_signal();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Received Ctrl+C, layers not yet started will be skipped");
            stop.stop();
        }
    });

    let tasks = build_tasks(&config, Path::new(&sources_dir));
    let report = orchestrator.run(tasks, previous).await;
    ctrl_c.abort();
    let report = report?;

    freshness_store.save(&report.freshness)?;
    for (layer, error) in &report.errors {
        tracing::warn!(layer = %layer, category = error.category(), error = %error, "layer failed");
    }
    let tables = store.table_names()?;
    tracing::info!(
        tables = tables.len(),
        summary = %report.summary(),
        "ingestion run finished"
    );
    if let Some(dir) = &args.export_dir {
        export_prices(&config, store.as_ref(), &tables, Path::new(dir))?;
    }

    let dataset = MarketDataset::from_results(&report.results);
    let bundle = AnalysisBundle::build(&dataset, &config);
    let briefing = BriefingComposer::new(config).with_rules(rules).compose(
        &bundle,
        &report.freshness,
        &report.warnings,
        Utc::now(),
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&briefing)?);
    } else {
        print!("{briefing}");
    }
    Ok(())
}
