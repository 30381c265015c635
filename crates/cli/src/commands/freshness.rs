//! Freshness command: last success and age of each configured layer.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use mirror_market_core::{ConfigLoader, FreshnessRecord};
use mirror_market_data::FreshnessStore;

/// Arguments for the freshness command.
#[derive(Args, Debug, Clone)]
pub struct FreshnessArgs {
    /// Config file path
    #[arg(short, long, default_value = "config/Config.toml")]
    pub config: String,
}

/// One table row per layer: configured layers first, then any recorded
/// layer no longer in the config.
fn freshness_rows(
    layers: &[String],
    record: &FreshnessRecord,
    now: DateTime<Utc>,
    threshold_days: i64,
) -> Vec<String> {
    let mut names: Vec<&str> = layers.iter().map(String::as_str).collect();
    for (layer, _) in record.iter() {
        if !names.contains(&layer) {
            names.push(layer);
        }
    }

    names
        .into_iter()
        .map(|layer| match record.last_success(layer) {
            Some(at) => {
                let age = (now - at).num_days();
                let flag = if age > threshold_days { "  STALE" } else { "" };
                format!(
                    "{layer:<20} {}  {age:>3} days{flag}",
                    at.format("%Y-%m-%d %H:%M:%S")
                )
            }
            None => format!("{layer:<20} never succeeded"),
        })
        .collect()
}

/// Prints the freshness table.
///
/// # Errors
/// Returns an error if the config or the freshness file cannot be read.
pub fn run_freshness(args: &FreshnessArgs) -> Result<()> {
    let config = ConfigLoader::load_from(&args.config)
        .with_context(|| format!("Failed to load config: {}", args.config))?;
    let store = FreshnessStore::new(&config.storage.freshness_path);
    let record = store.load()?;

    println!("Layer freshness ({})", store.path().display());
    println!("{}", "=".repeat(56));
    for row in freshness_rows(
        &config.layer_names(),
        &record,
        Utc::now(),
        config.freshness.staleness_warning_days,
    ) {
        println!("{row}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn rows_cover_configured_and_recorded_layers() {
        let now = Utc.with_ymd_and_hms(2025, 7, 14, 8, 0, 0).unwrap();
        let mut record = FreshnessRecord::new();
        record.mark_success("cme_prices", now - Duration::days(1));
        record.mark_success("retired_feed", now - Duration::days(30));

        let rows = freshness_rows(
            &["cme_prices".to_string(), "fred".to_string()],
            &record,
            now,
            7,
        );

        assert_eq!(rows.len(), 3);
        assert!(rows[0].starts_with("cme_prices"));
        assert!(rows[0].ends_with("1 days"));
        assert!(rows[1].ends_with("never succeeded"));
        assert!(rows[2].starts_with("retired_feed"));
        assert!(rows[2].ends_with("STALE"));
    }
}
