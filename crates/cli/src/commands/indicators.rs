//! Indicators command: technical snapshot and recent signals from a price CSV.

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Args;
use mirror_market_core::{ConfigLoader, LayerData, LayerKind};
use mirror_market_data::{CsvStorage, Normalizer};
use mirror_market_signals::{rank_signals, IndicatorSet, IndicatorSnapshot, SignalDetector};

/// Arguments for the indicators command.
#[derive(Args, Debug, Clone)]
pub struct IndicatorsArgs {
    /// Price CSV in the `date,entity,open,high,low,close,volume` layout
    #[arg(short, long)]
    pub file: String,

    /// Only report this entity
    #[arg(short, long)]
    pub entity: Option<String>,

    /// Config file path (signal thresholds)
    #[arg(short, long, default_value = "config/Config.toml")]
    pub config: String,
}

fn fmt_opt(value: Option<f64>, decimals: usize) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.decimals$}"))
}

fn snapshot_lines(snap: &IndicatorSnapshot) -> Vec<String> {
    vec![
        format!("Close:      {:.2} ({})", snap.close, snap.date),
        format!(
            "SMA:        20={}  50={}  200={}",
            fmt_opt(snap.sma20, 2),
            fmt_opt(snap.sma50, 2),
            fmt_opt(snap.sma200, 2)
        ),
        format!("RSI(14):    {}", fmt_opt(snap.rsi14, 1)),
        format!(
            "MACD:       {}  signal={}  hist={}",
            fmt_opt(snap.macd, 3),
            fmt_opt(snap.macd_signal, 3),
            fmt_opt(snap.macd_histogram, 3)
        ),
        format!(
            "Bollinger:  {} / {}  width={}",
            fmt_opt(snap.bb_lower, 2),
            fmt_opt(snap.bb_upper, 2),
            fmt_opt(snap.bb_width, 4)
        ),
        format!(
            "HV:         20d={}  60d={}",
            fmt_opt(snap.hv20.map(|v| v * 100.0), 1),
            fmt_opt(snap.hv60.map(|v| v * 100.0), 1)
        ),
        format!(
            "Change:     1d={}%  5d={}%",
            fmt_opt(snap.day_change.map(|v| v * 100.0), 2),
            fmt_opt(snap.week_change.map(|v| v * 100.0), 2)
        ),
    ]
}

/// Prints the latest indicator snapshot and ranked recent signals per entity.
///
/// # Errors
/// Returns an error if the config or CSV cannot be read, or the requested
/// entity is not in the file.
pub fn run_indicators(args: &IndicatorsArgs) -> Result<()> {
    let config = ConfigLoader::load_from(&args.config)
        .with_context(|| format!("Failed to load config: {}", args.config))?;
    let raw = CsvStorage::read_layer(Path::new(&args.file), LayerKind::Prices)?;

    let normalizer = Normalizer::from_config(&config.ingestion);
    let (data, warnings) = normalizer.normalize_layer(&raw);
    for warning in &warnings {
        tracing::warn!(%warning, "data quality");
    }
    let LayerData::Prices(prices) = data else {
        bail!("{} is not a price file", args.file);
    };

    if let Some(entity) = &args.entity {
        if !prices.contains_key(entity) {
            bail!("Entity {entity} not found in {}", args.file);
        }
    }

    let detector = SignalDetector::new(config.signals.clone());
    for (entity, series) in &prices {
        if args.entity.as_ref().is_some_and(|e| e != entity) {
            continue;
        }
        let indicators = IndicatorSet::compute(series);
        let Some(snapshot) = indicators.snapshot() else {
            tracing::warn!(entity = %entity, "no closes");
            continue;
        };

        println!("\n{entity} ({} bars)", series.len());
        println!("{}", "=".repeat(48));
        for line in snapshot_lines(&snapshot) {
            println!("{line}");
        }

        let signals = rank_signals(detector.detect_recent(entity, &indicators));
        if signals.is_empty() {
            println!("Signals:    none");
        } else {
            println!("Signals:");
            for signal in signals {
                println!("  [{}] {}", signal.severity.as_str().to_uppercase(), signal.message);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn missing_values_print_as_na() {
        let snap = IndicatorSnapshot {
            date: NaiveDate::from_ymd_opt(2025, 7, 11).unwrap(),
            close: 452.25,
            volume: None,
            sma20: Some(448.1),
            sma50: None,
            sma200: None,
            rsi14: Some(61.37),
            macd: None,
            macd_signal: None,
            macd_histogram: None,
            bb_upper: None,
            bb_lower: None,
            bb_width: None,
            hv20: Some(0.183),
            hv60: None,
            day_change: Some(0.0123),
            week_change: None,
            volume_sma20: None,
        };

        let lines = snapshot_lines(&snap);
        assert_eq!(lines[0], "Close:      452.25 (2025-07-11)");
        assert_eq!(lines[1], "SMA:        20=448.10  50=n/a  200=n/a");
        assert_eq!(lines[2], "RSI(14):    61.4");
        assert_eq!(lines[5], "HV:         20d=18.3  60d=n/a");
        assert_eq!(lines[6], "Change:     1d=1.23%  5d=n/a%");
    }

    #[test]
    fn unknown_entity_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("prices.csv");
        std::fs::write(
            &file,
            "date,entity,open,high,low,close,volume\n2025-07-10,Corn,,,,450.5,\n",
        )
        .unwrap();

        let err = run_indicators(&IndicatorsArgs {
            file: file.display().to_string(),
            entity: Some("Wheat".to_string()),
            config: dir.path().join("absent.toml").display().to_string(),
        })
        .unwrap_err();
        assert!(err.to_string().contains("Wheat"));
    }
}
