use std::collections::HashSet;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::layer::LayerKind;

/// Static configuration, read once at startup and passed by reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub ingestion: IngestionConfig,
    pub signals: SignalConfig,
    pub analysis: AnalysisConfig,
    pub weather: WeatherThresholds,
    pub freshness: FreshnessConfig,
    pub drivers: DriverConfig,
    pub storage: StorageConfig,
    pub layers: Vec<LayerConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    /// Layers fetched at once; 1 runs them sequentially.
    pub max_concurrency: usize,
    pub fetch_timeout_secs: u64,
    /// Longest run of incomplete records that is forward-filled.
    pub max_fill_gap_days: usize,
    /// Fractional one-bar close change that raises a large-move warning.
    pub large_move_threshold: Decimal,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 1,
            fetch_timeout_secs: 30,
            max_fill_gap_days: 5,
            large_move_threshold: dec!(0.10),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    pub rsi_overbought: f64,
    pub rsi_oversold: f64,
    pub rsi_severe_overbought: f64,
    pub rsi_severe_oversold: f64,
    pub volume_spike_multiplier: f64,
    pub divergence_lookback: usize,
    pub divergence_rsi_margin: f64,
    pub squeeze_window: usize,
    /// Fraction above the trailing minimum bandwidth still counted as a squeeze.
    pub squeeze_tolerance: f64,
    /// Days before each entity's latest date whose signals are reported.
    pub signal_window_days: i64,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            rsi_overbought: 70.0,
            rsi_oversold: 30.0,
            rsi_severe_overbought: 80.0,
            rsi_severe_oversold: 20.0,
            volume_spike_multiplier: 2.0,
            divergence_lookback: 20,
            divergence_rsi_margin: 5.0,
            squeeze_window: 120,
            squeeze_tolerance: 0.0,
            signal_window_days: 0,
        }
    }
}

/// Commodity-vs-currency pair tracked in the correlation section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrelationPair {
    pub commodity: String,
    pub currency: String,
    #[serde(default)]
    pub note: String,
}

impl CorrelationPair {
    fn new(commodity: &str, currency: &str, note: &str) -> Self {
        Self {
            commodity: commodity.to_string(),
            currency: currency.to_string(),
            note: note.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub crush_beans: String,
    pub crush_oil: String,
    pub crush_meal: String,
    pub crush_trend_window: usize,
    pub correlation_window: usize,
    pub correlation_min_samples: usize,
    pub notable_correlation: f64,
    pub strong_correlation: f64,
    pub currency_pairs: Vec<CorrelationPair>,
    /// Bars used for currency weekly moves.
    pub currency_window: usize,
    pub yield_short_series: String,
    pub yield_long_series: String,
    pub yield_flat_threshold: f64,
    /// Identical closes in a row before a price is flagged as flat.
    pub flat_price_bars: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            crush_beans: "Soybeans".to_string(),
            crush_oil: "Soybean Oil".to_string(),
            crush_meal: "Soybean Meal".to_string(),
            crush_trend_window: 5,
            correlation_window: 60,
            correlation_min_samples: 30,
            notable_correlation: 0.5,
            strong_correlation: 0.7,
            currency_pairs: vec![
                CorrelationPair::new("Soybeans", "BRL/USD", "BRL weakening makes Brazil soy cheaper"),
                CorrelationPair::new("Coffee", "COP/USD", "COP weakening makes Colombia coffee cheaper"),
                CorrelationPair::new("Coffee", "BRL/USD", "BRL weakening makes Brazil coffee cheaper"),
            ],
            currency_window: 5,
            yield_short_series: "Treasury 2Y".to_string(),
            yield_long_series: "Treasury 10Y".to_string(),
            yield_flat_threshold: 0.5,
            flat_price_bars: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherThresholds {
    pub heavy_rain_mm: f64,
    pub dry_mm: f64,
    pub extreme_heat_c: f64,
}

impl Default for WeatherThresholds {
    fn default() -> Self {
        Self {
            heavy_rain_mm: 20.0,
            dry_mm: 1.0,
            extreme_heat_c: 38.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FreshnessConfig {
    pub staleness_warning_days: i64,
}

impl Default for FreshnessConfig {
    fn default() -> Self {
        Self {
            staleness_warning_days: 7,
        }
    }
}

/// Thresholds for the Market Drivers rules. Percentages are in percent units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    pub export_currency: String,
    pub currency_move_pct: f64,
    /// Speculative-net percentile a long must reach (a short must stay
    /// below 100 minus this) before a crowded-trade insight fires.
    pub crowded_percentile: f64,
    pub weather_commodities: Vec<String>,
    pub weather_price_move_pct: f64,
    pub weather_max_regions: usize,
    pub acreage_corn: String,
    pub acreage_soy: String,
    pub acreage_gap_pct: f64,
    pub livestock: Vec<String>,
    pub livestock_move_pct: f64,
    pub curve_commodities: Vec<String>,
    pub steep_contango_pct: f64,
    pub china_commodities: Vec<String>,
    /// Share of a week's net sales, in percent, that China must exceed.
    pub china_share_pct: f64,
    pub dollar_series: String,
    pub dollar_move_pct: f64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            export_currency: "BRL/USD".to_string(),
            currency_move_pct: 1.0,
            crowded_percentile: 0.0,
            weather_commodities: vec!["Soybeans".to_string(), "Coffee".to_string()],
            weather_price_move_pct: 1.0,
            weather_max_regions: 3,
            acreage_corn: "Corn".to_string(),
            acreage_soy: "Soybeans".to_string(),
            acreage_gap_pct: 3.0,
            livestock: vec!["Live Cattle".to_string(), "Lean Hogs".to_string()],
            livestock_move_pct: 3.0,
            curve_commodities: vec![
                "Soybeans".to_string(),
                "Corn".to_string(),
                "Wheat".to_string(),
            ],
            steep_contango_pct: 5.0,
            china_commodities: vec![
                "Soybeans".to_string(),
                "Corn".to_string(),
                "Wheat".to_string(),
            ],
            china_share_pct: 30.0,
            dollar_series: "US Dollar Index".to_string(),
            dollar_move_pct: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub freshness_path: String,
    pub sources_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            freshness_path: "data/freshness.json".to_string(),
            sources_dir: "data/sources".to_string(),
        }
    }
}

/// One configured source layer backed by a file under `storage.sources_dir`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerConfig {
    pub name: String,
    pub kind: LayerKind,
    pub file: String,
    #[serde(default)]
    pub required_credential: Option<String>,
}

impl AppConfig {
    /// Checks thresholds and the layer list.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` for the first malformed entry found.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let s = &self.signals;
        if !(0.0 < s.rsi_oversold && s.rsi_oversold < s.rsi_overbought && s.rsi_overbought < 100.0) {
            return Err(ConfigurationError::threshold(
                "signals.rsi_oversold/rsi_overbought",
                "must satisfy 0 < oversold < overbought < 100",
            ));
        }
        if s.rsi_severe_overbought < s.rsi_overbought || s.rsi_severe_oversold > s.rsi_oversold {
            return Err(ConfigurationError::threshold(
                "signals.rsi_severe_*",
                "severe levels must lie beyond the normal levels",
            ));
        }
        if s.volume_spike_multiplier <= 0.0 {
            return Err(ConfigurationError::threshold(
                "signals.volume_spike_multiplier",
                "must be positive",
            ));
        }
        if s.divergence_lookback == 0 || s.squeeze_window < 2 {
            return Err(ConfigurationError::threshold(
                "signals.divergence_lookback/squeeze_window",
                "windows must be non-empty",
            ));
        }
        if s.signal_window_days < 0 || s.squeeze_tolerance < 0.0 {
            return Err(ConfigurationError::threshold(
                "signals.signal_window_days/squeeze_tolerance",
                "must not be negative",
            ));
        }

        let a = &self.analysis;
        if a.crush_trend_window == 0 || a.currency_window == 0 || a.flat_price_bars < 2 {
            return Err(ConfigurationError::threshold(
                "analysis windows",
                "crush/currency windows must be positive and flat_price_bars at least 2",
            ));
        }
        if a.correlation_window < 2 || a.correlation_min_samples < 2 {
            return Err(ConfigurationError::threshold(
                "analysis.correlation_window/correlation_min_samples",
                "need at least 2 samples",
            ));
        }
        if !(0.0..=1.0).contains(&a.notable_correlation) || a.strong_correlation < a.notable_correlation {
            return Err(ConfigurationError::threshold(
                "analysis.notable_correlation/strong_correlation",
                "must satisfy 0 <= notable <= strong",
            ));
        }

        if self.weather.dry_mm < 0.0 || self.weather.heavy_rain_mm <= self.weather.dry_mm {
            return Err(ConfigurationError::threshold(
                "weather.heavy_rain_mm/dry_mm",
                "must satisfy 0 <= dry < heavy rain",
            ));
        }
        if !(0.0..=100.0).contains(&self.drivers.crowded_percentile) {
            return Err(ConfigurationError::threshold(
                "drivers.crowded_percentile",
                "must lie within 0..=100",
            ));
        }
        if !(0.0..100.0).contains(&self.drivers.china_share_pct) {
            return Err(ConfigurationError::threshold(
                "drivers.china_share_pct",
                "must lie within 0..100",
            ));
        }
        if self.freshness.staleness_warning_days < 0 {
            return Err(ConfigurationError::threshold(
                "freshness.staleness_warning_days",
                "must not be negative",
            ));
        }

        let i = &self.ingestion;
        if i.max_concurrency == 0 || i.fetch_timeout_secs == 0 {
            return Err(ConfigurationError::threshold(
                "ingestion.max_concurrency/fetch_timeout_secs",
                "must be positive",
            ));
        }
        if i.large_move_threshold <= Decimal::ZERO {
            return Err(ConfigurationError::threshold(
                "ingestion.large_move_threshold",
                "must be positive",
            ));
        }

        let mut seen = HashSet::new();
        for layer in &self.layers {
            if layer.name.trim().is_empty() {
                return Err(ConfigurationError::EmptyLayerName);
            }
            if !seen.insert(layer.name.as_str()) {
                return Err(ConfigurationError::DuplicateLayer(layer.name.clone()));
            }
        }

        Ok(())
    }

    /// Names of every configured layer, in configuration order.
    #[must_use]
    pub fn layer_names(&self) -> Vec<String> {
        self.layers.iter().map(|l| l.name.clone()).collect()
    }
}
