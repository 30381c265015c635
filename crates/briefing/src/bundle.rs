//! Runs every analyzer over a merged dataset.
//!
//! The bundle is the only input to the Market-Drivers rules and the composer,
//! so neither ever touches a raw series.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use mirror_market_core::{AppConfig, SignalEvent, ValidationWarning};
use mirror_market_orchestrator::MarketDataset;
use mirror_market_signals::analysis::{
    analyze_crush, analyze_curve, currency_move, current_vs_seasonal, economic_reading,
    flat_price, return_correlation, summarize_export_sales, summarize_positioning,
    weather_alerts, yield_curve, CorrelationMatrix, CrushAnalysis, CurrencyMove, CurveAnalysis,
    EconomicReading, ExportSalesSummary, PositioningSummary, SeasonalComparison, WeatherAlert,
    YieldCurve,
};
use mirror_market_signals::{rank_signals, IndicatorSet, IndicatorSnapshot, SignalDetector};
use serde::Serialize;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrencyCorrelation {
    pub commodity: String,
    pub currency: String,
    pub note: String,
    pub r: f64,
}

/// Every analyzer output for one composition.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalysisBundle {
    /// Latest price date across all commodities.
    pub as_of: Option<NaiveDate>,
    pub technicals: BTreeMap<String, IndicatorSnapshot>,
    /// Recent signals of all commodities, in presentation order.
    pub signals: Vec<SignalEvent>,
    pub crush: Option<CrushAnalysis>,
    pub economic: Vec<EconomicReading>,
    pub yield_curve: Option<YieldCurve>,
    /// Latest reported week per commodity.
    pub export_sales: BTreeMap<String, ExportSalesSummary>,
    pub curves: BTreeMap<String, CurveAnalysis>,
    pub currencies: BTreeMap<String, CurrencyMove>,
    pub positioning: BTreeMap<String, PositioningSummary>,
    pub weather_alerts: Vec<WeatherAlert>,
    pub correlations: CorrelationMatrix,
    pub currency_correlations: Vec<CurrencyCorrelation>,
    pub seasonal: BTreeMap<String, SeasonalComparison>,
    /// Data-health findings on the cleaned series.
    pub health: Vec<ValidationWarning>,
}

impl AnalysisBundle {
    #[must_use]
    pub fn build(dataset: &MarketDataset, config: &AppConfig) -> Self {
        let analysis = &config.analysis;
        let detector = SignalDetector::new(config.signals.clone());
        let mut bundle = Self::default();

        let mut signals = Vec::new();
        for (entity, series) in &dataset.prices {
            let indicators = IndicatorSet::compute(series);
            let Some(snapshot) = indicators.snapshot() else {
                debug!(entity = %entity, "no closes, skipping technicals");
                continue;
            };
            bundle.as_of = bundle.as_of.max(Some(snapshot.date));
            bundle.technicals.insert(entity.clone(), snapshot);
            signals.extend(detector.detect_recent(entity, &indicators));

            let closes = series.close_points();
            if let Some(cmp) = current_vs_seasonal(&closes) {
                bundle.seasonal.insert(entity.clone(), cmp);
            }
            bundle
                .health
                .extend(flat_price(entity, series, analysis.flat_price_bars));
        }
        bundle.signals = rank_signals(signals);

        if let (Some(beans), Some(oil), Some(meal)) = (
            dataset.prices.get(&analysis.crush_beans),
            dataset.prices.get(&analysis.crush_oil),
            dataset.prices.get(&analysis.crush_meal),
        ) {
            bundle.crush = analyze_crush(beans, oil, meal, analysis.crush_trend_window);
        }

        bundle.economic = dataset
            .economic
            .iter()
            .filter_map(|(name, series)| economic_reading(name, series))
            .collect();
        if let (Some(short), Some(long)) = (
            dataset.economic.get(&analysis.yield_short_series),
            dataset.economic.get(&analysis.yield_long_series),
        ) {
            bundle.yield_curve = yield_curve(short, long, analysis.yield_flat_threshold);
        }

        bundle.export_sales = dataset
            .export_sales
            .iter()
            .filter_map(|(commodity, rows)| {
                Some((commodity.clone(), summarize_export_sales(rows)?))
            })
            .collect();

        bundle.curves = dataset
            .curves
            .iter()
            .filter_map(|(commodity, points)| Some((commodity.clone(), analyze_curve(points)?)))
            .collect();

        bundle.currencies = dataset
            .currencies
            .iter()
            .filter_map(|(pair, series)| {
                Some((pair.clone(), currency_move(pair, series, analysis.currency_window)?))
            })
            .collect();

        bundle.positioning = dataset
            .positioning
            .iter()
            .filter_map(|(commodity, series)| {
                Some((commodity.clone(), summarize_positioning(series)?))
            })
            .collect();

        bundle.weather_alerts = weather_alerts(&dataset.weather, &config.weather);

        let closes: BTreeMap<String, Vec<(NaiveDate, f64)>> = dataset
            .prices
            .iter()
            .map(|(entity, series)| (entity.clone(), series.close_points()))
            .collect();
        bundle.correlations = CorrelationMatrix::compute(
            &closes,
            analysis.correlation_window,
            analysis.correlation_min_samples,
        );
        bundle.currency_correlations = analysis
            .currency_pairs
            .iter()
            .filter_map(|pair| {
                let commodity = closes.get(&pair.commodity)?;
                let currency = dataset.currencies.get(&pair.currency)?.points();
                let r = return_correlation(
                    commodity,
                    &currency,
                    analysis.correlation_window,
                    analysis.correlation_min_samples,
                )?;
                Some(CurrencyCorrelation {
                    commodity: pair.commodity.clone(),
                    currency: pair.currency.clone(),
                    note: pair.note.clone(),
                    r,
                })
            })
            .collect();

        info!(
            commodities = bundle.technicals.len(),
            signals = bundle.signals.len(),
            curves = bundle.curves.len(),
            export_sales = bundle.export_sales.len(),
            weather_alerts = bundle.weather_alerts.len(),
            "analysis complete"
        );
        bundle
    }

    /// Weekly close change of a commodity, in percent.
    #[must_use]
    pub fn week_change_pct(&self, commodity: &str) -> Option<f64> {
        self.technicals
            .get(commodity)?
            .week_change
            .map(|c| c * 100.0)
    }

    #[must_use]
    pub fn economic(&self, series: &str) -> Option<&EconomicReading> {
        self.economic.iter().find(|r| r.series == series)
    }
}
