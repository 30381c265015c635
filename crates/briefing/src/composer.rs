//! Briefing Composer.
//!
//! Sections always come out in the same order regardless of which layers
//! arrived. A section whose inputs are missing is left out; MARKET DRIVERS and
//! SIGNALS always render.

use chrono::{DateTime, Utc};
use mirror_market_core::{
    AppConfig, DriverInsight, FreshnessRecord, LayerStaleness, Severity, ValidationWarning,
};
use mirror_market_signals::analysis::{CrushTrend, Strength};
use mirror_market_signals::IndicatorSnapshot;
use rust_decimal::Decimal;
use tracing::info;

use crate::bundle::AnalysisBundle;
use crate::drivers::{default_rules, evaluate_drivers, DriverRule};
use crate::report::{self, BriefingReport, Section};

const MAX_QUALITY_LINES: usize = 10;

pub struct BriefingComposer {
    config: AppConfig,
    rules: Vec<Box<dyn DriverRule>>,
}

impl BriefingComposer {
    #[must_use]
    pub fn new(config: AppConfig) -> Self {
        let rules = default_rules(&config);
        Self { config, rules }
    }

    /// Replaces the Market-Drivers rule set.
    #[must_use]
    pub fn with_rules(mut self, rules: Vec<Box<dyn DriverRule>>) -> Self {
        self.rules = rules;
        self
    }

    #[must_use]
    pub fn compose(
        &self,
        bundle: &AnalysisBundle,
        freshness: &FreshnessRecord,
        warnings: &[ValidationWarning],
        now: DateTime<Utc>,
    ) -> BriefingReport {
        let drivers = evaluate_drivers(&self.rules, bundle);

        let sections: Vec<Section> = [
            self.freshness_section(freshness, now),
            quality_section(warnings, &bundle.health),
            prices_section(bundle, &self.config),
            crush_section(bundle),
            economic_section(bundle, &self.config.drivers.dollar_series),
            yield_curve_section(bundle),
            export_sales_section(bundle),
            forward_curve_section(bundle),
            currencies_section(bundle),
            positioning_section(bundle),
            weather_section(bundle),
            correlations_section(bundle, &self.config),
            seasonal_section(bundle),
            Some(drivers_section(&drivers)),
            Some(signals_section(bundle)),
        ]
        .into_iter()
        .flatten()
        .collect();

        info!(
            sections = sections.len(),
            drivers = drivers.len(),
            signals = bundle.signals.len(),
            "briefing composed"
        );
        let header = format!(
            "=== Mirror Market Daily Briefing - {} ===",
            now.format("%Y-%m-%d")
        );
        BriefingReport::new(header, sections)
    }

    fn freshness_section(&self, freshness: &FreshnessRecord, now: DateTime<Utc>) -> Option<Section> {
        let stale = freshness.stale_layers(
            &self.config.layer_names(),
            now,
            self.config.freshness.staleness_warning_days,
        );
        let lines: Vec<String> = stale
            .iter()
            .map(|s| match s {
                LayerStaleness::Stale { layer, age_days } => {
                    format!("WARNING: {layer} data is {age_days} days old")
                }
                LayerStaleness::NeverSucceeded { layer } => {
                    format!("WARNING: {layer} never succeeded")
                }
            })
            .collect();
        non_empty(report::FRESHNESS_WARNINGS, lines)
    }
}

fn non_empty(title: &'static str, lines: Vec<String>) -> Option<Section> {
    (!lines.is_empty()).then(|| Section::new(title, lines))
}

fn quality_section(ingestion: &[ValidationWarning], health: &[ValidationWarning]) -> Option<Section> {
    let all: Vec<&ValidationWarning> = ingestion.iter().chain(health).collect();
    let mut lines: Vec<String> = all
        .iter()
        .take(MAX_QUALITY_LINES)
        .map(ToString::to_string)
        .collect();
    if all.len() > MAX_QUALITY_LINES {
        lines.push(format!("... and {} more", all.len() - MAX_QUALITY_LINES));
    }
    non_empty(report::DATA_QUALITY, lines)
}

fn describe_technicals(snap: &IndicatorSnapshot, config: &AppConfig) -> String {
    let mut parts = vec![format!("{:.2}", snap.close)];
    if let Some(day) = snap.day_change {
        parts.push(format!("({:+.1}%)", day * 100.0));
    }
    if let Some(ma200) = snap.sma200 {
        let side = if snap.close > ma200 { "Above" } else { "Below" };
        parts.push(format!("{side} 200-day MA"));
    } else if let Some(ma50) = snap.sma50 {
        let side = if snap.close > ma50 { "Above" } else { "Below" };
        parts.push(format!("{side} 50-day MA"));
    }
    if let Some(rsi) = snap.rsi14 {
        if rsi > config.signals.rsi_overbought {
            parts.push(format!("RSI {rsi:.0} (overbought)"));
        } else if rsi < config.signals.rsi_oversold {
            parts.push(format!("RSI {rsi:.0} (oversold)"));
        }
    }
    if let Some(hist) = snap.macd_histogram {
        parts.push(format!("MACD {}", if hist > 0.0 { "positive" } else { "negative" }));
    }
    if let Some(hv) = snap.hv20 {
        parts.push(format!("Vol {:.0}%", hv * 100.0));
    }
    parts.join("  ")
}

fn prices_section(bundle: &AnalysisBundle, config: &AppConfig) -> Option<Section> {
    let lines = bundle
        .technicals
        .iter()
        .map(|(commodity, snap)| {
            format!("{:<16} {}", format!("{commodity}:"), describe_technicals(snap, config))
        })
        .collect();
    non_empty(report::PRICES, lines)
}

fn crush_section(bundle: &AnalysisBundle) -> Option<Section> {
    let crush = bundle.crush.as_ref()?;
    let dollars = crush.latest.spread / Decimal::ONE_HUNDRED;
    let line = match crush.trend {
        Some(trend) => {
            let trend = match trend {
                CrushTrend::Widening => "widening",
                CrushTrend::Narrowing => "narrowing",
                CrushTrend::Unchanged => "unchanged",
            };
            format!("${dollars:.2}/bu ({trend}, {})", crush.margin_label())
        }
        None => format!("${dollars:.2}/bu ({})", crush.margin_label()),
    };
    Some(Section::new(report::CRUSH_SPREAD, vec![line]))
}

fn economic_section(bundle: &AnalysisBundle, dollar_series: &str) -> Option<Section> {
    let lines = bundle
        .economic
        .iter()
        .map(|r| {
            let comment = match (r.direction(), r.change_pct) {
                (Some(direction), Some(pct)) if r.series == dollar_series => {
                    let impact = if direction == "up" { "headwind" } else { "tailwind" };
                    format!(" ({direction} {:.1}%, {impact} for commodities)", pct.abs())
                }
                (Some(direction), Some(pct)) => format!(" ({direction} {:.1}%)", pct.abs()),
                _ => String::new(),
            };
            format!("{}: {:.2}{comment}", r.series, r.latest)
        })
        .collect();
    non_empty(report::ECONOMIC_CONTEXT, lines)
}

fn yield_curve_section(bundle: &AnalysisBundle) -> Option<Section> {
    let curve = bundle.yield_curve?;
    Some(Section::new(
        report::YIELD_CURVE,
        vec![format!(
            "2Y: {:.2}%  |  10Y: {:.2}%  |  Spread: {:+.2}% ({})",
            curve.short_rate, curve.long_rate, curve.spread, curve.shape
        )],
    ))
}

fn export_sales_section(bundle: &AnalysisBundle) -> Option<Section> {
    let lines = bundle
        .export_sales
        .iter()
        .map(|(commodity, sales)| {
            format!(
                "{commodity} (w/e {}): {}",
                sales.week_ending.format("%m/%d"),
                sales.describe()
            )
        })
        .collect();
    non_empty(report::EXPORT_SALES, lines)
}

fn forward_curve_section(bundle: &AnalysisBundle) -> Option<Section> {
    let lines = bundle
        .curves
        .iter()
        .map(|(commodity, curve)| format!("{commodity}: {}", curve.summary()))
        .collect();
    non_empty(report::FORWARD_CURVE, lines)
}

fn currencies_section(bundle: &AnalysisBundle) -> Option<Section> {
    let lines = bundle
        .currencies
        .values()
        .map(|mv| match mv.change_pct {
            Some(pct) => {
                let code = mv.pair.split('/').next().unwrap_or(mv.pair.as_str());
                let direction = if pct < 0.0 { "weakening" } else { "strengthening" };
                format!("{}: {:.4} ({pct:+.1}% this week, {code} {direction})", mv.pair, mv.latest)
            }
            None => format!("{}: {:.4}", mv.pair, mv.latest),
        })
        .collect();
    non_empty(report::CURRENCIES, lines)
}

fn positioning_section(bundle: &AnalysisBundle) -> Option<Section> {
    let lines = bundle
        .positioning
        .iter()
        .map(|(commodity, pos)| format!("{commodity}: {}", pos.describe()))
        .collect();
    non_empty(report::POSITIONING, lines)
}

fn weather_section(bundle: &AnalysisBundle) -> Option<Section> {
    let lines = bundle
        .weather_alerts
        .iter()
        .map(|a| format!("{}: {}", a.region, a.kind))
        .collect();
    non_empty(report::WEATHER_ALERTS, lines)
}

fn correlations_section(bundle: &AnalysisBundle, config: &AppConfig) -> Option<Section> {
    let analysis = &config.analysis;
    let mut lines = Vec::new();

    let pairs = bundle.correlations.notable_pairs(analysis.notable_correlation);
    if !pairs.is_empty() {
        lines.push("Cross-commodity (returns):".to_string());
        for pair in pairs {
            let strength = Strength::of(pair.r, analysis.notable_correlation, analysis.strong_correlation);
            let direction = if pair.r > 0.0 { "positive" } else { "negative" };
            lines.push(format!(
                "  {} vs {}: {:.2} ({} {direction})",
                pair.a,
                pair.b,
                pair.r,
                strength.as_str()
            ));
        }
    }
    if !bundle.currency_correlations.is_empty() {
        lines.push("Commodity-currency:".to_string());
        for c in &bundle.currency_correlations {
            lines.push(format!("  {} vs {}: {:.2} ({})", c.commodity, c.currency, c.r, c.note));
        }
    }
    non_empty(report::CORRELATIONS, lines)
}

fn seasonal_section(bundle: &AnalysisBundle) -> Option<Section> {
    let lines = bundle
        .seasonal
        .iter()
        .map(|(commodity, cmp)| {
            format!("{commodity}: {} vs {}-year average", cmp.assessment(), cmp.years)
        })
        .collect();
    non_empty(report::SEASONAL, lines)
}

fn drivers_section(drivers: &[DriverInsight]) -> Section {
    let lines = if drivers.is_empty() {
        vec!["No cross-market signals detected this session".to_string()]
    } else {
        drivers
            .iter()
            .enumerate()
            .map(|(i, d)| format!("{}. {}", i + 1, d.message))
            .collect()
    };
    Section::new(report::MARKET_DRIVERS, lines)
}

fn signals_section(bundle: &AnalysisBundle) -> Section {
    let lines = if bundle.signals.is_empty() {
        vec!["No active signals".to_string()]
    } else {
        bundle
            .signals
            .iter()
            .map(|s| {
                let tag = format!("[{}]", s.severity.as_str().to_uppercase());
                format!("{tag:<10} {}", s.message)
            })
            .collect()
    };
    Section::new(report::SIGNALS, lines)
}

/// Highest severity present, for callers that want a one-word status.
#[must_use]
pub fn top_severity(bundle: &AnalysisBundle) -> Option<Severity> {
    bundle.signals.iter().map(|s| s.severity).max()
}
