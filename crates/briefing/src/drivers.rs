//! Market Drivers: cross-source rules that connect two or more analytics into
//! one narrative insight.
//!
//! Rules read only the [`AnalysisBundle`] and never each other's output, so a
//! rule firing or not has no effect on any other rule.

use mirror_market_core::{AppConfig, CorrelationPair, DriverConfig, DriverInsight};
use mirror_market_signals::analysis::{tons, CurveStructure};
use rust_decimal::Decimal;
use tracing::debug;

use crate::bundle::AnalysisBundle;

pub trait DriverRule: Send + Sync {
    fn id(&self) -> &'static str;

    /// Insights produced by this rule; empty when its condition does not hold.
    fn evaluate(&self, bundle: &AnalysisBundle) -> Vec<DriverInsight>;
}

/// The standard rule set, in presentation order.
#[must_use]
pub fn default_rules(config: &AppConfig) -> Vec<Box<dyn DriverRule>> {
    let drivers = &config.drivers;
    vec![
        Box::new(CurrencyExport {
            config: drivers.clone(),
            pairs: config.analysis.currency_pairs.clone(),
        }),
        Box::new(CrowdedPositioning {
            overbought: config.signals.rsi_overbought,
            oversold: config.signals.rsi_oversold,
            percentile: drivers.crowded_percentile,
        }),
        Box::new(WeatherPremium(drivers.clone())),
        Box::new(AcreageCompetition(drivers.clone())),
        Box::new(LivestockDemand(drivers.clone())),
        Box::new(ChinaDemand(drivers.clone())),
        Box::new(CurveStructureDriver(drivers.clone())),
        Box::new(DollarStrength(drivers.clone())),
    ]
}

/// Evaluates every rule in order and concatenates their insights.
#[must_use]
pub fn evaluate_drivers(rules: &[Box<dyn DriverRule>], bundle: &AnalysisBundle) -> Vec<DriverInsight> {
    rules
        .iter()
        .flat_map(|rule| {
            let insights = rule.evaluate(bundle);
            debug!(rule = rule.id(), fired = insights.len(), "driver rule evaluated");
            insights
        })
        .collect()
}

// ============================================
// Rules
// ============================================

/// A move in an exporter's currency shifts the competitiveness of that
/// country's commodities.
pub struct CurrencyExport {
    config: DriverConfig,
    pairs: Vec<CorrelationPair>,
}

impl DriverRule for CurrencyExport {
    fn id(&self) -> &'static str {
        "currency_export"
    }

    fn evaluate(&self, bundle: &AnalysisBundle) -> Vec<DriverInsight> {
        let pair = &self.config.export_currency;
        let Some(change) = bundle.currencies.get(pair).and_then(|m| m.change_pct) else {
            return Vec::new();
        };
        let exports: Vec<&str> = self
            .pairs
            .iter()
            .filter(|p| &p.currency == pair && bundle.technicals.contains_key(&p.commodity))
            .map(|p| p.commodity.as_str())
            .collect();
        if exports.is_empty() {
            return Vec::new();
        }

        let code = pair.split('/').next().unwrap_or(pair);
        let goods = exports.join("/");
        let message = if change < -self.config.currency_move_pct {
            format!(
                "{code} export competitiveness improving: {code} weakened {:.1}% this week, \
                 making {goods} cheaper on world markets",
                change.abs()
            )
        } else if change > self.config.currency_move_pct {
            format!(
                "{code} export competitiveness declining: {code} strengthened {change:.1}% this week, \
                 {goods} exports getting more expensive"
            )
        } else {
            return Vec::new();
        };
        vec![DriverInsight::new(self.id(), message).with_value("change_pct", change)]
    }
}

/// Speculators heavily positioned in the direction of an RSI extreme.
pub struct CrowdedPositioning {
    overbought: f64,
    oversold: f64,
    /// Minimum percentile rank of the speculative net (mirrored for shorts).
    percentile: f64,
}

impl DriverRule for CrowdedPositioning {
    fn id(&self) -> &'static str {
        "crowded_positioning"
    }

    fn evaluate(&self, bundle: &AnalysisBundle) -> Vec<DriverInsight> {
        bundle
            .positioning
            .iter()
            .filter_map(|(commodity, pos)| {
                let rsi = bundle.technicals.get(commodity)?.rsi14?;
                let net = pos.speculative_net;
                let message = if net > 0
                    && rsi > self.overbought
                    && pos.speculative_percentile >= self.percentile
                {
                    format!(
                        "Crowded long in {commodity}: Specs net long {net} contracts AND RSI at \
                         {rsi:.0}, reversal risk elevated"
                    )
                } else if net < 0
                    && rsi < self.oversold
                    && pos.speculative_percentile <= 100.0 - self.percentile
                {
                    format!(
                        "Crowded short in {commodity}: Specs net short {} contracts AND RSI at \
                         {rsi:.0}, short squeeze risk",
                        net.unsigned_abs()
                    )
                } else {
                    return None;
                };
                Some(
                    DriverInsight::new(self.id(), message)
                        .with_value("speculative_net", net as f64)
                        .with_value("rsi", rsi)
                        .with_value("percentile", pos.speculative_percentile),
                )
            })
            .collect()
    }
}

/// Price-relevant weather alerts while a weather-sensitive crop rallies.
pub struct WeatherPremium(DriverConfig);

impl DriverRule for WeatherPremium {
    fn id(&self) -> &'static str {
        "weather_premium"
    }

    fn evaluate(&self, bundle: &AnalysisBundle) -> Vec<DriverInsight> {
        let mut regions: Vec<&str> = Vec::new();
        for alert in bundle.weather_alerts.iter().filter(|a| a.kind.is_price_relevant()) {
            if !regions.contains(&alert.region.as_str()) {
                regions.push(&alert.region);
            }
        }
        if regions.is_empty() {
            return Vec::new();
        }
        let shown = regions
            .iter()
            .take(self.0.weather_max_regions)
            .copied()
            .collect::<Vec<_>>()
            .join(", ");

        self.0
            .weather_commodities
            .iter()
            .filter_map(|commodity| {
                let weekly = bundle.week_change_pct(commodity)?;
                (weekly > self.0.weather_price_move_pct).then(|| {
                    DriverInsight::new(
                        self.id(),
                        format!(
                            "Weather premium building in {commodity}: price up {weekly:.1}% this \
                             week with active weather alerts in {shown}"
                        ),
                    )
                    .with_value("week_change_pct", weekly)
                    .with_value("alert_regions", regions.len() as f64)
                })
            })
            .collect()
    }
}

/// Relative corn/soy performance hints at next season's planting mix.
pub struct AcreageCompetition(DriverConfig);

impl DriverRule for AcreageCompetition {
    fn id(&self) -> &'static str {
        "acreage_competition"
    }

    fn evaluate(&self, bundle: &AnalysisBundle) -> Vec<DriverInsight> {
        let (corn_name, soy_name) = (&self.0.acreage_corn, &self.0.acreage_soy);
        let (Some(corn), Some(soy)) = (
            bundle.week_change_pct(corn_name),
            bundle.week_change_pct(soy_name),
        ) else {
            return Vec::new();
        };

        let message = if corn - soy > self.0.acreage_gap_pct {
            format!(
                "{corn_name} outperforming {soy_name} ({corn:+.1}% vs {soy:+.1}% this week): if \
                 sustained, farmers may shift acreage to {corn_name} next planting season"
            )
        } else if soy - corn > self.0.acreage_gap_pct {
            format!(
                "{soy_name} outperforming {corn_name} ({soy:+.1}% vs {corn:+.1}% this week): \
                 {soy_name} acreage may expand next season"
            )
        } else {
            return Vec::new();
        };
        vec![DriverInsight::new(self.id(), message)
            .with_value("corn_week_pct", corn)
            .with_value("soy_week_pct", soy)]
    }
}

/// Rising livestock prices mean growing herds and more meal demand.
pub struct LivestockDemand(DriverConfig);

impl DriverRule for LivestockDemand {
    fn id(&self) -> &'static str {
        "livestock_meal_demand"
    }

    fn evaluate(&self, bundle: &AnalysisBundle) -> Vec<DriverInsight> {
        self.0
            .livestock
            .iter()
            .filter_map(|animal| {
                let weekly = bundle.week_change_pct(animal)?;
                (weekly > self.0.livestock_move_pct).then(|| {
                    DriverInsight::new(
                        self.id(),
                        format!(
                            "{animal} prices rising ({weekly:+.1}% this week): expanding herds \
                             mean more soybean meal demand"
                        ),
                    )
                    .with_value("week_change_pct", weekly)
                })
            })
            .collect()
    }
}

/// China taking an outsized share of a week's export sales.
pub struct ChinaDemand(DriverConfig);

impl DriverRule for ChinaDemand {
    fn id(&self) -> &'static str {
        "china_demand"
    }

    fn evaluate(&self, bundle: &AnalysisBundle) -> Vec<DriverInsight> {
        self.0
            .china_commodities
            .iter()
            .filter_map(|commodity| {
                let sales = bundle.export_sales.get(commodity)?;
                let share = sales.china_share_pct?;
                if sales.china_net <= Decimal::ZERO || share <= self.0.china_share_pct {
                    return None;
                }
                Some(
                    DriverInsight::new(
                        self.id(),
                        format!(
                            "China buying pace strong for {commodity}: {} MT net sales ({share:.0}% \
                             of total), demand signal bullish",
                            tons(sales.china_net)
                        ),
                    )
                    .with_value("china_share_pct", share),
                )
            })
            .collect()
    }
}

/// Backwardated or steeply contangoed grain curves.
pub struct CurveStructureDriver(DriverConfig);

impl DriverRule for CurveStructureDriver {
    fn id(&self) -> &'static str {
        "curve_structure"
    }

    fn evaluate(&self, bundle: &AnalysisBundle) -> Vec<DriverInsight> {
        self.0
            .curve_commodities
            .iter()
            .filter_map(|commodity| {
                let curve = bundle.curves.get(commodity)?;
                let pct = curve.front_back.spread_pct?;
                let message = if curve.structure == CurveStructure::Backwardation {
                    format!(
                        "{commodity} in backwardation ({pct:+.1}%): market signals tight supply \
                         and strong nearby demand"
                    )
                } else if pct > self.0.steep_contango_pct {
                    format!(
                        "{commodity} in steep contango ({pct:+.1}%): market expects adequate \
                         supply, carrying costs elevated"
                    )
                } else {
                    return None;
                };
                Some(DriverInsight::new(self.id(), message).with_value("spread_pct", pct))
            })
            .collect()
    }
}

/// A moving dollar index works against or for USD-priced commodities.
pub struct DollarStrength(DriverConfig);

impl DriverRule for DollarStrength {
    fn id(&self) -> &'static str {
        "dollar_strength"
    }

    fn evaluate(&self, bundle: &AnalysisBundle) -> Vec<DriverInsight> {
        let Some(change) = bundle
            .economic(&self.0.dollar_series)
            .and_then(|r| r.change_pct)
        else {
            return Vec::new();
        };
        if change.abs() <= self.0.dollar_move_pct {
            return Vec::new();
        }
        let (direction, impact) = if change > 0.0 {
            ("strengthening", "headwind")
        } else {
            ("weakening", "tailwind")
        };
        vec![DriverInsight::new(
            self.id(),
            format!(
                "Dollar {direction} ({change:+.1}%): generally a {impact} for USD-denominated \
                 commodities"
            ),
        )
        .with_value("change_pct", change)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use mirror_market_signals::analysis::{
        Buyer, CurrencyMove, EconomicReading, ExportSalesSummary, PositioningSummary,
        WeatherAlert, WeatherAlertKind,
    };
    use rust_decimal::prelude::ToPrimitive;
    use rust_decimal_macros::dec;
    use mirror_market_signals::IndicatorSnapshot;

    fn snapshot(rsi: Option<f64>, week_change: Option<f64>) -> IndicatorSnapshot {
        IndicatorSnapshot {
            date: NaiveDate::from_ymd_opt(2025, 7, 11).unwrap(),
            close: 100.0,
            volume: None,
            sma20: None,
            sma50: None,
            sma200: None,
            rsi14: rsi,
            macd: None,
            macd_signal: None,
            macd_histogram: None,
            bb_upper: None,
            bb_lower: None,
            bb_width: None,
            hv20: None,
            hv60: None,
            day_change: None,
            week_change,
            volume_sma20: None,
        }
    }

    fn soybean_sales(china_net: Decimal, total: Decimal) -> ExportSalesSummary {
        ExportSalesSummary {
            week_ending: NaiveDate::from_ymd_opt(2025, 7, 10).unwrap(),
            net_sales: total,
            weekly_exports: dec!(0),
            top_buyers: vec![Buyer {
                country: "China".into(),
                net_sales: china_net,
            }],
            china_net,
            china_share_pct: (china_net / total * Decimal::ONE_HUNDRED).to_f64(),
        }
    }

    fn ids(insights: &[DriverInsight]) -> Vec<&str> {
        insights.iter().map(|i| i.rule_id.as_str()).collect()
    }

    fn bundle_with_everything_firing() -> AnalysisBundle {
        let mut bundle = AnalysisBundle::default();
        bundle
            .technicals
            .insert("Soybeans".into(), snapshot(Some(75.0), Some(0.02)));
        bundle
            .technicals
            .insert("Corn".into(), snapshot(Some(50.0), Some(0.06)));
        bundle
            .technicals
            .insert("Live Cattle".into(), snapshot(None, Some(0.04)));
        bundle.currencies.insert(
            "BRL/USD".into(),
            CurrencyMove {
                pair: "BRL/USD".into(),
                latest: 0.19,
                change_pct: Some(-2.0),
            },
        );
        bundle.positioning.insert(
            "Soybeans".into(),
            PositioningSummary {
                commercial_net: Some(-120_000),
                speculative_net: 150_000,
                speculative_percentile: 95.0,
                reports: 52,
            },
        );
        bundle.weather_alerts.push(WeatherAlert {
            region: "Mato Grosso".into(),
            date: NaiveDate::from_ymd_opt(2025, 7, 11).unwrap(),
            kind: WeatherAlertKind::HeavyRain {
                precipitation_mm: 42.0,
            },
        });
        bundle
            .export_sales
            .insert("Soybeans".into(), soybean_sales(dec!(512000), dec!(800000)));
        bundle.economic.push(EconomicReading {
            series: "US Dollar Index".into(),
            latest: 105.0,
            previous: Some(104.0),
            change_pct: Some(0.96),
        });
        bundle
    }

    #[test]
    fn rules_fire_in_fixed_order() {
        let rules = default_rules(&AppConfig::default());
        let insights = evaluate_drivers(&rules, &bundle_with_everything_firing());
        assert_eq!(
            ids(&insights),
            vec![
                "currency_export",
                "crowded_positioning",
                "weather_premium",
                "acreage_competition",
                "livestock_meal_demand",
                "china_demand",
                "dollar_strength",
            ]
        );
        assert!(insights[0].message.starts_with("BRL export competitiveness improving"));
        assert!(insights[2].message.contains("Mato Grosso"));
        assert!(insights[3].message.starts_with("Corn outperforming Soybeans"));
        assert_eq!(
            insights[5].message,
            "China buying pace strong for Soybeans: 512,000 MT net sales (64% of total), \
             demand signal bullish"
        );
    }

    #[test]
    fn china_share_at_or_below_threshold_is_quiet() {
        let rule = ChinaDemand(DriverConfig::default());
        let mut bundle = AnalysisBundle::default();
        bundle
            .export_sales
            .insert("Soybeans".into(), soybean_sales(dec!(240000), dec!(800000)));
        assert!(rule.evaluate(&bundle).is_empty());

        bundle
            .export_sales
            .insert("Soybeans".into(), soybean_sales(dec!(248000), dec!(800000)));
        assert_eq!(rule.evaluate(&bundle).len(), 1);

        bundle
            .export_sales
            .insert("Cotton".into(), soybean_sales(dec!(600000), dec!(800000)));
        assert_eq!(rule.evaluate(&bundle).len(), 1);
    }

    #[test]
    fn a_rule_firing_does_not_change_another_rule() {
        let config = AppConfig::default();
        let rules = default_rules(&config);
        let full = bundle_with_everything_firing();
        let mut quiet = full.clone();
        quiet.currencies.clear();
        quiet.economic.clear();

        let all = evaluate_drivers(&rules, &full);
        let fewer = evaluate_drivers(&rules, &quiet);
        let survivors: Vec<_> = all
            .iter()
            .filter(|i| i.rule_id != "currency_export" && i.rule_id != "dollar_strength")
            .cloned()
            .collect();
        assert_eq!(fewer, survivors);

        for rule in &rules {
            let alone = rule.evaluate(&full);
            let in_set: Vec<_> = all.iter().filter(|i| i.rule_id == rule.id()).cloned().collect();
            assert_eq!(alone, in_set, "rule {}", rule.id());
        }
    }

    #[test]
    fn crowded_percentile_gate() {
        let rule = CrowdedPositioning {
            overbought: 70.0,
            oversold: 30.0,
            percentile: 98.0,
        };
        assert!(rule.evaluate(&bundle_with_everything_firing()).is_empty());
    }

    #[test]
    fn dry_weather_alone_adds_no_premium() {
        let mut bundle = bundle_with_everything_firing();
        bundle.weather_alerts[0].kind = WeatherAlertKind::Dry {
            precipitation_mm: 0.0,
        };
        let rule = WeatherPremium(DriverConfig::default());
        assert!(rule.evaluate(&bundle).is_empty());
    }

    #[test]
    fn small_dollar_move_is_quiet() {
        let mut bundle = AnalysisBundle::default();
        bundle.economic.push(EconomicReading {
            series: "US Dollar Index".into(),
            latest: 104.3,
            previous: Some(104.0),
            change_pct: Some(0.29),
        });
        assert!(DollarStrength(DriverConfig::default()).evaluate(&bundle).is_empty());
    }
}
