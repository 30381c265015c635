//! Ingestion through composition with in-process sources.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use mirror_market_briefing::{report, AnalysisBundle, BriefingComposer};
use mirror_market_core::{
    AppConfig, ExportSale, FetchError, FreshnessRecord, LayerConfig, LayerData, LayerKind, PriceBar,
    ScalarPoint, Series, SourceFetcher,
};
use mirror_market_orchestrator::{IngestionOrchestrator, LayerTask, MarketDataset};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

struct Static(LayerData);

#[async_trait]
impl SourceFetcher for Static {
    async fn fetch(&self) -> Result<LayerData, FetchError> {
        Ok(self.0.clone())
    }
}

struct Unreachable;

#[async_trait]
impl SourceFetcher for Unreachable {
    async fn fetch(&self) -> Result<LayerData, FetchError> {
        Err(FetchError::Network("connection refused".into()))
    }
}

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 6).unwrap()
}

/// Steadily rising closes with no repeats and no large moves.
fn trending(base: Decimal, step: Decimal, bars: usize) -> Series<PriceBar> {
    Series::new(
        (0..bars)
            .map(|i| {
                PriceBar::close_only(
                    start() + Duration::days(i as i64),
                    base + step * Decimal::from(i as u64),
                )
            })
            .collect(),
    )
}

fn prices_layer() -> LayerData {
    let mut map = BTreeMap::new();
    map.insert("Corn".to_string(), trending(dec!(420), dec!(0.5), 60));
    map.insert("Soybeans".to_string(), trending(dec!(1000), dec!(1), 60));
    map.insert("Soybean Oil".to_string(), trending(dec!(45), dec!(0.02), 60));
    map.insert("Soybean Meal".to_string(), trending(dec!(300), dec!(0.25), 60));
    LayerData::Prices(map)
}

fn rates_layer() -> LayerData {
    let rates = |a: Decimal, b: Decimal| {
        Series::new(vec![
            ScalarPoint::new(start(), a),
            ScalarPoint::new(start() + Duration::days(1), b),
        ])
    };
    let mut map = BTreeMap::new();
    map.insert("Treasury 2Y".to_string(), rates(dec!(4.80), dec!(4.85)));
    map.insert("Treasury 10Y".to_string(), rates(dec!(4.20), dec!(4.25)));
    LayerData::Scalars(map)
}

fn export_sales_layer() -> LayerData {
    let week = start() + Duration::days(59);
    let sale = |country: &str, net: Decimal| ExportSale {
        week_ending: week,
        country: country.to_string(),
        net_sales: Some(net),
        weekly_exports: Some(dec!(150000)),
    };
    let mut map = BTreeMap::new();
    map.insert(
        "Soybeans".to_string(),
        vec![sale("China", dec!(420000)), sale("Mexico", dec!(180000))],
    );
    LayerData::ExportSales(map)
}

fn layer(name: &str, kind: LayerKind) -> LayerConfig {
    LayerConfig {
        name: name.to_string(),
        kind,
        file: format!("{name}.csv"),
        required_credential: None,
    }
}

fn config() -> AppConfig {
    AppConfig {
        layers: vec![
            layer("cme_prices", LayerKind::Prices),
            layer("fred", LayerKind::Economic),
            layer("noaa_weather", LayerKind::Weather),
            layer("cftc_cot", LayerKind::Positioning),
        ],
        ..AppConfig::default()
    }
}

#[tokio::test]
async fn partial_ingestion_still_produces_a_full_briefing() {
    let now = Utc::now();
    let config = config();

    let mut previous = FreshnessRecord::new();
    previous.mark_success("cftc_cot", now - Duration::days(10));

    let tasks = vec![
        LayerTask::new("cme_prices", LayerKind::Prices, Arc::new(Static(prices_layer()))),
        LayerTask::new("fred", LayerKind::Economic, Arc::new(Static(rates_layer()))),
        LayerTask::new("noaa_weather", LayerKind::Weather, Arc::new(Unreachable)),
    ];

    let run = IngestionOrchestrator::default()
        .run(tasks, previous)
        .await
        .unwrap();
    assert_eq!(run.succeeded(), 2);
    assert_eq!(run.failed(), 1);

    let dataset = MarketDataset::from_results(&run.results);
    let bundle = AnalysisBundle::build(&dataset, &config);
    let briefing =
        BriefingComposer::new(config).compose(&bundle, &run.freshness, &run.warnings, now);

    let freshness = briefing.section(report::FRESHNESS_WARNINGS).unwrap();
    assert!(freshness
        .lines
        .contains(&"WARNING: noaa_weather never succeeded".to_string()));
    assert!(freshness
        .lines
        .contains(&"WARNING: cftc_cot data is 10 days old".to_string()));
    assert!(!freshness.lines.iter().any(|l| l.contains("cme_prices")));

    let yield_line = &briefing.section(report::YIELD_CURVE).unwrap().lines[0];
    assert!(yield_line.contains("INVERTED"));
    assert!(briefing.section(report::CRUSH_SPREAD).is_some());
    assert!(briefing.section(report::WEATHER_ALERTS).is_none());
    assert!(briefing.section(report::POSITIONING).is_none());

    let titles = briefing.titles();
    assert_eq!(titles.first(), Some(&report::FRESHNESS_WARNINGS));
    assert_eq!(&titles[titles.len() - 2..], &[report::MARKET_DRIVERS, report::SIGNALS]);
}

#[tokio::test]
async fn sections_follow_the_fixed_order() {
    let order = [
        report::FRESHNESS_WARNINGS,
        report::DATA_QUALITY,
        report::PRICES,
        report::CRUSH_SPREAD,
        report::ECONOMIC_CONTEXT,
        report::YIELD_CURVE,
        report::EXPORT_SALES,
        report::FORWARD_CURVE,
        report::CURRENCIES,
        report::POSITIONING,
        report::WEATHER_ALERTS,
        report::CORRELATIONS,
        report::SEASONAL,
        report::MARKET_DRIVERS,
        report::SIGNALS,
    ];

    let tasks = vec![
        LayerTask::new("cme_prices", LayerKind::Prices, Arc::new(Static(prices_layer()))),
        LayerTask::new("fred", LayerKind::Economic, Arc::new(Static(rates_layer()))),
        LayerTask::new(
            "fas_export_sales",
            LayerKind::ExportSales,
            Arc::new(Static(export_sales_layer())),
        ),
    ];
    let run = IngestionOrchestrator::default()
        .run(tasks, FreshnessRecord::new())
        .await
        .unwrap();
    let dataset = MarketDataset::from_results(&run.results);
    let bundle = AnalysisBundle::build(&dataset, &config());
    let briefing = BriefingComposer::new(config()).compose(
        &bundle,
        &run.freshness,
        &run.warnings,
        Utc::now(),
    );

    let positions: Vec<usize> = briefing
        .titles()
        .iter()
        .map(|t| order.iter().position(|o| o == t).unwrap())
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
    assert!(briefing.section(report::EXPORT_SALES).is_some());
    assert!(briefing
        .section(report::MARKET_DRIVERS)
        .unwrap()
        .lines
        .iter()
        .any(|l| l.contains("China buying pace strong for Soybeans: 420,000 MT")));

    let rendered = briefing.to_string();
    assert!(rendered.starts_with("=== Mirror Market Daily Briefing"));
    assert!(rendered.contains("\nSIGNALS:\n"));
}

#[tokio::test]
async fn nothing_ingested_renders_only_warnings_drivers_and_signals() {
    let config = config();
    let run = IngestionOrchestrator::default()
        .run(
            vec![LayerTask::new("cme_prices", LayerKind::Prices, Arc::new(Unreachable))],
            FreshnessRecord::new(),
        )
        .await
        .unwrap();
    let bundle = AnalysisBundle::build(&MarketDataset::from_results(&run.results), &config);
    let briefing =
        BriefingComposer::new(config).compose(&bundle, &run.freshness, &run.warnings, Utc::now());

    assert_eq!(
        briefing.titles(),
        vec![report::FRESHNESS_WARNINGS, report::MARKET_DRIVERS, report::SIGNALS]
    );
    assert_eq!(
        briefing.section(report::MARKET_DRIVERS).unwrap().lines,
        vec!["No cross-market signals detected this session"]
    );
}
