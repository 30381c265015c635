//! Canonical time-series records.
//!
//! Every layer delivers dated records ordered by date. Price-like layers use
//! [`PriceBar`], scalar layers (economic indicators, world prices) use
//! [`ScalarPoint`]. Weather and positioning layers carry their own record
//! shapes but follow the same [`Record`] contract so the normalizer can treat
//! them uniformly.

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A dated observation that can be normalized.
pub trait Record: Clone {
    /// Observation date.
    fn date(&self) -> NaiveDate;

    /// Returns true if every required field is present.
    fn is_complete(&self) -> bool;

    /// Fills missing fields from an earlier record.
    fn fill_from(&mut self, prev: &Self);
}

/// One OHLCV observation. Only `close` is required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: Option<Decimal>,
    pub high: Option<Decimal>,
    pub low: Option<Decimal>,
    pub close: Option<Decimal>,
    pub volume: Option<Decimal>,
}

impl PriceBar {
    /// Creates a bar with only a close price.
    #[must_use]
    pub fn close_only(date: NaiveDate, close: Decimal) -> Self {
        Self {
            date,
            open: None,
            high: None,
            low: None,
            close: Some(close),
            volume: None,
        }
    }

    /// Sets the traded volume.
    #[must_use]
    pub fn with_volume(mut self, volume: Decimal) -> Self {
        self.volume = Some(volume);
        self
    }
}

impl Record for PriceBar {
    fn date(&self) -> NaiveDate {
        self.date
    }

    fn is_complete(&self) -> bool {
        self.close.is_some()
    }

    fn fill_from(&mut self, prev: &Self) {
        self.open = self.open.or(prev.open);
        self.high = self.high.or(prev.high);
        self.low = self.low.or(prev.low);
        self.close = self.close.or(prev.close);
        self.volume = self.volume.or(prev.volume);
    }
}

/// A single-valued observation (economic series, currency fixings, world prices).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalarPoint {
    pub date: NaiveDate,
    pub value: Option<Decimal>,
}

impl ScalarPoint {
    #[must_use]
    pub fn new(date: NaiveDate, value: Decimal) -> Self {
        Self {
            date,
            value: Some(value),
        }
    }
}

impl Record for ScalarPoint {
    fn date(&self) -> NaiveDate {
        self.date
    }

    fn is_complete(&self) -> bool {
        self.value.is_some()
    }

    fn fill_from(&mut self, prev: &Self) {
        self.value = self.value.or(prev.value);
    }
}

/// Daily weather for one growing region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherObservation {
    pub date: NaiveDate,
    pub precipitation_mm: Option<Decimal>,
    pub temp_max_c: Option<Decimal>,
    pub temp_min_c: Option<Decimal>,
}

impl Record for WeatherObservation {
    fn date(&self) -> NaiveDate {
        self.date
    }

    fn is_complete(&self) -> bool {
        self.precipitation_mm.is_some() && self.temp_max_c.is_some()
    }

    fn fill_from(&mut self, prev: &Self) {
        self.precipitation_mm = self.precipitation_mm.or(prev.precipitation_mm);
        self.temp_max_c = self.temp_max_c.or(prev.temp_max_c);
        self.temp_min_c = self.temp_min_c.or(prev.temp_min_c);
    }
}

/// Weekly Commitment of Traders net positions (contracts).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositioningRecord {
    pub date: NaiveDate,
    pub commercial_net: Option<i64>,
    pub noncommercial_net: Option<i64>,
}

impl Record for PositioningRecord {
    fn date(&self) -> NaiveDate {
        self.date
    }

    fn is_complete(&self) -> bool {
        self.noncommercial_net.is_some()
    }

    fn fill_from(&mut self, prev: &Self) {
        self.commercial_net = self.commercial_net.or(prev.commercial_net);
        self.noncommercial_net = self.noncommercial_net.or(prev.noncommercial_net);
    }
}

/// Latest settlement of one contract month on a forward curve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub contract_month: NaiveDate,
    pub label: String,
    pub close: Decimal,
}

/// One destination country's row of a weekly export-sales report, in metric
/// tons. A week carries one row per country.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportSale {
    pub week_ending: NaiveDate,
    pub country: String,
    pub net_sales: Option<Decimal>,
    pub weekly_exports: Option<Decimal>,
}

/// Date-ordered sequence of records.
///
/// The ordering invariant (strictly increasing, no duplicates) is established
/// by the normalizer; constructors here do not enforce it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Series<R> {
    records: Vec<R>,
}

pub type PriceSeries = Series<PriceBar>;
pub type ScalarSeries = Series<ScalarPoint>;
pub type WeatherSeries = Series<WeatherObservation>;
pub type PositioningSeries = Series<PositioningRecord>;

impl<R> Default for Series<R> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
        }
    }
}

impl<R> Series<R> {
    #[must_use]
    pub fn new(records: Vec<R>) -> Self {
        Self { records }
    }

    #[must_use]
    pub fn records(&self) -> &[R] {
        &self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn last(&self) -> Option<&R> {
        self.records.last()
    }

    #[must_use]
    pub fn into_records(self) -> Vec<R> {
        self.records
    }
}

impl<R: Record> Series<R> {
    /// Returns true if dates are strictly increasing.
    #[must_use]
    pub fn is_strictly_increasing(&self) -> bool {
        self.records.windows(2).all(|w| w[0].date() < w[1].date())
    }

    #[must_use]
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.records.iter().map(Record::date).collect()
    }

    #[must_use]
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.records.last().map(Record::date)
    }
}

impl PriceSeries {
    /// Dates and closes of every bar that has a close, as `f64` for statistics.
    #[must_use]
    pub fn closes(&self) -> (Vec<NaiveDate>, Vec<f64>) {
        self.records
            .iter()
            .filter_map(|bar| Some((bar.date, bar.close?.to_f64()?)))
            .unzip()
    }

    /// `(date, close)` pairs for every bar that has a close.
    #[must_use]
    pub fn close_points(&self) -> Vec<(NaiveDate, f64)> {
        self.records
            .iter()
            .filter_map(|bar| Some((bar.date, bar.close?.to_f64()?)))
            .collect()
    }

    /// Closes as a scalar series, for price-shaped layers read as rates.
    #[must_use]
    pub fn to_scalar(&self) -> ScalarSeries {
        Series::new(
            self.records
                .iter()
                .map(|bar| ScalarPoint {
                    date: bar.date,
                    value: bar.close,
                })
                .collect(),
        )
    }

    /// Volumes aligned with [`PriceSeries::closes`]; `None` where volume is absent.
    #[must_use]
    pub fn volumes(&self) -> Vec<Option<f64>> {
        self.records
            .iter()
            .filter(|bar| bar.close.and_then(|c| c.to_f64()).is_some())
            .map(|bar| bar.volume.and_then(|v| v.to_f64()))
            .collect()
    }

    #[must_use]
    pub fn last_close(&self) -> Option<Decimal> {
        self.records.iter().rev().find_map(|bar| bar.close)
    }

    /// Close on a given date, if that date is present.
    #[must_use]
    pub fn close_on(&self, date: NaiveDate) -> Option<Decimal> {
        self.records
            .binary_search_by_key(&date, |bar| bar.date)
            .ok()
            .and_then(|idx| self.records[idx].close)
    }

    /// Fractional change of the close over the last `bars` bars.
    #[must_use]
    pub fn change_over(&self, bars: usize) -> Option<f64> {
        let (_, closes) = self.closes();
        change_over(&closes, bars)
    }
}

impl ScalarSeries {
    /// Dates and values as `f64`, skipping missing values.
    #[must_use]
    pub fn values(&self) -> (Vec<NaiveDate>, Vec<f64>) {
        self.records
            .iter()
            .filter_map(|p| Some((p.date, p.value?.to_f64()?)))
            .unzip()
    }

    /// `(date, value)` pairs for every point that has a value.
    #[must_use]
    pub fn points(&self) -> Vec<(NaiveDate, f64)> {
        self.records
            .iter()
            .filter_map(|p| Some((p.date, p.value?.to_f64()?)))
            .collect()
    }

    #[must_use]
    pub fn last_value(&self) -> Option<Decimal> {
        self.records.iter().rev().find_map(|p| p.value)
    }

    /// Fractional change over the last `points` observations.
    #[must_use]
    pub fn change_over(&self, points: usize) -> Option<f64> {
        let (_, values) = self.values();
        change_over(&values, points)
    }
}

fn change_over(values: &[f64], bars: usize) -> Option<f64> {
    if bars == 0 || values.len() <= bars {
        return None;
    }
    let latest = values[values.len() - 1];
    let base = values[values.len() - 1 - bars];
    if base == 0.0 {
        return None;
    }
    Some(latest / base - 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
    }

    #[test]
    fn price_bar_fill_only_replaces_missing_fields() {
        let prev = PriceBar::close_only(d(1), dec!(10)).with_volume(dec!(500));
        let mut bar = PriceBar {
            date: d(2),
            open: Some(dec!(11)),
            high: None,
            low: None,
            close: None,
            volume: None,
        };
        bar.fill_from(&prev);

        assert_eq!(bar.open, Some(dec!(11)));
        assert_eq!(bar.close, Some(dec!(10)));
        assert_eq!(bar.volume, Some(dec!(500)));
        assert!(bar.is_complete());
    }

    #[test]
    fn closes_skips_bars_without_close() {
        let mut gap = PriceBar::close_only(d(2), dec!(0));
        gap.close = None;
        let series = Series::new(vec![
            PriceBar::close_only(d(1), dec!(10)),
            gap,
            PriceBar::close_only(d(3), dec!(12)),
        ]);

        let (dates, closes) = series.closes();
        assert_eq!(dates, vec![d(1), d(3)]);
        assert_eq!(closes, vec![10.0, 12.0]);
        assert_eq!(series.volumes().len(), 2);
    }

    #[test]
    fn change_over_uses_bar_offsets() {
        let series = Series::new(
            (1..=6)
                .map(|day| PriceBar::close_only(d(day), Decimal::from(100 + day)))
                .collect(),
        );
        let change = series.change_over(5).unwrap();
        assert!((change - (106.0 / 101.0 - 1.0)).abs() < 1e-12);
        assert!(series.change_over(6).is_none());
    }

    #[test]
    fn close_on_finds_exact_date() {
        let series = Series::new(vec![
            PriceBar::close_only(d(1), dec!(10)),
            PriceBar::close_only(d(3), dec!(12)),
        ]);
        assert_eq!(series.close_on(d(3)), Some(dec!(12)));
        assert_eq!(series.close_on(d(2)), None);
    }

    #[test]
    fn strictly_increasing_detects_duplicates() {
        let ok = Series::new(vec![ScalarPoint::new(d(1), dec!(1)), ScalarPoint::new(d(2), dec!(1))]);
        let dup = Series::new(vec![ScalarPoint::new(d(1), dec!(1)), ScalarPoint::new(d(1), dec!(2))]);
        assert!(ok.is_strictly_increasing());
        assert!(!dup.is_strictly_increasing());
    }
}
