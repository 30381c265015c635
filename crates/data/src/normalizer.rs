//! Normalizer/Validator.
//!
//! Turns a raw series into canonical form in three steps:
//!
//! 1. sort by date, keeping the last of any duplicate dates;
//! 2. forward-fill incomplete records from the previous complete record, up to
//!    `max_fill_gap` records in a row;
//! 3. drop records that are still incomplete.
//!
//! Absent dates (weekends, holidays) are never synthesized. Validation
//! warnings are advisory: they are logged and returned, and never remove data.

use std::collections::BTreeMap;

use mirror_market_core::{
    CurvePoint, ExportSale, IngestionConfig, LayerData, PositioningRecord, PriceBar, Record, ScalarPoint,
    Series, ValidationWarning, WarningKind, WeatherObservation,
};
use rust_decimal::Decimal;

/// Record-specific validation checks run on the cleaned series.
pub trait Validate: Record {
    /// Warnings raised by `self`, given the preceding clean record.
    fn check(&self, _prev: Option<&Self>, _large_move: Decimal) -> Vec<WarningKind> {
        Vec::new()
    }
}

impl Validate for PriceBar {
    fn check(&self, prev: Option<&Self>, large_move: Decimal) -> Vec<WarningKind> {
        let mut kinds = Vec::new();

        if let (Some(close), Some(prev_close)) = (self.close, prev.and_then(|p| p.close)) {
            if !prev_close.is_zero() {
                let change = close / prev_close - Decimal::ONE;
                if change.abs() > large_move {
                    kinds.push(WarningKind::LargeMove {
                        change: change.round_dp(4),
                    });
                }
            }
        }

        if let Some(volume) = self.volume {
            if volume <= Decimal::ZERO {
                kinds.push(WarningKind::NonPositiveVolume { volume });
            }
        }

        kinds
    }
}

impl Validate for ScalarPoint {}
impl Validate for WeatherObservation {}
impl Validate for PositioningRecord {}

#[derive(Debug, Clone)]
pub struct Normalizer {
    max_fill_gap: usize,
    large_move: Decimal,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::from_config(&IngestionConfig::default())
    }
}

impl Normalizer {
    #[must_use]
    pub fn new(max_fill_gap: usize, large_move: Decimal) -> Self {
        Self {
            max_fill_gap,
            large_move,
        }
    }

    #[must_use]
    pub fn from_config(config: &IngestionConfig) -> Self {
        Self::new(config.max_fill_gap_days, config.large_move_threshold)
    }

    /// Returns a cleaned copy of `raw` and the warnings found. `raw` is untouched.
    #[must_use]
    pub fn normalize<R: Validate>(
        &self,
        entity: &str,
        raw: &Series<R>,
    ) -> (Series<R>, Vec<ValidationWarning>) {
        let deduped = dedup_keep_last(raw.records());
        let (clean, mut warnings) = self.fill_and_drop(entity, deduped);

        let mut prev: Option<&R> = None;
        for record in &clean {
            for kind in record.check(prev, self.large_move) {
                warnings.push(ValidationWarning::new(entity, record.date(), kind));
            }
            prev = Some(record);
        }

        for warning in &warnings {
            tracing::warn!(entity = %warning.entity, date = %warning.date, "{}", warning);
        }

        (Series::new(clean), warnings)
    }

    /// Normalizes every series of a layer payload.
    #[must_use]
    pub fn normalize_layer(&self, data: &LayerData) -> (LayerData, Vec<ValidationWarning>) {
        let mut warnings = Vec::new();
        let data = match data {
            LayerData::Prices(map) => LayerData::Prices(self.normalize_map(map, &mut warnings)),
            LayerData::Scalars(map) => LayerData::Scalars(self.normalize_map(map, &mut warnings)),
            LayerData::Positioning(map) => {
                LayerData::Positioning(self.normalize_map(map, &mut warnings))
            }
            LayerData::Weather(map) => LayerData::Weather(self.normalize_map(map, &mut warnings)),
            LayerData::Curves(map) => LayerData::Curves(
                map.iter()
                    .map(|(entity, points)| (entity.clone(), normalize_curve(points)))
                    .collect(),
            ),
            LayerData::ExportSales(map) => LayerData::ExportSales(
                map.iter()
                    .map(|(entity, rows)| (entity.clone(), normalize_export_sales(rows)))
                    .collect(),
            ),
        };
        (data, warnings)
    }

    fn normalize_map<R: Validate>(
        &self,
        map: &BTreeMap<String, Series<R>>,
        warnings: &mut Vec<ValidationWarning>,
    ) -> BTreeMap<String, Series<R>> {
        map.iter()
            .map(|(entity, series)| {
                let (clean, found) = self.normalize(entity, series);
                warnings.extend(found);
                (entity.clone(), clean)
            })
            .collect()
    }

    fn fill_and_drop<R: Record>(
        &self,
        entity: &str,
        records: Vec<R>,
    ) -> (Vec<R>, Vec<ValidationWarning>) {
        let mut clean = Vec::with_capacity(records.len());
        let mut warnings = Vec::new();
        let mut last_complete: Option<R> = None;
        let mut run = 0usize;
        let mut dropped: Option<(usize, chrono::NaiveDate)> = None;

        for mut record in records {
            if record.is_complete() {
                if let Some((count, date)) = dropped.take() {
                    warnings.push(long_gap(entity, date, count));
                }
                run = 0;
                last_complete = Some(record.clone());
                clean.push(record);
                continue;
            }

            let Some(prev) = last_complete.as_ref() else {
                continue;
            };
            run += 1;
            if run <= self.max_fill_gap {
                record.fill_from(prev);
                clean.push(record);
            } else {
                let count = dropped.map_or(0, |(c, _)| c);
                dropped = Some((count + 1, record.date()));
            }
        }

        if let Some((count, date)) = dropped {
            warnings.push(long_gap(entity, date, count));
        }

        (clean, warnings)
    }
}

fn long_gap(entity: &str, date: chrono::NaiveDate, records: usize) -> ValidationWarning {
    ValidationWarning::new(entity, date, WarningKind::LongGap { records })
}

/// Sorts by date; among records sharing a date the one appearing last wins.
fn dedup_keep_last<R: Record>(records: &[R]) -> Vec<R> {
    let mut sorted = records.to_vec();
    sorted.sort_by_key(Record::date);

    let mut out: Vec<R> = Vec::with_capacity(sorted.len());
    for record in sorted {
        match out.last_mut() {
            Some(last) if last.date() == record.date() => *last = record,
            _ => out.push(record),
        }
    }
    out
}

/// Orders contract months nearest first, keeping the last quote for a repeated month.
#[must_use]
pub fn normalize_curve(points: &[CurvePoint]) -> Vec<CurvePoint> {
    let mut sorted = points.to_vec();
    sorted.sort_by_key(|p| p.contract_month);

    let mut out: Vec<CurvePoint> = Vec::with_capacity(sorted.len());
    for point in sorted {
        match out.last_mut() {
            Some(last) if last.contract_month == point.contract_month => *last = point,
            _ => out.push(point),
        }
    }
    out
}

/// Orders rows by week then country, keeping the last row for a repeated
/// week and country. Rows with neither sales nor exports are dropped.
#[must_use]
pub fn normalize_export_sales(rows: &[ExportSale]) -> Vec<ExportSale> {
    let mut sorted: Vec<ExportSale> = rows
        .iter()
        .filter(|r| r.net_sales.is_some() || r.weekly_exports.is_some())
        .cloned()
        .collect();
    // stable, so file order decides among duplicates
    sorted.sort_by(|a, b| (a.week_ending, &a.country).cmp(&(b.week_ending, &b.country)));

    let mut out: Vec<ExportSale> = Vec::with_capacity(sorted.len());
    for row in sorted {
        match out.last_mut() {
            Some(last) if last.week_ending == row.week_ending && last.country == row.country => {
                *last = row;
            }
            _ => out.push(row),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
    }

    fn bar(day: u32, close: Option<Decimal>) -> PriceBar {
        PriceBar {
            date: d(day),
            open: None,
            high: None,
            low: None,
            close,
            volume: Some(dec!(100)),
        }
    }

    fn closes(series: &Series<PriceBar>) -> Vec<(u32, Decimal)> {
        use chrono::Datelike;
        series
            .records()
            .iter()
            .map(|b| (b.date.day(), b.close.unwrap()))
            .collect()
    }

    #[test]
    fn sorts_and_keeps_last_duplicate() {
        let raw = Series::new(vec![
            bar(3, Some(dec!(12))),
            bar(1, Some(dec!(10))),
            bar(3, Some(dec!(13))),
            bar(2, Some(dec!(11))),
        ]);
        let (clean, _) = Normalizer::default().normalize("Corn", &raw);

        assert!(clean.is_strictly_increasing());
        assert_eq!(closes(&clean), vec![(1, dec!(10)), (2, dec!(11)), (3, dec!(13))]);
    }

    #[test]
    fn fills_short_gaps_and_drops_long_ones() {
        let normalizer = Normalizer::new(2, dec!(0.10));
        let raw = Series::new(vec![
            bar(1, Some(dec!(10))),
            bar(2, None),
            bar(3, None),
            bar(4, None),
            bar(5, None),
            bar(6, Some(dec!(10.5))),
        ]);
        let (clean, warnings) = normalizer.normalize("Wheat", &raw);

        assert_eq!(
            closes(&clean),
            vec![(1, dec!(10)), (2, dec!(10)), (3, dec!(10)), (6, dec!(10.5))]
        );
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, WarningKind::LongGap { records: 2 });
        assert_eq!(warnings[0].date, d(5));
    }

    #[test]
    fn leading_incomplete_records_are_dropped() {
        let raw = Series::new(vec![bar(1, None), bar(2, Some(dec!(10)))]);
        let (clean, warnings) = Normalizer::default().normalize("Corn", &raw);
        assert_eq!(closes(&clean), vec![(2, dec!(10))]);
        assert!(warnings.is_empty());
    }

    #[test]
    fn flags_large_move_and_bad_volume_without_dropping() {
        let mut spike = bar(2, Some(dec!(11.5)));
        spike.volume = Some(dec!(0));
        let raw = Series::new(vec![bar(1, Some(dec!(10))), spike, bar(3, Some(dec!(11.6)))]);

        let (clean, warnings) = Normalizer::default().normalize("Coffee", &raw);

        assert_eq!(clean.len(), 3);
        assert_eq!(warnings.len(), 2);
        assert!(warnings
            .iter()
            .any(|w| w.kind == WarningKind::LargeMove { change: dec!(0.15) }));
        assert!(warnings
            .iter()
            .any(|w| w.kind == WarningKind::NonPositiveVolume { volume: dec!(0) }));
    }

    #[test]
    fn ten_percent_move_is_not_large() {
        let raw = Series::new(vec![bar(1, Some(dec!(10))), bar(2, Some(dec!(11)))]);
        let (_, warnings) = Normalizer::default().normalize("Corn", &raw);
        assert!(warnings.is_empty());
    }

    #[test]
    fn input_series_is_not_mutated() {
        let raw = Series::new(vec![
            bar(2, None),
            bar(1, Some(dec!(10))),
            bar(1, Some(dec!(9))),
            bar(3, None),
        ]);
        let before = raw.clone();
        let _ = Normalizer::default().normalize("Corn", &raw);
        assert_eq!(raw, before);
    }

    #[test]
    fn weather_requires_precipitation_and_max_temperature() {
        let obs = |day, precip| WeatherObservation {
            date: d(day),
            precipitation_mm: precip,
            temp_max_c: Some(dec!(30)),
            temp_min_c: None,
        };
        let raw = Series::new(vec![obs(1, Some(dec!(5))), obs(2, None)]);
        let (clean, _) = Normalizer::default().normalize("Iowa", &raw);
        assert_eq!(clean.records()[1].precipitation_mm, Some(dec!(5)));
    }

    #[test]
    fn normalize_layer_sorts_curves() {
        let point = |month, close| CurvePoint {
            contract_month: NaiveDate::from_ymd_opt(2025, month, 1).unwrap(),
            label: format!("M{month}"),
            close,
        };
        let mut map = BTreeMap::new();
        map.insert(
            "Corn".to_string(),
            vec![point(9, dec!(4.6)), point(3, dec!(4.4)), point(5, dec!(4.5))],
        );
        let (data, warnings) = Normalizer::default().normalize_layer(&LayerData::Curves(map));
        assert!(warnings.is_empty());
        let LayerData::Curves(curves) = data else {
            panic!("shape changed");
        };
        let months: Vec<_> = curves["Corn"].iter().map(|p| p.label.as_str()).collect();
        assert_eq!(months, vec!["M3", "M5", "M9"]);
    }

    #[test]
    fn export_sales_keep_last_row_per_week_and_country() {
        let week = |day| NaiveDate::from_ymd_opt(2025, 7, day).unwrap();
        let row = |day, country: &str, net: Option<Decimal>| ExportSale {
            week_ending: week(day),
            country: country.to_string(),
            net_sales: net,
            weekly_exports: None,
        };
        let mut map = BTreeMap::new();
        map.insert(
            "Soybeans".to_string(),
            vec![
                row(10, "Mexico", Some(dec!(80000))),
                row(3, "China", Some(dec!(400000))),
                row(10, "China", Some(dec!(510000))),
                row(10, "China", Some(dec!(512000))),
                row(10, "Egypt", None),
            ],
        );

        let (data, warnings) = Normalizer::default().normalize_layer(&LayerData::ExportSales(map));
        assert!(warnings.is_empty());
        let LayerData::ExportSales(sales) = data else {
            panic!("shape changed");
        };
        let rows: Vec<_> = sales["Soybeans"]
            .iter()
            .map(|r| (r.week_ending, r.country.as_str(), r.net_sales))
            .collect();
        assert_eq!(
            rows,
            vec![
                (week(3), "China", Some(dec!(400000))),
                (week(10), "China", Some(dec!(512000))),
                (week(10), "Mexico", Some(dec!(80000))),
            ]
        );
    }
}
