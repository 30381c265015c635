//! Seasonal patterns: monthly price profile and the current deviation from it.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MonthlyStat {
    pub month: u32,
    pub avg: f64,
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

/// Average, min and max close for each calendar month present in the data.
#[must_use]
pub fn monthly_profile(points: &[(NaiveDate, f64)]) -> Vec<MonthlyStat> {
    (1..=12)
        .filter_map(|month| {
            let values: Vec<f64> = points
                .iter()
                .filter(|(d, _)| d.month() == month)
                .map(|(_, v)| *v)
                .collect();
            if values.is_empty() {
                return None;
            }
            Some(MonthlyStat {
                month,
                avg: values.iter().sum::<f64>() / values.len() as f64,
                min: values.iter().copied().fold(f64::INFINITY, f64::min),
                max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                count: values.len(),
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonalComparison {
    pub as_of: NaiveDate,
    pub current: f64,
    pub seasonal_avg: f64,
    pub deviation_pct: f64,
    /// Number of prior years contributing to the average.
    pub years: usize,
}

impl SeasonalComparison {
    #[must_use]
    pub fn assessment(&self) -> String {
        if self.deviation_pct > 0.0 {
            format!("Above seasonal (+{:.1}%)", self.deviation_pct)
        } else {
            format!("Below seasonal ({:.1}%)", self.deviation_pct)
        }
    }
}

/// Latest close against the mean close of the same calendar month in all
/// prior years. `None` when no prior year covers that month.
#[must_use]
pub fn current_vs_seasonal(points: &[(NaiveDate, f64)]) -> Option<SeasonalComparison> {
    let (as_of, current) = *points.last()?;
    let history: Vec<(i32, f64)> = points
        .iter()
        .filter(|(d, _)| d.month() == as_of.month() && d.year() < as_of.year())
        .map(|(d, v)| (d.year(), *v))
        .collect();
    if history.is_empty() {
        return None;
    }

    let seasonal_avg = history.iter().map(|(_, v)| v).sum::<f64>() / history.len() as f64;
    if seasonal_avg == 0.0 {
        return None;
    }
    let mut years: Vec<i32> = history.iter().map(|(y, _)| *y).collect();
    years.dedup();

    Some(SeasonalComparison {
        as_of,
        current,
        seasonal_avg,
        deviation_pct: (current / seasonal_avg - 1.0) * 100.0,
        years: years.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn profile_groups_by_month() {
        let points = vec![
            (d(2023, 1, 5), 10.0),
            (d(2023, 1, 6), 12.0),
            (d(2024, 1, 5), 14.0),
            (d(2024, 2, 5), 20.0),
        ];
        let profile = monthly_profile(&points);
        assert_eq!(profile.len(), 2);
        assert_eq!(profile[0].month, 1);
        assert!((profile[0].avg - 12.0).abs() < 1e-12);
        assert_eq!(profile[0].min, 10.0);
        assert_eq!(profile[0].max, 14.0);
        assert_eq!(profile[1].count, 1);
    }

    #[test]
    fn compares_against_prior_years_only() {
        let points = vec![
            (d(2022, 3, 1), 100.0),
            (d(2023, 3, 1), 110.0),
            (d(2023, 4, 1), 500.0),
            (d(2024, 3, 1), 120.0),
            (d(2024, 3, 2), 126.0),
        ];
        let cmp = current_vs_seasonal(&points).unwrap();
        assert_eq!(cmp.years, 2);
        assert!((cmp.seasonal_avg - 105.0).abs() < 1e-12);
        assert!((cmp.deviation_pct - 20.0).abs() < 1e-9);
        assert_eq!(cmp.assessment(), "Above seasonal (+20.0%)");
    }

    #[test]
    fn below_seasonal_is_negative() {
        let points = vec![(d(2023, 6, 1), 100.0), (d(2024, 6, 3), 90.0)];
        let cmp = current_vs_seasonal(&points).unwrap();
        assert_eq!(cmp.assessment(), "Below seasonal (-10.0%)");
    }

    #[test]
    fn single_year_has_no_comparison() {
        let points = vec![(d(2024, 6, 1), 100.0), (d(2024, 6, 3), 90.0)];
        assert!(current_vs_seasonal(&points).is_none());
    }
}
