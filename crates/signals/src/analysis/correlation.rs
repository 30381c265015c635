//! Return correlations between markets.
//!
//! Series are aligned on common dates, converted to one-bar returns, and
//! compared with Pearson correlation over a trailing window.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

/// Pearson correlation coefficient of two equal-length samples.
///
/// Returns `None` for mismatched or too-short inputs, or when either side has
/// no variance.
#[must_use]
pub fn pearson_correlation(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }

    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let mut covariance = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;

    for (xi, yi) in x.iter().zip(y.iter()) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        covariance += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denominator = (var_x * var_y).sqrt();
    if denominator < f64::EPSILON {
        return None;
    }

    Some((covariance / denominator).clamp(-1.0, 1.0))
}

/// Paired one-bar returns on dates present in both series. A return is taken
/// between consecutive common dates.
#[must_use]
pub fn aligned_returns(a: &[(NaiveDate, f64)], b: &[(NaiveDate, f64)]) -> Vec<(NaiveDate, f64, f64)> {
    let b_by_date: BTreeMap<NaiveDate, f64> = b.iter().copied().collect();
    let common: Vec<(NaiveDate, f64, f64)> = a
        .iter()
        .filter_map(|(date, va)| b_by_date.get(date).map(|vb| (*date, *va, *vb)))
        .collect();

    common
        .windows(2)
        .filter_map(|w| {
            let (_, a0, b0) = w[0];
            let (date, a1, b1) = w[1];
            (a0 != 0.0 && b0 != 0.0).then(|| (date, a1 / a0 - 1.0, b1 / b0 - 1.0))
        })
        .collect()
}

/// Correlation of aligned returns over the trailing `window`, or `None` with
/// fewer than `min_samples` pairs.
#[must_use]
pub fn return_correlation(
    a: &[(NaiveDate, f64)],
    b: &[(NaiveDate, f64)],
    window: usize,
    min_samples: usize,
) -> Option<f64> {
    let pairs = aligned_returns(a, b);
    let tail = &pairs[pairs.len().saturating_sub(window)..];
    if tail.len() < min_samples {
        return None;
    }
    let (x, y): (Vec<f64>, Vec<f64>) = tail.iter().map(|(_, ra, rb)| (*ra, *rb)).unzip();
    pearson_correlation(&x, &y)
}

/// Correlation recomputed on each window-shifted slice of aligned returns.
#[must_use]
pub fn rolling_correlation(
    a: &[(NaiveDate, f64)],
    b: &[(NaiveDate, f64)],
    window: usize,
) -> Vec<(NaiveDate, Option<f64>)> {
    let pairs = aligned_returns(a, b);
    if window < 2 || pairs.len() < window {
        return Vec::new();
    }
    pairs
        .windows(window)
        .map(|slice| {
            let (x, y): (Vec<f64>, Vec<f64>) = slice.iter().map(|(_, ra, rb)| (*ra, *rb)).unzip();
            (slice[slice.len() - 1].0, pearson_correlation(&x, &y))
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strength {
    Strong,
    Moderate,
    Weak,
}

impl Strength {
    #[must_use]
    pub fn of(r: f64, notable: f64, strong: f64) -> Self {
        if r.abs() > strong {
            Self::Strong
        } else if r.abs() > notable {
            Self::Moderate
        } else {
            Self::Weak
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strong => "strong",
            Self::Moderate => "moderate",
            Self::Weak => "weak",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationEntry {
    pub a: String,
    pub b: String,
    pub r: f64,
}

/// Pairwise correlations between entities.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub entities: Vec<String>,
    values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    /// Builds the matrix from entity-keyed `(date, close)` series.
    #[must_use]
    pub fn compute(
        series: &BTreeMap<String, Vec<(NaiveDate, f64)>>,
        window: usize,
        min_samples: usize,
    ) -> Self {
        let entities: Vec<String> = series.keys().cloned().collect();
        let n = entities.len();
        let mut values = vec![vec![None; n]; n];
        for i in 0..n {
            values[i][i] = Some(1.0);
            for j in (i + 1)..n {
                let r = return_correlation(
                    &series[&entities[i]],
                    &series[&entities[j]],
                    window,
                    min_samples,
                );
                values[i][j] = r;
                values[j][i] = r;
            }
        }
        Self { entities, values }
    }

    #[must_use]
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.entities.iter().position(|e| e == a)?;
        let j = self.entities.iter().position(|e| e == b)?;
        self.values[i][j]
    }

    /// Distinct pairs with `|r| > threshold`, strongest first.
    #[must_use]
    pub fn notable_pairs(&self, threshold: f64) -> Vec<CorrelationEntry> {
        let mut pairs = Vec::new();
        for i in 0..self.entities.len() {
            for j in (i + 1)..self.entities.len() {
                if let Some(r) = self.values[i][j].filter(|r| r.abs() > threshold) {
                    pairs.push(CorrelationEntry {
                        a: self.entities[i].clone(),
                        b: self.entities[j].clone(),
                        r,
                    });
                }
            }
        }
        pairs.sort_by(|x, y| {
            y.r.abs()
                .total_cmp(&x.r.abs())
                .then_with(|| x.a.cmp(&y.a))
                .then_with(|| x.b.cmp(&y.b))
        });
        pairs
    }
}
