//! Indicator Engine.
//!
//! Pure functions of a close (or volume) series. Every output is aligned with
//! its input; entries without enough trailing history are `None`, never a
//! placeholder value.
//!
//! Conventions:
//! - Standard deviations use the sample estimator (n - 1), for both Bollinger
//!   Bands and historical volatility.
//! - RSI seeds its averages with the simple mean of the first `period`
//!   changes, then applies Wilder smoothing. RSI is 100 when the average loss
//!   is zero.
//! - EMA seeds with the SMA of its first window and uses `2 / (n + 1)` after.

use chrono::NaiveDate;
use mirror_market_core::PriceSeries;
use serde::Serialize;

/// Trading days per year used to annualize volatility.
pub const TRADING_DAYS: f64 = 252.0;

/// Mean computed relative to the first element so a constant window returns
/// that constant exactly.
fn mean(window: &[f64]) -> f64 {
    let base = window[0];
    base + window.iter().map(|v| v - base).sum::<f64>() / window.len() as f64
}

/// Sample standard deviation; `None` for fewer than two values.
fn sample_std(window: &[f64]) -> Option<f64> {
    if window.len() < 2 {
        return None;
    }
    let m = mean(window);
    let ss: f64 = window.iter().map(|v| (v - m) * (v - m)).sum();
    Some((ss / (window.len() - 1) as f64).sqrt())
}

/// Simple moving average of the trailing `n` values.
#[must_use]
pub fn sma(values: &[f64], n: usize) -> Vec<Option<f64>> {
    if n == 0 {
        return vec![None; values.len()];
    }
    (0..values.len())
        .map(|i| (i + 1 >= n).then(|| mean(&values[i + 1 - n..=i])))
        .collect()
}

/// SMA over optional values; a window containing a gap is undefined.
#[must_use]
pub fn sma_optional(values: &[Option<f64>], n: usize) -> Vec<Option<f64>> {
    if n == 0 {
        return vec![None; values.len()];
    }
    (0..values.len())
        .map(|i| {
            if i + 1 < n {
                return None;
            }
            let window: Option<Vec<f64>> = values[i + 1 - n..=i].iter().copied().collect();
            window.map(|w| mean(&w))
        })
        .collect()
}

/// Exponential moving average seeded by the SMA of the first `n` values.
#[must_use]
pub fn ema(values: &[f64], n: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if n == 0 || values.len() < n {
        return out;
    }
    let alpha = 2.0 / (n as f64 + 1.0);
    let mut prev = mean(&values[..n]);
    out[n - 1] = Some(prev);
    for i in n..values.len() {
        prev += alpha * (values[i] - prev);
        out[i] = Some(prev);
    }
    out
}

/// EMA over a series whose leading entries are undefined. Starts at the first
/// defined value and stops at the next gap.
#[must_use]
pub fn ema_defined(values: &[Option<f64>], n: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    let Some(start) = values.iter().position(Option::is_some) else {
        return out;
    };
    let dense: Vec<f64> = values[start..].iter().map_while(|v| *v).collect();
    for (i, v) in ema(&dense, n).into_iter().enumerate() {
        out[start + i] = v;
    }
    out
}

/// Relative Strength Index with Wilder smoothing. First value at index `period`.
#[must_use]
pub fn rsi(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; closes.len()];
    if period == 0 || closes.len() <= period {
        return out;
    }

    let changes: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    let p = period as f64;
    let mut avg_gain = changes[..period].iter().map(|c| c.max(0.0)).sum::<f64>() / p;
    let mut avg_loss = changes[..period].iter().map(|c| (-c).max(0.0)).sum::<f64>() / p;
    out[period] = Some(rsi_value(avg_gain, avg_loss));

    for (i, change) in changes.iter().enumerate().skip(period) {
        avg_gain = (avg_gain * (p - 1.0) + change.max(0.0)) / p;
        avg_loss = (avg_loss * (p - 1.0) + (-change).max(0.0)) / p;
        out[i + 1] = Some(rsi_value(avg_gain, avg_loss));
    }
    out
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Macd {
    pub line: Vec<Option<f64>>,
    pub signal: Vec<Option<f64>>,
    pub histogram: Vec<Option<f64>>,
}

/// MACD line `EMA(fast) - EMA(slow)`, its `EMA(signal)` and the histogram.
#[must_use]
pub fn macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> Macd {
    let fast_ema = ema(closes, fast);
    let slow_ema = ema(closes, slow);
    let line: Vec<Option<f64>> = fast_ema
        .iter()
        .zip(&slow_ema)
        .map(|(f, s)| Some((*f)? - (*s)?))
        .collect();
    let signal_line = ema_defined(&line, signal);
    let histogram = line
        .iter()
        .zip(&signal_line)
        .map(|(m, s)| Some((*m)? - (*s)?))
        .collect();
    Macd {
        line,
        signal: signal_line,
        histogram,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bollinger {
    pub upper: Vec<Option<f64>>,
    pub middle: Vec<Option<f64>>,
    pub lower: Vec<Option<f64>>,
    /// `(upper - lower) / middle`.
    pub width: Vec<Option<f64>>,
}

/// Bollinger Bands: SMA(n) plus and minus `k` sample standard deviations.
#[must_use]
pub fn bollinger(closes: &[f64], n: usize, k: f64) -> Bollinger {
    let middle = sma(closes, n);
    let std: Vec<Option<f64>> = (0..closes.len())
        .map(|i| {
            if n == 0 || i + 1 < n {
                None
            } else {
                sample_std(&closes[i + 1 - n..=i])
            }
        })
        .collect();

    let upper: Vec<Option<f64>> = middle
        .iter()
        .zip(&std)
        .map(|(m, s)| Some((*m)? + k * (*s)?))
        .collect();
    let lower: Vec<Option<f64>> = middle
        .iter()
        .zip(&std)
        .map(|(m, s)| Some((*m)? - k * (*s)?))
        .collect();
    let width = (0..closes.len())
        .map(|i| {
            let m = middle[i]?;
            if m == 0.0 {
                return None;
            }
            Some((upper[i]? - lower[i]?) / m)
        })
        .collect();

    Bollinger {
        upper,
        middle,
        lower,
        width,
    }
}

/// Annualized historical volatility from the trailing `n` log returns.
#[must_use]
pub fn historical_volatility(closes: &[f64], n: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; closes.len()];
    if n < 2 || closes.len() <= n {
        return out;
    }
    let returns: Vec<Option<f64>> = closes
        .windows(2)
        .map(|w| (w[0] > 0.0 && w[1] > 0.0).then(|| (w[1] / w[0]).ln()))
        .collect();

    for i in n..closes.len() {
        let window: Option<Vec<f64>> = returns[i - n..i].iter().copied().collect();
        out[i] = window
            .and_then(|w| sample_std(&w))
            .map(|s| s * TRADING_DAYS.sqrt());
    }
    out
}

/// Fractional change against the value `k` bars earlier.
#[must_use]
pub fn pct_change(closes: &[f64], k: usize) -> Vec<Option<f64>> {
    (0..closes.len())
        .map(|i| {
            if k == 0 || i < k || closes[i - k] == 0.0 {
                None
            } else {
                Some(closes[i] / closes[i - k] - 1.0)
            }
        })
        .collect()
}

/// Every indicator of one price series, aligned by index with `dates`.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSet {
    pub dates: Vec<NaiveDate>,
    pub close: Vec<f64>,
    pub volume: Vec<Option<f64>>,
    pub sma20: Vec<Option<f64>>,
    pub sma50: Vec<Option<f64>>,
    pub sma200: Vec<Option<f64>>,
    pub rsi14: Vec<Option<f64>>,
    pub macd: Macd,
    pub bollinger: Bollinger,
    pub hv20: Vec<Option<f64>>,
    pub hv60: Vec<Option<f64>>,
    pub day_change: Vec<Option<f64>>,
    pub week_change: Vec<Option<f64>>,
    pub volume_sma20: Vec<Option<f64>>,
}

impl IndicatorSet {
    /// Computes all indicators over the bars that have a close.
    #[must_use]
    pub fn compute(series: &PriceSeries) -> Self {
        let (dates, close) = series.closes();
        let volume = series.volumes();
        Self {
            sma20: sma(&close, 20),
            sma50: sma(&close, 50),
            sma200: sma(&close, 200),
            rsi14: rsi(&close, 14),
            macd: macd(&close, 12, 26, 9),
            bollinger: bollinger(&close, 20, 2.0),
            hv20: historical_volatility(&close, 20),
            hv60: historical_volatility(&close, 60),
            day_change: pct_change(&close, 1),
            week_change: pct_change(&close, 5),
            volume_sma20: sma_optional(&volume, 20),
            dates,
            close,
            volume,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Indicator values at row `i`.
    #[must_use]
    pub fn row(&self, i: usize) -> Option<IndicatorSnapshot> {
        Some(IndicatorSnapshot {
            date: *self.dates.get(i)?,
            close: self.close[i],
            volume: self.volume[i],
            sma20: self.sma20[i],
            sma50: self.sma50[i],
            sma200: self.sma200[i],
            rsi14: self.rsi14[i],
            macd: self.macd.line[i],
            macd_signal: self.macd.signal[i],
            macd_histogram: self.macd.histogram[i],
            bb_upper: self.bollinger.upper[i],
            bb_lower: self.bollinger.lower[i],
            bb_width: self.bollinger.width[i],
            hv20: self.hv20[i],
            hv60: self.hv60[i],
            day_change: self.day_change[i],
            week_change: self.week_change[i],
            volume_sma20: self.volume_sma20[i],
        })
    }

    /// Latest row.
    #[must_use]
    pub fn snapshot(&self) -> Option<IndicatorSnapshot> {
        self.row(self.len().checked_sub(1)?)
    }
}

/// One row of an [`IndicatorSet`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorSnapshot {
    pub date: NaiveDate,
    pub close: f64,
    pub volume: Option<f64>,
    pub sma20: Option<f64>,
    pub sma50: Option<f64>,
    pub sma200: Option<f64>,
    pub rsi14: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_histogram: Option<f64>,
    pub bb_upper: Option<f64>,
    pub bb_lower: Option<f64>,
    pub bb_width: Option<f64>,
    pub hv20: Option<f64>,
    pub hv60: Option<f64>,
    pub day_change: Option<f64>,
    pub week_change: Option<f64>,
    pub volume_sma20: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirror_market_core::{PriceBar, Series};
    use rust_decimal::Decimal;

    fn ramp(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 + i as f64).collect()
    }

    // ============================================
    // Moving averages
    // ============================================

    #[test]
    fn sma_of_constant_series_is_exact() {
        let closes = vec![13.37; 60];
        let out = sma(&closes, 20);
        assert!(out[..19].iter().all(Option::is_none));
        assert!(out[19..].iter().all(|v| *v == Some(13.37)));
    }

    #[test]
    fn sma_distinguishes_gap_from_zero() {
        let closes = vec![0.0; 5];
        let out = sma(&closes, 3);
        assert_eq!(out, vec![None, None, Some(0.0), Some(0.0), Some(0.0)]);
    }

    #[test]
    fn ema_seeds_with_sma() {
        let values = [1.0, 2.0, 3.0, 4.0];
        let out = ema(&values, 3);
        assert_eq!(out[1], None);
        assert_eq!(out[2], Some(2.0));
        assert!((out[3].unwrap() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn sma_optional_skips_windows_with_gaps() {
        let values = [Some(1.0), None, Some(3.0), Some(5.0)];
        assert_eq!(sma_optional(&values, 2), vec![None, None, None, Some(4.0)]);
    }

    // ============================================
    // RSI
    // ============================================

    #[test]
    fn rsi_first_value_at_period() {
        let out = rsi(&ramp(20), 14);
        assert!(out[..14].iter().all(Option::is_none));
        assert!(out[14].is_some());
    }

    #[test]
    fn rsi_of_rising_series_is_100() {
        let out = rsi(&ramp(20), 14);
        assert_eq!(out[19], Some(100.0));
    }

    #[test]
    fn rsi_is_idempotent() {
        let closes: Vec<f64> = (0..40).map(|i| 50.0 + (i as f64 * 0.7).sin() * 5.0).collect();
        assert_eq!(rsi(&closes, 14), rsi(&closes, 14));
    }

    #[test]
    fn rsi_of_alternating_series_is_midrange() {
        let closes: Vec<f64> = (0..30).map(|i| if i % 2 == 0 { 10.0 } else { 11.0 }).collect();
        let last = rsi(&closes, 14)[29].unwrap();
        assert!(last > 40.0 && last < 60.0, "rsi was {last}");
    }

    // ============================================
    // MACD, Bollinger, volatility
    // ============================================

    #[test]
    fn macd_availability_follows_windows() {
        let out = macd(&ramp(60), 12, 26, 9);
        assert!(out.line[24].is_none());
        assert!(out.line[25].is_some());
        assert!(out.signal[32].is_none());
        assert!(out.signal[33].is_some());
        assert!(out.histogram[33].is_some());
    }

    #[test]
    fn bollinger_collapses_on_constant_series() {
        let bands = bollinger(&[5.0; 25], 20, 2.0);
        assert_eq!(bands.upper[24], Some(5.0));
        assert_eq!(bands.lower[24], Some(5.0));
        assert_eq!(bands.width[24], Some(0.0));
        assert!(bands.middle[18].is_none());
    }

    #[test]
    fn bollinger_uses_sample_std() {
        let closes: Vec<f64> = (1..=20).map(f64::from).collect();
        let bands = bollinger(&closes, 20, 2.0);
        // sample variance of 1..=20 is 35
        let expected = 10.5 + 2.0 * 35.0_f64.sqrt();
        assert!((bands.upper[19].unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn volatility_needs_n_returns() {
        let closes: Vec<f64> = (0..22).map(|i| 100.0 * 1.01_f64.powi(i)).collect();
        let out = historical_volatility(&closes, 20);
        assert!(out[19].is_none());
        assert!(out[20].is_some());
        // constant log return has zero dispersion
        assert!(out[21].unwrap().abs() < 1e-9);
    }

    #[test]
    fn pct_change_day_and_week() {
        let closes = [100.0, 110.0, 99.0, 100.0, 100.0, 120.0];
        let day = pct_change(&closes, 1);
        let week = pct_change(&closes, 5);
        assert!((day[1].unwrap() - 0.10).abs() < 1e-12);
        assert!((week[5].unwrap() - 0.20).abs() < 1e-12);
        assert!(week[4].is_none());
    }

    #[test]
    fn indicator_set_snapshot_reads_last_row() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let bars = (0..30)
            .map(|i| {
                PriceBar::close_only(start + chrono::Duration::days(i), Decimal::from(100 + i))
                    .with_volume(Decimal::from(1000))
            })
            .collect();
        let set = IndicatorSet::compute(&Series::new(bars));

        let snap = set.snapshot().unwrap();
        assert_eq!(set.len(), 30);
        assert_eq!(snap.close, 129.0);
        assert_eq!(snap.volume_sma20, Some(1000.0));
        assert!(snap.sma50.is_none());
        assert_eq!(snap.rsi14, Some(100.0));
    }
}
