//! Signal Detector.
//!
//! Scans an [`IndicatorSet`] bar by bar and emits a [`SignalEvent`] wherever a
//! pattern completes. A rule is evaluated only on bars where every indicator
//! it needs is defined.

use chrono::Duration;
use mirror_market_core::{Severity, SignalConfig, SignalEvent, SignalKind};
use tracing::debug;

use crate::indicators::IndicatorSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cross {
    Above,
    Below,
}

/// Direction of a crossover between two lines from bar `i - 1` to bar `i`.
fn crossover(
    fast: &[Option<f64>],
    slow: &[Option<f64>],
    i: usize,
) -> Option<Cross> {
    let (f0, s0, f1, s1) = (fast[i - 1]?, slow[i - 1]?, fast[i]?, slow[i]?);
    if f0 <= s0 && f1 > s1 {
        Some(Cross::Above)
    } else if f0 >= s0 && f1 < s1 {
        Some(Cross::Below)
    } else {
        None
    }
}

#[derive(Debug, Clone, Default)]
pub struct SignalDetector {
    config: SignalConfig,
}

impl SignalDetector {
    #[must_use]
    pub fn new(config: SignalConfig) -> Self {
        Self { config }
    }

    /// Every signal over the full history of one entity, in date order.
    #[must_use]
    pub fn detect(&self, entity: &str, ind: &IndicatorSet) -> Vec<SignalEvent> {
        let mut events = Vec::new();
        for i in 1..ind.len() {
            self.ma_crosses(entity, ind, i, &mut events);
            self.rsi_extreme(entity, ind, i, &mut events);
            self.rsi_divergence(entity, ind, i, &mut events);
            self.macd_cross(entity, ind, i, &mut events);
            self.bb_squeeze(entity, ind, i, &mut events);
            self.volume_spike(entity, ind, i, &mut events);
        }
        debug!(entity, bars = ind.len(), signals = events.len(), "detected signals");
        events
    }

    /// Signals dated within `signal_window_days` of the entity's latest bar.
    #[must_use]
    pub fn detect_recent(&self, entity: &str, ind: &IndicatorSet) -> Vec<SignalEvent> {
        let Some(latest) = ind.dates.last().copied() else {
            return Vec::new();
        };
        let cutoff = latest - Duration::days(self.config.signal_window_days);
        self.detect(entity, ind)
            .into_iter()
            .filter(|e| e.as_of_date >= cutoff)
            .collect()
    }

    fn ma_crosses(&self, entity: &str, ind: &IndicatorSet, i: usize, out: &mut Vec<SignalEvent>) {
        let pairs = [
            (&ind.sma20, &ind.sma50, SignalKind::MaCrossMinor, Severity::Warning, "20-day", "50-day", ""),
            (&ind.sma50, &ind.sma200, SignalKind::MaCrossMajor, Severity::Alert, "50-day", "200-day", "MAJOR "),
        ];
        for (fast, slow, kind, severity, fast_name, slow_name, prefix) in pairs {
            if let Some(cross) = crossover(fast, slow, i) {
                let message = match cross {
                    Cross::Above => format!(
                        "{entity} {prefix}golden cross ({fast_name} MA crossed above {slow_name} MA)"
                    ),
                    Cross::Below => format!(
                        "{entity} {prefix}death cross ({fast_name} MA crossed below {slow_name} MA)"
                    ),
                };
                out.push(SignalEvent::new(entity, kind, severity, message, ind.dates[i]));
            }
        }
    }

    fn rsi_extreme(&self, entity: &str, ind: &IndicatorSet, i: usize, out: &mut Vec<SignalEvent>) {
        let (Some(prev), Some(cur)) = (ind.rsi14[i - 1], ind.rsi14[i]) else {
            return;
        };
        let c = &self.config;
        let crossed_above = |level: f64| prev <= level && cur > level;
        let crossed_below = |level: f64| prev >= level && cur < level;

        let found = if crossed_above(c.rsi_severe_overbought) {
            Some((Severity::Warning, "overbought"))
        } else if crossed_above(c.rsi_overbought) {
            Some((Severity::Info, "overbought"))
        } else if crossed_below(c.rsi_severe_oversold) {
            Some((Severity::Warning, "oversold"))
        } else if crossed_below(c.rsi_oversold) {
            Some((Severity::Info, "oversold"))
        } else {
            None
        };

        if let Some((severity, label)) = found {
            out.push(SignalEvent::new(
                entity,
                SignalKind::RsiExtreme,
                severity,
                format!("{entity} RSI {label} ({cur:.0})"),
                ind.dates[i],
            ));
        }
    }

    fn rsi_divergence(&self, entity: &str, ind: &IndicatorSet, i: usize, out: &mut Vec<SignalEvent>) {
        let n = self.config.divergence_lookback;
        if i < n {
            return;
        }
        let Some(rsi_now) = ind.rsi14[i] else {
            return;
        };
        let close_now = ind.close[i];
        let closes = &ind.close[i - n..i];
        let rsis: Vec<f64> = ind.rsi14[i - n..i].iter().flatten().copied().collect();
        if rsis.is_empty() {
            return;
        }
        let margin = self.config.divergence_rsi_margin;

        let price_high = closes.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let rsi_high = rsis.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if close_now >= price_high && rsi_now < rsi_high - margin {
            out.push(SignalEvent::new(
                entity,
                SignalKind::RsiDivergence,
                Severity::Warning,
                format!(
                    "{entity} bearish RSI divergence (new {n}-bar high but RSI {rsi_now:.0} below prior {rsi_high:.0})"
                ),
                ind.dates[i],
            ));
        }

        let price_low = closes.iter().copied().fold(f64::INFINITY, f64::min);
        let rsi_low = rsis.iter().copied().fold(f64::INFINITY, f64::min);
        if close_now <= price_low && rsi_now > rsi_low + margin {
            out.push(SignalEvent::new(
                entity,
                SignalKind::RsiDivergence,
                Severity::Warning,
                format!(
                    "{entity} bullish RSI divergence (new {n}-bar low but RSI {rsi_now:.0} above prior {rsi_low:.0})"
                ),
                ind.dates[i],
            ));
        }
    }

    fn macd_cross(&self, entity: &str, ind: &IndicatorSet, i: usize, out: &mut Vec<SignalEvent>) {
        let message = match crossover(&ind.macd.line, &ind.macd.signal, i) {
            Some(Cross::Above) => format!("{entity} MACD bullish crossover (momentum turning up)"),
            Some(Cross::Below) => format!("{entity} MACD bearish crossover (momentum turning down)"),
            None => return,
        };
        out.push(SignalEvent::new(
            entity,
            SignalKind::MacdCross,
            Severity::Info,
            message,
            ind.dates[i],
        ));
    }

    fn bb_squeeze(&self, entity: &str, ind: &IndicatorSet, i: usize, out: &mut Vec<SignalEvent>) {
        let window = self.config.squeeze_window;
        if window < 2 || i + 1 < window {
            return;
        }
        let widths: Option<Vec<f64>> = ind.bollinger.width[i + 1 - window..=i].iter().copied().collect();
        let Some(widths) = widths else {
            return;
        };
        let current = widths[widths.len() - 1];
        let lowest = widths.iter().copied().fold(f64::INFINITY, f64::min);
        if current <= lowest * (1.0 + self.config.squeeze_tolerance) {
            out.push(SignalEvent::new(
                entity,
                SignalKind::BbSqueeze,
                Severity::Info,
                format!(
                    "{entity} Bollinger Band squeeze (width at {window}-bar low, breakout likely)"
                ),
                ind.dates[i],
            ));
        }
    }

    fn volume_spike(&self, entity: &str, ind: &IndicatorSet, i: usize, out: &mut Vec<SignalEvent>) {
        let (Some(volume), Some(avg)) = (ind.volume[i], ind.volume_sma20[i]) else {
            return;
        };
        if avg <= 0.0 {
            return;
        }
        if volume > self.config.volume_spike_multiplier * avg {
            out.push(SignalEvent::new(
                entity,
                SignalKind::VolumeSpike,
                Severity::Info,
                format!("{entity} volume spike ({:.1}x normal)", volume / avg),
                ind.dates[i],
            ));
        }
    }
}

/// Sorts for presentation: severity descending, then kind priority, entity and date.
#[must_use]
pub fn rank_signals(mut events: Vec<SignalEvent>) -> Vec<SignalEvent> {
    events.sort_by(SignalEvent::presentation_cmp);
    events
}
