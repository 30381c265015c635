//! Currency moves and economic-indicator context.

use mirror_market_core::ScalarSeries;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrencyMove {
    pub pair: String,
    pub latest: f64,
    /// Percent change over the configured window of bars.
    pub change_pct: Option<f64>,
}

impl CurrencyMove {
    /// Whether the quoted currency lost value against USD over the window.
    #[must_use]
    pub fn weakened(&self) -> Option<bool> {
        self.change_pct.map(|c| c < 0.0)
    }
}

#[must_use]
pub fn currency_move(pair: &str, series: &ScalarSeries, window: usize) -> Option<CurrencyMove> {
    Some(CurrencyMove {
        pair: pair.to_string(),
        latest: series.last_value()?.to_f64()?,
        change_pct: series.change_over(window).map(|c| c * 100.0),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EconomicReading {
    pub series: String,
    pub latest: f64,
    pub previous: Option<f64>,
    pub change_pct: Option<f64>,
}

impl EconomicReading {
    #[must_use]
    pub fn direction(&self) -> Option<&'static str> {
        let (latest, previous) = (self.latest, self.previous?);
        Some(if latest > previous { "up" } else { "down" })
    }
}

/// Latest observation and its change against the previous one.
#[must_use]
pub fn economic_reading(name: &str, series: &ScalarSeries) -> Option<EconomicReading> {
    let (_, values) = series.values();
    let latest = *values.last()?;
    let previous = values.len().checked_sub(2).map(|i| values[i]);
    let change_pct = previous
        .filter(|p| *p != 0.0)
        .map(|p| (latest - p) / p * 100.0);
    Some(EconomicReading {
        series: name.to_string(),
        latest,
        previous,
        change_pct,
    })
}
