//! Data-health checks on cleaned series.

use mirror_market_core::{PriceSeries, ValidationWarning, WarningKind};

/// Flags a series whose last `bars` closes are identical, a usual sign of a
/// source that stopped updating.
#[must_use]
pub fn flat_price(entity: &str, series: &PriceSeries, bars: usize) -> Option<ValidationWarning> {
    if bars < 2 {
        return None;
    }
    let closes: Vec<_> = series
        .records()
        .iter()
        .filter_map(|bar| bar.close.map(|c| (bar.date, c)))
        .collect();
    let tail = closes.get(closes.len().checked_sub(bars)?..)?;
    let (last_date, last_close) = *tail.last()?;
    tail.iter()
        .all(|(_, c)| *c == last_close)
        .then(|| ValidationWarning::new(entity, last_date, WarningKind::FlatPrice { bars }))
}
