//! Commitments of Traders positioning summary.

use mirror_market_core::PositioningSeries;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PositioningSummary {
    pub commercial_net: Option<i64>,
    pub speculative_net: i64,
    /// Share of history (0..=100) at or below the latest speculative net.
    pub speculative_percentile: f64,
    pub reports: usize,
}

impl PositioningSummary {
    #[must_use]
    pub fn describe(&self) -> String {
        let side = |net: i64| if net > 0 { "long" } else { "short" };
        let mut parts = Vec::new();
        if let Some(comm) = self.commercial_net {
            parts.push(format!("Commercials net {} {}", side(comm), comm.unsigned_abs()));
        }
        parts.push(format!(
            "Specs net {} {} ({:.0}th pct)",
            side(self.speculative_net),
            self.speculative_net.unsigned_abs(),
            self.speculative_percentile
        ));
        parts.join(", ")
    }
}

/// Latest nets and the percentile rank of the speculative net in its own history.
#[must_use]
pub fn summarize_positioning(series: &PositioningSeries) -> Option<PositioningSummary> {
    let history: Vec<i64> = series
        .records()
        .iter()
        .filter_map(|r| r.noncommercial_net)
        .collect();
    let latest_record = series
        .records()
        .iter()
        .rev()
        .find(|r| r.noncommercial_net.is_some())?;
    let speculative_net = latest_record.noncommercial_net?;

    let at_or_below = history.iter().filter(|v| **v <= speculative_net).count();
    Some(PositioningSummary {
        commercial_net: latest_record.commercial_net,
        speculative_net,
        speculative_percentile: at_or_below as f64 / history.len() as f64 * 100.0,
        reports: history.len(),
    })
}
