use std::cmp::Ordering;
use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Signal severity. Variants are declared in ascending order so the derived
/// `Ord` gives `Alert > Warning > Info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Alert,
}

impl Severity {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Alert => "alert",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of technical signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    MaCrossMinor,
    MaCrossMajor,
    RsiExtreme,
    RsiDivergence,
    MacdCross,
    BbSqueeze,
    VolumeSpike,
}

impl SignalKind {
    /// Presentation priority, lower first: major trend, then momentum, then
    /// volatility and volume.
    #[must_use]
    pub fn priority(&self) -> u8 {
        match self {
            Self::MaCrossMajor => 0,
            Self::MaCrossMinor => 1,
            Self::RsiDivergence => 2,
            Self::MacdCross => 3,
            Self::RsiExtreme => 4,
            Self::BbSqueeze => 5,
            Self::VolumeSpike => 6,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MaCrossMinor => "ma_cross_minor",
            Self::MaCrossMajor => "ma_cross_major",
            Self::RsiExtreme => "rsi_extreme",
            Self::RsiDivergence => "rsi_divergence",
            Self::MacdCross => "macd_cross",
            Self::BbSqueeze => "bb_squeeze",
            Self::VolumeSpike => "volume_spike",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A discrete signal emitted by the detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalEvent {
    pub entity_key: String,
    pub kind: SignalKind,
    pub severity: Severity,
    pub message: String,
    pub as_of_date: NaiveDate,
}

impl SignalEvent {
    #[must_use]
    pub fn new(
        entity_key: impl Into<String>,
        kind: SignalKind,
        severity: Severity,
        message: impl Into<String>,
        as_of_date: NaiveDate,
    ) -> Self {
        Self {
            entity_key: entity_key.into(),
            kind,
            severity,
            message: message.into(),
            as_of_date,
        }
    }

    /// Presentation order: severity descending, then kind priority, entity
    /// name, and date.
    #[must_use]
    pub fn presentation_cmp(&self, other: &Self) -> Ordering {
        other
            .severity
            .cmp(&self.severity)
            .then_with(|| self.kind.priority().cmp(&other.kind.priority()))
            .then_with(|| self.entity_key.cmp(&other.entity_key))
            .then_with(|| self.as_of_date.cmp(&other.as_of_date))
    }
}

/// Output of one Market-Drivers rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverInsight {
    pub rule_id: String,
    pub message: String,
    pub supporting_values: Vec<(String, f64)>,
}

impl DriverInsight {
    #[must_use]
    pub fn new(rule_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            rule_id: rule_id.into(),
            message: message.into(),
            supporting_values: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_value(mut self, name: impl Into<String>, value: f64) -> Self {
        self.supporting_values.push((name.into(), value));
        self
    }
}

/// Advisory data-quality finding. Never blocks the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationWarning {
    pub entity: String,
    pub date: NaiveDate,
    pub kind: WarningKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WarningKind {
    /// Close moved more than the large-move threshold in one bar.
    LargeMove { change: Decimal },
    /// Volume present but zero or negative.
    NonPositiveVolume { volume: Decimal },
    /// Run of incomplete records longer than the fill limit.
    LongGap { records: usize },
    /// Close unchanged for several consecutive bars.
    FlatPrice { bars: usize },
}

impl ValidationWarning {
    #[must_use]
    pub fn new(entity: impl Into<String>, date: NaiveDate, kind: WarningKind) -> Self {
        Self {
            entity: entity.into(),
            date,
            kind,
        }
    }
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            WarningKind::LargeMove { change } => write!(
                f,
                "{} large daily move on {}: {:+.1}%",
                self.entity,
                self.date,
                change * Decimal::ONE_HUNDRED
            ),
            WarningKind::NonPositiveVolume { volume } => write!(
                f,
                "{} zero/negative volume on {} ({})",
                self.entity, self.date, volume
            ),
            WarningKind::LongGap { records } => write!(
                f,
                "{} gap of {} missing records ending {} dropped",
                self.entity, records, self.date
            ),
            WarningKind::FlatPrice { bars } => write!(
                f,
                "{} close unchanged for {} bars through {} (possible stale data)",
                self.entity, bars, self.date
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
    }

    #[test]
    fn severity_total_order() {
        assert!(Severity::Alert > Severity::Warning);
        assert!(Severity::Warning > Severity::Info);
        let mut all = vec![Severity::Info, Severity::Alert, Severity::Warning];
        all.sort();
        assert_eq!(all, vec![Severity::Info, Severity::Warning, Severity::Alert]);
    }

    #[test]
    fn presentation_order_ranks_severity_then_kind_then_entity() {
        let mut events = vec![
            SignalEvent::new("Corn", SignalKind::VolumeSpike, Severity::Info, "", date()),
            SignalEvent::new("Wheat", SignalKind::MaCrossMinor, Severity::Warning, "", date()),
            SignalEvent::new("Corn", SignalKind::RsiDivergence, Severity::Warning, "", date()),
            SignalEvent::new("Soybeans", SignalKind::MaCrossMajor, Severity::Alert, "", date()),
            SignalEvent::new("Coffee", SignalKind::MaCrossMinor, Severity::Warning, "", date()),
        ];
        events.sort_by(SignalEvent::presentation_cmp);

        let order: Vec<(&str, SignalKind)> = events
            .iter()
            .map(|e| (e.entity_key.as_str(), e.kind))
            .collect();
        assert_eq!(
            order,
            vec![
                ("Soybeans", SignalKind::MaCrossMajor),
                ("Coffee", SignalKind::MaCrossMinor),
                ("Wheat", SignalKind::MaCrossMinor),
                ("Corn", SignalKind::RsiDivergence),
                ("Corn", SignalKind::VolumeSpike),
            ]
        );
    }

    #[test]
    fn warning_display_mentions_entity() {
        let w = ValidationWarning::new("Coffee", date(), WarningKind::LargeMove { change: dec!(0.125) });
        let text = w.to_string();
        assert!(text.contains("Coffee"));
        assert!(text.contains("+12.5%"));
    }

    #[test]
    fn driver_insight_collects_values() {
        let insight = DriverInsight::new("dollar", "Dollar strengthening")
            .with_value("change_pct", 0.8);
        assert_eq!(insight.supporting_values.len(), 1);
        assert_eq!(insight.supporting_values[0].0, "change_pct");
    }
}
