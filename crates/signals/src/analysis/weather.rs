//! Weather alerts for growing regions, from each region's latest observation.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use mirror_market_core::{WeatherSeries, WeatherThresholds};
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WeatherAlertKind {
    HeavyRain { precipitation_mm: f64 },
    Dry { precipitation_mm: f64 },
    ExtremeHeat { temp_max_c: f64 },
}

impl WeatherAlertKind {
    /// Heavy rain and extreme heat move crop prices; dry spells only warrant
    /// watching.
    #[must_use]
    pub fn is_price_relevant(&self) -> bool {
        matches!(self, Self::HeavyRain { .. } | Self::ExtremeHeat { .. })
    }
}

impl fmt::Display for WeatherAlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HeavyRain { precipitation_mm } => {
                write!(f, "Heavy rain ({precipitation_mm:.0}mm), harvest delays possible")
            }
            Self::Dry { .. } => f.write_str("Dry conditions, watch soil moisture"),
            Self::ExtremeHeat { temp_max_c } => {
                write!(f, "Extreme heat ({temp_max_c:.0}C), crop stress risk")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherAlert {
    pub region: String,
    pub date: NaiveDate,
    pub kind: WeatherAlertKind,
}

/// Alerts raised by the latest observation of every region, in region order.
#[must_use]
pub fn weather_alerts(
    regions: &BTreeMap<String, WeatherSeries>,
    thresholds: &WeatherThresholds,
) -> Vec<WeatherAlert> {
    let mut alerts = Vec::new();
    for (region, series) in regions {
        let Some(latest) = series.last() else {
            continue;
        };
        let alert = |kind| WeatherAlert {
            region: region.clone(),
            date: latest.date,
            kind,
        };

        if let Some(precip) = latest.precipitation_mm.and_then(|p| p.to_f64()) {
            if precip > thresholds.heavy_rain_mm {
                alerts.push(alert(WeatherAlertKind::HeavyRain {
                    precipitation_mm: precip,
                }));
            } else if precip < thresholds.dry_mm {
                alerts.push(alert(WeatherAlertKind::Dry {
                    precipitation_mm: precip,
                }));
            }
        }
        if let Some(temp) = latest.temp_max_c.and_then(|t| t.to_f64()) {
            if temp > thresholds.extreme_heat_c {
                alerts.push(alert(WeatherAlertKind::ExtremeHeat { temp_max_c: temp }));
            }
        }
    }
    alerts
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirror_market_core::{Series, WeatherObservation};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn obs(precip: Decimal, temp: Decimal) -> WeatherSeries {
        Series::new(vec![WeatherObservation {
            date: NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            precipitation_mm: Some(precip),
            temp_max_c: Some(temp),
            temp_min_c: None,
        }])
    }

    #[test]
    fn classifies_latest_observation() {
        let mut regions = BTreeMap::new();
        regions.insert("Mato Grosso".to_string(), obs(dec!(32), dec!(39.5)));
        regions.insert("Iowa".to_string(), obs(dec!(0.2), dec!(25)));
        regions.insert("Parana".to_string(), obs(dec!(5), dec!(30)));

        let alerts = weather_alerts(&regions, &WeatherThresholds::default());
        assert_eq!(alerts.len(), 3);
        assert_eq!(alerts[0].region, "Iowa");
        assert!(matches!(alerts[0].kind, WeatherAlertKind::Dry { .. }));
        assert!(!alerts[0].kind.is_price_relevant());
        assert!(alerts[1..].iter().all(|a| a.region == "Mato Grosso"));
        assert!(alerts[1..].iter().all(|a| a.kind.is_price_relevant()));
        assert_eq!(
            alerts[1].kind.to_string(),
            "Heavy rain (32mm), harvest delays possible"
        );
    }
}
