//! Treasury yield-curve shape from the 10Y minus 2Y spread.

use std::fmt;

use mirror_market_core::ScalarSeries;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum YieldCurveShape {
    Inverted,
    Flat,
    Normal,
}

impl fmt::Display for YieldCurveShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Inverted => "INVERTED (recession signal)",
            Self::Flat => "FLAT",
            Self::Normal => "Normal",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct YieldCurve {
    pub short_rate: f64,
    pub long_rate: f64,
    pub spread: f64,
    pub shape: YieldCurveShape,
}

#[must_use]
pub fn classify_spread(spread: f64, flat_threshold: f64) -> YieldCurveShape {
    if spread < 0.0 {
        YieldCurveShape::Inverted
    } else if spread < flat_threshold {
        YieldCurveShape::Flat
    } else {
        YieldCurveShape::Normal
    }
}

/// Shape from the latest values of the short and long tenor series.
#[must_use]
pub fn yield_curve(short: &ScalarSeries, long: &ScalarSeries, flat_threshold: f64) -> Option<YieldCurve> {
    let short_rate = short.last_value()?.to_f64()?;
    let long_rate = long.last_value()?.to_f64()?;
    let spread = long_rate - short_rate;
    Some(YieldCurve {
        short_rate,
        long_rate,
        spread,
        shape: classify_spread(spread, flat_threshold),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use mirror_market_core::{ScalarPoint, Series};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn rate(value: Decimal) -> ScalarSeries {
        Series::new(vec![ScalarPoint::new(
            NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
            value,
        )])
    }

    #[test]
    fn thresholds() {
        assert_eq!(classify_spread(-0.1, 0.5), YieldCurveShape::Inverted);
        assert_eq!(classify_spread(0.0, 0.5), YieldCurveShape::Flat);
        assert_eq!(classify_spread(0.5, 0.5), YieldCurveShape::Normal);
    }

    #[test]
    fn inverted_curve_from_series() {
        let curve = yield_curve(&rate(dec!(4.9)), &rate(dec!(4.3)), 0.5).unwrap();
        assert!((curve.spread + 0.6).abs() < 1e-9);
        assert_eq!(curve.shape, YieldCurveShape::Inverted);
    }

    #[test]
    fn missing_tenor_is_none() {
        assert!(yield_curve(&Series::default(), &rate(dec!(4.3)), 0.5).is_none());
    }
}
