//! Forward-curve structure: contango, backwardation, calendar spreads.

use std::fmt;

use chrono::NaiveDate;
use mirror_market_core::CurvePoint;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CurveStructure {
    Contango,
    Backwardation,
    Mixed,
}

impl fmt::Display for CurveStructure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Contango => "Contango",
            Self::Backwardation => "Backwardation",
            Self::Mixed => "Mixed",
        })
    }
}

impl CurveStructure {
    #[must_use]
    pub fn implication(&self) -> &'static str {
        match self {
            Self::Contango => "adequate supply, carrying costs priced in",
            Self::Backwardation => "tight supply, strong nearby demand",
            Self::Mixed => "mixed signals across the curve",
        }
    }
}

/// Contango if prices never fall along the curve, backwardation if they never
/// rise, mixed otherwise. A flat curve counts as contango.
#[must_use]
pub fn classify(prices: &[Decimal]) -> CurveStructure {
    if prices.windows(2).all(|w| w[1] >= w[0]) {
        CurveStructure::Contango
    } else if prices.windows(2).all(|w| w[1] <= w[0]) {
        CurveStructure::Backwardation
    } else {
        CurveStructure::Mixed
    }
}

/// Mean month-over-month price delta along the curve.
#[must_use]
pub fn slope(prices: &[Decimal]) -> Option<Decimal> {
    if prices.len() < 2 {
        return None;
    }
    let steps = Decimal::from(prices.len() - 1);
    Some((prices[prices.len() - 1] - prices[0]) / steps)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarSpread {
    pub near_label: String,
    pub far_label: String,
    /// Far minus near.
    pub spread: Decimal,
    pub spread_pct: Option<f64>,
}

fn spread_between(near: &CurvePoint, far: &CurvePoint) -> CalendarSpread {
    let spread = far.close - near.close;
    let spread_pct = (!near.close.is_zero())
        .then(|| (spread / near.close * Decimal::ONE_HUNDRED).to_f64())
        .flatten();
    CalendarSpread {
        near_label: near.label.clone(),
        far_label: far.label.clone(),
        spread,
        spread_pct,
    }
}

/// Spread between two contract months present on the curve.
#[must_use]
pub fn calendar_spread(curve: &[CurvePoint], near: NaiveDate, far: NaiveDate) -> Option<CalendarSpread> {
    let find = |month: NaiveDate| curve.iter().find(|p| p.contract_month == month);
    Some(spread_between(find(near)?, find(far)?))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurveAnalysis {
    pub structure: CurveStructure,
    pub front: CurvePoint,
    pub back: CurvePoint,
    /// Back minus front.
    pub front_back: CalendarSpread,
    pub slope: Decimal,
    pub contracts: usize,
}

impl CurveAnalysis {
    #[must_use]
    pub fn summary(&self) -> String {
        let pct = self
            .front_back
            .spread_pct
            .map_or_else(String::new, |p| format!(", {p:+.1}%"));
        format!(
            "{}: {} {:.2} -> {} {:.2} ({:+.2}{pct}), {}",
            self.structure,
            self.front.label,
            self.front.close,
            self.back.label,
            self.back.close,
            self.front_back.spread,
            self.structure.implication()
        )
    }
}

/// Analyzes a curve; points are sorted by contract month first.
#[must_use]
pub fn analyze_curve(points: &[CurvePoint]) -> Option<CurveAnalysis> {
    if points.len() < 2 {
        return None;
    }
    let mut sorted = points.to_vec();
    sorted.sort_by_key(|p| p.contract_month);
    let prices: Vec<Decimal> = sorted.iter().map(|p| p.close).collect();

    let front = sorted[0].clone();
    let back = sorted[sorted.len() - 1].clone();
    Some(CurveAnalysis {
        structure: classify(&prices),
        front_back: spread_between(&front, &back),
        slope: slope(&prices)?,
        contracts: sorted.len(),
        front,
        back,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn curve(prices: &[Decimal]) -> Vec<CurvePoint> {
        prices
            .iter()
            .enumerate()
            .map(|(i, close)| {
                let month = NaiveDate::from_ymd_opt(2025, 3 + 2 * i as u32, 1).unwrap();
                CurvePoint {
                    contract_month: month,
                    label: month.format("%b %y").to_string(),
                    close: *close,
                }
            })
            .collect()
    }

    #[test]
    fn contango_and_backwardation() {
        assert_eq!(
            classify(&[dec!(10), dec!(10.1), dec!(10.3), dec!(10.6)]),
            CurveStructure::Contango
        );
        assert_eq!(
            classify(&[dec!(10.6), dec!(10.3), dec!(10.1), dec!(10)]),
            CurveStructure::Backwardation
        );
        assert_eq!(
            classify(&[dec!(10), dec!(10.4), dec!(10.2)]),
            CurveStructure::Mixed
        );
        assert_eq!(classify(&[dec!(5), dec!(5)]), CurveStructure::Contango);
    }

    #[test]
    fn slope_is_mean_step() {
        assert_eq!(slope(&[dec!(10), dec!(10.1), dec!(10.3), dec!(10.6)]), Some(dec!(0.2)));
        assert_eq!(slope(&[dec!(10)]), None);
    }

    #[test]
    fn analysis_sorts_and_measures_front_back() {
        let mut points = curve(&[dec!(10), dec!(10.1), dec!(10.3), dec!(10.6)]);
        points.reverse();
        let analysis = analyze_curve(&points).unwrap();

        assert_eq!(analysis.structure, CurveStructure::Contango);
        assert_eq!(analysis.front.close, dec!(10));
        assert_eq!(analysis.front_back.spread, dec!(0.6));
        assert!((analysis.front_back.spread_pct.unwrap() - 6.0).abs() < 1e-9);
        assert_eq!(analysis.contracts, 4);
        assert!(analysis.summary().starts_with("Contango"));
    }

    #[test]
    fn calendar_spread_between_months() {
        let points = curve(&[dec!(4.50), dec!(4.62), dec!(4.70)]);
        let spread = calendar_spread(
            &points,
            points[0].contract_month,
            points[2].contract_month,
        )
        .unwrap();
        assert_eq!(spread.spread, dec!(0.20));

        let missing = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
        assert!(calendar_spread(&points, missing, points[1].contract_month).is_none());
    }
}
