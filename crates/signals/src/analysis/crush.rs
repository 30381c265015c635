//! Soybean board crush.
//!
//! `spread = oil * 11 + meal * 2.2 - beans`, with oil in cents/lb, meal in
//! $/short ton and beans in cents/bushel, giving cents per bushel.

use chrono::NaiveDate;
use mirror_market_core::PriceSeries;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

const OIL_YIELD: Decimal = dec!(11);
const MEAL_YIELD: Decimal = dec!(2.2);

#[must_use]
pub fn crush_spread(oil: Decimal, meal: Decimal, beans: Decimal) -> Decimal {
    oil * OIL_YIELD + meal * MEAL_YIELD - beans
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrushPoint {
    pub date: NaiveDate,
    pub beans: Decimal,
    pub oil: Decimal,
    pub meal: Decimal,
    pub spread: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CrushTrend {
    Widening,
    Narrowing,
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrushAnalysis {
    pub series: Vec<CrushPoint>,
    pub latest: CrushPoint,
    /// Change over the trend window, if the series is long enough.
    pub change: Option<Decimal>,
    pub trend: Option<CrushTrend>,
}

impl CrushAnalysis {
    #[must_use]
    pub fn is_profitable(&self) -> bool {
        self.latest.spread > Decimal::ZERO
    }

    #[must_use]
    pub fn margin_label(&self) -> &'static str {
        if self.is_profitable() {
            "processors profitable"
        } else {
            "margin squeeze"
        }
    }
}

/// Spread on every date where all three legs have a close.
#[must_use]
pub fn crush_series(beans: &PriceSeries, oil: &PriceSeries, meal: &PriceSeries) -> Vec<CrushPoint> {
    beans
        .records()
        .iter()
        .filter_map(|bar| {
            let date = bar.date;
            let beans = bar.close?;
            let oil = oil.close_on(date)?;
            let meal = meal.close_on(date)?;
            Some(CrushPoint {
                date,
                beans,
                oil,
                meal,
                spread: crush_spread(oil, meal, beans),
            })
        })
        .collect()
}

/// Latest spread, its sign, and the trend against `trend_window` points back.
#[must_use]
pub fn analyze_crush(
    beans: &PriceSeries,
    oil: &PriceSeries,
    meal: &PriceSeries,
    trend_window: usize,
) -> Option<CrushAnalysis> {
    let series = crush_series(beans, oil, meal);
    let latest = series.last()?.clone();

    let change = (trend_window > 0 && series.len() > trend_window)
        .then(|| latest.spread - series[series.len() - 1 - trend_window].spread);
    let trend = change.map(|c| match c.cmp(&Decimal::ZERO) {
        std::cmp::Ordering::Greater => CrushTrend::Widening,
        std::cmp::Ordering::Less => CrushTrend::Narrowing,
        std::cmp::Ordering::Equal => CrushTrend::Unchanged,
    });

    Some(CrushAnalysis {
        series,
        latest,
        change,
        trend,
    })
}
