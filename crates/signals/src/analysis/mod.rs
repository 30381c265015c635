//! Derived analytics over canonical series.
//!
//! Every analyzer is a pure function of already-cleaned data and returns
//! `None` (or an empty collection) when its inputs are unavailable.

pub mod correlation;
pub mod crush;
pub mod export_sales;
pub mod forward_curve;
pub mod health;
pub mod market;
pub mod positioning;
pub mod seasonal;
pub mod weather;
pub mod yield_curve;

pub use correlation::{
    aligned_returns, pearson_correlation, return_correlation, rolling_correlation,
    CorrelationEntry, CorrelationMatrix, Strength,
};
pub use crush::{analyze_crush, crush_series, crush_spread, CrushAnalysis, CrushPoint, CrushTrend};
pub use export_sales::{summarize_export_sales, tons, Buyer, ExportSalesSummary};
pub use forward_curve::{
    analyze_curve, calendar_spread, classify, slope, CalendarSpread, CurveAnalysis, CurveStructure,
};
pub use health::flat_price;
pub use market::{currency_move, economic_reading, CurrencyMove, EconomicReading};
pub use positioning::{summarize_positioning, PositioningSummary};
pub use seasonal::{current_vs_seasonal, monthly_profile, MonthlyStat, SeasonalComparison};
pub use weather::{weather_alerts, WeatherAlert, WeatherAlertKind};
pub use yield_curve::{classify_spread, yield_curve, YieldCurve, YieldCurveShape};
