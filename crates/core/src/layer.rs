//! Layer results: the typed output of one source layer for one run.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::series::{
    CurvePoint, ExportSale, PositioningSeries, PriceSeries, ScalarSeries, WeatherSeries,
};

/// What a layer delivers, which decides how its data is merged downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    /// Commodity futures OHLCV, keyed by commodity.
    Prices,
    /// Currency pairs, keyed by pair (e.g. "BRL/USD").
    Currencies,
    /// Scalar economic series, keyed by series name.
    Economic,
    /// Commitment of Traders positioning, keyed by commodity.
    Positioning,
    /// Daily weather, keyed by growing region.
    Weather,
    /// Contract-month settlements, keyed by commodity.
    ForwardCurve,
    /// Weekly export sales by destination country, keyed by commodity.
    ExportSales,
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Prices => "prices",
            Self::Currencies => "currencies",
            Self::Economic => "economic",
            Self::Positioning => "positioning",
            Self::Weather => "weather",
            Self::ForwardCurve => "forward_curve",
            Self::ExportSales => "export_sales",
        };
        f.write_str(name)
    }
}

/// Entity-keyed payload of a layer, one variant per record shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", content = "entities", rename_all = "snake_case")]
pub enum LayerData {
    Prices(BTreeMap<String, PriceSeries>),
    Scalars(BTreeMap<String, ScalarSeries>),
    Positioning(BTreeMap<String, PositioningSeries>),
    Weather(BTreeMap<String, WeatherSeries>),
    Curves(BTreeMap<String, Vec<CurvePoint>>),
    ExportSales(BTreeMap<String, Vec<ExportSale>>),
}

impl LayerData {
    /// Number of entities in the layer.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        match self {
            Self::Prices(m) => m.len(),
            Self::Scalars(m) => m.len(),
            Self::Positioning(m) => m.len(),
            Self::Weather(m) => m.len(),
            Self::Curves(m) => m.len(),
            Self::ExportSales(m) => m.len(),
        }
    }

    /// Total records across all entities.
    #[must_use]
    pub fn record_count(&self) -> usize {
        match self {
            Self::Prices(m) => m.values().map(PriceSeries::len).sum(),
            Self::Scalars(m) => m.values().map(ScalarSeries::len).sum(),
            Self::Positioning(m) => m.values().map(PositioningSeries::len).sum(),
            Self::Weather(m) => m.values().map(WeatherSeries::len).sum(),
            Self::Curves(m) => m.values().map(Vec::len).sum(),
            Self::ExportSales(m) => m.values().map(Vec::len).sum(),
        }
    }

    /// Returns true if no entity carries any record.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.record_count() == 0
    }

    /// Returns true if this payload shape is valid for the given kind.
    #[must_use]
    pub fn matches_kind(&self, kind: LayerKind) -> bool {
        matches!(
            (self, kind),
            (Self::Prices(_), LayerKind::Prices | LayerKind::Currencies)
                | (Self::Scalars(_), LayerKind::Economic | LayerKind::Currencies)
                | (Self::Positioning(_), LayerKind::Positioning)
                | (Self::Weather(_), LayerKind::Weather)
                | (Self::Curves(_), LayerKind::ForwardCurve)
                | (Self::ExportSales(_), LayerKind::ExportSales)
        )
    }
}

/// Output of one layer for one orchestrator run. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerResult {
    layer_name: String,
    kind: LayerKind,
    data: LayerData,
    fetched_at: DateTime<Utc>,
}

impl LayerResult {
    #[must_use]
    pub fn new(
        layer_name: impl Into<String>,
        kind: LayerKind,
        data: LayerData,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        Self {
            layer_name: layer_name.into(),
            kind,
            data,
            fetched_at,
        }
    }

    #[must_use]
    pub fn layer_name(&self) -> &str {
        &self.layer_name
    }

    #[must_use]
    pub fn kind(&self) -> LayerKind {
        self.kind
    }

    #[must_use]
    pub fn data(&self) -> &LayerData {
        &self.data
    }

    #[must_use]
    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }
}
