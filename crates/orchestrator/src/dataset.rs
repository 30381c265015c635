use std::collections::BTreeMap;

use mirror_market_core::{
    CurvePoint, ExportSale, LayerData, LayerKind, LayerResult, PositioningSeries, PriceSeries,
    ScalarSeries, WeatherSeries,
};
use serde::Serialize;
use tracing::debug;

/// All layer results of a run merged by kind into entity-keyed maps.
///
/// Built from copies, so analyzers can never reach back into a
/// [`LayerResult`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MarketDataset {
    pub prices: BTreeMap<String, PriceSeries>,
    pub currencies: BTreeMap<String, ScalarSeries>,
    pub economic: BTreeMap<String, ScalarSeries>,
    pub positioning: BTreeMap<String, PositioningSeries>,
    pub weather: BTreeMap<String, WeatherSeries>,
    pub curves: BTreeMap<String, Vec<CurvePoint>>,
    pub export_sales: BTreeMap<String, Vec<ExportSale>>,
}

impl MarketDataset {
    /// Merges results in layer-name order. An entity delivered by two layers
    /// of the same kind keeps the later layer's series.
    #[must_use]
    pub fn from_results(results: &BTreeMap<String, LayerResult>) -> Self {
        let mut dataset = Self::default();
        for result in results.values() {
            dataset.merge(result);
        }
        dataset
    }

    fn merge(&mut self, result: &LayerResult) {
        debug!(layer = %result.layer_name(), kind = %result.kind(), "merging layer");
        match (result.kind(), result.data()) {
            (LayerKind::Currencies, LayerData::Prices(map)) => {
                for (pair, series) in map {
                    self.currencies.insert(pair.clone(), series.to_scalar());
                }
            }
            (LayerKind::Currencies, LayerData::Scalars(map)) => extend(&mut self.currencies, map),
            (_, LayerData::Prices(map)) => extend(&mut self.prices, map),
            (_, LayerData::Scalars(map)) => extend(&mut self.economic, map),
            (_, LayerData::Positioning(map)) => extend(&mut self.positioning, map),
            (_, LayerData::Weather(map)) => extend(&mut self.weather, map),
            (_, LayerData::Curves(map)) => extend(&mut self.curves, map),
            (_, LayerData::ExportSales(map)) => extend(&mut self.export_sales, map),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
            && self.currencies.is_empty()
            && self.economic.is_empty()
            && self.positioning.is_empty()
            && self.weather.is_empty()
            && self.curves.is_empty()
            && self.export_sales.is_empty()
    }
}

fn extend<V: Clone>(target: &mut BTreeMap<String, V>, source: &BTreeMap<String, V>) {
    target.extend(source.iter().map(|(k, v)| (k.clone(), v.clone())));
}
