//! Conversion between layer payloads and persistence rows.
//!
//! A layer is stored in a table named after the layer. Dated records use
//! their observation date as the row date; forward-curve points use the
//! contract month and export-sales rows the week ending.

use std::collections::BTreeMap;

use mirror_market_core::{
    LayerData, LayerResult, PersistenceStore, Record, Row, RowFilter, Series, StorageError,
};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Flattens a layer payload into rows.
///
/// # Errors
///
/// Returns an error if a record cannot be serialized.
pub fn layer_rows(data: &LayerData) -> Result<Vec<Row>, StorageError> {
    match data {
        LayerData::Prices(map) => series_rows(map),
        LayerData::Scalars(map) => series_rows(map),
        LayerData::Positioning(map) => series_rows(map),
        LayerData::Weather(map) => series_rows(map),
        LayerData::Curves(map) => {
            let mut rows = Vec::new();
            for (entity, points) in map {
                for point in points {
                    rows.push(Row {
                        entity: entity.clone(),
                        date: point.contract_month,
                        payload: serde_json::to_value(point)?,
                    });
                }
            }
            Ok(rows)
        }
        LayerData::ExportSales(map) => {
            let mut rows = Vec::new();
            for (entity, sales) in map {
                for sale in sales {
                    rows.push(Row {
                        entity: entity.clone(),
                        date: sale.week_ending,
                        payload: serde_json::to_value(sale)?,
                    });
                }
            }
            Ok(rows)
        }
    }
}

fn series_rows<R: Record + Serialize>(
    map: &BTreeMap<String, Series<R>>,
) -> Result<Vec<Row>, StorageError> {
    let mut rows = Vec::new();
    for (entity, series) in map {
        for record in series.records() {
            rows.push(Row {
                entity: entity.clone(),
                date: record.date(),
                payload: serde_json::to_value(record)?,
            });
        }
    }
    Ok(rows)
}

/// Writes a layer result into its table. Returns the number of rows written.
///
/// # Errors
///
/// Returns an error if serialization or the store write fails.
pub fn persist_layer(
    store: &dyn PersistenceStore,
    result: &LayerResult,
) -> Result<usize, StorageError> {
    let rows = layer_rows(result.data())?;
    store.write(result.layer_name(), &rows)?;
    tracing::debug!(layer = %result.layer_name(), rows = rows.len(), "layer persisted");
    Ok(rows.len())
}

/// Reads a table back into entity-keyed series.
///
/// # Errors
///
/// Returns an error if the table is missing or a payload does not decode as `R`.
pub fn load_series<R: Record + DeserializeOwned>(
    store: &dyn PersistenceStore,
    table: &str,
    filter: &RowFilter,
) -> Result<BTreeMap<String, Series<R>>, StorageError> {
    let mut grouped: BTreeMap<String, Vec<R>> = BTreeMap::new();
    for row in store.read(table, filter)? {
        let record: R = serde_json::from_value(row.payload)?;
        grouped.entry(row.entity).or_default().push(record);
    }
    Ok(grouped
        .into_iter()
        .map(|(entity, records)| (entity, Series::new(records)))
        .collect())
}
