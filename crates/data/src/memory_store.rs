//! In-process table store.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use chrono::NaiveDate;
use mirror_market_core::{PersistenceStore, Row, RowFilter, StorageError};

type Table = BTreeMap<(String, NaiveDate), serde_json::Value>;

/// Tables keyed by `(entity, date)`. Writes replace rows with the same key.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Table>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Row count of a table, zero if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn row_count(&self, table: &str) -> Result<usize, StorageError> {
        let tables = self.tables.read().map_err(|_| StorageError::Poisoned)?;
        Ok(tables.get(table).map_or(0, BTreeMap::len))
    }

    /// Names of all tables, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn table_names(&self) -> Result<Vec<String>, StorageError> {
        let tables = self.tables.read().map_err(|_| StorageError::Poisoned)?;
        let mut names: Vec<String> = tables.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

impl PersistenceStore for MemoryStore {
    fn write(&self, table: &str, rows: &[Row]) -> Result<(), StorageError> {
        let mut tables = self.tables.write().map_err(|_| StorageError::Poisoned)?;
        let entries = tables.entry(table.to_string()).or_default();
        for row in rows {
            entries.insert((row.entity.clone(), row.date), row.payload.clone());
        }
        Ok(())
    }

    fn read(&self, table: &str, filter: &RowFilter) -> Result<Vec<Row>, StorageError> {
        let tables = self.tables.read().map_err(|_| StorageError::Poisoned)?;
        let entries = tables
            .get(table)
            .ok_or_else(|| StorageError::UnknownTable(table.to_string()))?;

        Ok(entries
            .iter()
            .map(|((entity, date), payload)| Row {
                entity: entity.clone(),
                date: *date,
                payload: payload.clone(),
            })
            .filter(|row| filter.matches(row))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(entity: &str, day: u32, value: i64) -> Row {
        Row {
            entity: entity.to_string(),
            date: NaiveDate::from_ymd_opt(2025, 4, day).unwrap(),
            payload: json!({ "value": value }),
        }
    }

    #[test]
    fn write_is_idempotent_upsert() {
        let store = MemoryStore::new();
        let rows = vec![row("Corn", 1, 1), row("Corn", 2, 2)];
        store.write("prices", &rows).unwrap();
        store.write("prices", &rows).unwrap();
        assert_eq!(store.row_count("prices").unwrap(), 2);

        store.write("prices", &[row("Corn", 2, 5)]).unwrap();
        let read = store.read("prices", &RowFilter::all()).unwrap();
        assert_eq!(read.len(), 2);
        assert_eq!(read[1].payload, json!({ "value": 5 }));
    }

    #[test]
    fn read_filters_by_entity_and_range() {
        let store = MemoryStore::new();
        store
            .write(
                "prices",
                &[row("Corn", 1, 1), row("Corn", 5, 2), row("Wheat", 3, 3)],
            )
            .unwrap();

        let filter = RowFilter::all().entity("Corn").between(
            NaiveDate::from_ymd_opt(2025, 4, 2).unwrap(),
            NaiveDate::from_ymd_opt(2025, 4, 30).unwrap(),
        );
        let read = store.read("prices", &filter).unwrap();
        assert_eq!(read, vec![row("Corn", 5, 2)]);
    }

    #[test]
    fn unknown_table_is_an_error() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.read("missing", &RowFilter::all()),
            Err(StorageError::UnknownTable(_))
        ));
    }
}
