use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{FetchError, StorageError};
use crate::layer::LayerData;

/// An external source connector. Every provider is driven through this one
/// contract regardless of protocol.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(&self) -> Result<LayerData, FetchError>;
}

/// One persisted record, keyed naturally by `(entity, date)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub entity: String,
    pub date: NaiveDate,
    pub payload: serde_json::Value,
}

/// Key and date-range filter for [`PersistenceStore::read`]. Bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowFilter {
    pub entity: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl RowFilter {
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    #[must_use]
    pub fn between(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    #[must_use]
    pub fn matches(&self, row: &Row) -> bool {
        self.entity.as_deref().map_or(true, |e| e == row.entity)
            && self.from.map_or(true, |from| row.date >= from)
            && self.to.map_or(true, |to| row.date <= to)
    }
}

/// Table store collaborator.
///
/// `write` is an idempotent upsert on `(entity, date)`: writing the same rows
/// twice leaves the table unchanged.
pub trait PersistenceStore: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the rows cannot be stored.
    fn write(&self, table: &str, rows: &[Row]) -> Result<(), StorageError>;

    /// Rows matching `filter`, ordered by entity then date.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be read.
    fn read(&self, table: &str, filter: &RowFilter) -> Result<Vec<Row>, StorageError>;
}
