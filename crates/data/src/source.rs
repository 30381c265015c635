use std::path::PathBuf;

use async_trait::async_trait;
use mirror_market_core::{FetchError, LayerData, LayerKind, SourceFetcher};

use crate::csv_storage::CsvStorage;

/// Source connector backed by a CSV file, one file per layer.
#[derive(Debug, Clone)]
pub struct CsvSource {
    path: PathBuf,
    kind: LayerKind,
}

impl CsvSource {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, kind: LayerKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl SourceFetcher for CsvSource {
    async fn fetch(&self) -> Result<LayerData, FetchError> {
        let path = self.path.clone();
        let kind = self.kind;

        tokio::task::spawn_blocking(move || {
            if !path.exists() {
                return Err(FetchError::Network(format!(
                    "source file not found: {}",
                    path.display()
                )));
            }
            CsvStorage::read_layer(&path, kind).map_err(|e| FetchError::Parse(format!("{e:#}")))
        })
        .await
        .map_err(|e| FetchError::Network(format!("reader task failed: {e}")))?
    }
}
