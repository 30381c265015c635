//! Freshness record persisted across runs as a JSON file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use mirror_market_core::FreshnessRecord;

#[derive(Debug, Clone)]
pub struct FreshnessStore {
    path: PathBuf,
}

impl FreshnessStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the record. A missing file means no layer has ever succeeded.
    ///
    /// # Errors
    /// Returns error if the file exists but cannot be read or parsed.
    pub fn load(&self) -> Result<FreshnessRecord> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "no freshness file, starting empty");
            return Ok(FreshnessRecord::new());
        }
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read freshness file: {}", self.path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse freshness file: {}", self.path.display()))
    }

    /// Saves the record, replacing the previous file atomically.
    ///
    /// # Errors
    /// Returns error if the directory or file cannot be written.
    pub fn save(&self, record: &FreshnessRecord) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(record)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .with_context(|| format!("Failed to write freshness file: {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace freshness file: {}", self.path.display()))?;
        Ok(())
    }
}
