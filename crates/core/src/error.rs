//! Error taxonomy shared across the workspace.
//!
//! `FetchError` is recoverable per layer and never crosses the orchestrator
//! boundary. `ConfigurationError` is fatal and surfaces at startup.
//! Insufficient history is not an error; indicators encode it as `None`.

use thiserror::Error;

/// Failure of a single source layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Transport failure talking to the provider.
    #[error("Network error: {0}")]
    Network(String),

    /// Missing or rejected credential.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Provider answered but the payload could not be used.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Fetch did not finish within the per-layer timeout.
    #[error("Timed out after {0}s")]
    Timeout(u64),
}

impl FetchError {
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::Auth(_) => "auth",
            Self::Parse(_) => "parse",
            Self::Timeout(_) => "timeout",
        }
    }
}

/// Malformed configuration or task list.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Invalid threshold '{name}': {reason}")]
    InvalidThreshold { name: String, reason: String },

    #[error("Duplicate layer name '{0}' in task list")]
    DuplicateLayer(String),

    #[error("Empty layer name in task list")]
    EmptyLayerName,

    #[error("Failed to load configuration: {0}")]
    Load(String),
}

impl ConfigurationError {
    pub(crate) fn threshold(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidThreshold {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Failure of the persistence collaborator.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Unknown table '{0}'")]
    UnknownTable(String),

    #[error("Store lock poisoned")]
    Poisoned,
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_error_categories() {
        assert_eq!(FetchError::Network("reset".into()).category(), "network");
        assert_eq!(FetchError::Auth("no key".into()).category(), "auth");
        assert_eq!(FetchError::Parse("bad csv".into()).category(), "parse");
        assert_eq!(FetchError::Timeout(30).category(), "timeout");
    }

    #[test]
    fn messages_are_descriptive() {
        assert_eq!(FetchError::Timeout(30).to_string(), "Timed out after 30s");
        assert_eq!(
            ConfigurationError::DuplicateLayer("prices".into()).to_string(),
            "Duplicate layer name 'prices' in task list"
        );
    }
}
