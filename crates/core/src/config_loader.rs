use std::path::Path;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};

use crate::config::AppConfig;
use crate::error::ConfigurationError;

pub const DEFAULT_CONFIG_PATH: &str = "config/Config.toml";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads configuration from `config/Config.toml` merged with `APP_` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be parsed or fails validation.
    pub fn load() -> Result<AppConfig, ConfigurationError> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Loads configuration from a specific TOML file. A missing file yields the defaults.
    ///
    /// Nested keys use a double underscore, e.g. `APP_SIGNALS__RSI_OVERBOUGHT=75`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be parsed or fails validation.
    pub fn load_from(path: impl AsRef<Path>) -> Result<AppConfig, ConfigurationError> {
        let config: AppConfig = Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("APP_").split("__"))
            .extract()
            .map_err(|e| ConfigurationError::Load(e.to_string()))?;

        config.validate()?;
        tracing::debug!(
            layers = config.layers.len(),
            path = %path.as_ref().display(),
            "configuration loaded"
        );
        Ok(config)
    }
}
