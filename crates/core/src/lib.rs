pub mod config;
pub mod config_loader;
pub mod error;
pub mod events;
pub mod freshness;
pub mod layer;
pub mod series;
pub mod traits;

pub use config::{
    AnalysisConfig, AppConfig, CorrelationPair, DriverConfig, FreshnessConfig, IngestionConfig,
    LayerConfig, SignalConfig, StorageConfig, WeatherThresholds,
};
pub use config_loader::ConfigLoader;
pub use error::{ConfigurationError, FetchError, StorageError};
pub use events::{DriverInsight, Severity, SignalEvent, SignalKind, ValidationWarning, WarningKind};
pub use freshness::{FreshnessRecord, LayerStaleness};
pub use layer::{LayerData, LayerKind, LayerResult};
pub use series::{
    CurvePoint, ExportSale, PositioningRecord, PositioningSeries, PriceBar, PriceSeries, Record,
    ScalarPoint, ScalarSeries, Series, WeatherObservation, WeatherSeries,
};
pub use traits::{PersistenceStore, Row, RowFilter, SourceFetcher};
