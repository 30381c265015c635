pub mod dataset;
pub mod orchestrator;
pub mod report;
pub mod task;

pub use dataset::MarketDataset;
pub use orchestrator::IngestionOrchestrator;
pub use report::{LayerError, RunReport};
pub use task::{LayerTask, OrchestratorConfig, StopSignal};
