//! CLI commands for the market-data analyst.

pub mod freshness;
pub mod indicators;
pub mod run;

pub use freshness::{run_freshness, FreshnessArgs};
pub use indicators::{run_indicators, IndicatorsArgs};
pub use run::{run_briefing, RunArgs};
