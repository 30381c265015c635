pub mod bundle;
pub mod composer;
pub mod drivers;
pub mod report;

pub use bundle::{AnalysisBundle, CurrencyCorrelation};
pub use composer::{top_severity, BriefingComposer};
pub use drivers::{default_rules, evaluate_drivers, DriverRule};
pub use report::{BriefingReport, Section};
