//! Data handling for the commodity market analyst.
//!
//! This crate provides:
//! - The Normalizer/Validator for canonical series
//! - An in-memory table store and layer persistence helpers
//! - CSV layer files and a file-backed source connector
//! - The on-disk freshness record

pub mod csv_storage;
pub mod freshness_store;
pub mod memory_store;
pub mod normalizer;
pub mod persist;
pub mod source;

pub use csv_storage::CsvStorage;
pub use freshness_store::FreshnessStore;
pub use memory_store::MemoryStore;
pub use normalizer::{normalize_curve, normalize_export_sales, Normalizer, Validate};
pub use persist::{layer_rows, load_series, persist_layer};
pub use source::CsvSource;
