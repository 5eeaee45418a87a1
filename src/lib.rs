//! Outlier Insight Engine - statistical outlier detection over tabular datasets
//!
//! This library classifies dataset columns, derives IQR-based outlier bounds
//! per numeric column (detect, fetch, remove and cap outliers), and scores
//! rows with a Local Outlier Factor density model.

pub mod classify;
pub mod config;
pub mod dataset;
pub mod engine;
pub mod outlier_core;
pub mod stats;
pub mod utils;

pub use classify::{classify, ColumnClassification};
pub use config::EngineConfig;
pub use dataset::{Column, ColumnData, ColumnKind, Dataset};
pub use engine::{DatasetSummary, OutlierEngine, OutlierReport};
pub use outlier_core::{BoundsParams, LocalOutlierFactor, NeighborSearch, OutlierBounds};
pub use stats::Statistics;
pub use utils::OutlierError;

/// Result type used for I/O-facing helpers (loading, configuration)
pub type Result<T> = anyhow::Result<T>;
