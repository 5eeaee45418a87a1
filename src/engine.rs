use serde::Serialize;
use std::collections::BTreeMap;

use crate::classify::{classify, ColumnClassification};
use crate::config::EngineConfig;
use crate::dataset::Dataset;
use crate::outlier_core::bounds::{compute_bounds, OutlierBounds};
use crate::outlier_core::lof::{detect_density_outliers, DensityOutliers};
use crate::outlier_core::univariate::{
    cap_outliers, check_column, fetch_outliers, remove_outliers, ColumnOutlierCheck, OutlierFetch,
};
use crate::utils::OutlierError;

/// Orchestrates column classification and per-column outlier checks
///
/// The engine holds only configuration; every operation takes the dataset
/// explicitly, so calls are independent of each other.
#[derive(Debug, Clone, Default)]
pub struct OutlierEngine {
    config: EngineConfig,
}

impl OutlierEngine {
    /// Create an engine with default parameters
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine from a validated configuration
    pub fn with_config(config: EngineConfig) -> Result<Self, OutlierError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Classify the dataset's columns using the configured thresholds
    pub fn classify(&self, dataset: &Dataset) -> ColumnClassification {
        classify(dataset, self.config.cat_threshold, self.config.car_threshold)
    }

    /// Numerical columns minus caller-specified identifier-like columns
    pub fn numerical_columns(&self, dataset: &Dataset, exclude: &[&str]) -> Vec<String> {
        self.classify(dataset).numerical_excluding(exclude)
    }

    /// Check every numerical column (minus `exclude`) for outliers
    pub fn check(&self, dataset: &Dataset, exclude: &[&str]) -> Result<OutlierReport, OutlierError> {
        let params = self.config.bounds_params();
        let columns = self
            .numerical_columns(dataset, exclude)
            .iter()
            .map(|column| check_column(dataset, column, &params))
            .collect::<Result<Vec<_>, _>>()?;

        let report = OutlierReport { columns };
        tracing::info!(
            dataset = %dataset.name,
            checked = report.columns.len(),
            with_outliers = report.columns_with_outliers().len(),
            "outlier check complete"
        );
        Ok(report)
    }

    /// Row/column counts and classified set sizes
    pub fn summary(&self, dataset: &Dataset) -> DatasetSummary {
        let classification = self.classify(dataset);
        DatasetSummary {
            name: dataset.name.clone(),
            observations: dataset.len(),
            variables: dataset.column_count(),
            categorical: classification.categorical.len(),
            numerical: classification.numerical.len(),
            cardinal: classification.cardinal.len(),
            numeric_but_categorical: classification.numeric_but_categorical.len(),
        }
    }

    pub fn bounds(&self, dataset: &Dataset, column: &str) -> Result<OutlierBounds, OutlierError> {
        compute_bounds(dataset, column, &self.config.bounds_params())
    }

    /// Fetch a column's outlier rows with the configured display limit
    pub fn fetch(&self, dataset: &Dataset, column: &str, include_index: bool) -> Result<OutlierFetch, OutlierError> {
        fetch_outliers(
            dataset,
            column,
            &self.config.bounds_params(),
            include_index,
            self.config.display_limit,
        )
    }

    /// Remove outliers column by column.
    ///
    /// Each column's bounds are computed on the rows left after the previous
    /// columns were filtered, so the result depends on column order.
    pub fn remove_all(&self, dataset: &Dataset, columns: &[String]) -> Result<Dataset, OutlierError> {
        let params = self.config.bounds_params();
        let mut current = dataset.clone();
        for column in columns {
            current = remove_outliers(&current, column, &params)?;
        }

        tracing::info!(
            dataset = %dataset.name,
            before = dataset.len(),
            after = current.len(),
            "removed outliers"
        );
        Ok(current)
    }

    /// Cap every listed column **in place**, returning the bounds used for each
    pub fn cap_all(
        &self,
        dataset: &mut Dataset,
        columns: &[String],
    ) -> Result<Vec<(String, OutlierBounds)>, OutlierError> {
        let params = self.config.bounds_params();
        columns
            .iter()
            .map(|column| Ok((column.clone(), cap_outliers(dataset, column, &params)?)))
            .collect()
    }

    /// Local Outlier Factor selection over a numeric dataset without missing values
    pub fn density_outliers(&self, dataset: &Dataset, rank: usize) -> Result<DensityOutliers, OutlierError> {
        detect_density_outliers(dataset, &self.config.scorer(), rank)
    }
}

/// Per-column outlier flags, in numerical-column order
#[derive(Debug, Clone, Serialize)]
pub struct OutlierReport {
    pub columns: Vec<ColumnOutlierCheck>,
}

impl OutlierReport {
    /// Column name to outlier flag
    pub fn flags(&self) -> BTreeMap<String, bool> {
        self.columns
            .iter()
            .map(|c| (c.column.clone(), c.has_outliers))
            .collect()
    }

    pub fn flag(&self, column: &str) -> Option<bool> {
        self.columns
            .iter()
            .find(|c| c.column == column)
            .map(|c| c.has_outliers)
    }

    pub fn columns_with_outliers(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.has_outliers)
            .map(|c| c.column.as_str())
            .collect()
    }
}

/// Summary information about a dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetSummary {
    pub name: String,
    pub observations: usize,
    pub variables: usize,
    pub categorical: usize,
    pub numerical: usize,
    pub cardinal: usize,
    pub numeric_but_categorical: usize,
}
