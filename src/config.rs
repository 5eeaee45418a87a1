use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::classify::{DEFAULT_CAR_THRESHOLD, DEFAULT_CAT_THRESHOLD};
use crate::outlier_core::bounds::{
    BoundsParams, DEFAULT_IQR_MULTIPLIER, DEFAULT_LOWER_QUANTILE, DEFAULT_UPPER_QUANTILE,
};
use crate::outlier_core::knn_kdtree::NeighborSearch;
use crate::outlier_core::lof::{LocalOutlierFactor, DEFAULT_NEIGHBOR_COUNT};
use crate::outlier_core::univariate::DEFAULT_DISPLAY_LIMIT;
use crate::utils::OutlierError;

/// Engine parameters; every field falls back to its default when absent from a config file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub lower_quantile: f64,
    pub upper_quantile: f64,
    pub iqr_multiplier: f64,
    /// Numeric columns with fewer distinct values are categorical
    pub cat_threshold: usize,
    /// Categorical columns with more distinct values are cardinal
    pub car_threshold: usize,
    pub display_limit: usize,
    pub neighbor_count: usize,
    pub neighbor_search: NeighborSearch,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lower_quantile: DEFAULT_LOWER_QUANTILE,
            upper_quantile: DEFAULT_UPPER_QUANTILE,
            iqr_multiplier: DEFAULT_IQR_MULTIPLIER,
            cat_threshold: DEFAULT_CAT_THRESHOLD,
            car_threshold: DEFAULT_CAR_THRESHOLD,
            display_limit: DEFAULT_DISPLAY_LIMIT,
            neighbor_count: DEFAULT_NEIGHBOR_COUNT,
            neighbor_search: NeighborSearch::default(),
        }
    }
}

impl EngineConfig {
    /// Load and validate a JSON config file
    pub fn from_json_file(path: impl AsRef<Path>) -> crate::Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: EngineConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), OutlierError> {
        self.bounds_params()
            .validate()
            .map_err(|e| OutlierError::Config(e.to_string()))?;

        if self.neighbor_count == 0 {
            return Err(OutlierError::Config(
                "neighbor_count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn bounds_params(&self) -> BoundsParams {
        BoundsParams {
            lower_quantile: self.lower_quantile,
            upper_quantile: self.upper_quantile,
            multiplier: self.iqr_multiplier,
        }
    }

    pub fn scorer(&self) -> LocalOutlierFactor {
        LocalOutlierFactor::new(self.neighbor_count).with_search(self.neighbor_search)
    }
}
