//! Local Outlier Factor density scoring
//!
//! Scores follow the "negative outlier factor" convention: values near -1
//! are inliers, increasingly negative values are increasingly anomalous.

use ndarray::Array2;
use serde::Serialize;

use super::feature::validate_features;
use super::knn_kdtree::{k_nearest_neighbors, NeighborSearch};
use crate::dataset::{ColumnKind, Dataset};
use crate::utils::OutlierError;

/// Default number of neighbors
pub const DEFAULT_NEIGHBOR_COUNT: usize = 20;

/// Added to the mean reachability distance so duplicate points do not divide by zero
const LRD_EPSILON: f64 = 1e-10;

/// Local Outlier Factor scorer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalOutlierFactor {
    neighbor_count: usize,
    search: NeighborSearch,
}

impl LocalOutlierFactor {
    pub fn new(neighbor_count: usize) -> Self {
        Self {
            neighbor_count,
            search: NeighborSearch::default(),
        }
    }

    pub fn with_search(mut self, search: NeighborSearch) -> Self {
        self.search = search;
        self
    }

    pub fn neighbor_count(&self) -> usize {
        self.neighbor_count
    }

    pub fn search(&self) -> NeighborSearch {
        self.search
    }

    /// Score every row of a numeric-only dataset without missing values
    ///
    /// # Returns
    /// * `Ok(scores)` - one score per row, in row order
    /// * `Err(OutlierError::InvalidColumnType)` - a column is not numeric
    /// * `Err(OutlierError::InvalidInput)` - a value is missing, or fewer than 2 rows
    /// * `Err(OutlierError::EmptyDataset)` - no rows
    pub fn score(&self, dataset: &Dataset) -> Result<Vec<f64>, OutlierError> {
        if let Some(column) = dataset
            .columns()
            .iter()
            .find(|c| c.kind() != ColumnKind::Numeric)
        {
            return Err(OutlierError::not_numeric(&column.name));
        }
        if dataset.has_missing() {
            return Err(OutlierError::InvalidInput(format!(
                "dataset '{}' contains missing values; drop them before density scoring",
                dataset.name
            )));
        }

        self.score_matrix(&dataset.to_feature_matrix()?)
    }

    /// Score every row of a feature matrix
    pub fn score_matrix(&self, features: &Array2<f64>) -> Result<Vec<f64>, OutlierError> {
        validate_features(features)?;

        let n_samples = features.nrows();
        if self.neighbor_count == 0 {
            return Err(OutlierError::InvalidInput(
                "neighbor count must be at least 1".to_string(),
            ));
        }
        if n_samples < 2 {
            return Err(OutlierError::InvalidInput(
                "Need at least 2 samples to compute nearest neighbors".to_string(),
            ));
        }

        let k = if self.neighbor_count >= n_samples {
            tracing::warn!(
                requested = self.neighbor_count,
                used = n_samples - 1,
                "neighbor count exceeds sample count, clamping"
            );
            n_samples - 1
        } else {
            self.neighbor_count
        };

        let neighbors = k_nearest_neighbors(features, k, self.search)?;

        // Local reachability density of each row
        let lrd: Vec<f64> = (0..n_samples)
            .map(|p| {
                let reach_sum: f64 = neighbors.indices[p]
                    .iter()
                    .zip(&neighbors.distances[p])
                    .map(|(&o, &d)| neighbors.k_distance(o).max(d))
                    .sum();
                1.0 / (reach_sum / k as f64 + LRD_EPSILON)
            })
            .collect();

        let scores: Vec<f64> = (0..n_samples)
            .map(|p| {
                let ratio_sum: f64 = neighbors.indices[p].iter().map(|&o| lrd[o] / lrd[p]).sum();
                -(ratio_sum / k as f64)
            })
            .collect();

        tracing::debug!(samples = n_samples, k, "computed local outlier factor scores");
        Ok(scores)
    }
}

impl Default for LocalOutlierFactor {
    fn default() -> Self {
        Self::new(DEFAULT_NEIGHBOR_COUNT)
    }
}

/// Score at position `rank` of the ascending-sorted scores (0 = most anomalous)
pub fn threshold_at_rank(scores: &[f64], rank: usize) -> Result<f64, OutlierError> {
    if rank >= scores.len() {
        return Err(OutlierError::InvalidInput(format!(
            "rank {} out of range for {} scores",
            rank,
            scores.len()
        )));
    }

    let mut sorted = scores.to_vec();
    sorted.sort_by(f64::total_cmp);
    Ok(sorted[rank])
}

/// Row positions whose score is strictly below `threshold`
pub fn select_below(scores: &[f64], threshold: f64) -> Vec<usize> {
    scores
        .iter()
        .enumerate()
        .filter_map(|(i, &s)| (s < threshold).then_some(i))
        .collect()
}

/// Rows selected by a density score threshold
#[derive(Debug, Clone, Serialize)]
pub struct DensityOutliers {
    pub threshold: f64,
    /// Row positions in the scored dataset
    pub positions: Vec<usize>,
    /// Stable labels of the same rows
    pub labels: Vec<usize>,
    pub scores: Vec<f64>,
}

/// Score a dataset and select the rows more extreme than the score at `rank`
pub fn detect_density_outliers(
    dataset: &Dataset,
    scorer: &LocalOutlierFactor,
    rank: usize,
) -> Result<DensityOutliers, OutlierError> {
    let scores = scorer.score(dataset)?;
    let threshold = threshold_at_rank(&scores, rank)?;
    let positions = select_below(&scores, threshold);
    let labels = positions.iter().map(|&i| dataset.index()[i]).collect();

    tracing::info!(
        dataset = %dataset.name,
        threshold,
        selected = positions.len(),
        "selected density outliers"
    );

    Ok(DensityOutliers {
        threshold,
        positions,
        labels,
        scores,
    })
}

/// New dataset without the selected density outliers
pub fn drop_density_outliers(dataset: &Dataset, outliers: &DensityOutliers) -> Dataset {
    dataset.drop_rows_by_label(&outliers.labels)
}
