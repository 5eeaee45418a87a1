use serde::Serialize;

use crate::dataset::Dataset;
use crate::utils::{validate_quantile, OutlierError};

/// Sorted non-missing values of a numeric slice
fn sorted_present(values: &[f64]) -> Vec<f64> {
    let mut present: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    present.sort_by(f64::total_cmp);
    present
}

/// Linear-interpolation quantile over an already sorted, NaN-free slice
fn interpolate(sorted: &[f64], q: f64) -> f64 {
    let position = (sorted.len() - 1) as f64 * q;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

/// Compute several quantiles of `values`, skipping missing values
///
/// Uses linear interpolation between the closest ranks at position `(n - 1) * q`.
/// A single present value is returned for every level.
///
/// # Returns
/// * `Err(OutlierError::EmptyDataset)` - no non-missing values
/// * `Err(OutlierError::InvalidInput)` - a level outside [0, 1]
pub fn quantiles(values: &[f64], levels: &[f64]) -> Result<Vec<f64>, OutlierError> {
    for &q in levels {
        validate_quantile(q)?;
    }

    let sorted = sorted_present(values);
    if sorted.is_empty() {
        return Err(OutlierError::EmptyDataset(
            "cannot compute quantiles without non-missing values".to_string(),
        ));
    }

    Ok(levels.iter().map(|&q| interpolate(&sorted, q)).collect())
}

/// Compute a single quantile of `values`, skipping missing values
pub fn quantile(values: &[f64], q: f64) -> Result<f64, OutlierError> {
    Ok(quantiles(values, &[q])?[0])
}

/// Descriptive statistics of a numeric column
#[derive(Debug, Clone, Serialize)]
pub struct Statistics {
    pub field: String,
    pub count: usize,
    pub missing: usize,
    pub mean: f64,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

impl Statistics {
    /// Compute statistics for a numeric column in a dataset
    pub fn compute(dataset: &Dataset, field: &str) -> Result<Self, OutlierError> {
        let values = dataset.numeric_values(field)?;
        let sorted = sorted_present(values);

        if sorted.is_empty() {
            return Err(OutlierError::EmptyDataset(format!(
                "column '{}' has no non-missing values",
                field
            )));
        }

        let count = sorted.len();
        let mean = sorted.iter().sum::<f64>() / count as f64;

        Ok(Statistics {
            field: field.to_string(),
            count,
            missing: values.len() - count,
            mean,
            min: sorted[0],
            q1: interpolate(&sorted, 0.25),
            median: interpolate(&sorted, 0.5),
            q3: interpolate(&sorted, 0.75),
            max: sorted[count - 1],
        })
    }
}
