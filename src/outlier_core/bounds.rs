use serde::{Deserialize, Serialize};

use crate::dataset::Dataset;
use crate::stats::quantiles;
use crate::utils::{validate_multiplier, validate_quantile_pair, OutlierError};

/// Default lower quantile for the IQR
pub const DEFAULT_LOWER_QUANTILE: f64 = 0.25;
/// Default upper quantile for the IQR
pub const DEFAULT_UPPER_QUANTILE: f64 = 0.75;
/// Default IQR multiplier (Tukey fences)
pub const DEFAULT_IQR_MULTIPLIER: f64 = 1.5;

/// Quantile pair and IQR multiplier used to derive bounds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundsParams {
    pub lower_quantile: f64,
    pub upper_quantile: f64,
    pub multiplier: f64,
}

impl BoundsParams {
    /// Create validated parameters
    pub fn new(lower_quantile: f64, upper_quantile: f64, multiplier: f64) -> Result<Self, OutlierError> {
        let params = Self {
            lower_quantile,
            upper_quantile,
            multiplier,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), OutlierError> {
        validate_quantile_pair(self.lower_quantile, self.upper_quantile)?;
        validate_multiplier(self.multiplier)
    }
}

impl Default for BoundsParams {
    fn default() -> Self {
        Self {
            lower_quantile: DEFAULT_LOWER_QUANTILE,
            upper_quantile: DEFAULT_UPPER_QUANTILE,
            multiplier: DEFAULT_IQR_MULTIPLIER,
        }
    }
}

/// Lower and upper outlier limits of a numeric column.
///
/// Comparisons are strict and treat `NaN` as "not an outlier": any comparison
/// against a missing value is false, so missing values are never flagged,
/// never removed and never capped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutlierBounds {
    pub lower: f64,
    pub upper: f64,
}

impl OutlierBounds {
    /// Bounds from quartiles: `q1 - m * iqr` and `q3 + m * iqr`
    pub fn from_quartiles(q1: f64, q3: f64, multiplier: f64) -> Self {
        let iqr = q3 - q1;
        Self {
            lower: q1 - multiplier * iqr,
            upper: q3 + multiplier * iqr,
        }
    }

    pub fn is_low(&self, value: f64) -> bool {
        value < self.lower
    }

    pub fn is_high(&self, value: f64) -> bool {
        value > self.upper
    }

    /// Strictly below the lower or above the upper limit; `NaN` is never an outlier
    pub fn is_outlier(&self, value: f64) -> bool {
        self.is_low(value) || self.is_high(value)
    }

    /// Clamp into the bounds; `NaN` passes through unchanged
    pub fn clamp(&self, value: f64) -> f64 {
        if self.is_low(value) {
            self.lower
        } else if self.is_high(value) {
            self.upper
        } else {
            value
        }
    }
}

/// Compute IQR outlier bounds of a numeric column
///
/// # Returns
/// * `Err(OutlierError::ColumnNotFound)` - column absent
/// * `Err(OutlierError::InvalidColumnType)` - column not numeric
/// * `Err(OutlierError::EmptyDataset)` - no non-missing values to take percentiles of
pub fn compute_bounds(
    dataset: &Dataset,
    column: &str,
    params: &BoundsParams,
) -> Result<OutlierBounds, OutlierError> {
    params.validate()?;
    let values = dataset.numeric_values(column)?;

    let qs = quantiles(values, &[params.lower_quantile, params.upper_quantile]).map_err(|e| match e {
        OutlierError::EmptyDataset(_) => OutlierError::EmptyDataset(format!(
            "column '{}' has no values to compute percentiles on",
            column
        )),
        other => other,
    })?;

    let bounds = OutlierBounds::from_quartiles(qs[0], qs[1], params.multiplier);
    tracing::debug!(
        column,
        q1 = qs[0],
        q3 = qs[1],
        lower = bounds.lower,
        upper = bounds.upper,
        "computed outlier bounds"
    );
    Ok(bounds)
}
