//! IQR-based univariate outlier detection and treatment.
//!
//! Every function takes the dataset explicitly and, apart from the `cap_*`
//! functions, leaves it untouched. Bounds are recomputed from the dataset on
//! each call unless a `*_with_bounds` variant is used with fixed bounds.

use serde::Serialize;

use super::bounds::{compute_bounds, BoundsParams, OutlierBounds};
use crate::dataset::Dataset;
use crate::utils::OutlierError;

/// Above this many matching rows, `fetch_outliers` only returns the first `display_limit`
pub const FULL_DISPLAY_MAX: usize = 10;
/// Default number of rows shown when the outlier set is large
pub const DEFAULT_DISPLAY_LIMIT: usize = 5;

/// Per-row outlier flags against fixed bounds
pub fn outlier_mask_with_bounds(
    dataset: &Dataset,
    column: &str,
    bounds: &OutlierBounds,
) -> Result<Vec<bool>, OutlierError> {
    let values = dataset.numeric_values(column)?;
    Ok(values.iter().map(|&v| bounds.is_outlier(v)).collect())
}

/// Per-row outlier flags against bounds computed from `dataset`
pub fn outlier_mask(
    dataset: &Dataset,
    column: &str,
    params: &BoundsParams,
) -> Result<Vec<bool>, OutlierError> {
    let bounds = compute_bounds(dataset, column, params)?;
    outlier_mask_with_bounds(dataset, column, &bounds)
}

/// Whether any value lies outside fixed bounds
pub fn has_outliers_with_bounds(
    dataset: &Dataset,
    column: &str,
    bounds: &OutlierBounds,
) -> Result<bool, OutlierError> {
    let values = dataset.numeric_values(column)?;
    Ok(values.iter().any(|&v| bounds.is_outlier(v)))
}

/// Whether any value lies strictly outside the column's IQR bounds
pub fn has_outliers(dataset: &Dataset, column: &str, params: &BoundsParams) -> Result<bool, OutlierError> {
    let bounds = compute_bounds(dataset, column, params)?;
    has_outliers_with_bounds(dataset, column, &bounds)
}

/// Whether any value lies strictly below the lower bound
pub fn has_low_outliers(dataset: &Dataset, column: &str, params: &BoundsParams) -> Result<bool, OutlierError> {
    let bounds = compute_bounds(dataset, column, params)?;
    Ok(dataset.numeric_values(column)?.iter().any(|&v| bounds.is_low(v)))
}

/// Whether any value lies strictly above the upper bound
pub fn has_high_outliers(dataset: &Dataset, column: &str, params: &BoundsParams) -> Result<bool, OutlierError> {
    let bounds = compute_bounds(dataset, column, params)?;
    Ok(dataset.numeric_values(column)?.iter().any(|&v| bounds.is_high(v)))
}

/// Number of outlier rows in a column
pub fn count_outliers(dataset: &Dataset, column: &str, params: &BoundsParams) -> Result<usize, OutlierError> {
    Ok(outlier_mask(dataset, column, params)?.into_iter().filter(|&o| o).count())
}

/// Labels of every outlier row, in row order
pub fn outlier_labels(
    dataset: &Dataset,
    column: &str,
    params: &BoundsParams,
) -> Result<Vec<usize>, OutlierError> {
    let mask = outlier_mask(dataset, column, params)?;
    Ok(labels_where(dataset, &mask))
}

fn labels_where(dataset: &Dataset, mask: &[bool]) -> Vec<usize> {
    dataset
        .index()
        .iter()
        .zip(mask)
        .filter_map(|(&label, &flag)| flag.then_some(label))
        .collect()
}

/// Outlier rows of one column, prepared for display
#[derive(Debug, Clone)]
pub struct OutlierFetch {
    /// Display subset: the first `display_limit` matches when more than
    /// `FULL_DISPLAY_MAX` rows match, otherwise every match
    pub rows: Dataset,
    /// Labels of all matching rows when requested, never truncated
    pub labels: Option<Vec<usize>>,
    /// Total number of matching rows
    pub total: usize,
    pub bounds: OutlierBounds,
}

impl OutlierFetch {
    /// Whether `rows` holds fewer rows than actually matched
    pub fn is_truncated(&self) -> bool {
        self.rows.len() < self.total
    }
}

/// Fetch the outlier rows of a column
pub fn fetch_outliers(
    dataset: &Dataset,
    column: &str,
    params: &BoundsParams,
    include_index: bool,
    display_limit: usize,
) -> Result<OutlierFetch, OutlierError> {
    let bounds = compute_bounds(dataset, column, params)?;
    let mask = outlier_mask_with_bounds(dataset, column, &bounds)?;

    let positions: Vec<usize> = mask
        .iter()
        .enumerate()
        .filter_map(|(i, &flag)| flag.then_some(i))
        .collect();
    let total = positions.len();

    let shown = if total > FULL_DISPLAY_MAX {
        &positions[..display_limit.min(total)]
    } else {
        &positions[..]
    };

    Ok(OutlierFetch {
        rows: dataset.select_rows(shown),
        labels: include_index.then(|| labels_where(dataset, &mask)),
        total,
        bounds,
    })
}

/// New dataset without the rows lying outside fixed bounds
pub fn remove_outliers_with_bounds(
    dataset: &Dataset,
    column: &str,
    bounds: &OutlierBounds,
) -> Result<Dataset, OutlierError> {
    let keep: Vec<bool> = outlier_mask_with_bounds(dataset, column, bounds)?
        .into_iter()
        .map(|o| !o)
        .collect();
    Ok(dataset.filter_rows(&keep))
}

/// New dataset without the column's outlier rows; missing values are kept
pub fn remove_outliers(dataset: &Dataset, column: &str, params: &BoundsParams) -> Result<Dataset, OutlierError> {
    let bounds = compute_bounds(dataset, column, params)?;
    let cleaned = remove_outliers_with_bounds(dataset, column, &bounds)?;
    tracing::debug!(
        column,
        removed = dataset.len() - cleaned.len(),
        remaining = cleaned.len(),
        "removed outliers"
    );
    Ok(cleaned)
}

/// Clamp a column into fixed bounds **in place**, returning how many values changed
pub fn cap_outliers_with_bounds(
    dataset: &mut Dataset,
    column: &str,
    bounds: &OutlierBounds,
) -> Result<usize, OutlierError> {
    let values = dataset.numeric_values_mut(column)?;
    let mut capped = 0;
    for value in values.iter_mut() {
        if bounds.is_outlier(*value) {
            *value = bounds.clamp(*value);
            capped += 1;
        }
    }
    Ok(capped)
}

/// Replace a column's outliers with its bounds **in place**.
///
/// This is the only mutating operation of the engine. Bounds are computed
/// once from the data before capping and returned to the caller; missing
/// values are left as they are.
pub fn cap_outliers(
    dataset: &mut Dataset,
    column: &str,
    params: &BoundsParams,
) -> Result<OutlierBounds, OutlierError> {
    let bounds = compute_bounds(dataset, column, params)?;
    let capped = cap_outliers_with_bounds(dataset, column, &bounds)?;
    tracing::debug!(column, capped, lower = bounds.lower, upper = bounds.upper, "capped outliers");
    Ok(bounds)
}

/// Outlier counts of a single column, for reporting
#[derive(Debug, Clone, Serialize)]
pub struct ColumnOutlierCheck {
    pub column: String,
    pub has_outliers: bool,
    pub low_count: usize,
    pub high_count: usize,
    pub bounds: OutlierBounds,
}

/// Check a column and count low and high outliers in one pass
pub fn check_column(
    dataset: &Dataset,
    column: &str,
    params: &BoundsParams,
) -> Result<ColumnOutlierCheck, OutlierError> {
    let bounds = compute_bounds(dataset, column, params)?;
    let values = dataset.numeric_values(column)?;
    let low_count = values.iter().filter(|&&v| bounds.is_low(v)).count();
    let high_count = values.iter().filter(|&&v| bounds.is_high(v)).count();

    Ok(ColumnOutlierCheck {
        column: column.to_string(),
        has_outliers: low_count + high_count > 0,
        low_count,
        high_count,
        bounds,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Column;

    fn age_dataset() -> Dataset {
        Dataset::from_columns(
            "titanic",
            vec![
                Column::numeric(
                    "Age",
                    vec![29.0, 2.0, 38.0, 20.125, 80.0, 15.0, 30.0, 25.0, 45.0, f64::NAN],
                ),
                Column::text("Sex", &["m", "f", "f", "m", "m", "f", "m", "f", "m", "f"]),
            ],
        )
        .unwrap()
    }

    /// 100 values in 0..100 followed by `high` values far above the upper bound
    fn dataset_with_high_outliers(high: usize) -> Dataset {
        let mut values: Vec<f64> = (0..100).map(|i| i as f64).collect();
        values.extend((0..high).map(|i| 10_000.0 + i as f64));
        Dataset::from_columns("wide", vec![Column::numeric("x", values)]).unwrap()
    }

    fn wide_dataset() -> Dataset {
        dataset_with_high_outliers(12)
    }

    #[test]
    fn test_has_outliers_age() {
        let dataset = age_dataset();
        let params = BoundsParams::default();
        assert!(has_outliers(&dataset, "Age", &params).unwrap());
        assert!(has_high_outliers(&dataset, "Age", &params).unwrap());
        assert!(!has_low_outliers(&dataset, "Age", &params).unwrap());
        assert_eq!(outlier_labels(&dataset, "Age", &params).unwrap(), vec![4]);
    }

    #[test]
    fn test_has_outliers_constant_column() {
        let dataset = Dataset::from_columns("c", vec![Column::numeric("x", vec![3.0; 8])]).unwrap();
        assert!(!has_outliers(&dataset, "x", &BoundsParams::default()).unwrap());
    }

    #[test]
    fn test_has_outliers_errors() {
        let dataset = age_dataset();
        let params = BoundsParams::default();
        assert!(matches!(
            has_outliers(&dataset, "Fare", &params),
            Err(OutlierError::ColumnNotFound(_))
        ));
        assert!(matches!(
            has_outliers(&dataset, "Sex", &params),
            Err(OutlierError::InvalidColumnType { .. })
        ));
    }

    #[test]
    fn test_values_on_bounds_are_kept() {
        let bounds = OutlierBounds { lower: 1.0, upper: 3.0 };
        let dataset = Dataset::from_columns("b", vec![Column::numeric("x", vec![1.0, 2.0, 3.0])]).unwrap();
        assert!(!has_outliers_with_bounds(&dataset, "x", &bounds).unwrap());
    }

    #[test]
    fn test_fetch_small_set_returns_all() {
        let dataset = age_dataset();
        let fetch = fetch_outliers(&dataset, "Age", &BoundsParams::default(), true, 5).unwrap();
        assert_eq!(fetch.total, 1);
        assert_eq!(fetch.rows.len(), 1);
        assert_eq!(fetch.labels, Some(vec![4]));
        assert!(!fetch.is_truncated());
    }

    #[test]
    fn test_fetch_large_set_truncates_rows_not_labels() {
        let dataset = wide_dataset();
        let fetch = fetch_outliers(&dataset, "x", &BoundsParams::default(), true, 5).unwrap();

        assert_eq!(fetch.total, 12);
        assert_eq!(fetch.rows.len(), 5);
        assert_eq!(fetch.rows.index(), &[100, 101, 102, 103, 104]);
        assert_eq!(fetch.labels.clone().unwrap(), (100..112).collect::<Vec<_>>());
        assert!(fetch.is_truncated());
    }

    #[test]
    fn test_fetch_exactly_ten_matches_shows_all() {
        let dataset = dataset_with_high_outliers(FULL_DISPLAY_MAX);
        let fetch = fetch_outliers(&dataset, "x", &BoundsParams::default(), true, 5).unwrap();

        assert_eq!(fetch.total, 10);
        assert_eq!(fetch.rows.index(), (100..110).collect::<Vec<_>>().as_slice());
        assert!(!fetch.is_truncated());
    }

    #[test]
    fn test_fetch_eleven_matches_truncates() {
        let dataset = dataset_with_high_outliers(FULL_DISPLAY_MAX + 1);
        let fetch = fetch_outliers(&dataset, "x", &BoundsParams::default(), true, 5).unwrap();

        assert_eq!(fetch.total, 11);
        assert_eq!(fetch.rows.index(), &[100, 101, 102, 103, 104]);
        assert_eq!(fetch.labels.clone().unwrap(), (100..111).collect::<Vec<_>>());
        assert!(fetch.is_truncated());
    }

    #[test]
    fn test_fetch_without_index() {
        let fetch = fetch_outliers(&wide_dataset(), "x", &BoundsParams::default(), false, 3).unwrap();
        assert!(fetch.labels.is_none());
        assert_eq!(fetch.rows.len(), 3);
    }

    #[test]
    fn test_remove_outliers_keeps_missing_and_input() {
        let dataset = age_dataset();
        let cleaned = remove_outliers(&dataset, "Age", &BoundsParams::default()).unwrap();

        assert_eq!(dataset.len(), 10);
        assert_eq!(cleaned.len(), 9);
        assert!(!cleaned.index().contains(&4));
        assert!(cleaned.numeric_values("Age").unwrap()[8].is_nan());
    }

    #[test]
    fn test_remove_then_check_against_pre_removal_bounds() {
        let dataset = wide_dataset();
        let bounds = compute_bounds(&dataset, "x", &BoundsParams::default()).unwrap();
        let cleaned = remove_outliers_with_bounds(&dataset, "x", &bounds).unwrap();
        assert!(!has_outliers_with_bounds(&cleaned, "x", &bounds).unwrap());
    }

    #[test]
    fn test_cap_outliers_in_place() {
        let mut dataset = age_dataset();
        let bounds = cap_outliers(&mut dataset, "Age", &BoundsParams::default()).unwrap();

        let ages = dataset.numeric_values("Age").unwrap();
        assert_eq!(ages[4], bounds.upper);
        assert_eq!(ages[1], 2.0);
        assert!(ages[9].is_nan());
        assert!(!has_outliers_with_bounds(&dataset, "Age", &bounds).unwrap());
    }

    #[test]
    fn test_cap_is_idempotent_with_fixed_bounds() {
        let mut once = wide_dataset();
        let bounds = compute_bounds(&once, "x", &BoundsParams::default()).unwrap();
        assert_eq!(cap_outliers_with_bounds(&mut once, "x", &bounds).unwrap(), 12);

        let mut twice = once.clone();
        assert_eq!(cap_outliers_with_bounds(&mut twice, "x", &bounds).unwrap(), 0);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_cap_non_numeric_fails() {
        let mut dataset = age_dataset();
        assert!(cap_outliers(&mut dataset, "Sex", &BoundsParams::default()).is_err());
    }

    #[test]
    fn test_check_column_counts() {
        let check = check_column(&wide_dataset(), "x", &BoundsParams::default()).unwrap();
        assert!(check.has_outliers);
        assert_eq!(check.low_count, 0);
        assert_eq!(check.high_count, 12);
        assert_eq!(count_outliers(&wide_dataset(), "x", &BoundsParams::default()).unwrap(), 12);
    }
}
