use ndarray::Array2;

use crate::utils::OutlierError;

/// Check that a feature matrix can be fed to the density scorer.
///
/// Rows are samples and columns are features. The scorer needs at least one
/// sample and one feature, and every value must be finite: a missing value
/// (NaN) means the caller skipped `Dataset::drop_missing`, an infinite one
/// has no meaningful distance.
pub fn validate_features(features: &Array2<f64>) -> Result<(), OutlierError> {
    let (samples, dims) = features.dim();
    if samples == 0 {
        return Err(OutlierError::EmptyDataset(
            "no rows to score for density outliers".to_string(),
        ));
    }
    if dims == 0 {
        return Err(OutlierError::InvalidInput(
            "density scoring needs at least one numeric column".to_string(),
        ));
    }

    match features.indexed_iter().find(|(_, v)| !v.is_finite()) {
        Some(((row, col), v)) if v.is_nan() => Err(OutlierError::InvalidInput(format!(
            "missing value at row {}, column {}; drop rows with missing values before density scoring",
            row, col
        ))),
        Some(((row, col), v)) => Err(OutlierError::InvalidInput(format!(
            "infinite value {} at row {}, column {} cannot be scored",
            v, row, col
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    #[test]
    fn test_finite_matrix_is_accepted() {
        assert!(validate_features(&arr2(&[[0.5, -2.0], [3.0, 1e9]])).is_ok());
    }

    #[test]
    fn test_shape_errors() {
        assert!(matches!(
            validate_features(&Array2::<f64>::zeros((0, 3))),
            Err(OutlierError::EmptyDataset(_))
        ));
        assert!(matches!(
            validate_features(&Array2::<f64>::zeros((4, 0))),
            Err(OutlierError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_missing_value_points_at_drop_missing() {
        let message = validate_features(&arr2(&[[1.0, 2.0], [3.0, f64::NAN]]))
            .unwrap_err()
            .to_string();
        assert!(message.contains("row 1, column 1"));
        assert!(message.contains("drop rows with missing values"));
    }

    #[test]
    fn test_infinite_value_is_rejected() {
        let message = validate_features(&arr2(&[[1.0, f64::NEG_INFINITY], [3.0, 4.0]]))
            .unwrap_err()
            .to_string();
        assert!(message.contains("infinite value -inf at row 0, column 1"));
    }
}
