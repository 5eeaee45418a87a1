use super::error::OutlierError;

/// Validate a quantile level is within [0, 1]
///
/// # Arguments
/// * `q` - The quantile level to validate
///
/// # Returns
/// * `Ok(())` if valid
/// * `Err(OutlierError::InvalidInput)` if out of range or NaN
pub fn validate_quantile(q: f64) -> Result<(), OutlierError> {
    if !(0.0..=1.0).contains(&q) {
        return Err(OutlierError::InvalidInput(format!(
            "quantile must be 0-1, got {}",
            q
        )));
    }
    Ok(())
}

/// Validate a (lower, upper) quantile pair used for IQR bounds
pub fn validate_quantile_pair(lower: f64, upper: f64) -> Result<(), OutlierError> {
    validate_quantile(lower)?;
    validate_quantile(upper)?;
    if lower > upper {
        return Err(OutlierError::InvalidInput(format!(
            "lower quantile {} exceeds upper quantile {}",
            lower, upper
        )));
    }
    Ok(())
}

/// Validate the IQR multiplier is finite and non-negative
pub fn validate_multiplier(multiplier: f64) -> Result<(), OutlierError> {
    if !multiplier.is_finite() || multiplier < 0.0 {
        return Err(OutlierError::InvalidInput(format!(
            "IQR multiplier must be finite and >= 0, got {}",
            multiplier
        )));
    }
    Ok(())
}

/// Normalize a float for hashing: folds -0.0 into 0.0 so both count as one distinct value
pub fn canonical_bits(value: f64) -> u64 {
    if value == 0.0 {
        0.0f64.to_bits()
    } else {
        value.to_bits()
    }
}

/// Parse a raw text cell into a numeric value, `None` when the cell is not a number
///
/// Empty cells and the usual missing markers map to `Some(NaN)`.
pub fn parse_numeric_cell(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if is_missing_marker(trimmed) {
        return Some(f64::NAN);
    }
    trimmed.parse::<f64>().ok()
}

/// Whether a raw text cell denotes a missing value
pub fn is_missing_marker(raw: &str) -> bool {
    matches!(raw.trim(), "" | "NA" | "NaN" | "nan" | "null" | "NULL" | "None")
}
