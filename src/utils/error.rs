use thiserror::Error;

/// Error type for outlier detection operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OutlierError {
    /// Referenced column does not exist in the dataset
    #[error("ColumnNotFoundError: column '{0}' not found")]
    ColumnNotFound(String),
    /// Column exists but has the wrong declared type for the operation
    #[error("InvalidColumnTypeError: column '{column}' is not {expected}")]
    InvalidColumnType { column: String, expected: String },
    /// Malformed input (missing values where prohibited, bad parameters, shape mismatch)
    #[error("InvalidInputError: {0}")]
    InvalidInput(String),
    /// No values to compute percentiles or neighbors on
    #[error("EmptyDatasetError: {0}")]
    EmptyDataset(String),
    /// Invalid engine configuration
    #[error("ConfigError: {0}")]
    Config(String),
}

impl OutlierError {
    pub(crate) fn not_numeric(column: &str) -> Self {
        OutlierError::InvalidColumnType {
            column: column.to_string(),
            expected: "numeric".to_string(),
        }
    }
}
