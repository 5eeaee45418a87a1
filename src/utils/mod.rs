/// Utility modules for error handling and type conversions
pub mod error;
pub mod type_convert;

// Re-export commonly used types
pub use error::OutlierError;
pub use type_convert::{validate_multiplier, validate_quantile, validate_quantile_pair};
