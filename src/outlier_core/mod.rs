/// Outlier detection core modules
pub mod bounds;
pub mod feature;
pub mod knn_kdtree;
pub mod lof;
pub mod univariate;

// Re-export commonly used functions
pub use bounds::{compute_bounds, BoundsParams, OutlierBounds};
pub use knn_kdtree::NeighborSearch;
pub use lof::{
    detect_density_outliers, drop_density_outliers, select_below, threshold_at_rank, DensityOutliers,
    LocalOutlierFactor,
};
pub use univariate::{
    cap_outliers, fetch_outliers, has_outliers, remove_outliers, ColumnOutlierCheck, OutlierFetch,
};
