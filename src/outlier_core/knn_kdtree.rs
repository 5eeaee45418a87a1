//! K-nearest-neighbor search for density scoring
//!
//! Two strategies produce identical, deterministic neighbor lists:
//! an exact O(n²) brute-force scan and a KD-Tree (kiddo) search that is
//! O(n log n) on well-spread data. Neighbors are ordered by ascending
//! Euclidean distance, ties broken by ascending row position, and a row is
//! never its own neighbor (exact duplicates of it are).

use kiddo::KdTree;
use kiddo::SquaredEuclidean;
use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::utils::type_convert::canonical_bits;
use crate::utils::OutlierError;

/// Maximum number of features supported by the KD-Tree strategy
pub const MAX_FEATURES: usize = 16;

/// Leaf bucket size of `kiddo::KdTree`
const BUCKET_SIZE: usize = 32;

/// Neighbor search strategy
///
/// `KdTree` falls back to the brute-force scan when a coordinate value
/// repeats more than the tree's leaf bucket can hold on some axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeighborSearch {
    #[default]
    BruteForce,
    KdTree,
}

/// The `k` nearest neighbors of every row
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbors {
    /// Row positions of each row's neighbors, nearest first
    pub indices: Vec<Vec<usize>>,
    /// Euclidean distances matching `indices`
    pub distances: Vec<Vec<f64>>,
}

impl Neighbors {
    /// Distance from `row` to its farthest (k-th) neighbor
    pub fn k_distance(&self, row: usize) -> f64 {
        self.distances[row].last().copied().unwrap_or(0.0)
    }
}

fn euclidean(a: &ArrayView1<f64>, b: &ArrayView1<f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

fn sort_candidates(candidates: &mut [(f64, usize)]) {
    candidates.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
}

fn collect(candidates_per_row: Vec<Vec<(f64, usize)>>) -> Neighbors {
    let mut indices = Vec::with_capacity(candidates_per_row.len());
    let mut distances = Vec::with_capacity(candidates_per_row.len());
    for candidates in candidates_per_row {
        let (d, i): (Vec<f64>, Vec<usize>) = candidates.into_iter().unzip();
        distances.push(d);
        indices.push(i);
    }
    Neighbors { indices, distances }
}

/// Find the `k` nearest neighbors of every row of `features`
///
/// # Arguments
/// * `features` - Feature matrix (rows=samples, cols=features), validated by the caller
/// * `k` - Number of neighbors, `1 <= k < n_samples`
/// * `search` - Strategy to use
///
/// # Returns
/// * `Err(OutlierError::InvalidInput)` - `k` out of range, or more than `MAX_FEATURES`
///   columns with the KD-Tree strategy
pub fn k_nearest_neighbors(
    features: &Array2<f64>,
    k: usize,
    search: NeighborSearch,
) -> Result<Neighbors, OutlierError> {
    let n_samples = features.nrows();
    if k == 0 || k >= n_samples {
        return Err(OutlierError::InvalidInput(format!(
            "neighbor count must be in 1..{}, got {}",
            n_samples, k
        )));
    }

    tracing::debug!(
        samples = n_samples,
        features = features.ncols(),
        k,
        ?search,
        "searching nearest neighbors"
    );

    match search {
        NeighborSearch::BruteForce => Ok(brute_force(features, k)),
        NeighborSearch::KdTree => match crowded_axis(features) {
            Some(axis) => {
                tracing::debug!(
                    axis,
                    bucket_size = BUCKET_SIZE,
                    "coordinate value repeats beyond KD-Tree bucket size, using brute force"
                );
                Ok(brute_force(features, k))
            }
            None => kdtree_dispatch(features, k),
        },
    }
}

/// First axis on which a single value occurs more than `BUCKET_SIZE` times
///
/// kiddo cannot split a leaf whose points all share the split coordinate.
fn crowded_axis(features: &Array2<f64>) -> Option<usize> {
    features.columns().into_iter().position(|column| {
        let mut counts: HashMap<u64, usize> = HashMap::new();
        column.iter().any(|&value| {
            let count = counts.entry(canonical_bits(value)).or_insert(0);
            *count += 1;
            *count > BUCKET_SIZE
        })
    })
}

fn brute_force(features: &Array2<f64>, k: usize) -> Neighbors {
    let n_samples = features.nrows();
    let rows: Vec<ArrayView1<f64>> = features.rows().into_iter().collect();

    let per_row = (0..n_samples)
        .map(|i| {
            let mut candidates: Vec<(f64, usize)> = (0..n_samples)
                .filter(|&j| j != i)
                .map(|j| (euclidean(&rows[i], &rows[j]), j))
                .collect();
            sort_candidates(&mut candidates);
            candidates.truncate(k);
            candidates
        })
        .collect();

    collect(per_row)
}

fn kdtree_dispatch(features: &Array2<f64>, k: usize) -> Result<Neighbors, OutlierError> {
    match features.ncols() {
        1 => Ok(kdtree::<1>(features, k)),
        2 => Ok(kdtree::<2>(features, k)),
        3 => Ok(kdtree::<3>(features, k)),
        4 => Ok(kdtree::<4>(features, k)),
        5 => Ok(kdtree::<5>(features, k)),
        6 => Ok(kdtree::<6>(features, k)),
        7 => Ok(kdtree::<7>(features, k)),
        8 => Ok(kdtree::<8>(features, k)),
        9 => Ok(kdtree::<9>(features, k)),
        10 => Ok(kdtree::<10>(features, k)),
        11 => Ok(kdtree::<11>(features, k)),
        12 => Ok(kdtree::<12>(features, k)),
        13 => Ok(kdtree::<13>(features, k)),
        14 => Ok(kdtree::<14>(features, k)),
        15 => Ok(kdtree::<15>(features, k)),
        16 => Ok(kdtree::<16>(features, k)),
        n => Err(OutlierError::InvalidInput(format!(
            "Feature count {} exceeds maximum supported KD-Tree dimension {}. \
             Use brute-force neighbor search instead.",
            n, MAX_FEATURES
        ))),
    }
}

/// KD-Tree search for dimension K.
///
/// The k+1 nearest points (self included) fix the k-th neighbor radius; a
/// radius query then gathers every point at that distance so ties are
/// resolved by row position exactly as in the brute-force scan.
fn kdtree<const K: usize>(features: &Array2<f64>, k: usize) -> Neighbors {
    let rows: Vec<ArrayView1<f64>> = features.rows().into_iter().collect();
    let points: Vec<[f64; K]> = rows
        .iter()
        .map(|row| {
            let mut arr = [0.0; K];
            for (j, &val) in row.iter().enumerate().take(K) {
                arr[j] = val;
            }
            arr
        })
        .collect();

    let mut tree: KdTree<f64, K> = KdTree::new();
    for (i, point) in points.iter().enumerate() {
        tree.add(point, i as u64);
    }

    let per_row = points
        .iter()
        .enumerate()
        .map(|(i, point)| {
            let radius = tree
                .nearest_n::<SquaredEuclidean>(point, k + 1)
                .iter()
                .map(|n| n.distance)
                .fold(0.0, f64::max);

            let mut candidates: Vec<(f64, usize)> = tree
                .within::<SquaredEuclidean>(point, radius * (1.0 + 1e-9) + f64::MIN_POSITIVE)
                .into_iter()
                .map(|n| n.item as usize)
                .filter(|&j| j != i)
                .map(|j| (euclidean(&rows[i], &rows[j]), j))
                .collect();
            sort_candidates(&mut candidates);
            candidates.truncate(k);
            candidates
        })
        .collect();

    collect(per_row)
}
