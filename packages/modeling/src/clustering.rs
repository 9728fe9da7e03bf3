//! Partition-based and density-based clustering via `linfa-clustering`.

use linfa::DatasetBase;
use linfa::ParamGuard;
use linfa::traits::{Fit, Predict, Transformer};
use linfa_clustering::{Dbscan, KMeans};
use ndarray::{Array1, Array2};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::ModelError;

/// Result of a k-means run.
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansOutcome {
    /// Cluster index per input row.
    pub labels: Vec<usize>,
    /// One center per cluster, in the input feature space.
    pub centroids: Vec<Vec<f64>>,
    /// Within-cluster sum of squared distances.
    pub inertia: f64,
}

/// Runs k-means with a seeded generator. `k` is clamped to the number of
/// distinct rows.
///
/// # Errors
///
/// Returns an error for empty input or if `linfa` rejects the run.
pub fn kmeans(
    x: &Array2<f64>,
    k: usize,
    seed: u64,
    max_iterations: u64,
) -> Result<KMeansOutcome, ModelError> {
    if x.nrows() == 0 || x.ncols() == 0 || k == 0 {
        return Err(ModelError::EmptyInput);
    }
    let k = k.min(distinct_rows(x));

    let dataset = DatasetBase::from(x.clone());
    let model = KMeans::params_with_rng(k, StdRng::seed_from_u64(seed))
        .max_n_iterations(max_iterations)
        .tolerance(1e-6)
        .fit(&dataset)
        .map_err(|e| ModelError::Clustering(e.to_string()))?;

    let predicted: Array1<usize> = model.predict(x);
    let labels = predicted.to_vec();
    let centroids: Vec<Vec<f64>> = model
        .centroids()
        .rows()
        .into_iter()
        .map(|row| row.to_vec())
        .collect();
    let inertia = inertia(x, &labels, &centroids);

    Ok(KMeansOutcome {
        labels,
        centroids,
        inertia,
    })
}

/// Within-cluster sum of squares for k = 1..=min(`max_k`, rows). Diagnostic
/// only: the caller keeps its fixed k regardless of the curve.
///
/// # Errors
///
/// Returns an error if any k-means run fails.
pub fn elbow_inertias(
    x: &Array2<f64>,
    max_k: usize,
    seed: u64,
    max_iterations: u64,
) -> Result<Vec<f64>, ModelError> {
    (1..=max_k.min(x.nrows()))
        .map(|k| kmeans(x, k, seed, max_iterations).map(|o| o.inertia))
        .collect()
}

/// Runs DBSCAN. `None` marks noise points.
///
/// # Errors
///
/// Returns an error for empty input or invalid parameters.
pub fn dbscan(
    x: &Array2<f64>,
    eps: f64,
    min_points: usize,
) -> Result<Vec<Option<usize>>, ModelError> {
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(ModelError::EmptyInput);
    }

    let memberships: Array1<Option<usize>> = Dbscan::params(min_points)
        .tolerance(eps)
        .check()
        .map_err(|e| ModelError::Clustering(e.to_string()))?
        .transform(x);

    Ok(memberships.to_vec())
}

/// Number of distinct non-noise clusters in a DBSCAN labelling.
#[must_use]
pub fn cluster_count(labels: &[Option<usize>]) -> usize {
    let mut ids: Vec<usize> = labels.iter().flatten().copied().collect();
    ids.sort_unstable();
    ids.dedup();
    ids.len()
}

fn distinct_rows(x: &Array2<f64>) -> usize {
    let mut rows: Vec<Vec<u64>> = x
        .rows()
        .into_iter()
        .map(|row| row.iter().map(|v| v.to_bits()).collect())
        .collect();
    rows.sort_unstable();
    rows.dedup();
    rows.len()
}

fn inertia(x: &Array2<f64>, labels: &[usize], centroids: &[Vec<f64>]) -> f64 {
    x.rows()
        .into_iter()
        .zip(labels)
        .map(|(row, &label)| {
            centroids.get(label).map_or(0.0, |center| {
                row.iter()
                    .zip(center)
                    .map(|(v, c)| (v - c) * (v - c))
                    .sum::<f64>()
            })
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    fn two_blobs() -> Array2<f64> {
        array![
            [0.0, 0.0],
            [0.1, 0.0],
            [0.0, 0.1],
            [0.1, 0.1],
            [0.05, 0.05],
            [10.0, 10.0],
            [10.1, 10.0],
            [10.0, 10.1],
            [10.1, 10.1],
            [10.05, 10.05],
        ]
    }

    #[test]
    fn kmeans_separates_blobs() {
        let x = two_blobs();
        let outcome = kmeans(&x, 2, 42, 300).unwrap();
        assert_eq!(outcome.labels.len(), 10);
        assert!(outcome.labels[..5].iter().all(|l| *l == outcome.labels[0]));
        assert!(outcome.labels[5..].iter().all(|l| *l == outcome.labels[5]));
        assert_ne!(outcome.labels[0], outcome.labels[5]);
        assert_eq!(outcome.centroids.len(), 2);
        assert!(outcome.inertia < 1.0);
    }

    #[test]
    fn kmeans_is_reproducible_with_seed() {
        let x = two_blobs();
        let a = kmeans(&x, 3, 42, 300).unwrap();
        let b = kmeans(&x, 3, 42, 300).unwrap();
        assert_eq!(a.labels, b.labels);
    }

    #[test]
    fn elbow_inertia_drops_from_one_to_two_clusters() {
        let x = two_blobs();
        let curve = elbow_inertias(&x, 4, 42, 300).unwrap();
        assert_eq!(curve.len(), 4);
        assert!(curve[1] < curve[0]);
    }

    #[test]
    fn dbscan_marks_isolated_point_as_noise() {
        let mut rows = two_blobs().into_raw_vec();
        rows.extend([50.0, -50.0]);
        let x = Array2::from_shape_vec((11, 2), rows).unwrap();

        let labels = dbscan(&x, 0.5, 3).unwrap();
        assert_eq!(labels.len(), 11);
        assert_eq!(labels[10], None);
        assert_eq!(cluster_count(&labels), 2);
        assert!(labels[..5].iter().all(|l| l.is_some() && *l == labels[0]));
    }

    #[test]
    fn kmeans_clamps_k_to_distinct_rows() {
        let x = array![[1.0, 1.0], [1.0, 1.0], [2.0, 2.0], [2.0, 2.0]];
        let outcome = kmeans(&x, 3, 42, 300).unwrap();
        assert_eq!(outcome.centroids.len(), 2);
        assert!(outcome.inertia.abs() < 1e-12);
    }

    #[test]
    fn empty_input_is_error() {
        let x = Array2::<f64>::zeros((0, 2));
        assert!(matches!(kmeans(&x, 3, 42, 10), Err(ModelError::EmptyInput)));
        assert!(matches!(dbscan(&x, 0.5, 5), Err(ModelError::EmptyInput)));
    }
}
