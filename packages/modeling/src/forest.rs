//! Bagged regression trees (random forest with all features considered at
//! every split).

use ndarray::{Array1, ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::tree::{RegressionTree, TreeParams};
use crate::{ModelError, check_shapes, normalize_importances};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_trees: usize,
    pub tree: TreeParams,
    pub seed: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<RegressionTree>,
    importances: Vec<f64>,
    n_features: usize,
}

impl RandomForest {
    /// Fits `n_trees` trees, each on a bootstrap resample drawn from a
    /// generator seeded with `params.seed`.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty or shapes disagree.
    pub fn fit(
        x: ArrayView2<'_, f64>,
        y: ArrayView1<'_, f64>,
        params: &ForestParams,
    ) -> Result<Self, ModelError> {
        check_shapes(x, y.len())?;

        let n = x.nrows();
        let n_trees = params.n_trees.max(1);
        let mut rng = StdRng::seed_from_u64(params.seed);
        let mut trees = Vec::with_capacity(n_trees);
        let mut summed = vec![0.0; x.ncols()];

        for _ in 0..n_trees {
            let samples: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
            let tree = RegressionTree::fit(x, y, &samples, &params.tree);
            for (total, v) in summed
                .iter_mut()
                .zip(normalize_importances(tree.impurity_decrease()))
            {
                *total += v;
            }
            trees.push(tree);
        }

        log::debug!("Fitted random forest with {n_trees} trees on {n} rows");

        Ok(Self {
            trees,
            importances: normalize_importances(&summed),
            n_features: x.ncols(),
        })
    }

    /// Mean prediction across trees.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn predict(&self, x: ArrayView2<'_, f64>) -> Array1<f64> {
        let mut total: Array1<f64> = Array1::zeros(x.nrows());
        for tree in &self.trees {
            total += &tree.predict(x);
        }
        total / self.trees.len().max(1) as f64
    }

    #[must_use]
    pub fn feature_importances(&self) -> &[f64] {
        &self.importances
    }

    #[must_use]
    pub const fn n_features(&self) -> usize {
        self.n_features
    }

    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{Array2, array};

    use super::*;

    fn params(seed: u64) -> ForestParams {
        ForestParams {
            n_trees: 25,
            tree: TreeParams::default(),
            seed,
        }
    }

    fn linear_data() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((40, 2), |(i, j)| if j == 0 { i as f64 } else { 1.0 });
        let y = x.column(0).mapv(|v| 2.0 * v + 1.0);
        (x, y)
    }

    #[test]
    fn same_seed_gives_same_model() {
        let (x, y) = linear_data();
        let a = RandomForest::fit(x.view(), y.view(), &params(42)).unwrap();
        let b = RandomForest::fit(x.view(), y.view(), &params(42)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.n_trees(), 25);
    }

    #[test]
    fn tracks_monotone_signal() {
        let (x, y) = linear_data();
        let forest = RandomForest::fit(x.view(), y.view(), &params(7)).unwrap();
        let predictions = forest.predict(array![[5.0, 1.0], [35.0, 1.0]].view());
        assert!(predictions[0] < predictions[1]);
        assert!((predictions[1] - 71.0).abs() < 10.0);
    }

    #[test]
    fn importances_sum_to_one_and_ignore_constant_feature() {
        let (x, y) = linear_data();
        let forest = RandomForest::fit(x.view(), y.view(), &params(1)).unwrap();
        let importances = forest.feature_importances();
        assert!((importances.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(importances[1].abs() < 1e-12);
    }

    #[test]
    fn rejects_mismatched_targets() {
        let x = array![[1.0], [2.0]];
        let y = array![1.0];
        assert!(RandomForest::fit(x.view(), y.view(), &params(1)).is_err());
    }
}
