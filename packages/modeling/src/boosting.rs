//! Gradient-boosted regression trees with squared-error loss.

use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::tree::{RegressionTree, TreeParams};
use crate::{ModelError, check_shapes, normalize_importances};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoostingParams {
    pub n_stages: usize,
    pub learning_rate: f64,
    pub tree: TreeParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoosting {
    initial: f64,
    learning_rate: f64,
    stages: Vec<RegressionTree>,
    importances: Vec<f64>,
    n_features: usize,
}

impl GradientBoosting {
    /// Starts from the target mean and fits each stage to the residuals
    /// of the current ensemble.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty or shapes disagree.
    pub fn fit(
        x: ArrayView2<'_, f64>,
        y: ArrayView1<'_, f64>,
        params: &BoostingParams,
    ) -> Result<Self, ModelError> {
        check_shapes(x, y.len())?;

        let initial = y.mean().unwrap_or(0.0);
        let samples: Vec<usize> = (0..x.nrows()).collect();
        let mut current = Array1::from_elem(x.nrows(), initial);
        let mut stages = Vec::with_capacity(params.n_stages);
        let mut summed = vec![0.0; x.ncols()];

        for _ in 0..params.n_stages {
            let residuals = &y - &current;
            let tree = RegressionTree::fit(x, residuals.view(), &samples, &params.tree);
            current.scaled_add(params.learning_rate, &tree.predict(x));
            for (total, v) in summed
                .iter_mut()
                .zip(normalize_importances(tree.impurity_decrease()))
            {
                *total += v;
            }
            stages.push(tree);
        }

        log::debug!(
            "Fitted gradient boosting with {} stages on {} rows",
            stages.len(),
            x.nrows()
        );

        Ok(Self {
            initial,
            learning_rate: params.learning_rate,
            stages,
            importances: normalize_importances(&summed),
            n_features: x.ncols(),
        })
    }

    #[must_use]
    pub fn predict(&self, x: ArrayView2<'_, f64>) -> Array1<f64> {
        let mut out = Array1::from_elem(x.nrows(), self.initial);
        for tree in &self.stages {
            out.scaled_add(self.learning_rate, &tree.predict(x));
        }
        out
    }

    #[must_use]
    pub fn feature_importances(&self) -> &[f64] {
        &self.importances
    }

    #[must_use]
    pub const fn n_features(&self) -> usize {
        self.n_features
    }
}
