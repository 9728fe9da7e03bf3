//! CART regression trees.
//!
//! Trees split on the threshold that maximizes the reduction of the sum of
//! squared errors. Samples are passed as an index list so that bootstrap
//! resamples (with repeated indices) need no copying of the matrix.

use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: 16,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
    n_features: usize,
    /// Total squared-error reduction per feature, unnormalized.
    impurity_decrease: Vec<f64>,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    gain: f64,
}

impl RegressionTree {
    /// Fits a tree on the rows of `x` listed in `samples`.
    ///
    /// `samples` must be non-empty and index valid rows.
    #[must_use]
    pub fn fit(
        x: ArrayView2<'_, f64>,
        y: ArrayView1<'_, f64>,
        samples: &[usize],
        params: &TreeParams,
    ) -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            n_features: x.ncols(),
            impurity_decrease: vec![0.0; x.ncols()],
        };
        tree.grow(x, y, samples.to_vec(), 0, params);
        tree
    }

    /// Grows the subtree for `samples` and returns its node index.
    fn grow(
        &mut self,
        x: ArrayView2<'_, f64>,
        y: ArrayView1<'_, f64>,
        samples: Vec<usize>,
        depth: usize,
        params: &TreeParams,
    ) -> usize {
        let value = mean_of(y, &samples);
        let index = self.nodes.len();
        self.nodes.push(Node::Leaf { value });

        if depth >= params.max_depth || samples.len() < params.min_samples_split.max(2) {
            return index;
        }

        let Some(best) = best_split(x, y, &samples, params.min_samples_leaf.max(1)) else {
            return index;
        };

        let (left_samples, right_samples): (Vec<usize>, Vec<usize>) = samples
            .iter()
            .partition(|&&s| x[[s, best.feature]] <= best.threshold);

        self.impurity_decrease[best.feature] += best.gain;

        let left = self.grow(x, y, left_samples, depth + 1, params);
        let right = self.grow(x, y, right_samples, depth + 1, params);
        self.nodes[index] = Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left,
            right,
        };
        index
    }

    #[must_use]
    pub fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    #[must_use]
    pub fn predict(&self, x: ArrayView2<'_, f64>) -> Array1<f64> {
        x.rows().into_iter().map(|row| self.predict_row(row)).collect()
    }

    #[must_use]
    pub fn impurity_decrease(&self) -> &[f64] {
        &self.impurity_decrease
    }

    #[must_use]
    pub const fn n_features(&self) -> usize {
        self.n_features
    }

    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }
}

#[allow(clippy::cast_precision_loss)]
fn mean_of(y: ArrayView1<'_, f64>, samples: &[usize]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().map(|&s| y[s]).sum::<f64>() / samples.len() as f64
}

/// Finds the split with the largest squared-error reduction. Ties keep
/// the lowest feature index and the lowest threshold.
#[allow(clippy::cast_precision_loss)]
fn best_split(
    x: ArrayView2<'_, f64>,
    y: ArrayView1<'_, f64>,
    samples: &[usize],
    min_leaf: usize,
) -> Option<BestSplit> {
    let n = samples.len();
    let total: f64 = samples.iter().map(|&s| y[s]).sum();
    let parent_term = total * total / n as f64;

    let mut best: Option<BestSplit> = None;
    let mut order = samples.to_vec();

    for feature in 0..x.ncols() {
        order.sort_by(|&a, &b| x[[a, feature]].total_cmp(&x[[b, feature]]));

        let mut left_sum = 0.0;
        for i in 0..n - 1 {
            left_sum += y[order[i]];
            let left_n = i + 1;
            let right_n = n - left_n;
            if left_n < min_leaf || right_n < min_leaf {
                continue;
            }

            let current = x[[order[i], feature]];
            let next = x[[order[i + 1], feature]];
            if next <= current {
                continue;
            }

            let right_sum = total - left_sum;
            let gain = left_sum * left_sum / left_n as f64 + right_sum * right_sum / right_n as f64
                - parent_term;

            if gain > best.as_ref().map_or(1e-12, |b| b.gain + 1e-12) {
                best = Some(BestSplit {
                    feature,
                    threshold: current + (next - current) / 2.0,
                    gain,
                });
            }
        }
    }

    best
}
