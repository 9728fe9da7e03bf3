#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Numeric modeling primitives.
//!
//! Everything here works on plain `ndarray` matrices and knows nothing
//! about locations. Clustering and ordinary least squares delegate to
//! `linfa`; the tree ensembles are implemented here because they must
//! report feature importances. Every trained model is serializable so it
//! can be stored in the on-disk [`cache`].

pub mod boosting;
pub mod cache;
pub mod clustering;
pub mod evaluate;
pub mod features;
pub mod forest;
pub mod linear;
pub mod metrics;
pub mod split;
pub mod tree;

use ndarray::{Array1, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::boosting::GradientBoosting;
use crate::forest::RandomForest;
use crate::linear::LinearModel;

/// Errors that can occur while fitting or persisting models.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// No rows or no features to fit on.
    #[error("Cannot fit on empty input")]
    EmptyInput,

    /// Matrix and target dimensions disagree.
    #[error("Shape mismatch: {0}")]
    Shape(String),

    /// Least-squares solve failed (e.g. singular design matrix).
    #[error("Linear regression failed: {0}")]
    Linear(String),

    /// A clustering algorithm rejected its parameters or input.
    #[error("Clustering failed: {0}")]
    Clustering(String),

    /// I/O error (cache read/write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Encoding the cache artifact failed.
    #[error("Cache encode error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
}

/// A fitted regressor of any supported family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", content = "model", rename_all = "snake_case")]
pub enum TrainedModel {
    Linear(LinearModel),
    RandomForest(RandomForest),
    GradientBoosting(GradientBoosting),
}

impl TrainedModel {
    #[must_use]
    pub fn predict(&self, x: ArrayView2<'_, f64>) -> Array1<f64> {
        match self {
            Self::Linear(m) => m.predict(x),
            Self::RandomForest(m) => m.predict(x),
            Self::GradientBoosting(m) => m.predict(x),
        }
    }

    /// Normalized impurity-based importances. Linear models have none.
    #[must_use]
    pub fn feature_importances(&self) -> Option<&[f64]> {
        match self {
            Self::Linear(_) => None,
            Self::RandomForest(m) => Some(m.feature_importances()),
            Self::GradientBoosting(m) => Some(m.feature_importances()),
        }
    }

    #[must_use]
    pub fn n_features(&self) -> usize {
        match self {
            Self::Linear(m) => m.n_features(),
            Self::RandomForest(m) => m.n_features(),
            Self::GradientBoosting(m) => m.n_features(),
        }
    }
}

/// Validates that `x` has rows and columns and matches `y` in length.
///
/// # Errors
///
/// Returns [`ModelError::EmptyInput`] or [`ModelError::Shape`].
pub fn check_shapes(x: ArrayView2<'_, f64>, y_len: usize) -> Result<(), ModelError> {
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(ModelError::EmptyInput);
    }
    if x.nrows() != y_len {
        return Err(ModelError::Shape(format!(
            "{} rows but {y_len} targets",
            x.nrows()
        )));
    }
    Ok(())
}

/// Divides each element by the sum, leaving an all-zero vector untouched.
#[must_use]
pub fn normalize_importances(raw: &[f64]) -> Vec<f64> {
    let total: f64 = raw.iter().sum();
    if total > 0.0 {
        raw.iter().map(|v| v / total).collect()
    } else {
        raw.to_vec()
    }
}
