//! Held-out and cross-validated evaluation of a model family.

use ndarray::{ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::metrics::{mse, r2, rmse};
use crate::split::kfold;
use crate::{ModelError, TrainedModel};

/// Error metrics on one set of predictions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scores {
    pub mse: f64,
    pub rmse: f64,
    pub r2: f64,
}

impl Scores {
    #[must_use]
    pub fn compute(truth: ArrayView1<'_, f64>, predicted: ArrayView1<'_, f64>) -> Self {
        Self {
            mse: mse(truth, predicted),
            rmse: rmse(truth, predicted),
            r2: r2(truth, predicted),
        }
    }
}

/// Fits on the `train` rows and scores on the `test` rows.
///
/// # Errors
///
/// Propagates errors from `fit`.
pub fn holdout<F>(
    x: ArrayView2<'_, f64>,
    y: ArrayView1<'_, f64>,
    train: &[usize],
    test: &[usize],
    fit: F,
) -> Result<(TrainedModel, Scores), ModelError>
where
    F: Fn(ArrayView2<'_, f64>, ArrayView1<'_, f64>) -> Result<TrainedModel, ModelError>,
{
    let x_train = x.select(Axis(0), train);
    let y_train = y.select(Axis(0), train);
    let model = fit(x_train.view(), y_train.view())?;

    let x_test = x.select(Axis(0), test);
    let y_test = y.select(Axis(0), test);
    let predicted = model.predict(x_test.view());

    Ok((model, Scores::compute(y_test.view(), predicted.view())))
}

/// R² of each of `folds` contiguous folds. Empty when there are too few
/// rows for the requested number of folds.
///
/// # Errors
///
/// Propagates errors from `fit`.
pub fn cross_val_r2<F>(
    x: ArrayView2<'_, f64>,
    y: ArrayView1<'_, f64>,
    folds: usize,
    fit: F,
) -> Result<Vec<f64>, ModelError>
where
    F: Fn(ArrayView2<'_, f64>, ArrayView1<'_, f64>) -> Result<TrainedModel, ModelError>,
{
    kfold(x.nrows(), folds)
        .iter()
        .map(|(train, test)| holdout(x, y, train, test, &fit).map(|(_, scores)| scores.r2))
        .collect()
}
