//! Ordinary least squares on standardized features.

use linfa::Dataset;
use linfa::traits::Fit;
use linfa_linear::LinearRegression;
use ndarray::{Array1, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::features::Standardizer;
use crate::{ModelError, check_shapes};

/// A linear model fitted on standardized inputs. Zero-variance columns are
/// dropped before the solve so they cannot make the system singular.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    scaler: Standardizer,
    kept: Vec<usize>,
    coefficients: Vec<f64>,
    intercept: f64,
}

impl LinearModel {
    /// # Errors
    ///
    /// Returns an error if the input is empty, shapes disagree, or the
    /// least-squares solve fails.
    pub fn fit(x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>) -> Result<Self, ModelError> {
        check_shapes(x, y.len())?;

        let (scaler, scaled) = Standardizer::fit_transform(x);
        let kept = scaler.varying_columns();

        if kept.is_empty() {
            return Ok(Self {
                scaler,
                kept,
                coefficients: Vec::new(),
                intercept: y.mean().unwrap_or(0.0),
            });
        }

        let records = scaled.select(Axis(1), &kept);
        let dataset = Dataset::new(records, y.to_owned());
        let fitted = LinearRegression::new()
            .fit(&dataset)
            .map_err(|e| ModelError::Linear(e.to_string()))?;

        let coefficients = fitted.params().to_vec();
        if coefficients.iter().any(|c| !c.is_finite()) || !fitted.intercept().is_finite() {
            return Err(ModelError::Linear(
                "solution contains non-finite coefficients".to_string(),
            ));
        }

        Ok(Self {
            scaler,
            kept,
            coefficients,
            intercept: fitted.intercept(),
        })
    }

    #[must_use]
    pub fn predict(&self, x: ArrayView2<'_, f64>) -> Array1<f64> {
        let scaled = self.scaler.transform(x);
        scaled
            .rows()
            .into_iter()
            .map(|row| {
                self.kept
                    .iter()
                    .zip(&self.coefficients)
                    .map(|(&j, c)| row[j] * c)
                    .sum::<f64>()
                    + self.intercept
            })
            .collect()
    }

    /// Coefficients in standardized units, zero for dropped columns.
    #[must_use]
    pub fn coefficients(&self) -> Vec<f64> {
        let mut full = vec![0.0; self.scaler.n_features()];
        for (&j, c) in self.kept.iter().zip(&self.coefficients) {
            full[j] = *c;
        }
        full
    }

    #[must_use]
    pub const fn intercept(&self) -> f64 {
        self.intercept
    }

    #[must_use]
    pub fn n_features(&self) -> usize {
        self.scaler.n_features()
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{Array2, array};

    use super::*;

    #[test]
    fn recovers_exact_linear_relation() {
        let x = Array2::from_shape_fn((20, 2), |(i, j)| {
            let i = i as f64;
            if j == 0 { i } else { (i * 0.7).cos() }
        });
        let y = x
            .rows()
            .into_iter()
            .map(|r| 3.0 * r[0] - 2.0 * r[1] + 5.0)
            .collect::<Array1<f64>>();

        let model = LinearModel::fit(x.view(), y.view()).unwrap();
        let predictions = model.predict(x.view());
        for (p, t) in predictions.iter().zip(y.iter()) {
            assert!((p - t).abs() < 1e-6, "{p} vs {t}");
        }
    }

    #[test]
    fn constant_feature_is_ignored() {
        let x = array![[1.0, 9.0], [2.0, 9.0], [3.0, 9.0], [4.0, 9.0]];
        let y = array![2.0, 4.0, 6.0, 8.0];
        let model = LinearModel::fit(x.view(), y.view()).unwrap();
        assert_eq!(model.coefficients()[1], 0.0);
        let p = model.predict(array![[5.0, 9.0]].view());
        assert!((p[0] - 10.0).abs() < 1e-6);
    }

    #[test]
    fn all_constant_features_predict_mean() {
        let x = array![[1.0], [1.0], [1.0]];
        let y = array![1.0, 2.0, 6.0];
        let model = LinearModel::fit(x.view(), y.view()).unwrap();
        assert!((model.predict(x.view())[0] - 3.0).abs() < 1e-12);
    }
}
