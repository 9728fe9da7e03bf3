//! Feature matrices and standardization.

use ndarray::{Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::ModelError;

/// A dense feature matrix with named columns.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    pub names: Vec<String>,
    pub values: Array2<f64>,
}

impl FeatureMatrix {
    /// Builds a matrix from row vectors.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Shape`] if any row length differs from the
    /// number of names.
    pub fn from_rows(names: Vec<String>, rows: &[Vec<f64>]) -> Result<Self, ModelError> {
        let width = names.len();
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != width) {
            return Err(ModelError::Shape(format!(
                "row {i} has {} values, expected {width}",
                row.len()
            )));
        }

        let flat: Vec<f64> = rows.iter().flatten().copied().collect();
        let values = Array2::from_shape_vec((rows.len(), width), flat)
            .map_err(|e| ModelError::Shape(e.to_string()))?;
        Ok(Self { names, values })
    }

    #[must_use]
    pub fn nrows(&self) -> usize {
        self.values.nrows()
    }

    #[must_use]
    pub fn ncols(&self) -> usize {
        self.values.ncols()
    }

    /// Copies the given rows (in order) into a new matrix.
    #[must_use]
    pub fn select_rows(&self, indices: &[usize]) -> Array2<f64> {
        self.values.select(Axis(0), indices)
    }
}

/// Column-wise zero-mean, unit-variance scaling.
///
/// Uses the population standard deviation. Constant columns keep a scale
/// of 1 so they map to all zeros instead of NaN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standardizer {
    means: Vec<f64>,
    scales: Vec<f64>,
    constant: Vec<bool>,
}

impl Standardizer {
    #[must_use]
    pub fn fit(x: ArrayView2<'_, f64>) -> Self {
        let mut means = Vec::with_capacity(x.ncols());
        let mut scales = Vec::with_capacity(x.ncols());
        let mut constant = Vec::with_capacity(x.ncols());

        for column in x.axis_iter(Axis(1)) {
            let mean = column.mean().unwrap_or(0.0);
            let std = column.std(0.0);
            let is_constant = !(std.is_finite() && std > f64::EPSILON * mean.abs().max(1.0));
            means.push(mean);
            scales.push(if is_constant { 1.0 } else { std });
            constant.push(is_constant);
        }

        Self {
            means,
            scales,
            constant,
        }
    }

    #[must_use]
    pub fn transform(&self, x: ArrayView2<'_, f64>) -> Array2<f64> {
        let mut out = x.to_owned();
        for (j, mut column) in out.axis_iter_mut(Axis(1)).enumerate() {
            let mean = self.means.get(j).copied().unwrap_or(0.0);
            let scale = self.scales.get(j).copied().unwrap_or(1.0);
            column.mapv_inplace(|v| (v - mean) / scale);
        }
        out
    }

    #[must_use]
    pub fn fit_transform(x: ArrayView2<'_, f64>) -> (Self, Array2<f64>) {
        let scaler = Self::fit(x);
        let scaled = scaler.transform(x);
        (scaler, scaled)
    }

    /// Indices of columns with non-zero variance.
    #[must_use]
    pub fn varying_columns(&self) -> Vec<usize> {
        self.constant
            .iter()
            .enumerate()
            .filter(|(_, c)| !**c)
            .map(|(i, _)| i)
            .collect()
    }

    #[must_use]
    pub fn n_features(&self) -> usize {
        self.means.len()
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn from_rows_rejects_ragged_input() {
        let names = vec!["a".to_string(), "b".to_string()];
        let err = FeatureMatrix::from_rows(names, &[vec![1.0, 2.0], vec![3.0]]).unwrap_err();
        assert!(matches!(err, ModelError::Shape(_)));
    }

    #[test]
    fn from_rows_builds_matrix() {
        let names = vec!["a".to_string(), "b".to_string()];
        let m = FeatureMatrix::from_rows(names, &[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(m.nrows(), 2);
        assert_eq!(m.ncols(), 2);
        assert_eq!(m.select_rows(&[1]), array![[3.0, 4.0]]);
    }

    #[test]
    fn standardized_columns_have_zero_mean_unit_variance() {
        let x = array![[1.0, 10.0], [2.0, 20.0], [3.0, 30.0], [4.0, 40.0]];
        let (_, z) = Standardizer::fit_transform(x.view());
        for column in z.axis_iter(Axis(1)) {
            assert!(column.mean().unwrap().abs() < 1e-12);
            assert!((column.std(0.0) - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn constant_column_maps_to_zero() {
        let x = array![[5.0, 1.0], [5.0, 2.0], [5.0, 3.0]];
        let (scaler, z) = Standardizer::fit_transform(x.view());
        assert!(z.column(0).iter().all(|v| *v == 0.0));
        assert_eq!(scaler.varying_columns(), vec![1]);
    }
}
