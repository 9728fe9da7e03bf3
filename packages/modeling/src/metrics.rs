//! Regression metrics.

use ndarray::ArrayView1;

/// Mean squared error. Zero for empty input.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn mse(truth: ArrayView1<'_, f64>, predicted: ArrayView1<'_, f64>) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    let sse: f64 = truth
        .iter()
        .zip(predicted.iter())
        .map(|(t, p)| (t - p) * (t - p))
        .sum();
    sse / truth.len() as f64
}

#[must_use]
pub fn rmse(truth: ArrayView1<'_, f64>, predicted: ArrayView1<'_, f64>) -> f64 {
    mse(truth, predicted).sqrt()
}

/// Coefficient of determination.
///
/// A constant target has no variance to explain: a perfect fit scores 1.0
/// and anything else 0.0, so the result is always finite.
#[must_use]
pub fn r2(truth: ArrayView1<'_, f64>, predicted: ArrayView1<'_, f64>) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    let mean = truth.mean().unwrap_or(0.0);
    let ss_res: f64 = truth
        .iter()
        .zip(predicted.iter())
        .map(|(t, p)| (t - p) * (t - p))
        .sum();
    let ss_tot: f64 = truth.iter().map(|t| (t - mean) * (t - mean)).sum();

    if ss_tot <= f64::EPSILON {
        return if ss_res <= f64::EPSILON { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn perfect_prediction() {
        let y = array![1.0, 2.0, 3.0];
        assert!(mse(y.view(), y.view()).abs() < 1e-12);
        assert!((r2(y.view(), y.view()) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn mean_prediction_scores_zero_r2() {
        let y = array![1.0, 2.0, 3.0];
        let p = array![2.0, 2.0, 2.0];
        assert!(r2(y.view(), p.view()).abs() < 1e-12);
        assert!((mse(y.view(), p.view()) - 2.0 / 3.0).abs() < 1e-12);
        assert!((rmse(y.view(), p.view()) - (2.0_f64 / 3.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn constant_target_is_finite() {
        let y = array![4.0, 4.0];
        assert!((r2(y.view(), y.view()) - 1.0).abs() < 1e-12);
        assert!(r2(y.view(), array![3.0, 5.0].view()).abs() < 1e-12);
    }

    #[test]
    fn worse_than_mean_is_negative() {
        let y = array![1.0, 2.0, 3.0];
        let p = array![3.0, 2.0, 1.0];
        assert!(r2(y.view(), p.view()) < 0.0);
    }
}
