//! Train/test splitting and k-fold partitioning.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// Shuffles `0..n` with a seeded generator and holds out
/// `ceil(n * test_fraction)` indices (at least one, at most `n - 1`).
/// Products within rounding error of a whole number are not rounded up.
///
/// Returns `(train, test)`. With fewer than two rows everything is train.
#[must_use]
pub fn train_test_split(n: usize, test_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n).collect();
    if n < 2 {
        return (indices, Vec::new());
    }

    indices.shuffle(&mut StdRng::seed_from_u64(seed));

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let n_test = (n as f64).mul_add(test_fraction, -1e-9).ceil() as usize;
    let n_test = n_test.clamp(1, n - 1);

    let train = indices.split_off(n_test);
    (train, indices)
}

/// Contiguous, unshuffled folds. The first `n % k` folds get one extra
/// row. Returns `(train, test)` per fold; empty when `k < 2` or `n < k`.
#[must_use]
pub fn kfold(n: usize, k: usize) -> Vec<(Vec<usize>, Vec<usize>)> {
    if k < 2 || n < k {
        return Vec::new();
    }

    let base = n / k;
    let extra = n % k;
    let mut start = 0;
    let mut folds = Vec::with_capacity(k);

    for fold in 0..k {
        let size = base + usize::from(fold < extra);
        let test: Vec<usize> = (start..start + size).collect();
        let train: Vec<usize> = (0..start).chain(start + size..n).collect();
        folds.push((train, test));
        start += size;
    }

    folds
}
