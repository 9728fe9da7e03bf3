//! Feature extraction from location records.
//!
//! Only columns present in the input table become features. Missing
//! values inside a present column are imputed as zero.

use outlet_map_location_models::{Column, LocationRecord, LocationTable};
use outlet_map_modeling::ModelError;
use outlet_map_modeling::features::FeatureMatrix;

/// Numeric rating/POI columns present in the table, in canonical order.
#[must_use]
pub fn numeric_features(table: &LocationTable) -> Vec<Column> {
    Column::NUMERIC_FEATURES
        .iter()
        .copied()
        .filter(|c| table.has_column(*c))
        .collect()
}

/// Feature columns for the efficiency model: the numeric columns,
/// optionally followed by the amenity flags present in the table.
#[must_use]
pub fn model_features(table: &LocationTable, include_flags: bool) -> Vec<Column> {
    let mut columns = numeric_features(table);
    if include_flags {
        columns.extend(
            Column::FLAG_FEATURES
                .iter()
                .copied()
                .filter(|c| table.has_column(*c)),
        );
    }
    columns
}

#[must_use]
pub fn feature_names(columns: &[Column]) -> Vec<String> {
    columns.iter().map(ToString::to_string).collect()
}

#[must_use]
pub fn feature_row(record: &LocationRecord, columns: &[Column]) -> Vec<f64> {
    columns
        .iter()
        .map(|c| record.numeric(*c).unwrap_or(0.0))
        .collect()
}

/// Builds the zero-imputed feature matrix for `records`.
///
/// # Errors
///
/// Returns an error if the matrix cannot be shaped.
pub fn feature_matrix(
    records: &[LocationRecord],
    columns: &[Column],
) -> Result<FeatureMatrix, ModelError> {
    let rows: Vec<Vec<f64>> = records.iter().map(|r| feature_row(r, columns)).collect();
    FeatureMatrix::from_rows(feature_names(columns), &rows)
}

/// Composite popularity proxy: `rating * 2 + ln(1 + reviews)`, with
/// missing values as zero.
#[must_use]
pub fn efficiency_target(record: &LocationRecord) -> f64 {
    let rating = record.rating.unwrap_or(0.0);
    let reviews = record.reviews_count.map_or(0.0, f64::from);
    rating.mul_add(2.0, reviews.ln_1p())
}

/// Arithmetic mean. `None` for an empty input.
#[must_use]
pub fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values
        .into_iter()
        .fold((0.0, 0_u32), |(sum, n), v| (sum + v, n + 1));
    (n > 0).then(|| sum / f64::from(n))
}
