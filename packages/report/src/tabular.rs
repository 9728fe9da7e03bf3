//! Flattened CSV export.
//!
//! One row per scalar metric plus one row per scored location, in a long
//! `section,subject,metric,value` layout so that every row shares the
//! same header. Nested structure is not preserved.

use std::path::Path;

use outlet_map_analytics_models::AnalysisResult;
use serde::Serialize;

use crate::{ReportError, write_atomic};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlatRow {
    pub section: &'static str,
    pub subject: String,
    pub metric: String,
    pub value: String,
}

impl FlatRow {
    fn new(section: &'static str, subject: &str, metric: &str, value: impl ToString) -> Self {
        Self {
            section,
            subject: subject.to_string(),
            metric: metric.to_string(),
            value: value.to_string(),
        }
    }
}

/// Flattens the scalar metrics and efficiency rows of `result`.
#[must_use]
pub fn flatten(result: &AnalysisResult) -> Vec<FlatRow> {
    let mut rows = vec![
        FlatRow::new("run", "", "generated_at", result.generated_at.to_rfc3339()),
        FlatRow::new("run", "", "city", result.city.as_deref().unwrap_or("")),
        FlatRow::new("run", "", "total_records", result.total_records),
        FlatRow::new("run", "", "own_brand_records", result.own_brand_records),
    ];

    let coverage = &result.coverage;
    rows.push(FlatRow::new("coverage", "", "total_locations", coverage.total_locations));
    rows.push(FlatRow::new("coverage", "", "cities", coverage.cities));
    rows.push(FlatRow::new(
        "coverage",
        "",
        "avg_locations_per_city",
        coverage.avg_locations_per_city,
    ));
    for city in &coverage.density_by_city {
        rows.push(FlatRow::new("coverage", &city.city, "mean_distance_km", city.mean_distance_km));
        rows.push(FlatRow::new("coverage", &city.city, "density", city.density));
    }

    for gap in &result.gaps.population_gaps {
        rows.push(FlatRow::new("gaps", &gap.city, "per_100k", gap.per_100k));
        rows.push(FlatRow::new("gaps", &gap.city, "status", gap.status));
    }
    rows.push(FlatRow::new(
        "gaps",
        "",
        "infrastructure_gaps",
        result.gaps.infrastructure_gaps.gap_areas.len(),
    ));
    rows.push(FlatRow::new(
        "gaps",
        "",
        "competitive_gaps",
        result.gaps.competitive_gaps.gap_areas.len(),
    ));

    for stats in &result.competitors.operators {
        let operator = stats.operator.to_string();
        rows.push(FlatRow::new("competitors", &operator, "locations", stats.locations));
        rows.push(FlatRow::new("competitors", &operator, "share", stats.share));
    }

    if let Some(clustering) = result.clustering.completed() {
        rows.push(FlatRow::new("clustering", "", "k", clustering.partition.k));
        rows.push(FlatRow::new("clustering", "", "inertia", clustering.partition.inertia));
        rows.push(FlatRow::new(
            "clustering",
            "",
            "density_clusters",
            clustering.density.n_clusters,
        ));
        rows.push(FlatRow::new(
            "clustering",
            "",
            "noise_points",
            clustering.density.noise_points,
        ));
    }

    if let Some(efficiency) = result.efficiency.completed() {
        rows.push(FlatRow::new("efficiency", "", "selected_model", efficiency.report.selected));
        if let Some(r2) = efficiency.report.best_r2() {
            rows.push(FlatRow::new("efficiency", "", "r2", r2));
        }
        rows.push(FlatRow::new("efficiency", "", "mean_predicted", efficiency.mean_predicted));
        for location in &efficiency.locations {
            let subject = format!("{} | {}", location.name, location.address);
            rows.push(FlatRow::new("location", &subject, "actual", location.actual));
            rows.push(FlatRow::new("location", &subject, "predicted", location.predicted));
            rows.push(FlatRow::new("location", &subject, "bucket", location.bucket));
        }
    }

    rows
}

/// Writes [`flatten`] output as CSV.
///
/// # Errors
///
/// Returns an error if a row cannot be encoded or the file written.
pub fn write_csv(result: &AnalysisResult, path: &Path) -> Result<(), ReportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in flatten(result) {
        writer.serialize(row)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| ReportError::Csv(e.into_error().into()))?;
    write_atomic(path, &bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::sample;

    #[test]
    fn flattens_scalars_and_locations() {
        let rows = flatten(&sample());

        let find = |section: &str, subject: &str, metric: &str| {
            rows.iter()
                .find(|r| r.section == section && r.subject == subject && r.metric == metric)
                .map(|r| r.value.clone())
        };
        assert_eq!(find("run", "", "total_records").as_deref(), Some("3"));
        assert_eq!(find("coverage", "Москва", "density").as_deref(), Some("High"));
        assert_eq!(
            find("efficiency", "", "selected_model").as_deref(),
            Some("random_forest")
        );
        assert_eq!(
            find("location", "Tele2 Арбат | Арбат, 1", "bucket").as_deref(),
            Some("Medium")
        );
        // Skipped clustering contributes nothing.
        assert!(rows.iter().all(|r| r.section != "clustering"));
    }

    #[test]
    fn csv_has_header_and_quotes_commas() {
        let dir = std::env::temp_dir().join("outlet_map_tabular_test");
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("report.csv");

        write_csv(&sample(), &path).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        assert_eq!(lines.next(), Some("section,subject,metric,value"));
        assert!(contents.contains("\"Tele2, \"\"Юг\"\" | Ленина, 5\""));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
