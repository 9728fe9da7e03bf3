#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Report artifacts for a finished analysis run.
//!
//! Every artifact is rendered from the same [`AnalysisResult`]. The JSON
//! report is the only lossless one and can be read back with
//! [`structured::read_json_report`]; the CSV, text, chart and map outputs
//! are summaries.
//!
//! [`write_reports`] attempts each artifact independently. A failure is
//! logged and leaves the matching [`ReportPaths`] field empty, so one
//! broken renderer never costs the other outputs.

pub mod chart;
pub mod html;
pub mod map;
pub mod structured;
pub mod tabular;
pub mod text;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use outlet_map_analytics_models::AnalysisResult;
use outlet_map_config::MapConfig;
use serde::Serialize;
use thiserror::Error;

/// Errors raised while writing or reading a report artifact.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Files written by [`write_reports`]. `None` means the artifact was
/// skipped or failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportPaths {
    pub json: Option<PathBuf>,
    pub csv: Option<PathBuf>,
    pub text: Option<PathBuf>,
    pub dashboard: Option<PathBuf>,
    pub svg_map: Option<PathBuf>,
    pub html_map: Option<PathBuf>,
    pub geojson: Option<PathBuf>,
    pub operator_share: Option<PathBuf>,
    pub efficiency_histogram: Option<PathBuf>,
}

impl ReportPaths {
    /// Every path that was written, in a stable order.
    #[must_use]
    pub fn written(&self) -> Vec<&Path> {
        [
            &self.json,
            &self.csv,
            &self.text,
            &self.dashboard,
            &self.svg_map,
            &self.html_map,
            &self.geojson,
            &self.operator_share,
            &self.efficiency_histogram,
        ]
        .into_iter()
        .filter_map(Option::as_deref)
        .collect()
    }
}

/// `YYYYmmdd_HHMMSS` stamp used in artifact file names.
#[must_use]
pub fn timestamp(at: &DateTime<Utc>) -> String {
    at.format("%Y%m%d_%H%M%S").to_string()
}

/// Writes `contents` to `path` through a temporary sibling file and a
/// rename, so readers never see a partial file.
///
/// # Errors
///
/// Returns [`ReportError::Io`] if the parent directory cannot be created
/// or either filesystem step fails.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), ReportError> {
    let io_err = |source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    std::fs::write(&tmp, contents).map_err(io_err)?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(e));
    }
    Ok(())
}

/// Writes every report artifact for `result` into `dir`.
///
/// # Errors
///
/// Returns [`ReportError::Io`] only if `dir` cannot be created. Failures
/// of individual artifacts are logged and reported as missing paths.
pub fn write_reports(
    result: &AnalysisResult,
    map_config: &MapConfig,
    dir: &Path,
) -> Result<ReportPaths, ReportError> {
    std::fs::create_dir_all(dir).map_err(|source| ReportError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let ts = timestamp(&result.generated_at);
    let base = format!("analysis_report_{ts}");
    log::info!("Writing reports to {}", dir.display());

    let mut paths = ReportPaths {
        json: attempt("JSON report", dir.join(format!("{base}.json")), |p| {
            structured::write_json(result, p)
        }),
        csv: attempt("CSV report", dir.join(format!("{base}.csv")), |p| {
            tabular::write_csv(result, p)
        }),
        text: attempt("text report", dir.join(format!("{base}.txt")), |p| {
            write_atomic(p, text::text_report(result).as_bytes())
        }),
        dashboard: attempt("dashboard", dir.join(format!("dashboard_{ts}.html")), |p| {
            write_atomic(p, html::dashboard(result, map_config).as_bytes())
        }),
        svg_map: attempt("SVG map", dir.join(format!("coverage_map_{ts}.svg")), |p| {
            write_atomic(p, map::svg_map(&result.locations, map_config).as_bytes())
        }),
        geojson: attempt("GeoJSON", dir.join(format!("locations_{ts}.geojson")), |p| {
            map::write_geojson(&result.locations, map_config, p)
        }),
        operator_share: attempt(
            "operator share chart",
            dir.join(format!("operator_share_{ts}.svg")),
            |p| write_atomic(p, chart::operator_share_svg(result, map_config).as_bytes()),
        ),
        ..ReportPaths::default()
    };

    paths.html_map = attempt("HTML map", dir.join(format!("coverage_map_{ts}.html")), |p| {
        let page = map::leaflet_page(&result.locations, map_config)?;
        write_atomic(p, page.as_bytes())
    });

    paths.efficiency_histogram = match chart::efficiency_histogram_svg(result) {
        Some(svg) => attempt(
            "efficiency histogram",
            dir.join(format!("efficiency_histogram_{ts}.svg")),
            |p| write_atomic(p, svg.as_bytes()),
        ),
        None => {
            log::info!("No efficiency scores, skipping efficiency histogram");
            None
        }
    };

    log::info!("Wrote {} report artifacts", paths.written().len());
    Ok(paths)
}

fn attempt(
    what: &str,
    path: PathBuf,
    write: impl FnOnce(&Path) -> Result<(), ReportError>,
) -> Option<PathBuf> {
    match write(&path) {
        Ok(()) => {
            log::debug!("Wrote {what} to {}", path.display());
            Some(path)
        }
        Err(e) => {
            log::warn!("Failed to write {what}: {e}");
            None
        }
    }
}

/// Escapes text for inclusion in HTML or SVG markup.
#[must_use]
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::TimeZone;
    use outlet_map_analytics_models::{
        AnalysisResult, BucketCount, CityBreakdown, CityDensity, CompetitorAnalysis,
        CoverageMetrics, DensityLevel, EfficiencyBucket, EfficiencyResult, ErrorMetrics,
        FamilyImportances, FamilyReport, FeatureImportance, GapAnalysis, LocationEfficiency,
        MapPoint, ModelFamily, OperatorStats, Outcome, TrainingReport, TrendAnalysis,
    };
    use outlet_map_location_models::{Coordinates, OperatorLabel};

    use super::*;

    fn point(name: &str, operator: OperatorLabel, lat: f64, lng: f64) -> MapPoint {
        MapPoint {
            name: name.to_string(),
            address: format!("{name} street"),
            city: "Москва".to_string(),
            operator,
            coordinates: Coordinates::new(lat, lng),
            rating: Some(4.2),
        }
    }

    fn efficiency() -> EfficiencyResult {
        let metrics = ErrorMetrics {
            mse: 1.25,
            rmse: 1.118_033_988_749_895,
            r2: 0.61,
        };
        EfficiencyResult {
            features: vec!["rating".to_string(), "reviews_count".to_string()],
            from_cache: false,
            report: TrainingReport {
                train_rows: 8,
                test_rows: 2,
                families: vec![FamilyReport {
                    family: ModelFamily::RandomForest,
                    holdout: metrics,
                    cv_r2: vec![0.5, 0.7],
                    cv_mean_r2: Some(0.6),
                }],
                failed: vec![(ModelFamily::Linear, "singular matrix".to_string())],
                selected: ModelFamily::RandomForest,
                in_sample: metrics,
                importances: vec![FamilyImportances {
                    family: ModelFamily::RandomForest,
                    ranked: vec![FeatureImportance {
                        feature: "rating".to_string(),
                        importance: 0.8,
                    }],
                }],
            },
            locations: vec![
                LocationEfficiency {
                    name: "Tele2 Арбат".to_string(),
                    address: "Арбат, 1".to_string(),
                    city: "Москва".to_string(),
                    coordinates: Some(Coordinates::new(55.75, 37.59)),
                    actual: 12.3,
                    predicted: 11.9,
                    bucket: EfficiencyBucket::Medium,
                    suggestions: Vec::new(),
                },
                LocationEfficiency {
                    name: "Tele2, \"Юг\"".to_string(),
                    address: "Ленина, 5".to_string(),
                    city: "Москва".to_string(),
                    coordinates: None,
                    actual: 4.0,
                    predicted: 5.5,
                    bucket: EfficiencyBucket::Low,
                    suggestions: vec!["Encourage customers to leave reviews".to_string()],
                },
            ],
            bucket_counts: vec![
                BucketCount {
                    bucket: EfficiencyBucket::Low,
                    count: 1,
                },
                BucketCount {
                    bucket: EfficiencyBucket::Medium,
                    count: 1,
                },
                BucketCount {
                    bucket: EfficiencyBucket::High,
                    count: 0,
                },
                BucketCount {
                    bucket: EfficiencyBucket::VeryHigh,
                    count: 0,
                },
            ],
            mean_predicted: 8.7,
            recommendations: vec!["Model accuracy is high".to_string()],
        }
    }

    pub fn sample() -> AnalysisResult {
        AnalysisResult {
            generated_at: Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap(),
            city: None,
            total_records: 3,
            own_brand_records: 2,
            coverage: CoverageMetrics {
                total_locations: 2,
                cities: 1,
                avg_locations_per_city: 2.0,
                density_by_city: vec![CityDensity {
                    city: "Москва".to_string(),
                    locations: 2,
                    mean_distance_km: 1.3,
                    density: DensityLevel::High,
                }],
                city_breakdown: vec![CityBreakdown {
                    city: "Москва".to_string(),
                    locations: 2,
                    mean_rating: Some(4.1),
                    mean_reviews: None,
                }],
                demand_gaps: None,
                recommendations: vec!["Open more points in Казань".to_string()],
            },
            gaps: GapAnalysis::default(),
            competitors: CompetitorAnalysis {
                operators: vec![
                    OperatorStats {
                        operator: OperatorLabel::OwnBrand,
                        locations: 2,
                        share: 2.0 / 3.0,
                        mean_rating: Some(4.1),
                        mean_reviews: None,
                        cities: 1,
                    },
                    OperatorStats {
                        operator: OperatorLabel::Mts,
                        locations: 1,
                        share: 1.0 / 3.0,
                        mean_rating: None,
                        mean_reviews: None,
                        cities: 1,
                    },
                ],
                ..CompetitorAnalysis::default()
            },
            trends: TrendAnalysis::default(),
            clustering: Outcome::InsufficientData {
                rows: 3,
                required: 10,
            },
            efficiency: Outcome::Completed(efficiency()),
            locations: vec![
                point("Tele2 Арбат", OperatorLabel::OwnBrand, 55.75, 37.59),
                point("Tele2 <Юг>", OperatorLabel::OwnBrand, 55.70, 37.62),
                point("МТС", OperatorLabel::Mts, 55.80, 37.70),
            ],
            recommendations: (1..=7).map(|i| format!("Recommendation {i}")).collect(),
        }
    }
}
