//! Runs every analysis stage in order over one table.

use chrono::{Datelike, Utc};
use outlet_map_analytics_models::{AnalysisResult, MapPoint};
use outlet_map_config::AnalysisConfig;
use outlet_map_location_models::LocationTable;
use outlet_map_source::operator::{classify_table, operator_of, own_brand_rows};
use outlet_map_source::progress::ProgressCallback;

use crate::clustering::cluster_locations;
use crate::competitors::analyze_competitors;
use crate::coverage::analyze_coverage;
use crate::efficiency::{CachePolicy, analyze_efficiency};
use crate::gaps::analyze_gaps;
use crate::recommendations::combine;
use crate::trends::analyze_trends;
use crate::{AnalyticsError, Stage};

/// Per-run options that are not part of the analysis configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Restrict the run to one city.
    pub city: Option<String>,
    pub cache: CachePolicy,
    /// Reference year for location ages and the opening forecast.
    pub current_year: i32,
}

impl PipelineOptions {
    /// Options for an unscoped run using the configured model cache.
    /// `no_cache` retrains instead of loading, but still refreshes the
    /// cached artifact.
    #[must_use]
    pub fn new(config: &AnalysisConfig, no_cache: bool) -> Self {
        let path = config.model_cache_path.clone();
        Self {
            city: None,
            cache: if no_cache {
                CachePolicy::Refresh(path)
            } else {
                CachePolicy::Use(path)
            },
            current_year: Utc::now().year(),
        }
    }

    #[must_use]
    pub fn with_city(mut self, city: Option<String>) -> Self {
        self.city = city;
        self
    }
}

/// Runs coverage, gaps, competitors, trends, clustering and efficiency
/// over `table` and assembles the combined result.
///
/// Records are (re)classified by operator first, so raw ingested tables
/// can be passed directly.
///
/// # Errors
///
/// Returns the first stage error. Sparse data never errors.
pub fn run_pipeline(
    table: &LocationTable,
    config: &AnalysisConfig,
    options: &PipelineOptions,
    progress: &dyn ProgressCallback,
) -> Result<AnalysisResult, AnalyticsError> {
    let mut table = match &options.city {
        Some(city) => table.filter_city(city),
        None => table.clone(),
    };
    classify_table(&mut table);

    let own_brand_records = own_brand_rows(&table).len();
    log::info!(
        "Running analysis pipeline on {} records ({own_brand_records} own-brand){}",
        table.len(),
        options
            .city
            .as_ref()
            .map_or_else(String::new, |city| format!(" for {city}"))
    );

    progress.set_total(Stage::all().len() as u64);
    let step = |stage: Stage| {
        log::debug!("Starting {stage} stage");
        progress.set_message(format!("Analyzing {stage}"));
    };

    step(Stage::Coverage);
    let coverage = analyze_coverage(&table, config);
    progress.inc(1);

    step(Stage::Gaps);
    let gaps = analyze_gaps(&table, config, options.city.as_deref())?;
    progress.inc(1);

    step(Stage::Competitors);
    let competitors = analyze_competitors(&table, &config.competitors);
    progress.inc(1);

    step(Stage::Trends);
    let trends = analyze_trends(&table, options.current_year);
    progress.inc(1);

    step(Stage::Clustering);
    let clustering = cluster_locations(&table, &config.clustering)?;
    progress.inc(1);

    step(Stage::Efficiency);
    let efficiency = analyze_efficiency(&table, &config.efficiency, &options.cache)?;
    progress.inc(1);

    let mut result = AnalysisResult {
        generated_at: Utc::now(),
        city: options.city.clone(),
        total_records: table.len(),
        own_brand_records,
        coverage,
        gaps,
        competitors,
        trends,
        clustering,
        efficiency,
        locations: map_points(&table),
        recommendations: Vec::new(),
    };
    result.recommendations = combine(&result);

    progress.finish(format!(
        "Analysis complete: {} recommendations",
        result.recommendations.len()
    ));
    Ok(result)
}

/// Every record with coordinates, for map rendering.
#[must_use]
pub fn map_points(table: &LocationTable) -> Vec<MapPoint> {
    table
        .records
        .iter()
        .filter_map(|r| {
            Some(MapPoint {
                name: r.name.clone(),
                address: r.address.clone(),
                city: r.city.clone(),
                operator: operator_of(r),
                coordinates: r.coordinates?,
                rating: r.rating,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};

    use outlet_map_analytics_models::Outcome;
    use outlet_map_location_models::{Column, LocationRecord, OperatorLabel};
    use outlet_map_source::progress::NullProgress;

    use super::*;
    use crate::fixtures::{record, table, varied_own_brand};

    fn options() -> PipelineOptions {
        PipelineOptions {
            city: None,
            cache: CachePolicy::Disabled,
            current_year: 2024,
        }
    }

    fn mixed_records() -> Vec<LocationRecord> {
        let mut records = varied_own_brand(30);
        records.extend(
            (0..6_u32).map(|i| record("МТС", "Москва", 55.5 + f64::from(i) * 0.01, 37.9)),
        );
        records.push(LocationRecord {
            coordinates: None,
            ..record("Билайн", "Омск", 0.0, 0.0)
        });
        records
    }

    #[derive(Default)]
    struct Counting {
        total: AtomicU64,
        done: AtomicU64,
    }

    impl ProgressCallback for Counting {
        fn set_total(&self, total: u64) {
            self.total.store(total, Ordering::Relaxed);
        }
        fn set_position(&self, pos: u64) {
            self.done.store(pos, Ordering::Relaxed);
        }
        fn inc(&self, delta: u64) {
            self.done.fetch_add(delta, Ordering::Relaxed);
        }
        fn set_message(&self, _msg: String) {}
        fn finish(&self, _msg: String) {}
        fn finish_and_clear(&self) {}
    }

    #[test]
    fn full_run_completes_every_stage() {
        let progress = Counting::default();
        let result = run_pipeline(
            &table(mixed_records()),
            &AnalysisConfig::default(),
            &options(),
            &progress,
        )
        .unwrap();

        assert_eq!(result.total_records, 37);
        assert_eq!(result.own_brand_records, 30);
        assert_eq!(result.coverage.total_locations, 30);
        assert!(result.clustering.is_completed());
        assert!(result.efficiency.is_completed());
        // The row without coordinates has no map point.
        assert_eq!(result.locations.len(), 36);
        assert!(!result.recommendations.is_empty());

        assert_eq!(progress.total.load(Ordering::Relaxed), 6);
        assert_eq!(progress.done.load(Ordering::Relaxed), 6);
    }

    #[test]
    fn small_tables_report_insufficient_data() {
        let t = table(vec![
            record("Tele2", "Москва", 55.75, 37.60),
            record("МТС", "Москва", 55.76, 37.61),
        ]);
        let result =
            run_pipeline(&t, &AnalysisConfig::default(), &options(), &NullProgress).unwrap();

        assert!(matches!(
            result.clustering,
            Outcome::InsufficientData { rows: 2, .. }
        ));
        assert!(matches!(
            result.efficiency,
            Outcome::InsufficientData { rows: 1, .. }
        ));
        assert!(
            result
                .recommendations
                .iter()
                .any(|r| r.starts_with("Clustering skipped"))
        );
    }

    #[test]
    fn no_own_brand_rows_is_well_formed() {
        let t = table(vec![record("МТС", "Казань", 55.79, 49.12)]);
        let result =
            run_pipeline(&t, &AnalysisConfig::default(), &options(), &NullProgress).unwrap();

        assert!(result.coverage.is_empty());
        assert_eq!(result.own_brand_records, 0);
        assert_eq!(result.gaps.competitive_gaps.gap_areas.len(), 1);
    }

    #[test]
    fn city_scope_filters_records() {
        let opts = options().with_city(Some("Казань".to_string()));
        let result = run_pipeline(
            &table(mixed_records()),
            &AnalysisConfig::default(),
            &opts,
            &NullProgress,
        )
        .unwrap();

        assert_eq!(result.city.as_deref(), Some("Казань"));
        assert_eq!(result.total_records, 15);
        assert!(result.locations.iter().all(|p| p.city == "Казань"));
        assert!(
            result
                .gaps
                .population_gaps
                .iter()
                .all(|g| g.city == "Казань")
        );
    }

    #[test]
    fn missing_gap_column_names_the_stage() {
        let mut t = table(mixed_records());
        t.columns.remove(&Column::NearbyMetroCount);

        let err = run_pipeline(&t, &AnalysisConfig::default(), &options(), &NullProgress)
            .unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Gaps));
        assert!(err.to_string().starts_with("gaps analysis failed"));
    }

    #[test]
    fn unclassified_records_are_classified() {
        let records = vec![LocationRecord {
            operator: None,
            ..record("Салон Tele2", "Москва", 55.75, 37.6)
        }];
        let t = LocationTable::with_all_columns(records);
        let result =
            run_pipeline(&t, &AnalysisConfig::default(), &options(), &NullProgress).unwrap();

        assert_eq!(result.locations[0].operator, OperatorLabel::OwnBrand);
        assert_eq!(result.own_brand_records, 1);
    }

    #[test]
    fn new_options_follow_no_cache_flag() {
        let config = AnalysisConfig::default();
        assert_eq!(
            PipelineOptions::new(&config, false).cache,
            CachePolicy::Use(config.model_cache_path.clone())
        );
        assert_eq!(
            PipelineOptions::new(&config, true).cache,
            CachePolicy::Refresh(config.model_cache_path.clone())
        );
    }
}
