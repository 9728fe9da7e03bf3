//! Location efficiency scoring.
//!
//! The target is a popularity proxy computed from rating and review
//! volume. Three regressor families are trained on the same seeded
//! train/test split and cross-validated. The family with the best
//! held-out R² serves predictions. A served model is cached on disk and
//! reused while its feature set still matches; any cache miss retrains.

use std::path::{Path, PathBuf};

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use outlet_map_analytics_models::{
    BucketCount, EfficiencyBucket, EfficiencyResult, ErrorMetrics, FamilyImportances,
    FamilyReport, FeatureImportance, LocationEfficiency, ModelFamily, Outcome, TrainingReport,
};
use outlet_map_config::EfficiencyConfig;
use outlet_map_location_models::{Column, LocationRecord, LocationTable};
use outlet_map_modeling::boosting::{BoostingParams, GradientBoosting};
use outlet_map_modeling::cache::{self, CachedModel};
use outlet_map_modeling::evaluate::{Scores, cross_val_r2, holdout};
use outlet_map_modeling::forest::{ForestParams, RandomForest};
use outlet_map_modeling::linear::LinearModel;
use outlet_map_modeling::split::train_test_split;
use outlet_map_modeling::tree::TreeParams;
use outlet_map_modeling::{ModelError, TrainedModel};
use outlet_map_source::operator::own_brand_rows;

use crate::features::{
    efficiency_target, feature_matrix, feature_names, feature_row, mean, model_features,
};
use crate::{AnalyticsError, Stage};

/// How the on-disk model cache is used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachePolicy {
    /// Load from the path when possible, save after retraining.
    Use(PathBuf),
    /// Always retrain, then overwrite the cached artifact.
    Refresh(PathBuf),
    /// Neither read nor write a cache.
    Disabled,
}

impl CachePolicy {
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Use(path) | Self::Refresh(path) => Some(path),
            Self::Disabled => None,
        }
    }

    /// Same policy on a per-scope artifact: `model.msgpack` becomes
    /// `model_<scope>.msgpack` next to it.
    #[must_use]
    pub fn scoped(&self, scope: &str) -> Self {
        let rename = |path: &Path| {
            let stem = path
                .file_stem()
                .map_or_else(String::new, |s| s.to_string_lossy().into_owned());
            let name = match path.extension() {
                Some(ext) => format!("{stem}_{scope}.{}", ext.to_string_lossy()),
                None => format!("{stem}_{scope}"),
            };
            path.with_file_name(name)
        };
        match self {
            Self::Use(path) => Self::Use(rename(path)),
            Self::Refresh(path) => Self::Refresh(rename(path)),
            Self::Disabled => Self::Disabled,
        }
    }
}

/// A served efficiency model and what is known about how it was trained.
#[derive(Debug, Clone, PartialEq)]
pub struct EfficiencyModel {
    pub features: Vec<Column>,
    pub model: TrainedModel,
    pub report: TrainingReport,
    pub from_cache: bool,
}

impl EfficiencyModel {
    /// Trains every family and keeps the best by held-out R².
    ///
    /// Families that fail to fit are recorded in the report and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::Model`] if the feature matrix cannot be
    /// built or every family fails.
    pub fn train(
        records: &[LocationRecord],
        features: Vec<Column>,
        config: &EfficiencyConfig,
    ) -> Result<Self, AnalyticsError> {
        let model_err = |source: ModelError| AnalyticsError::Model {
            stage: Stage::Efficiency,
            source,
        };

        let matrix = feature_matrix(records, &features).map_err(model_err)?;
        let x = matrix.values.view();
        let targets: Array1<f64> = records.iter().map(efficiency_target).collect();
        let y = targets.view();
        let (train, test) = train_test_split(records.len(), config.test_fraction, config.seed);

        log::info!(
            "Training efficiency models on {} rows ({} train, {} test) with {} features",
            records.len(),
            train.len(),
            test.len(),
            features.len()
        );

        let mut reports = Vec::new();
        let mut models = Vec::new();
        let mut failed = Vec::new();
        let mut last_error = None;

        for &family in ModelFamily::all() {
            let fitted = holdout(x, y, &train, &test, |xs, ys| {
                fit_family(family, config, xs, ys)
            });
            let (model, scores) = match fitted {
                Ok(fitted) => fitted,
                Err(e) => {
                    log::warn!("Skipping {family} model: {e}");
                    failed.push((family, e.to_string()));
                    last_error = Some(e);
                    continue;
                }
            };

            let cv_r2 = cross_val_r2(x, y, config.folds, |xs, ys| {
                fit_family(family, config, xs, ys)
            })
            .unwrap_or_else(|e| {
                log::warn!("Cross-validation of {family} model failed: {e}");
                Vec::new()
            });

            log::info!(
                "{family}: held-out R² {:.3}, RMSE {:.3}",
                scores.r2,
                scores.rmse
            );
            reports.push(FamilyReport {
                family,
                holdout: metrics(scores),
                cv_mean_r2: mean(cv_r2.iter().copied()),
                cv_r2,
            });
            models.push((family, model));
        }

        let Some(selected) = select_best(&reports) else {
            return Err(model_err(last_error.unwrap_or(ModelError::EmptyInput)));
        };
        let importances = ranked_importances(&models, &features);
        let Some((_, model)) = models.into_iter().find(|(family, _)| *family == selected) else {
            return Err(model_err(ModelError::EmptyInput));
        };

        let in_sample = Scores::compute(y, model.predict(x).view());
        log::info!("Selected {selected} model");

        Ok(Self {
            features,
            model,
            report: TrainingReport {
                train_rows: train.len(),
                test_rows: test.len(),
                families: reports,
                failed,
                selected,
                in_sample: metrics(in_sample),
                importances,
            },
            from_cache: false,
        })
    }

    /// Predicted efficiency of every record.
    #[must_use]
    pub fn predict(&self, records: &[LocationRecord]) -> Vec<f64> {
        let rows: Vec<f64> = records
            .iter()
            .flat_map(|r| feature_row(r, &self.features))
            .collect();
        Array2::from_shape_vec((records.len(), self.features.len()), rows)
            .map(|x| self.model.predict(x.view()).to_vec())
            .unwrap_or_default()
    }

    /// Predicted efficiency of a single, possibly hypothetical, location.
    #[must_use]
    pub fn predict_location(&self, record: &LocationRecord) -> f64 {
        self.predict(std::slice::from_ref(record))
            .first()
            .copied()
            .unwrap_or(0.0)
    }
}

fn fit_family(
    family: ModelFamily,
    config: &EfficiencyConfig,
    x: ArrayView2<'_, f64>,
    y: ArrayView1<'_, f64>,
) -> Result<TrainedModel, ModelError> {
    match family {
        ModelFamily::Linear => LinearModel::fit(x, y).map(TrainedModel::Linear),
        ModelFamily::RandomForest => RandomForest::fit(
            x,
            y,
            &ForestParams {
                n_trees: config.trees,
                tree: TreeParams {
                    max_depth: config.forest_max_depth,
                    ..TreeParams::default()
                },
                seed: config.seed,
            },
        )
        .map(TrainedModel::RandomForest),
        ModelFamily::GradientBoosting => GradientBoosting::fit(
            x,
            y,
            &BoostingParams {
                n_stages: config.boosting_stages,
                learning_rate: config.learning_rate,
                tree: TreeParams {
                    max_depth: config.boosting_max_depth,
                    ..TreeParams::default()
                },
            },
        )
        .map(TrainedModel::GradientBoosting),
    }
}

const fn metrics(scores: Scores) -> ErrorMetrics {
    ErrorMetrics {
        mse: scores.mse,
        rmse: scores.rmse,
        r2: scores.r2,
    }
}

/// Family with the highest held-out R². The first one wins a tie.
#[must_use]
pub fn select_best(reports: &[FamilyReport]) -> Option<ModelFamily> {
    let mut best: Option<&FamilyReport> = None;
    for report in reports {
        if best.is_none_or(|b| report.holdout.r2 > b.holdout.r2) {
            best = Some(report);
        }
    }
    best.map(|r| r.family)
}

fn ranked_importances(
    models: &[(ModelFamily, TrainedModel)],
    features: &[Column],
) -> Vec<FamilyImportances> {
    models
        .iter()
        .filter_map(|(family, model)| {
            let values = model.feature_importances()?;
            let mut ranked: Vec<FeatureImportance> = features
                .iter()
                .zip(values)
                .map(|(feature, &importance)| FeatureImportance {
                    feature: feature.to_string(),
                    importance,
                })
                .collect();
            ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance));
            Some(FamilyImportances {
                family: *family,
                ranked,
            })
        })
        .collect()
}

/// Scores `model` against `records` rather than the rows it was trained on.
fn in_sample_metrics(
    model: &TrainedModel,
    records: &[LocationRecord],
    features: &[Column],
) -> Result<ErrorMetrics, AnalyticsError> {
    let matrix = feature_matrix(records, features).map_err(|source| AnalyticsError::Model {
        stage: Stage::Efficiency,
        source,
    })?;
    let x = matrix.values.view();
    let targets: Array1<f64> = records.iter().map(efficiency_target).collect();
    Ok(metrics(Scores::compute(targets.view(), model.predict(x).view())))
}

/// Loads the cached model when the policy allows and the artifact fits
/// `features`, otherwise trains and (unless disabled) saves. A cached
/// model's in-sample metrics are recomputed on `records`; its holdout and
/// cross-validation numbers still describe the training run.
///
/// # Errors
///
/// Returns an error only if training fails. Cache problems are logged.
pub fn load_or_train(
    records: &[LocationRecord],
    features: Vec<Column>,
    config: &EfficiencyConfig,
    cache_policy: &CachePolicy,
) -> Result<EfficiencyModel, AnalyticsError> {
    let names = feature_names(&features);

    if let CachePolicy::Use(path) = cache_policy {
        match cache::load::<TrainingReport>(path, &names) {
            Ok(cached) => {
                log::info!("Loaded cached efficiency model from {}", path.display());
                let mut report = cached.report;
                report.in_sample = in_sample_metrics(&cached.model, records, &features)?;
                return Ok(EfficiencyModel {
                    features,
                    model: cached.model,
                    report,
                    from_cache: true,
                });
            }
            Err(miss) => log::info!("Retraining efficiency model: {miss}"),
        }
    }

    let trained = EfficiencyModel::train(records, features, config)?;

    if let Some(path) = cache_policy.path() {
        let artifact = CachedModel::new(names, trained.model.clone(), trained.report.clone());
        if let Err(e) = cache::save(path, &artifact) {
            log::warn!("Failed to save model cache to {}: {e}", path.display());
        }
    }

    Ok(trained)
}

/// Scores own-brand locations.
///
/// # Errors
///
/// Returns [`AnalyticsError::Model`] if no model family can be trained.
pub fn analyze_efficiency(
    table: &LocationTable,
    config: &EfficiencyConfig,
    cache_policy: &CachePolicy,
) -> Result<Outcome<EfficiencyResult>, AnalyticsError> {
    let own = own_brand_rows(table);
    let features = model_features(table, config.include_flags);

    if features.is_empty() {
        log::warn!("No feature columns, skipping efficiency model");
        return Ok(Outcome::NoFeatures);
    }
    if own.len() < config.min_rows {
        log::warn!(
            "Insufficient data for efficiency model: {} own-brand rows, {} required",
            own.len(),
            config.min_rows
        );
        return Ok(Outcome::InsufficientData {
            rows: own.len(),
            required: config.min_rows,
        });
    }

    let model = load_or_train(&own.records, features, config, cache_policy)?;
    let predictions = model.predict(&own.records);

    let mut locations: Vec<LocationEfficiency> = own
        .records
        .iter()
        .zip(&predictions)
        .map(|(record, &predicted)| {
            let bucket = EfficiencyBucket::from_score(predicted);
            LocationEfficiency {
                name: record.name.clone(),
                address: record.address.clone(),
                city: record.city.clone(),
                coordinates: record.coordinates,
                actual: efficiency_target(record),
                predicted,
                bucket,
                suggestions: if bucket == EfficiencyBucket::Low {
                    suggestions(record)
                } else {
                    Vec::new()
                },
            }
        })
        .collect();
    locations.sort_by(|a, b| b.predicted.total_cmp(&a.predicted));

    let bucket_counts = EfficiencyBucket::all()
        .iter()
        .map(|&bucket| BucketCount {
            bucket,
            count: locations.iter().filter(|l| l.bucket == bucket).count(),
        })
        .collect();

    let mut result = EfficiencyResult {
        features: feature_names(&model.features),
        from_cache: model.from_cache,
        report: model.report,
        mean_predicted: mean(predictions.iter().copied()).unwrap_or(0.0),
        locations,
        bucket_counts,
        recommendations: Vec::new(),
    };
    result.recommendations = recommendations(&result);
    Ok(Outcome::Completed(result))
}

/// Improvement suggestions for one low-efficiency location. Values that
/// are unknown never trigger a suggestion.
#[must_use]
pub fn suggestions(record: &LocationRecord) -> Vec<String> {
    let mut out = Vec::new();

    if record.rating.is_some_and(|r| r < 3.0) {
        out.push("Improve service quality to raise the rating".to_string());
    }
    if record.reviews_count.is_some_and(|n| n < 5) {
        out.push("Encourage customers to leave reviews".to_string());
    }
    if record.walkability_score.is_some_and(|w| w < 5.0) {
        out.push("Review the accessibility of the location".to_string());
    }
    if record.poi.shopping_centers == Some(0) {
        out.push("Consider relocating into a shopping center".to_string());
    }

    out
}

fn recommendations(result: &EfficiencyResult) -> Vec<String> {
    let mut out = Vec::new();
    let report = &result.report;

    if let Some(r2) = report.best_r2() {
        out.push(if r2 < 0.3 {
            format!("Model accuracy is low (R² {r2:.2}). More data or features are needed")
        } else if r2 < 0.6 {
            format!("Model accuracy is moderate (R² {r2:.2}). Consider adding more features")
        } else {
            format!("Model accuracy is high (R² {r2:.2}). Predictions can guide site selection")
        });
    }

    let importances = report
        .importances
        .iter()
        .find(|i| i.family == report.selected)
        .or_else(|| report.importances.first());
    if let Some(importances) = importances
        && !importances.ranked.is_empty()
    {
        let top: Vec<&str> = importances
            .ranked
            .iter()
            .take(3)
            .map(|f| f.feature.as_str())
            .collect();
        out.push(format!(
            "Most important features: {}. Focus on improving them",
            top.join(", ")
        ));
    }

    let low = result
        .locations
        .iter()
        .filter(|l| l.bucket == EfficiencyBucket::Low)
        .count();
    if low > 0 {
        out.push(format!(
            "{low} locations have low efficiency and individual improvement suggestions"
        ));
    }

    out
}
