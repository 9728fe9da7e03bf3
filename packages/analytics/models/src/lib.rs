#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Result types produced by the outlet-map analyses.
//!
//! Every stage returns one of the structs below, and
//! [`AnalysisResult`] aggregates them for the report emitters. All types
//! round-trip through `serde` without loss, so a saved JSON report can be
//! re-rendered later.

use chrono::{DateTime, Utc};
use outlet_map_location_models::{Coordinates, OperatorLabel};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Density of a city's own-brand network by mean pairwise distance.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum DensityLevel {
    High,
    Medium,
    Low,
}

impl DensityLevel {
    /// Below `high_below_km` is High, above `low_above_km` is Low and
    /// everything in between (both ends inclusive) is Medium.
    #[must_use]
    pub fn classify(mean_distance_km: f64, high_below_km: f64, low_above_km: f64) -> Self {
        if mean_distance_km < high_below_km {
            Self::High
        } else if mean_distance_km > low_above_km {
            Self::Low
        } else {
            Self::Medium
        }
    }
}

/// Whether a city has enough own-brand locations for its population.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum Sufficiency {
    Sufficient,
    Insufficient,
}

/// Categorical efficiency level.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum EfficiencyBucket {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl EfficiencyBucket {
    /// Upper (inclusive) edges of Low, Medium and High.
    pub const EDGES: [f64; 3] = [10.0, 15.0, 20.0];

    /// Bins a score into right-closed intervals `[0,10]`, `(10,15]`,
    /// `(15,20]`, `(20,25]`. Scores outside `[0,25]` clamp to the nearest
    /// end bucket.
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score.is_nan() || score <= Self::EDGES[0] {
            Self::Low
        } else if score <= Self::EDGES[1] {
            Self::Medium
        } else if score <= Self::EDGES[2] {
            Self::High
        } else {
            Self::VeryHigh
        }
    }

    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Low, Self::Medium, Self::High, Self::VeryHigh]
    }
}

/// Regressor family trained by the efficiency model.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ModelFamily {
    Linear,
    RandomForest,
    GradientBoosting,
}

impl ModelFamily {
    /// Training order, which is also the tie-break order for selection.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Linear, Self::RandomForest, Self::GradientBoosting]
    }

    /// Whether the family reports impurity-based feature importances.
    #[must_use]
    pub const fn is_tree_ensemble(self) -> bool {
        matches!(self, Self::RandomForest | Self::GradientBoosting)
    }
}

/// Outcome of a stage that needs a minimum amount of data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome<T> {
    Completed(T),
    /// Fewer rows than the stage needs; nothing was computed.
    InsufficientData { rows: usize, required: usize },
    /// None of the feature columns are present in the input.
    NoFeatures,
}

impl<T> Outcome<T> {
    #[must_use]
    pub const fn completed(&self) -> Option<&T> {
        match self {
            Self::Completed(value) => Some(value),
            Self::InsufficientData { .. } | Self::NoFeatures => None,
        }
    }

    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    /// Human-readable reason nothing was computed.
    #[must_use]
    pub fn skip_reason(&self) -> Option<String> {
        match self {
            Self::Completed(_) => None,
            Self::InsufficientData { rows, required } => Some(format!(
                "insufficient data: {rows} rows, at least {required} required"
            )),
            Self::NoFeatures => Some("no feature columns available".to_string()),
        }
    }
}

/// A count keyed by city name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CityCount {
    pub city: String,
    pub count: usize,
}

/// Shape of a city's own-brand network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityDensity {
    pub city: String,
    /// Own-brand locations with coordinates.
    pub locations: usize,
    pub mean_distance_km: f64,
    pub density: DensityLevel,
}

/// Per-city own-brand summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityBreakdown {
    pub city: String,
    pub locations: usize,
    pub mean_rating: Option<f64>,
    pub mean_reviews: Option<f64>,
}

/// Dense groups of locations (any operator) that have no own-brand
/// member.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DemandGaps {
    pub clusters_found: usize,
    pub gap_clusters: usize,
    /// Coordinates of every location inside a gap cluster.
    pub gap_locations: Vec<Coordinates>,
}

/// Own-brand coverage metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoverageMetrics {
    pub total_locations: usize,
    pub cities: usize,
    pub avg_locations_per_city: f64,
    /// Only cities with at least two own-brand locations with coordinates.
    pub density_by_city: Vec<CityDensity>,
    pub city_breakdown: Vec<CityBreakdown>,
    pub demand_gaps: Option<DemandGaps>,
    pub recommendations: Vec<String>,
}

impl CoverageMetrics {
    /// No own-brand locations were found.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.total_locations == 0
    }
}

/// Own-brand presence relative to population.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationGap {
    pub city: String,
    pub population: u64,
    pub locations: usize,
    pub per_100k: f64,
    pub status: Sufficiency,
}

/// An infrastructure-rich spot with no own-brand location nearby.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfrastructureGap {
    pub name: String,
    pub address: String,
    pub city: String,
    pub coordinates: Coordinates,
    pub infrastructure_score: f64,
    /// `None` when there are no own-brand locations with coordinates.
    pub nearest_own_brand_km: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InfrastructureGaps {
    /// Rows meeting the infrastructure threshold (with coordinates).
    pub candidates: usize,
    pub gap_areas: Vec<InfrastructureGap>,
}

/// A competitor location with no own-brand location nearby.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitiveGap {
    pub name: String,
    pub address: String,
    pub city: String,
    pub coordinates: Coordinates,
    pub operator: OperatorLabel,
    pub rating: Option<f64>,
    pub nearest_own_brand_km: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompetitiveGaps {
    /// Competitor rows with coordinates that were checked.
    pub competitors: usize,
    pub gap_areas: Vec<CompetitiveGap>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GapAnalysis {
    pub population_gaps: Vec<PopulationGap>,
    pub infrastructure_gaps: InfrastructureGaps,
    pub competitive_gaps: CompetitiveGaps,
    pub recommendations: Vec<String>,
}

/// Aggregate figures for one operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorStats {
    pub operator: OperatorLabel,
    pub locations: usize,
    /// Fraction of all classified locations.
    pub share: f64,
    pub mean_rating: Option<f64>,
    pub mean_reviews: Option<f64>,
    pub cities: usize,
}

/// Closest competitor to one own-brand location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearestCompetitor {
    pub name: String,
    pub address: String,
    pub city: String,
    pub competitor: OperatorLabel,
    pub competitor_name: String,
    pub distance_km: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorMean {
    pub operator: OperatorLabel,
    pub mean: f64,
}

/// Per-operator means of one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparativeMetric {
    pub metric: String,
    pub means: Vec<OperatorMean>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompetitorAnalysis {
    pub operators: Vec<OperatorStats>,
    pub proximity: Vec<NearestCompetitor>,
    pub comparisons: Vec<ComparativeMetric>,
    pub recommendations: Vec<String>,
}

/// Openings in one calendar year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearCount {
    pub year: i32,
    pub openings: usize,
    /// Change against the previous listed year, in percent. `None` for
    /// the first year.
    pub growth_pct: Option<f64>,
}

/// Opening history, present only when establishment years are known.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpeningHistory {
    pub yearly: Vec<YearCount>,
    /// Mean yearly openings over the last three years, `None` when
    /// nothing opened recently.
    pub forecast_next_year: Option<f64>,
    pub mean_age_years: f64,
    pub oldest_year: i32,
    pub newest_year: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendAnalysis {
    pub history: Option<OpeningHistory>,
    /// Own-brand locations per city, most first.
    pub city_distribution: Vec<CityCount>,
    pub recommendations: Vec<String>,
}

/// Profile of one cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSummary {
    pub cluster: usize,
    pub size: usize,
    pub mean_rating: Option<f64>,
    pub mean_reviews: Option<f64>,
    pub cities: Vec<CityCount>,
}

/// Fixed-k partition of the standardized feature matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionClustering {
    /// Clusters actually produced (the configured k, reduced when there
    /// are fewer distinct rows).
    pub k: usize,
    pub labels: Vec<usize>,
    /// Cluster centers in standardized units.
    pub centers: Vec<Vec<f64>>,
    pub inertia: f64,
    /// Within-cluster sum of squares for k = 1, 2, ... (diagnostic only).
    pub elbow_inertias: Vec<f64>,
    pub clusters: Vec<ClusterSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DensityClustering {
    pub eps: f64,
    pub min_points: usize,
    /// `None` marks noise.
    pub labels: Vec<Option<usize>>,
    pub n_clusters: usize,
    pub noise_points: usize,
    pub clusters: Vec<ClusterSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusteringResult {
    pub features: Vec<String>,
    pub rows: usize,
    pub partition: PartitionClustering,
    pub density: DensityClustering,
    pub recommendations: Vec<String>,
}

/// Error metrics of one set of predictions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ErrorMetrics {
    pub mse: f64,
    pub rmse: f64,
    pub r2: f64,
}

/// How one regressor family performed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilyReport {
    pub family: ModelFamily,
    /// Held-out metrics on the shared test split.
    pub holdout: ErrorMetrics,
    pub cv_r2: Vec<f64>,
    pub cv_mean_r2: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Ranked importances reported by one tree ensemble.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilyImportances {
    pub family: ModelFamily,
    /// Most important first.
    pub ranked: Vec<FeatureImportance>,
}

/// Everything learned while training the efficiency model. Stored next
/// to the cached model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub train_rows: usize,
    pub test_rows: usize,
    pub families: Vec<FamilyReport>,
    /// Families that failed to fit, with the reason.
    pub failed: Vec<(ModelFamily, String)>,
    pub selected: ModelFamily,
    /// Metrics of the selected model on all rows.
    pub in_sample: ErrorMetrics,
    pub importances: Vec<FamilyImportances>,
}

impl TrainingReport {
    /// Held-out R² of the selected family.
    #[must_use]
    pub fn best_r2(&self) -> Option<f64> {
        self.families
            .iter()
            .find(|f| f.family == self.selected)
            .map(|f| f.holdout.r2)
    }
}

/// Efficiency of one own-brand location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationEfficiency {
    pub name: String,
    pub address: String,
    pub city: String,
    pub coordinates: Option<Coordinates>,
    /// Composite target computed from rating and reviews.
    pub actual: f64,
    pub predicted: f64,
    pub bucket: EfficiencyBucket,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketCount {
    pub bucket: EfficiencyBucket,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EfficiencyResult {
    pub features: Vec<String>,
    /// The served model came from the on-disk cache.
    pub from_cache: bool,
    pub report: TrainingReport,
    /// Highest predicted score first.
    pub locations: Vec<LocationEfficiency>,
    pub bucket_counts: Vec<BucketCount>,
    pub mean_predicted: f64,
    pub recommendations: Vec<String>,
}

/// One location as drawn on maps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapPoint {
    pub name: String,
    pub address: String,
    pub city: String,
    pub operator: OperatorLabel,
    pub coordinates: Coordinates,
    pub rating: Option<f64>,
}

/// The aggregate of every analysis stage for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub generated_at: DateTime<Utc>,
    /// City the run was restricted to, if any.
    pub city: Option<String>,
    pub total_records: usize,
    pub own_brand_records: usize,
    pub coverage: CoverageMetrics,
    pub gaps: GapAnalysis,
    pub competitors: CompetitorAnalysis,
    pub trends: TrendAnalysis,
    pub clustering: Outcome<ClusteringResult>,
    pub efficiency: Outcome<EfficiencyResult>,
    pub locations: Vec<MapPoint>,
    /// Combined, de-duplicated recommendations from every stage.
    pub recommendations: Vec<String>,
}
