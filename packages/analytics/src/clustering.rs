//! Location archetypes from feature clustering.
//!
//! The numeric rating/POI features are standardized and clustered twice:
//! k-means with a fixed k and DBSCAN with a fixed radius. The within-
//! cluster sum of squares for a range of k is recorded alongside but never
//! used to pick k.

use std::collections::BTreeSet;

use ndarray::Array2;
use outlet_map_analytics_models::{
    ClusterSummary, ClusteringResult, DensityClustering, Outcome, PartitionClustering,
};
use outlet_map_config::ClusteringConfig;
use outlet_map_location_models::{LocationRecord, LocationTable};
use outlet_map_modeling::ModelError;
use outlet_map_modeling::clustering::{cluster_count, dbscan, elbow_inertias, kmeans};
use outlet_map_modeling::features::Standardizer;

use crate::features::{feature_matrix, feature_names, mean, numeric_features};
use crate::trends::city_counts;
use crate::{AnalyticsError, Stage};

/// Clusters every location in the table.
///
/// # Errors
///
/// Returns [`AnalyticsError::Model`] if a clustering run fails.
pub fn cluster_locations(
    table: &LocationTable,
    config: &ClusteringConfig,
) -> Result<Outcome<ClusteringResult>, AnalyticsError> {
    let columns = numeric_features(table);
    if columns.is_empty() {
        log::warn!("No numeric feature columns, skipping clustering");
        return Ok(Outcome::NoFeatures);
    }
    if table.len() < config.min_rows {
        log::warn!(
            "Insufficient data for clustering: {} rows, {} required",
            table.len(),
            config.min_rows
        );
        return Ok(Outcome::InsufficientData {
            rows: table.len(),
            required: config.min_rows,
        });
    }

    log::info!(
        "Clustering {} locations on {} features",
        table.len(),
        columns.len()
    );

    let model_err = |source: ModelError| AnalyticsError::Model {
        stage: Stage::Clustering,
        source,
    };

    let matrix = feature_matrix(&table.records, &columns).map_err(model_err)?;
    let (_, scaled) = Standardizer::fit_transform(matrix.values.view());

    let partition = partition(&table.records, &scaled, config).map_err(model_err)?;
    let density = density(&table.records, &scaled, config).map_err(model_err)?;

    let recommendations = recommendations(&partition, &density);
    Ok(Outcome::Completed(ClusteringResult {
        features: feature_names(&columns),
        rows: table.len(),
        partition,
        density,
        recommendations,
    }))
}

fn partition(
    records: &[LocationRecord],
    scaled: &Array2<f64>,
    config: &ClusteringConfig,
) -> Result<PartitionClustering, ModelError> {
    let outcome = kmeans(scaled, config.k, config.seed, config.max_iterations)?;
    let elbow = elbow_inertias(scaled, config.max_elbow_k, config.seed, config.max_iterations)?;

    let labels: Vec<Option<usize>> = outcome.labels.iter().copied().map(Some).collect();
    let clusters = summarize(records, &labels);

    Ok(PartitionClustering {
        k: outcome.centroids.len(),
        labels: outcome.labels,
        centers: outcome.centroids,
        inertia: outcome.inertia,
        elbow_inertias: elbow,
        clusters,
    })
}

fn density(
    records: &[LocationRecord],
    scaled: &Array2<f64>,
    config: &ClusteringConfig,
) -> Result<DensityClustering, ModelError> {
    let labels = dbscan(scaled, config.dbscan_eps, config.dbscan_min_points)?;
    let clusters = summarize(records, &labels);

    Ok(DensityClustering {
        eps: config.dbscan_eps,
        min_points: config.dbscan_min_points,
        n_clusters: cluster_count(&labels),
        noise_points: labels.iter().filter(|l| l.is_none()).count(),
        labels,
        clusters,
    })
}

/// One summary per cluster id, ascending. Noise (`None`) is skipped.
#[must_use]
pub fn summarize(records: &[LocationRecord], labels: &[Option<usize>]) -> Vec<ClusterSummary> {
    let ids: BTreeSet<usize> = labels.iter().flatten().copied().collect();

    ids.into_iter()
        .map(|id| {
            let members: Vec<&LocationRecord> = records
                .iter()
                .zip(labels)
                .filter(|(_, label)| **label == Some(id))
                .map(|(r, _)| r)
                .collect();
            ClusterSummary {
                cluster: id,
                size: members.len(),
                mean_rating: mean(members.iter().filter_map(|r| r.rating)),
                mean_reviews: mean(
                    members
                        .iter()
                        .filter_map(|r| r.reviews_count.map(f64::from)),
                ),
                cities: city_counts(members.iter().copied()),
            }
        })
        .collect()
}

fn recommendations(partition: &PartitionClustering, density: &DensityClustering) -> Vec<String> {
    let mut out = Vec::new();

    if partition.k > 1 {
        out.push(format!(
            "Found {} distinct location clusters. Develop a separate strategy for each",
            partition.k
        ));
    }
    if density.noise_points > 0 {
        out.push(format!(
            "{} locations do not belong to any density cluster. Review these outliers individually",
            density.noise_points
        ));
    }

    out
}

#[cfg(test)]
mod tests {
    use outlet_map_config::AnalysisConfig;
    use outlet_map_location_models::Column;

    use super::*;
    use crate::fixtures::{record, table, varied_own_brand};

    #[test]
    fn below_minimum_rows_is_insufficient() {
        let t = table(varied_own_brand(9));
        let outcome = cluster_locations(&t, &AnalysisConfig::default().clustering).unwrap();
        assert_eq!(
            outcome,
            Outcome::InsufficientData {
                rows: 9,
                required: 10
            }
        );
    }

    #[test]
    fn no_feature_columns_is_empty_result() {
        let mut t = table(varied_own_brand(30));
        t.columns = Column::REQUIRED.iter().copied().collect::<BTreeSet<_>>();
        let outcome = cluster_locations(&t, &AnalysisConfig::default().clustering).unwrap();
        assert_eq!(outcome, Outcome::NoFeatures);
    }

    #[test]
    fn clusters_every_row() {
        let t = table(varied_own_brand(40));
        let config = AnalysisConfig::default().clustering;
        let outcome = cluster_locations(&t, &config).unwrap();
        let result = outcome.completed().unwrap();

        assert_eq!(result.rows, 40);
        assert_eq!(result.features.len(), 11);
        assert_eq!(result.partition.k, 3);
        assert_eq!(result.partition.labels.len(), 40);
        assert_eq!(result.partition.centers.len(), 3);
        assert_eq!(result.partition.elbow_inertias.len(), 10);
        let sizes: usize = result.partition.clusters.iter().map(|c| c.size).sum();
        assert_eq!(sizes, 40);

        assert_eq!(result.density.labels.len(), 40);
        let clustered: usize = result.density.clusters.iter().map(|c| c.size).sum();
        assert_eq!(clustered + result.density.noise_points, 40);
        assert!(!result.recommendations.is_empty());
    }

    #[test]
    fn summaries_skip_noise() {
        let records = vec![
            record("a", "Москва", 0.0, 0.0),
            record("b", "Казань", 0.0, 0.0),
            record("c", "Москва", 0.0, 0.0),
        ];
        let summaries = summarize(&records, &[Some(1), None, Some(1)]);
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].cluster, 1);
        assert_eq!(summaries[0].size, 2);
        assert_eq!(summaries[0].cities[0].city, "Москва");
        assert_eq!(summaries[0].cities[0].count, 2);
    }
}
