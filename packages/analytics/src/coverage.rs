//! Own-brand coverage metrics.

use std::collections::BTreeSet;

use ndarray::Array2;
use outlet_map_analytics_models::{
    CityBreakdown, CityDensity, CoverageMetrics, DemandGaps, DensityLevel,
};
use outlet_map_config::{AnalysisConfig, DemandConfig};
use outlet_map_location_models::{Coordinates, LocationRecord, LocationTable};
use outlet_map_modeling::clustering::{cluster_count, dbscan};
use outlet_map_source::operator::own_brand_rows;
use outlet_map_spatial::{mean_pairwise_distance_km, nearest};

use crate::features::mean;

/// Computes coverage metrics for the own-brand network.
///
/// Returns empty metrics when the table has no own-brand rows.
#[must_use]
pub fn analyze_coverage(table: &LocationTable, config: &AnalysisConfig) -> CoverageMetrics {
    log::info!("Analyzing coverage of {} locations", table.len());

    let own = own_brand_rows(table);
    if own.is_empty() {
        log::info!("No own-brand locations, coverage metrics are empty");
        return CoverageMetrics::default();
    }

    let cities = own.cities();
    #[allow(clippy::cast_precision_loss)]
    let avg_locations_per_city = own.len() as f64 / cities.len().max(1) as f64;

    let density_by_city = density_by_city(&own, &cities, config);
    let city_breakdown = cities
        .iter()
        .map(|city| city_breakdown(city, &own.records))
        .collect();
    let demand_gaps = demand_gaps(table, &own, &config.demand);

    let mut metrics = CoverageMetrics {
        total_locations: own.len(),
        cities: cities.len(),
        avg_locations_per_city,
        density_by_city,
        city_breakdown,
        demand_gaps,
        recommendations: Vec::new(),
    };
    metrics.recommendations = recommendations(&metrics);

    log::info!(
        "Coverage: {} own-brand locations in {} cities",
        metrics.total_locations,
        metrics.cities
    );
    metrics
}

/// Mean pairwise distance and density level for every city with at
/// least two own-brand locations that have coordinates.
#[must_use]
pub fn density_by_city(
    own: &LocationTable,
    cities: &[String],
    config: &AnalysisConfig,
) -> Vec<CityDensity> {
    cities
        .iter()
        .filter_map(|city| {
            let points = city_coordinates(&own.records, city);
            let mean_distance_km = mean_pairwise_distance_km(&points)?;
            Some(CityDensity {
                city: city.clone(),
                locations: points.len(),
                mean_distance_km,
                density: DensityLevel::classify(
                    mean_distance_km,
                    config.density.high_below_km,
                    config.density.low_above_km,
                ),
            })
        })
        .collect()
}

fn city_coordinates(records: &[LocationRecord], city: &str) -> Vec<Coordinates> {
    records
        .iter()
        .filter(|r| r.city == city)
        .filter_map(|r| r.coordinates)
        .collect()
}

fn city_breakdown(city: &str, records: &[LocationRecord]) -> CityBreakdown {
    let in_city: Vec<&LocationRecord> = records.iter().filter(|r| r.city == city).collect();
    CityBreakdown {
        city: city.to_string(),
        locations: in_city.len(),
        mean_rating: mean(in_city.iter().filter_map(|r| r.rating)),
        mean_reviews: mean(
            in_city
                .iter()
                .filter_map(|r| r.reviews_count.map(f64::from)),
        ),
    }
}

/// Clusters the raw coordinates of every location and reports the
/// clusters that no own-brand location falls into.
///
/// An own-brand location is attributed to the cluster of its nearest
/// clustered point. Noise points are never a gap.
fn demand_gaps(
    table: &LocationTable,
    own: &LocationTable,
    config: &DemandConfig,
) -> Option<DemandGaps> {
    let points: Vec<Coordinates> = table.records.iter().filter_map(|r| r.coordinates).collect();
    if points.len() < 2 {
        return None;
    }

    let flat: Vec<f64> = points
        .iter()
        .flat_map(|c| [c.latitude, c.longitude])
        .collect();
    let matrix = Array2::from_shape_vec((points.len(), 2), flat).ok()?;

    let labels = match dbscan(&matrix, config.eps_degrees, config.min_points) {
        Ok(labels) => labels,
        Err(e) => {
            log::warn!("Demand clustering failed, skipping demand gaps: {e}");
            return None;
        }
    };

    let covered: BTreeSet<usize> = own
        .records
        .iter()
        .filter_map(|r| r.coordinates)
        .filter_map(|c| nearest(c, &points))
        .filter_map(|(i, _)| labels[i])
        .collect();
    let gap_ids: BTreeSet<usize> = labels
        .iter()
        .flatten()
        .copied()
        .filter(|id| !covered.contains(id))
        .collect();

    let gap_locations = points
        .iter()
        .zip(&labels)
        .filter(|(_, label)| label.is_some_and(|id| gap_ids.contains(&id)))
        .map(|(c, _)| *c)
        .collect();

    Some(DemandGaps {
        clusters_found: cluster_count(&labels),
        gap_clusters: gap_ids.len(),
        gap_locations,
    })
}

fn recommendations(metrics: &CoverageMetrics) -> Vec<String> {
    let mut out = Vec::new();

    if let Some(gaps) = &metrics.demand_gaps
        && !gaps.gap_locations.is_empty()
    {
        out.push(format!(
            "Found {} potential white-spot locations in {} demand clusters without own-brand presence",
            gaps.gap_locations.len(),
            gaps.gap_clusters
        ));
    }

    for city in &metrics.density_by_city {
        match city.density {
            DensityLevel::Low => out.push(format!(
                "{} has low coverage density ({:.1} km between locations on average). Opening new locations is recommended",
                city.city, city.mean_distance_km
            )),
            DensityLevel::High => out.push(format!(
                "{} has high coverage density ({:.1} km between locations on average). Locations may cannibalize each other's traffic",
                city.city, city.mean_distance_km
            )),
            DensityLevel::Medium => {}
        }
    }

    out
}
