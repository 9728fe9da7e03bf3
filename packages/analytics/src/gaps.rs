//! Gap detection: where demand exists without own-brand presence.
//!
//! Three independent signals are combined:
//!
//! * population: own-brand locations per 100k residents of each city in
//!   the population reference
//! * infrastructure: infrastructure-rich spots with no own-brand location
//!   within the infrastructure radius
//! * competition: competitor locations with no own-brand location within
//!   the coverage radius

use outlet_map_analytics_models::{
    CompetitiveGap, CompetitiveGaps, GapAnalysis, InfrastructureGap, InfrastructureGaps,
    PopulationGap, Sufficiency,
};
use outlet_map_config::{AnalysisConfig, GapConfig};
use outlet_map_location_models::{Column, Coordinates, LocationRecord, LocationTable};
use outlet_map_source::operator::{is_own_brand, operator_of};
use outlet_map_spatial::{any_within_km, nearest};

use crate::{AnalyticsError, Stage};

/// Columns the infrastructure signal cannot be computed without.
pub const INFRASTRUCTURE_COLUMNS: [Column; 3] = [
    Column::NearbyShoppingCentersCount,
    Column::NearbyMetroCount,
    Column::AnchorTenantsCount,
];

/// Runs all three gap signals.
///
/// `scope` restricts the population signal to one city.
///
/// # Errors
///
/// Returns [`AnalyticsError::MissingColumn`] if any of the
/// [`INFRASTRUCTURE_COLUMNS`] is absent from the table.
pub fn analyze_gaps(
    table: &LocationTable,
    config: &AnalysisConfig,
    scope: Option<&str>,
) -> Result<GapAnalysis, AnalyticsError> {
    log::info!("Analyzing gaps across {} locations", table.len());

    if let Some(column) = INFRASTRUCTURE_COLUMNS
        .iter()
        .find(|c| !table.has_column(**c))
    {
        return Err(AnalyticsError::MissingColumn {
            stage: Stage::Gaps,
            column: *column,
        });
    }

    let own_coordinates = own_brand_coordinates(table);

    let population_gaps = population_gaps(table, config, scope);
    let infrastructure_gaps = infrastructure_gaps(
        table,
        &own_coordinates,
        &config.gaps,
        config.infrastructure_radius_km,
    );
    let competitive_gaps = competitive_gaps(table, &own_coordinates, config.coverage_radius_km);

    let mut analysis = GapAnalysis {
        population_gaps,
        infrastructure_gaps,
        competitive_gaps,
        recommendations: Vec::new(),
    };
    analysis.recommendations = recommendations(&analysis);

    log::info!(
        "Gaps: {} infrastructure, {} competitive",
        analysis.infrastructure_gaps.gap_areas.len(),
        analysis.competitive_gaps.gap_areas.len()
    );
    Ok(analysis)
}

fn own_brand_coordinates(table: &LocationTable) -> Vec<Coordinates> {
    table
        .records
        .iter()
        .filter(|r| is_own_brand(r))
        .filter_map(|r| r.coordinates)
        .collect()
}

/// Own-brand density per 100k residents for every city in the
/// population reference. Cities outside the reference are ignored.
#[must_use]
pub fn population_gaps(
    table: &LocationTable,
    config: &AnalysisConfig,
    scope: Option<&str>,
) -> Vec<PopulationGap> {
    config
        .population
        .iter()
        .filter(|(city, population)| **population > 0 && scope.is_none_or(|s| s == city.as_str()))
        .map(|(city, &population)| {
            let locations = table
                .records
                .iter()
                .filter(|r| r.city == *city && is_own_brand(r))
                .count();
            #[allow(clippy::cast_precision_loss)]
            let per_100k = locations as f64 / population as f64 * 100_000.0;
            PopulationGap {
                city: city.clone(),
                population,
                locations,
                per_100k,
                status: if per_100k < config.gaps.min_per_100k {
                    Sufficiency::Insufficient
                } else {
                    Sufficiency::Sufficient
                },
            }
        })
        .collect()
}

/// Whether a record clears every infrastructure threshold. Missing
/// counts are zero.
#[must_use]
pub fn is_infrastructure_rich(record: &LocationRecord, config: &GapConfig) -> bool {
    record.poi.shopping_centers.unwrap_or(0) > config.min_shopping_centers
        && record.poi.metro_stations.unwrap_or(0) > config.min_metro_stations
        && record.poi.anchor_tenants.unwrap_or(0) > config.min_anchor_tenants
}

/// Weighted infrastructure score. Transit stops contribute at most 3.
#[must_use]
pub fn infrastructure_score(record: &LocationRecord) -> f64 {
    let count = |v: Option<u32>| f64::from(v.unwrap_or(0));
    let transit = (count(record.poi.transit_stops) * 0.5).min(3.0);
    count(record.poi.shopping_centers).mul_add(
        2.0,
        count(record.poi.metro_stations).mul_add(3.0, count(record.poi.anchor_tenants) * 1.5),
    ) + transit
}

fn infrastructure_gaps(
    table: &LocationTable,
    own: &[Coordinates],
    config: &GapConfig,
    radius_km: f64,
) -> InfrastructureGaps {
    let candidates: Vec<(&LocationRecord, Coordinates)> = table
        .records
        .iter()
        .filter(|r| is_infrastructure_rich(r, config))
        .filter_map(|r| r.coordinates.map(|c| (r, c)))
        .collect();

    let gap_areas = candidates
        .iter()
        .filter(|(_, c)| !any_within_km(*c, own, radius_km))
        .map(|(r, c)| InfrastructureGap {
            name: r.name.clone(),
            address: r.address.clone(),
            city: r.city.clone(),
            coordinates: *c,
            infrastructure_score: infrastructure_score(r),
            nearest_own_brand_km: nearest(*c, own).map(|(_, d)| d),
        })
        .collect();

    InfrastructureGaps {
        candidates: candidates.len(),
        gap_areas,
    }
}

fn competitive_gaps(table: &LocationTable, own: &[Coordinates], radius_km: f64) -> CompetitiveGaps {
    let competitors: Vec<(&LocationRecord, Coordinates)> = table
        .records
        .iter()
        .filter(|r| operator_of(r).is_competitor())
        .filter_map(|r| r.coordinates.map(|c| (r, c)))
        .collect();

    let gap_areas = competitors
        .iter()
        .filter(|(_, c)| !any_within_km(*c, own, radius_km))
        .map(|(r, c)| CompetitiveGap {
            name: r.name.clone(),
            address: r.address.clone(),
            city: r.city.clone(),
            coordinates: *c,
            operator: operator_of(r),
            rating: r.rating,
            nearest_own_brand_km: nearest(*c, own).map(|(_, d)| d),
        })
        .collect();

    CompetitiveGaps {
        competitors: competitors.len(),
        gap_areas,
    }
}

fn recommendations(analysis: &GapAnalysis) -> Vec<String> {
    let mut out: Vec<String> = analysis
        .population_gaps
        .iter()
        .filter(|g| g.status == Sufficiency::Insufficient)
        .map(|g| {
            format!(
                "{} is under-covered ({:.2} locations per 100k residents). Opening new locations is recommended",
                g.city, g.per_100k
            )
        })
        .collect();

    let infrastructure = analysis.infrastructure_gaps.gap_areas.len();
    if infrastructure > 0 {
        out.push(format!(
            "Found {infrastructure} infrastructure-rich areas without own-brand locations. Prioritize them for new openings"
        ));
    }

    let competitive = analysis.competitive_gaps.gap_areas.len();
    if competitive > 0 {
        out.push(format!(
            "Found {competitive} areas with competitor presence but no own-brand location. Assess the competitive potential there"
        ));
    }

    out
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use outlet_map_location_models::PoiCounts;

    use super::*;
    use crate::fixtures::{record, rich, table};

    fn config_with_population(city: &str, population: u64) -> AnalysisConfig {
        AnalysisConfig {
            population: BTreeMap::from([(city.to_string(), population)]),
            ..AnalysisConfig::default()
        }
    }

    #[test]
    fn fifteen_locations_per_million_is_insufficient() {
        let records = (0..15_u32)
            .map(|i| record(&format!("Tele2 {i}"), "Город", 50.0, 30.0 + f64::from(i) * 0.1))
            .collect();
        let config = config_with_population("Город", 1_000_000);
        let gaps = population_gaps(&table(records), &config, None);

        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].locations, 15);
        assert!((gaps[0].per_100k - 1.5).abs() < 1e-12);
        assert_eq!(gaps[0].status, Sufficiency::Insufficient);
    }

    #[test]
    fn enough_locations_are_sufficient() {
        let records = (0..20)
            .map(|i| record(&format!("Tele2 {i}"), "Город", 50.0, 30.0))
            .collect();
        let config = config_with_population("Город", 1_000_000);
        let gaps = population_gaps(&table(records), &config, None);
        assert_eq!(gaps[0].status, Sufficiency::Sufficient);
    }

    #[test]
    fn scope_limits_population_gaps() {
        let t = table(vec![record("Tele2", "Москва", 55.75, 37.6)]);
        let config = AnalysisConfig::default();
        let all = population_gaps(&t, &config, None);
        let scoped = population_gaps(&t, &config, Some("Москва"));
        assert_eq!(all.len(), config.population.len());
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].city, "Москва");
    }

    #[test]
    fn competitor_without_nearby_own_brand_is_a_gap() {
        let competitor = record("МТС", "Москва", 55.7500, 37.6000);
        let far_own = record("Tele2", "Москва", 55.8500, 37.6000);
        let config = AnalysisConfig::default();

        let analysis =
            analyze_gaps(&table(vec![competitor.clone(), far_own]), &config, None).unwrap();
        assert_eq!(analysis.competitive_gaps.competitors, 1);
        assert_eq!(analysis.competitive_gaps.gap_areas.len(), 1);
        let gap = &analysis.competitive_gaps.gap_areas[0];
        assert_eq!(gap.name, "МТС");
        assert!(gap.nearest_own_brand_km.unwrap() > 10.0);

        // About 0.5 km away.
        let near_own = record("Tele2", "Москва", 55.7545, 37.6000);
        let analysis = analyze_gaps(&table(vec![competitor, near_own]), &config, None).unwrap();
        assert!(analysis.competitive_gaps.gap_areas.is_empty());
    }

    #[test]
    fn other_operators_are_not_competitive_gaps() {
        let analysis = analyze_gaps(
            &table(vec![record("Связной", "Москва", 55.75, 37.6)]),
            &AnalysisConfig::default(),
            None,
        )
        .unwrap();
        assert_eq!(analysis.competitive_gaps.competitors, 0);
    }

    #[test]
    fn infrastructure_gap_respects_radius() {
        let spot = rich("ТЦ Европа", "Москва", 55.7500, 37.6000);
        let config = AnalysisConfig::default();

        let lonely = analyze_gaps(&table(vec![spot.clone()]), &config, None).unwrap();
        assert_eq!(lonely.infrastructure_gaps.candidates, 1);
        assert_eq!(lonely.infrastructure_gaps.gap_areas.len(), 1);
        let gap = &lonely.infrastructure_gaps.gap_areas[0];
        // 3*2 + 1*3 + 2*1.5 + min(10*0.5, 3)
        assert!((gap.infrastructure_score - 15.0).abs() < 1e-12);
        assert_eq!(gap.nearest_own_brand_km, None);

        // About 1.1 km away, inside the 2 km radius.
        let own = record("Tele2", "Москва", 55.7600, 37.6000);
        let covered = analyze_gaps(&table(vec![spot, own]), &config, None).unwrap();
        assert!(covered.infrastructure_gaps.gap_areas.is_empty());
    }

    #[test]
    fn thresholds_are_strict() {
        let config = AnalysisConfig::default().gaps;
        let mut r = rich("x", "Москва", 55.0, 37.0);
        assert!(is_infrastructure_rich(&r, &config));
        r.poi.shopping_centers = Some(2);
        assert!(!is_infrastructure_rich(&r, &config));
        r.poi = PoiCounts::default();
        assert!(!is_infrastructure_rich(&r, &config));
    }

    #[test]
    fn records_without_coordinates_are_skipped() {
        let mut competitor = record("Билайн", "Москва", 55.75, 37.6);
        competitor.coordinates = None;
        let analysis =
            analyze_gaps(&table(vec![competitor]), &AnalysisConfig::default(), None).unwrap();
        assert_eq!(analysis.competitive_gaps.competitors, 0);
        assert!(analysis.competitive_gaps.gap_areas.is_empty());
    }

    #[test]
    fn missing_infrastructure_column_is_fatal() {
        let mut t = table(vec![record("Tele2", "Москва", 55.75, 37.6)]);
        t.columns.remove(&Column::NearbyMetroCount);

        let err = analyze_gaps(&t, &AnalysisConfig::default(), None).unwrap_err();
        assert!(matches!(
            err,
            AnalyticsError::MissingColumn {
                stage: Stage::Gaps,
                column: Column::NearbyMetroCount,
            }
        ));
        assert!(err.to_string().contains("gaps"));
    }

    #[test]
    fn empty_table_is_well_formed() {
        let analysis =
            analyze_gaps(&table(Vec::new()), &AnalysisConfig::default(), None).unwrap();
        assert!(analysis.infrastructure_gaps.gap_areas.is_empty());
        assert!(analysis.competitive_gaps.gap_areas.is_empty());
        assert!(
            analysis
                .population_gaps
                .iter()
                .all(|g| g.status == Sufficiency::Insufficient)
        );
    }
}
