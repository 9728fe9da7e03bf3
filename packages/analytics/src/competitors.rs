//! Competitive landscape: operator shares, proximity and comparisons.

use std::collections::BTreeSet;

use outlet_map_analytics_models::{
    ComparativeMetric, CompetitorAnalysis, NearestCompetitor, OperatorMean, OperatorStats,
};
use outlet_map_config::CompetitorConfig;
use outlet_map_location_models::{Column, Coordinates, LocationRecord, LocationTable, OperatorLabel};
use outlet_map_source::operator::operator_of;
use outlet_map_spatial::nearest;

use crate::features::mean;

/// Columns compared across operators when present.
pub const COMPARED_COLUMNS: [Column; 3] = [Column::Rating, Column::ReviewsCount, Column::PhotosCount];

#[must_use]
pub fn analyze_competitors(table: &LocationTable, config: &CompetitorConfig) -> CompetitorAnalysis {
    log::info!("Analyzing competitors across {} locations", table.len());

    let mut analysis = CompetitorAnalysis {
        operators: operator_stats(table),
        proximity: proximity(table),
        comparisons: comparisons(table),
        recommendations: Vec::new(),
    };
    analysis.recommendations = recommendations(&analysis, config);
    analysis
}

/// Statistics for every operator with at least one location, in
/// classification order.
#[must_use]
pub fn operator_stats(table: &LocationTable) -> Vec<OperatorStats> {
    let total = table.len();

    OperatorLabel::all()
        .iter()
        .filter_map(|&operator| {
            let rows: Vec<&LocationRecord> = table
                .records
                .iter()
                .filter(|r| operator_of(r) == operator)
                .collect();
            if rows.is_empty() {
                return None;
            }

            let cities: BTreeSet<&str> = rows.iter().map(|r| r.city.as_str()).collect();
            #[allow(clippy::cast_precision_loss)]
            let share = rows.len() as f64 / total as f64;

            Some(OperatorStats {
                operator,
                locations: rows.len(),
                share,
                mean_rating: mean(rows.iter().filter_map(|r| r.rating)),
                mean_reviews: mean(rows.iter().filter_map(|r| r.reviews_count.map(f64::from))),
                cities: cities.len(),
            })
        })
        .collect()
}

/// Nearest competitor of every own-brand location with coordinates.
#[must_use]
pub fn proximity(table: &LocationTable) -> Vec<NearestCompetitor> {
    let competitors: Vec<(&LocationRecord, Coordinates)> = table
        .records
        .iter()
        .filter(|r| operator_of(r).is_competitor())
        .filter_map(|r| r.coordinates.map(|c| (r, c)))
        .collect();
    let points: Vec<Coordinates> = competitors.iter().map(|(_, c)| *c).collect();

    table
        .records
        .iter()
        .filter(|r| operator_of(r).is_own_brand())
        .filter_map(|own| {
            let (index, distance_km) = nearest(own.coordinates?, &points)?;
            let (competitor, _) = competitors[index];
            Some(NearestCompetitor {
                name: own.name.clone(),
                address: own.address.clone(),
                city: own.city.clone(),
                competitor: operator_of(competitor),
                competitor_name: competitor.name.clone(),
                distance_km,
            })
        })
        .collect()
}

fn comparisons(table: &LocationTable) -> Vec<ComparativeMetric> {
    COMPARED_COLUMNS
        .iter()
        .filter(|c| table.has_column(**c))
        .map(|&column| ComparativeMetric {
            metric: column.to_string(),
            means: OperatorLabel::all()
                .iter()
                .filter_map(|&operator| {
                    mean(
                        table
                            .records
                            .iter()
                            .filter(|r| operator_of(r) == operator)
                            .filter_map(|r| r.numeric(column)),
                    )
                    .map(|mean| OperatorMean { operator, mean })
                })
                .collect(),
        })
        .collect()
}

fn recommendations(analysis: &CompetitorAnalysis, config: &CompetitorConfig) -> Vec<String> {
    let mut out = Vec::new();

    if let Some(own) = analysis
        .operators
        .iter()
        .find(|s| s.operator.is_own_brand())
    {
        if own.share < config.low_share {
            out.push(format!(
                "Own-brand market share is low ({:.0}%). Aggressive expansion is needed",
                own.share * 100.0
            ));
        } else if own.share > config.high_share {
            out.push(format!(
                "Own-brand market share is high ({:.0}%). Focus on retaining current positions",
                own.share * 100.0
            ));
        }
    }

    let close = analysis
        .proximity
        .iter()
        .filter(|p| p.distance_km < config.close_km)
        .count();
    if close > 0 {
        out.push(format!(
            "{close} own-brand locations sit right next to a competitor. Review traffic cannibalization there"
        ));
    }

    out
}

#[cfg(test)]
mod tests {
    use outlet_map_config::AnalysisConfig;

    use super::*;
    use crate::fixtures::{record, table};

    fn rated(name: &str, rating: f64, lat: f64) -> LocationRecord {
        LocationRecord {
            rating: Some(rating),
            reviews_count: Some(10),
            ..record(name, "Москва", lat, 37.6)
        }
    }

    #[test]
    fn stats_cover_present_operators() {
        let t = table(vec![
            rated("Tele2", 4.0, 55.70),
            rated("Tele2", 5.0, 55.71),
            rated("МТС", 3.0, 55.72),
            rated("Связной", 4.5, 55.73),
        ]);
        let stats = operator_stats(&t);

        assert_eq!(stats.len(), 3);
        assert_eq!(stats[0].operator, OperatorLabel::OwnBrand);
        assert_eq!(stats[0].locations, 2);
        assert!((stats[0].share - 0.5).abs() < 1e-12);
        assert_eq!(stats[0].mean_rating, Some(4.5));
        assert_eq!(stats[0].cities, 1);
        assert_eq!(stats[2].operator, OperatorLabel::Other);
    }

    #[test]
    fn nearest_competitor_ignores_other() {
        let t = table(vec![
            record("Tele2", "Москва", 55.7500, 37.6000),
            record("Связной", "Москва", 55.7501, 37.6000),
            record("Билайн", "Москва", 55.7600, 37.6000),
            record("МТС", "Москва", 55.8000, 37.6000),
        ]);
        let nearest = proximity(&t);

        assert_eq!(nearest.len(), 1);
        assert_eq!(nearest[0].competitor, OperatorLabel::Beeline);
        assert!((nearest[0].distance_km - 1.11).abs() < 0.05);
    }

    #[test]
    fn no_competitors_means_no_proximity() {
        let t = table(vec![record("Tele2", "Москва", 55.75, 37.6)]);
        assert!(proximity(&t).is_empty());
    }

    #[test]
    fn low_share_and_close_competitor_recommendations() {
        let mut records = vec![
            record("Tele2", "Москва", 55.75000, 37.6),
            record("МТС", "Москва", 55.75050, 37.6),
        ];
        records.extend((0..8_u32).map(|i| record("Билайн", "Москва", 56.0 + f64::from(i), 37.6)));
        let config = AnalysisConfig::default().competitors;
        let analysis = analyze_competitors(&table(records), &config);

        assert!(analysis.recommendations.iter().any(|r| r.contains("low (10%)")));
        assert!(
            analysis
                .recommendations
                .iter()
                .any(|r| r.starts_with("1 own-brand locations"))
        );
    }

    #[test]
    fn comparisons_include_present_metrics() {
        let t = table(vec![rated("Tele2", 4.0, 55.7), rated("МТС", 2.0, 55.8)]);
        let comparisons = comparisons(&t);
        assert_eq!(comparisons.len(), 3);
        assert_eq!(comparisons[0].metric, "rating");
        assert_eq!(comparisons[0].means.len(), 2);
        // Photos are absent for every row.
        assert!(comparisons[2].means.is_empty());
    }
}
