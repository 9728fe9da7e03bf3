//! Merges the recommendations of every stage into one list.

use std::collections::HashSet;

use outlet_map_analytics_models::AnalysisResult;

/// Stage recommendations in pipeline order, duplicates removed. Skipped
/// clustering or efficiency stages contribute a note saying why.
#[must_use]
pub fn combine(result: &AnalysisResult) -> Vec<String> {
    let mut all: Vec<String> = Vec::new();

    all.extend(result.coverage.recommendations.iter().cloned());
    all.extend(result.gaps.recommendations.iter().cloned());
    all.extend(result.competitors.recommendations.iter().cloned());
    all.extend(result.trends.recommendations.iter().cloned());

    match result.clustering.completed() {
        Some(clustering) => all.extend(clustering.recommendations.iter().cloned()),
        None => all.extend(
            result
                .clustering
                .skip_reason()
                .map(|reason| format!("Clustering skipped: {reason}")),
        ),
    }
    match result.efficiency.completed() {
        Some(efficiency) => all.extend(efficiency.recommendations.iter().cloned()),
        None => all.extend(
            result
                .efficiency
                .skip_reason()
                .map(|reason| format!("Efficiency model skipped: {reason}")),
        ),
    }

    dedupe(all)
}

/// Keeps the first occurrence of each recommendation.
#[must_use]
pub fn dedupe(items: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use outlet_map_analytics_models::{
        CompetitorAnalysis, CoverageMetrics, GapAnalysis, Outcome, TrendAnalysis,
    };

    use super::*;

    fn result() -> AnalysisResult {
        AnalysisResult {
            generated_at: Utc::now(),
            city: None,
            total_records: 0,
            own_brand_records: 0,
            coverage: CoverageMetrics {
                recommendations: vec!["a".to_string(), "b".to_string()],
                ..CoverageMetrics::default()
            },
            gaps: GapAnalysis {
                recommendations: vec!["b".to_string(), "c".to_string()],
                ..GapAnalysis::default()
            },
            competitors: CompetitorAnalysis::default(),
            trends: TrendAnalysis {
                recommendations: vec!["a".to_string()],
                ..TrendAnalysis::default()
            },
            clustering: Outcome::InsufficientData {
                rows: 3,
                required: 10,
            },
            efficiency: Outcome::NoFeatures,
            locations: Vec::new(),
            recommendations: Vec::new(),
        }
    }

    #[test]
    fn keeps_pipeline_order_without_duplicates() {
        let combined = combine(&result());
        assert_eq!(&combined[..3], ["a", "b", "c"]);
        assert_eq!(combined.len(), 5);
        assert!(combined[3].starts_with("Clustering skipped"));
        assert!(combined[4].starts_with("Efficiency model skipped"));
    }

    #[test]
    fn dedupe_keeps_first() {
        let items = ["x", "y", "x", "z", "y"].map(String::from);
        assert_eq!(dedupe(items), vec!["x", "y", "z"]);
    }
}
