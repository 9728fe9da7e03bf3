//! Plain-text report and executive summary.

use std::fmt::Write as _;

use outlet_map_analytics_models::{AnalysisResult, Outcome, Sufficiency};

/// Recommendations shown in the executive summary.
pub const SUMMARY_RECOMMENDATIONS: usize = 5;

const RULE: &str = "==================================================";

/// Full text report. Sections always appear in the order coverage,
/// efficiency, recommendations.
#[must_use]
pub fn text_report(result: &AnalysisResult) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "LOCATION NETWORK ANALYSIS REPORT");
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(
        out,
        "Generated: {}",
        result.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    if let Some(city) = &result.city {
        let _ = writeln!(out, "City: {city}");
    }
    let _ = writeln!(
        out,
        "Records analyzed: {} ({} own-brand)",
        result.total_records, result.own_brand_records
    );
    out.push('\n');

    coverage_section(&mut out, result);
    efficiency_section(&mut out, result);

    let _ = writeln!(out, "RECOMMENDATIONS");
    let _ = writeln!(out, "{RULE}");
    if result.recommendations.is_empty() {
        let _ = writeln!(out, "No recommendations.");
    }
    for (i, recommendation) in result.recommendations.iter().enumerate() {
        let _ = writeln!(out, "{}. {recommendation}", i + 1);
    }

    out
}

fn coverage_section(out: &mut String, result: &AnalysisResult) {
    let coverage = &result.coverage;
    let _ = writeln!(out, "COVERAGE");
    let _ = writeln!(out, "{RULE}");

    if coverage.is_empty() {
        let _ = writeln!(out, "No own-brand locations in the input.\n");
        return;
    }

    let _ = writeln!(out, "Total locations: {}", coverage.total_locations);
    let _ = writeln!(out, "Cities covered: {}", coverage.cities);
    let _ = writeln!(
        out,
        "Average locations per city: {:.1}",
        coverage.avg_locations_per_city
    );
    for city in &coverage.density_by_city {
        let _ = writeln!(
            out,
            "  {}: {} locations, mean distance {:.2} km, density {}",
            city.city, city.locations, city.mean_distance_km, city.density
        );
    }
    if let Some(demand) = &coverage.demand_gaps {
        let _ = writeln!(
            out,
            "Demand clusters without own-brand presence: {} of {}",
            demand.gap_clusters, demand.clusters_found
        );
    }
    out.push('\n');
}

fn efficiency_section(out: &mut String, result: &AnalysisResult) {
    let _ = writeln!(out, "EFFICIENCY");
    let _ = writeln!(out, "{RULE}");

    let efficiency = match &result.efficiency {
        Outcome::Completed(efficiency) => efficiency,
        skipped => {
            let reason = skipped.skip_reason().unwrap_or_default();
            let _ = writeln!(out, "No efficiency scores: {reason}.\n");
            return;
        }
    };

    let report = &efficiency.report;
    let _ = writeln!(
        out,
        "Model: {}{}",
        report.selected,
        if efficiency.from_cache { " (cached)" } else { "" }
    );
    if let Some(r2) = report.best_r2() {
        let _ = writeln!(out, "Held-out R²: {r2:.3}");
    }
    let _ = writeln!(out, "Mean predicted score: {:.2}", efficiency.mean_predicted);
    for count in &efficiency.bucket_counts {
        let _ = writeln!(out, "  {}: {}", count.bucket, count.count);
    }

    let _ = writeln!(out, "Top locations:");
    for location in efficiency.locations.iter().take(5) {
        let _ = writeln!(
            out,
            "  {:.2}  {} ({})",
            location.predicted, location.name, location.address
        );
    }
    out.push('\n');
}

/// Key totals and the first [`SUMMARY_RECOMMENDATIONS`] recommendations.
#[must_use]
pub fn executive_summary(result: &AnalysisResult) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "EXECUTIVE SUMMARY");
    let _ = writeln!(out, "Own-brand locations: {}", result.coverage.total_locations);
    let _ = writeln!(out, "Cities covered: {}", result.coverage.cities);

    let insufficient = result
        .gaps
        .population_gaps
        .iter()
        .filter(|g| g.status == Sufficiency::Insufficient)
        .count();
    let _ = writeln!(out, "Under-served cities: {insufficient}");
    let _ = writeln!(
        out,
        "Competitive gaps: {}",
        result.gaps.competitive_gaps.gap_areas.len()
    );
    if let Some(efficiency) = result.efficiency.completed() {
        let _ = writeln!(
            out,
            "Mean efficiency score: {:.2}",
            efficiency.mean_predicted
        );
    }

    if !result.recommendations.is_empty() {
        let _ = writeln!(out, "Top recommendations:");
        for (i, recommendation) in result
            .recommendations
            .iter()
            .take(SUMMARY_RECOMMENDATIONS)
            .enumerate()
        {
            let _ = writeln!(out, "{}. {recommendation}", i + 1);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::sample;

    #[test]
    fn sections_are_in_fixed_order() {
        let report = text_report(&sample());
        let coverage = report.find("COVERAGE").unwrap();
        let efficiency = report.find("EFFICIENCY").unwrap();
        let recommendations = report.find("RECOMMENDATIONS").unwrap();
        assert!(coverage < efficiency && efficiency < recommendations);
        assert!(report.contains("Москва: 2 locations, mean distance 1.30 km, density High"));
        assert!(report.contains("7. Recommendation 7"));
    }

    #[test]
    fn skipped_efficiency_is_stated() {
        let mut result = sample();
        result.efficiency = Outcome::InsufficientData {
            rows: 4,
            required: 10,
        };
        let report = text_report(&result);
        assert!(report.contains("No efficiency scores: insufficient data: 4 rows"));
    }

    #[test]
    fn summary_keeps_top_five() {
        let summary = executive_summary(&sample());
        assert!(summary.contains("5. Recommendation 5"));
        assert!(!summary.contains("Recommendation 6"));
        assert!(summary.contains("Own-brand locations: 2"));
    }
}
