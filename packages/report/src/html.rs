//! Static HTML dashboard.

use std::fmt::Write as _;

use outlet_map_analytics_models::{AnalysisResult, Outcome};
use outlet_map_config::MapConfig;

use crate::{chart, escape, map};

/// Self-contained dashboard page: headline numbers, embedded charts and
/// map, recommendations and the efficiency ranking.
#[must_use]
pub fn dashboard(result: &AnalysisResult, map_config: &MapConfig) -> String {
    let mut cards = String::new();
    card(&mut cards, "Records", &result.total_records.to_string());
    card(
        &mut cards,
        "Own-brand locations",
        &result.coverage.total_locations.to_string(),
    );
    card(&mut cards, "Cities", &result.coverage.cities.to_string());
    card(
        &mut cards,
        "Competitive gaps",
        &result.gaps.competitive_gaps.gap_areas.len().to_string(),
    );
    if let Some(efficiency) = result.efficiency.completed() {
        card(
            &mut cards,
            "Mean efficiency",
            &format!("{:.2}", efficiency.mean_predicted),
        );
    }

    let mut charts = String::new();
    charts.push_str(&chart::operator_share_svg(result, map_config));
    if let Some(histogram) = chart::efficiency_histogram_svg(result) {
        charts.push_str(&histogram);
    }

    let mut recommendations = String::new();
    for recommendation in &result.recommendations {
        let _ = write!(recommendations, "<li>{}</li>", escape(recommendation));
    }

    let title = result.city.as_ref().map_or_else(
        || "Location network dashboard".to_string(),
        |city| format!("Location network dashboard: {}", escape(city)),
    );

    format!(
        r##"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
body {{ font-family: sans-serif; margin: 24px; color: #111827; }}
.cards {{ display: flex; gap: 16px; flex-wrap: wrap; }}
.card {{ border: 1px solid #e5e7eb; border-radius: 8px; padding: 12px 20px; }}
.card .value {{ font-size: 28px; font-weight: bold; }}
table {{ border-collapse: collapse; }}
td, th {{ border: 1px solid #e5e7eb; padding: 4px 8px; text-align: left; }}
</style>
</head>
<body>
<h1>{title}</h1>
<p>Generated {generated}</p>
<div class="cards">{cards}</div>
<h2>Charts</h2>
<div>{charts}</div>
<h2>Map</h2>
<div>{svg_map}</div>
<h2>Recommendations</h2>
<ol>{recommendations}</ol>
<h2>Efficiency</h2>
{efficiency}
</body>
</html>
"##,
        generated = result.generated_at.format("%Y-%m-%d %H:%M UTC"),
        svg_map = map::svg_map(&result.locations, map_config),
        efficiency = efficiency_table(result),
    )
}

fn card(out: &mut String, label: &str, value: &str) {
    let _ = write!(
        out,
        r#"<div class="card"><div class="label">{}</div><div class="value">{}</div></div>"#,
        escape(label),
        escape(value),
    );
}

fn efficiency_table(result: &AnalysisResult) -> String {
    let efficiency = match &result.efficiency {
        Outcome::Completed(efficiency) => efficiency,
        skipped => {
            return format!(
                "<p>No efficiency scores: {}.</p>",
                escape(&skipped.skip_reason().unwrap_or_default())
            );
        }
    };

    let mut rows = String::new();
    for location in &efficiency.locations {
        let _ = write!(
            rows,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{:.2}</td><td>{}</td></tr>",
            escape(&location.name),
            escape(&location.address),
            escape(&location.city),
            location.predicted,
            location.bucket,
        );
    }

    format!(
        "<p>Model: {}</p><table><tr><th>Name</th><th>Address</th><th>City</th><th>Score</th><th>Level</th></tr>{rows}</table>",
        efficiency.report.selected
    )
}
