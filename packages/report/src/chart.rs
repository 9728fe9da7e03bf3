//! SVG bar charts.

use std::fmt::Write as _;

use outlet_map_analytics_models::AnalysisResult;
use outlet_map_config::MapConfig;

use crate::escape;

const WIDTH: f64 = 640.0;
const HEIGHT: f64 = 360.0;
const MARGIN: f64 = 48.0;

/// One bar: label, value and fill color.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub label: String,
    pub value: f64,
    pub color: String,
}

/// Vertical bar chart scaled to the largest value.
#[must_use]
pub fn bar_chart_svg(title: &str, bars: &[Bar], value_suffix: &str) -> String {
    let mut body = String::new();
    let max = bars.iter().map(|b| b.value).fold(0.0_f64, f64::max);
    let plot_height = 2.0f64.mul_add(-MARGIN, HEIGHT);
    #[allow(clippy::cast_precision_loss)]
    let slot = if bars.is_empty() {
        0.0
    } else {
        2.0f64.mul_add(-MARGIN, WIDTH) / bars.len() as f64
    };

    for (i, bar) in bars.iter().enumerate() {
        let height = if max > 0.0 {
            bar.value / max * plot_height
        } else {
            0.0
        };
        #[allow(clippy::cast_precision_loss)]
        let x = (i as f64).mul_add(slot, MARGIN) + slot * 0.1;
        let y = HEIGHT - MARGIN - height;
        let _ = write!(
            body,
            r##"<rect x="{x:.1}" y="{y:.1}" width="{:.1}" height="{height:.1}" fill="{}" opacity="0.85"/>"##,
            slot * 0.8,
            escape(&bar.color),
        );
        let _ = write!(
            body,
            r##"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="12">{:.1}{}</text>"##,
            x + slot * 0.4,
            y - 4.0,
            bar.value,
            escape(value_suffix),
        );
        let _ = write!(
            body,
            r##"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="12">{}</text>"##,
            x + slot * 0.4,
            HEIGHT - MARGIN + 16.0,
            escape(&bar.label),
        );
    }

    format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}" viewBox="0 0 {WIDTH} {HEIGHT}" style="background:white">
<text x="{:.1}" y="24" text-anchor="middle" font-size="16" font-weight="bold">{}</text>
<line x1="{MARGIN}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="#9ca3af"/>
{body}
</svg>
"##,
        WIDTH / 2.0,
        escape(title),
        HEIGHT - MARGIN,
        WIDTH - MARGIN,
        HEIGHT - MARGIN,
    )
}

/// Market share per operator, in percent.
#[must_use]
pub fn operator_share_svg(result: &AnalysisResult, map: &MapConfig) -> String {
    let bars: Vec<Bar> = result
        .competitors
        .operators
        .iter()
        .map(|stats| {
            let label = stats.operator.to_string();
            Bar {
                color: map.color_for(&label).to_string(),
                label,
                value: stats.share * 100.0,
            }
        })
        .collect();
    bar_chart_svg("Market share by operator", &bars, "%")
}

/// Locations per efficiency bucket. `None` when no scores exist.
#[must_use]
pub fn efficiency_histogram_svg(result: &AnalysisResult) -> Option<String> {
    let efficiency = result.efficiency.completed()?;
    #[allow(clippy::cast_precision_loss)]
    let bars: Vec<Bar> = efficiency
        .bucket_counts
        .iter()
        .map(|count| Bar {
            label: count.bucket.to_string(),
            value: count.count as f64,
            color: "#3b82f6".to_string(),
        })
        .collect();
    Some(bar_chart_svg("Locations by efficiency", &bars, ""))
}

#[cfg(test)]
mod tests {
    use outlet_map_analytics_models::Outcome;
    use outlet_map_config::AnalysisConfig;

    use super::*;
    use crate::fixtures::sample;

    #[test]
    fn share_chart_uses_operator_colors() {
        let svg = operator_share_svg(&sample(), &AnalysisConfig::default().map);
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains(r##"fill="#00A2FF""##));
        assert!(svg.contains(r##"fill="#E30613""##));
        assert!(svg.contains("66.7%"));
        assert_eq!(svg.matches("<rect").count(), 2);
    }

    #[test]
    fn histogram_needs_scores() {
        let mut result = sample();
        let svg = efficiency_histogram_svg(&result).unwrap();
        assert_eq!(svg.matches("<rect").count(), 4);
        assert!(svg.contains("VeryHigh"));

        result.efficiency = Outcome::NoFeatures;
        assert_eq!(efficiency_histogram_svg(&result), None);
    }

    #[test]
    fn empty_chart_is_valid_markup() {
        let svg = bar_chart_svg("Empty", &[], "");
        assert!(svg.trim_end().ends_with("</svg>"));
        assert!(!svg.contains("<rect"));
    }
}
