//! Network growth and geographic concentration of own-brand locations.
//!
//! The opening history needs `established_year`; without it only the
//! city distribution is reported.

use std::collections::BTreeMap;

use outlet_map_analytics_models::{CityCount, OpeningHistory, TrendAnalysis, YearCount};
use outlet_map_location_models::{Column, LocationRecord, LocationTable};
use outlet_map_source::operator::own_brand_rows;

use crate::features::mean;

/// Years looked back over for the next-year forecast.
pub const FORECAST_WINDOW_YEARS: i32 = 3;

#[must_use]
pub fn analyze_trends(table: &LocationTable, current_year: i32) -> TrendAnalysis {
    let own = own_brand_rows(table);
    log::info!("Analyzing trends of {} own-brand locations", own.len());

    let history = if own.has_column(Column::EstablishedYear) {
        let years: Vec<i32> = own.records.iter().filter_map(|r| r.established_year).collect();
        opening_history(&years, current_year)
    } else {
        log::debug!("No establishment years, skipping opening history");
        None
    };

    let mut analysis = TrendAnalysis {
        history,
        city_distribution: city_distribution(&own),
        recommendations: Vec::new(),
    };
    analysis.recommendations = recommendations(&analysis);
    analysis
}

/// Yearly openings with growth rates, a next-year forecast and the mean
/// age. `None` when no year is known.
#[must_use]
pub fn opening_history(years: &[i32], current_year: i32) -> Option<OpeningHistory> {
    let mut counts: BTreeMap<i32, usize> = BTreeMap::new();
    for year in years {
        *counts.entry(*year).or_default() += 1;
    }
    let (&oldest_year, _) = counts.first_key_value()?;
    let (&newest_year, _) = counts.last_key_value()?;

    let mut yearly = Vec::with_capacity(counts.len());
    let mut previous: Option<usize> = None;
    for (&year, &openings) in &counts {
        #[allow(clippy::cast_precision_loss)]
        let growth_pct =
            previous.map(|p| (openings as f64 - p as f64) / p as f64 * 100.0);
        yearly.push(YearCount {
            year,
            openings,
            growth_pct,
        });
        previous = Some(openings);
    }

    #[allow(clippy::cast_precision_loss)]
    let forecast_next_year = mean(
        counts
            .range(current_year - FORECAST_WINDOW_YEARS..)
            .map(|(_, &n)| n as f64),
    );

    Some(OpeningHistory {
        yearly,
        forecast_next_year,
        mean_age_years: mean(years.iter().map(|y| f64::from(current_year - y))).unwrap_or(0.0),
        oldest_year,
        newest_year,
    })
}

/// Locations per city, most first, ties by name.
#[must_use]
pub fn city_distribution(table: &LocationTable) -> Vec<CityCount> {
    city_counts(&table.records)
}

#[must_use]
pub fn city_counts<'a>(records: impl IntoIterator<Item = &'a LocationRecord>) -> Vec<CityCount> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for record in records {
        *counts.entry(record.city.as_str()).or_default() += 1;
    }

    let mut out: Vec<CityCount> = counts
        .into_iter()
        .map(|(city, count)| CityCount {
            city: city.to_string(),
            count,
        })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.city.cmp(&b.city)));
    out
}

fn recommendations(analysis: &TrendAnalysis) -> Vec<String> {
    let mut out = Vec::new();

    let last_growth = analysis
        .history
        .as_ref()
        .and_then(|h| h.yearly.last())
        .and_then(|y| y.growth_pct);
    if let Some(growth) = last_growth {
        if growth < 0.0 {
            out.push("Network growth is negative. An expansion strategy is needed".to_string());
        } else if growth > 10.0 {
            out.push(
                "Network is growing fast. Make sure new locations meet quality standards"
                    .to_string(),
            );
        }
    }

    if !analysis.city_distribution.is_empty() {
        let top: Vec<&str> = analysis
            .city_distribution
            .iter()
            .take(3)
            .map(|c| c.city.as_str())
            .collect();
        out.push(format!("Locations are concentrated in: {}", top.join(", ")));
    }

    out
}
