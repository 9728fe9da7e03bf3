#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Location network analyses.
//!
//! Each stage takes a classified [`LocationTable`] and returns a typed
//! result from `outlet_map_analytics_models`. Stages never fail for lack of
//! data: sparse inputs produce empty or [`Outcome::InsufficientData`]
//! results. They do fail, naming themselves, when the input breaks its
//! data contract (for example a required column is absent).
//!
//! [`pipeline::run_pipeline`] runs every stage in order and assembles an
//! [`AnalysisResult`](outlet_map_analytics_models::AnalysisResult).
//!
//! [`LocationTable`]: outlet_map_location_models::LocationTable
//! [`Outcome::InsufficientData`]: outlet_map_analytics_models::Outcome

pub mod clustering;
pub mod competitors;
pub mod coverage;
pub mod efficiency;
pub mod features;
pub mod gaps;
pub mod pipeline;
pub mod recommendations;
pub mod trends;

use outlet_map_location_models::Column;
use outlet_map_modeling::ModelError;
use outlet_map_source::SourceError;
use strum_macros::{AsRefStr, Display};
use thiserror::Error;

/// Analysis stage, used to attribute errors and progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Stage {
    Coverage,
    Gaps,
    Competitors,
    Trends,
    Clustering,
    Efficiency,
}

impl Stage {
    /// Stages in pipeline order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Coverage,
            Self::Gaps,
            Self::Competitors,
            Self::Trends,
            Self::Clustering,
            Self::Efficiency,
        ]
    }
}

/// Errors that abort an analysis stage.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// The input table lacks a column the stage cannot do without.
    #[error("{stage} analysis failed: required column '{column}' is missing")]
    MissingColumn { stage: Stage, column: Column },

    /// A model could not be fitted.
    #[error("{stage} analysis failed: {source}")]
    Model { stage: Stage, source: ModelError },

    /// Loading the input table failed.
    #[error(transparent)]
    Source(#[from] SourceError),
}

impl AnalyticsError {
    /// Stage that failed, if the error came from one.
    #[must_use]
    pub const fn stage(&self) -> Option<Stage> {
        match self {
            Self::MissingColumn { stage, .. } | Self::Model { stage, .. } => Some(*stage),
            Self::Source(_) => None,
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use outlet_map_location_models::{Coordinates, LocationRecord, LocationTable, PoiCounts};
    use outlet_map_source::operator::classify_table;

    pub fn record(name: &str, city: &str, lat: f64, lng: f64) -> LocationRecord {
        LocationRecord {
            name: name.to_string(),
            address: format!("{name} street"),
            city: city.to_string(),
            coordinates: Some(Coordinates::new(lat, lng)),
            ..LocationRecord::default()
        }
    }

    pub fn rich(name: &str, city: &str, lat: f64, lng: f64) -> LocationRecord {
        LocationRecord {
            poi: PoiCounts {
                shopping_centers: Some(3),
                metro_stations: Some(1),
                anchor_tenants: Some(2),
                transit_stops: Some(10),
                ..PoiCounts::default()
            },
            ..record(name, city, lat, lng)
        }
    }

    pub fn table(records: Vec<LocationRecord>) -> LocationTable {
        let mut table = LocationTable::with_all_columns(records);
        classify_table(&mut table);
        table
    }

    /// Own-brand rows with varied, deterministic feature values.
    pub fn varied_own_brand(n: usize) -> Vec<LocationRecord> {
        (0..n)
            .map(|i| {
                #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
                let f = i as f64;
                #[allow(clippy::cast_possible_truncation)]
                let u = i as u32;
                LocationRecord {
                    rating: Some(1.0 + (f * 0.37) % 4.0),
                    reviews_count: Some((u * 7) % 50),
                    photos_count: Some(u % 9),
                    walkability_score: Some((f * 1.3) % 10.0),
                    poi: PoiCounts {
                        shopping_centers: Some(u % 4),
                        cafes: Some((u * 3) % 11),
                        restaurants: Some((u * 5) % 7),
                        banks: Some(u % 3),
                        metro_stations: Some(u % 2),
                        transit_stops: Some((u * 2) % 13),
                        anchor_tenants: Some(u % 5),
                    },
                    ..record(
                        &format!("Tele2 #{i}"),
                        if i % 2 == 0 { "Москва" } else { "Казань" },
                        55.0 + f * 0.01,
                        37.0 + f * 0.01,
                    )
                }
            })
            .collect()
    }
}
