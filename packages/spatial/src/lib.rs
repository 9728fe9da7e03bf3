#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Geodesic distance helpers for proximity analysis.
//!
//! All distances are great-circle distances on the WGS84 ellipsoid in
//! kilometers. Proximity checks compare against every candidate
//! exhaustively; inputs are city-scale so no spatial index is kept.

use geo::{Distance, Geodesic, Point};
use outlet_map_location_models::Coordinates;

/// Converts coordinates to a `geo` point (x = longitude, y = latitude).
#[must_use]
pub fn to_point(coordinates: Coordinates) -> Point<f64> {
    Point::new(coordinates.longitude, coordinates.latitude)
}

/// Geodesic distance between two coordinates in kilometers.
#[must_use]
pub fn distance_km(a: Coordinates, b: Coordinates) -> f64 {
    Geodesic.distance(to_point(a), to_point(b)) / 1000.0
}

/// Mean of all pairwise distances. `None` for fewer than two points.
#[must_use]
pub fn mean_pairwise_distance_km(points: &[Coordinates]) -> Option<f64> {
    if points.len() < 2 {
        return None;
    }

    let mut total = 0.0;
    let mut pairs = 0_u64;
    for (i, a) in points.iter().enumerate() {
        for b in &points[i + 1..] {
            total += distance_km(*a, *b);
            pairs += 1;
        }
    }

    #[allow(clippy::cast_precision_loss)]
    let mean = total / pairs as f64;
    Some(mean)
}

/// Index and distance of the candidate closest to `origin`.
#[must_use]
pub fn nearest(origin: Coordinates, candidates: &[Coordinates]) -> Option<(usize, f64)> {
    candidates
        .iter()
        .map(|c| distance_km(origin, *c))
        .enumerate()
        .min_by(|(_, a), (_, b)| a.total_cmp(b))
}

/// Whether any candidate lies strictly closer than `radius_km`.
#[must_use]
pub fn any_within_km(origin: Coordinates, candidates: &[Coordinates], radius_km: f64) -> bool {
    candidates
        .iter()
        .any(|c| distance_km(origin, *c) < radius_km)
}
