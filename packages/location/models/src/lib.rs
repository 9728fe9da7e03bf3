#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Retail location types shared across the outlet-map system.
//!
//! A [`LocationRecord`] is one storefront exported by the map-service
//! scraper after normalization. Records are grouped into a
//! [`LocationTable`], which also remembers which optional columns were
//! present in the input so that downstream analyses can tell "column
//! absent" apart from "value missing".

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Operator network a storefront belongs to.
///
/// Derived from the display name by the operator classifier. The set is
/// closed: anything that is not recognized is [`OperatorLabel::Other`].
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum OperatorLabel {
    /// The distribution network under analysis (Tele2).
    #[serde(rename = "Tele2")]
    #[strum(serialize = "Tele2")]
    OwnBrand,
    #[serde(rename = "MTS")]
    #[strum(serialize = "MTS")]
    Mts,
    #[serde(rename = "Beeline")]
    #[strum(serialize = "Beeline")]
    Beeline,
    #[serde(rename = "MegaFon")]
    #[strum(serialize = "MegaFon")]
    Megafon,
    #[serde(rename = "Other")]
    #[strum(serialize = "Other")]
    Other,
}

impl OperatorLabel {
    /// Returns all operator labels in classification order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::OwnBrand,
            Self::Mts,
            Self::Beeline,
            Self::Megafon,
            Self::Other,
        ]
    }

    /// Competitor networks, excluding the own brand and [`Self::Other`].
    #[must_use]
    pub const fn competitors() -> &'static [Self] {
        &[Self::Mts, Self::Beeline, Self::Megafon]
    }

    #[must_use]
    pub const fn is_own_brand(self) -> bool {
        matches!(self, Self::OwnBrand)
    }

    #[must_use]
    pub const fn is_competitor(self) -> bool {
        matches!(self, Self::Mts | Self::Beeline | Self::Megafon)
    }
}

/// Kind of organization searched for on the map service.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OrgType {
    Tele2,
    Mts,
    Beeline,
    Megafon,
    Electronics,
    ShoppingCenter,
    Bank,
    Atm,
}

impl OrgType {
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Tele2,
            Self::Mts,
            Self::Beeline,
            Self::Megafon,
            Self::Electronics,
            Self::ShoppingCenter,
            Self::Bank,
            Self::Atm,
        ]
    }

    /// Organization types that are operator storefronts.
    #[must_use]
    pub const fn operators() -> &'static [Self] {
        &[Self::Tele2, Self::Mts, Self::Beeline, Self::Megafon]
    }

    /// Search phrase used on the map service, prefixed by the city name.
    #[must_use]
    pub const fn search_query(self) -> &'static str {
        match self {
            Self::Tele2 => "салон связи Tele2",
            Self::Mts => "салон связи МТС",
            Self::Beeline => "салон связи Билайн",
            Self::Megafon => "салон связи МегаФон",
            Self::Electronics => "магазин электроники",
            Self::ShoppingCenter => "торговый центр",
            Self::Bank => "банк",
            Self::Atm => "банкомат",
        }
    }
}

/// Column of the location table as it appears in scraper exports.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Column {
    Name,
    Address,
    City,
    Latitude,
    Longitude,
    Rating,
    ReviewsCount,
    PhotosCount,
    NearbyShoppingCentersCount,
    NearbyCafesCount,
    NearbyRestaurantsCount,
    NearbyBanksCount,
    NearbyMetroCount,
    PublicTransportStopsCount,
    AnchorTenantsCount,
    WalkabilityScore,
    IsModernFacade,
    HasParking,
    HasDelivery,
    EstablishedYear,
}

impl Column {
    /// Columns every input row must carry.
    pub const REQUIRED: [Self; 5] = [
        Self::Name,
        Self::Address,
        Self::City,
        Self::Latitude,
        Self::Longitude,
    ];

    /// Numeric rating/POI columns used as clustering and model features.
    pub const NUMERIC_FEATURES: [Self; 11] = [
        Self::Rating,
        Self::ReviewsCount,
        Self::PhotosCount,
        Self::NearbyShoppingCentersCount,
        Self::NearbyCafesCount,
        Self::NearbyRestaurantsCount,
        Self::NearbyBanksCount,
        Self::NearbyMetroCount,
        Self::PublicTransportStopsCount,
        Self::AnchorTenantsCount,
        Self::WalkabilityScore,
    ];

    /// Boolean amenity flags that can extend the model feature set.
    pub const FLAG_FEATURES: [Self; 3] = [Self::IsModernFacade, Self::HasParking, Self::HasDelivery];

    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Name,
            Self::Address,
            Self::City,
            Self::Latitude,
            Self::Longitude,
            Self::Rating,
            Self::ReviewsCount,
            Self::PhotosCount,
            Self::NearbyShoppingCentersCount,
            Self::NearbyCafesCount,
            Self::NearbyRestaurantsCount,
            Self::NearbyBanksCount,
            Self::NearbyMetroCount,
            Self::PublicTransportStopsCount,
            Self::AnchorTenantsCount,
            Self::WalkabilityScore,
            Self::IsModernFacade,
            Self::HasParking,
            Self::HasDelivery,
            Self::EstablishedYear,
        ]
    }

    #[must_use]
    pub const fn is_required(self) -> bool {
        matches!(
            self,
            Self::Name | Self::Address | Self::City | Self::Latitude | Self::Longitude
        )
    }

    /// Whether the column holds a non-negative count.
    #[must_use]
    pub const fn is_count(self) -> bool {
        matches!(
            self,
            Self::ReviewsCount
                | Self::PhotosCount
                | Self::NearbyShoppingCentersCount
                | Self::NearbyCafesCount
                | Self::NearbyRestaurantsCount
                | Self::NearbyBanksCount
                | Self::NearbyMetroCount
                | Self::PublicTransportStopsCount
                | Self::AnchorTenantsCount
        )
    }

    #[must_use]
    pub const fn is_flag(self) -> bool {
        matches!(
            self,
            Self::IsModernFacade | Self::HasParking | Self::HasDelivery
        )
    }
}

/// A latitude/longitude pair in degrees (WGS84).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Whether both components lie within the valid degree ranges.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Counts of points of interest around a storefront.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoiCounts {
    pub shopping_centers: Option<u32>,
    pub cafes: Option<u32>,
    pub restaurants: Option<u32>,
    pub banks: Option<u32>,
    pub metro_stations: Option<u32>,
    pub transit_stops: Option<u32>,
    pub anchor_tenants: Option<u32>,
}

/// One normalized storefront.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
    pub name: String,
    pub address: String,
    pub city: String,
    /// Either both components are present or the pair is absent.
    pub coordinates: Option<Coordinates>,
    /// Within `[0, 5]` when present.
    pub rating: Option<f64>,
    pub reviews_count: Option<u32>,
    pub photos_count: Option<u32>,
    pub poi: PoiCounts,
    pub walkability_score: Option<f64>,
    pub is_modern_facade: Option<bool>,
    pub has_parking: Option<bool>,
    pub has_delivery: Option<bool>,
    pub established_year: Option<i32>,
    /// Set by the operator classifier after ingestion.
    pub operator: Option<OperatorLabel>,
}

impl LocationRecord {
    /// Numeric value of a column for this record, if the column is numeric
    /// and the value is present. Flags map to `1.0`/`0.0`.
    #[must_use]
    pub fn numeric(&self, column: Column) -> Option<f64> {
        let count = |value: Option<u32>| value.map(f64::from);
        let flag = |value: Option<bool>| value.map(|b| if b { 1.0 } else { 0.0 });

        match column {
            Column::Name | Column::Address | Column::City => None,
            Column::Latitude => self.coordinates.map(|c| c.latitude),
            Column::Longitude => self.coordinates.map(|c| c.longitude),
            Column::Rating => self.rating,
            Column::ReviewsCount => count(self.reviews_count),
            Column::PhotosCount => count(self.photos_count),
            Column::NearbyShoppingCentersCount => count(self.poi.shopping_centers),
            Column::NearbyCafesCount => count(self.poi.cafes),
            Column::NearbyRestaurantsCount => count(self.poi.restaurants),
            Column::NearbyBanksCount => count(self.poi.banks),
            Column::NearbyMetroCount => count(self.poi.metro_stations),
            Column::PublicTransportStopsCount => count(self.poi.transit_stops),
            Column::AnchorTenantsCount => count(self.poi.anchor_tenants),
            Column::WalkabilityScore => self.walkability_score,
            Column::IsModernFacade => flag(self.is_modern_facade),
            Column::HasParking => flag(self.has_parking),
            Column::HasDelivery => flag(self.has_delivery),
            Column::EstablishedYear => self.established_year.map(f64::from),
        }
    }
}

/// A set of location records plus the columns present in their source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationTable {
    pub records: Vec<LocationRecord>,
    pub columns: BTreeSet<Column>,
}

impl LocationTable {
    #[must_use]
    pub const fn new(records: Vec<LocationRecord>, columns: BTreeSet<Column>) -> Self {
        Self { records, columns }
    }

    /// Builds a table that declares every known column as present.
    #[must_use]
    pub fn with_all_columns(records: Vec<LocationRecord>) -> Self {
        Self {
            records,
            columns: Column::all().iter().copied().collect(),
        }
    }

    #[must_use]
    pub fn has_column(&self, column: Column) -> bool {
        self.columns.contains(&column)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct city names in first-seen order.
    #[must_use]
    pub fn cities(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        self.records
            .iter()
            .filter(|r| seen.insert(r.city.as_str()))
            .map(|r| r.city.clone())
            .collect()
    }

    /// Sub-view containing only the rows of one city.
    #[must_use]
    pub fn filter_city(&self, city: &str) -> Self {
        Self {
            records: self
                .records
                .iter()
                .filter(|r| r.city == city)
                .cloned()
                .collect(),
            columns: self.columns.clone(),
        }
    }

    /// Sub-view containing the rows accepted by `predicate`.
    #[must_use]
    pub fn filter(&self, predicate: impl Fn(&LocationRecord) -> bool) -> Self {
        Self {
            records: self
                .records
                .iter()
                .filter(|r| predicate(r))
                .cloned()
                .collect(),
            columns: self.columns.clone(),
        }
    }
}
