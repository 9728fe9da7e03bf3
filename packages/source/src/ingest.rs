//! Record ingestion.
//!
//! Reads scraper exports (CSV or JSON array) and normalizes raw records
//! into a [`LocationTable`]. Structural violations (missing required
//! column, malformed value, malformed coordinate pair) abort ingestion;
//! missing optional cells become `None`.

use std::collections::BTreeSet;
use std::path::Path;
use std::str::FromStr;

use outlet_map_location_models::{Column, LocationRecord, LocationTable, PoiCounts};
use serde_json::Value;

use crate::operator::classify_table;
use crate::parsing::{
    parse_coordinates, parse_count, parse_f64, parse_flag, parse_rating, parse_text, parse_year,
};
use crate::progress::ProgressCallback;
use crate::{RawRecord, SourceError};

/// Loads a CSV or JSON export, normalizes every row and classifies
/// operators.
///
/// # Errors
///
/// Returns [`SourceError`] if the file cannot be read, its format is
/// unsupported, or any row violates the input contract.
pub fn load_table(path: &Path, progress: &dyn ProgressCallback) -> Result<LocationTable, SourceError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let (raw, columns) = match extension.as_deref() {
        Some("csv") => {
            let (raw, headers) = read_csv_records(path)?;
            (raw, columns_from_keys(headers.iter().map(String::as_str)))
        }
        Some("json") => {
            let raw = read_json_records(path)?;
            let columns = columns_of(&raw);
            (raw, columns)
        }
        _ => {
            return Err(SourceError::UnsupportedFormat {
                path: path.to_path_buf(),
            });
        }
    };

    log::info!("Read {} raw records from {}", raw.len(), path.display());

    let mut table = normalize_records(&raw, columns, progress)?;
    classify_table(&mut table);
    Ok(table)
}

/// Reads a CSV file into raw records. Empty cells become `null`.
///
/// # Errors
///
/// Returns [`SourceError`] if the file cannot be read or parsed.
pub fn read_csv_records(path: &Path) -> Result<(Vec<RawRecord>, Vec<String>), SourceError> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().trim_start_matches('\u{feff}').to_string())
        .collect();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let record: RawRecord = headers
            .iter()
            .zip(row.iter())
            .map(|(header, cell)| {
                let value = if cell.trim().is_empty() {
                    Value::Null
                } else {
                    Value::String(cell.to_string())
                };
                (header.clone(), value)
            })
            .collect();
        records.push(record);
    }

    Ok((records, headers))
}

/// Reads a JSON array of objects into raw records.
///
/// # Errors
///
/// Returns [`SourceError`] if the file is not a JSON array of objects.
pub fn read_json_records(path: &Path) -> Result<Vec<RawRecord>, SourceError> {
    let content = std::fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&content)?;

    let Value::Array(items) = value else {
        return Err(SourceError::InvalidStructure {
            path: path.to_path_buf(),
            message: "expected a top-level array of records".to_string(),
        });
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Object(map) => Ok(map),
            other => Err(SourceError::InvalidStructure {
                path: path.to_path_buf(),
                message: format!("element {} is not an object: {other}", i + 1),
            }),
        })
        .collect()
}

/// Known columns among a set of keys. Unknown keys are ignored.
#[must_use]
pub fn columns_from_keys<'a>(keys: impl IntoIterator<Item = &'a str>) -> BTreeSet<Column> {
    keys.into_iter()
        .filter_map(|key| Column::from_str(key).ok())
        .collect()
}

/// Union of the known columns across all records.
#[must_use]
pub fn columns_of(raw: &[RawRecord]) -> BTreeSet<Column> {
    columns_from_keys(raw.iter().flat_map(|r| r.keys().map(String::as_str)))
}

/// Fails if any required column is missing from `columns`.
///
/// # Errors
///
/// Returns [`SourceError::MissingColumn`] naming the first missing column.
pub fn validate_columns(columns: &BTreeSet<Column>) -> Result<(), SourceError> {
    match Column::REQUIRED.iter().find(|c| !columns.contains(*c)) {
        Some(missing) => Err(SourceError::MissingColumn {
            column: missing.to_string(),
        }),
        None => Ok(()),
    }
}

/// Normalizes raw records into a table declaring `columns`.
///
/// An empty input is valid and yields an empty table.
///
/// # Errors
///
/// Returns [`SourceError`] for the first row that violates the input
/// contract. No partial table is returned.
pub fn normalize_records(
    raw: &[RawRecord],
    columns: BTreeSet<Column>,
    progress: &dyn ProgressCallback,
) -> Result<LocationTable, SourceError> {
    if !raw.is_empty() {
        validate_columns(&columns)?;
    }

    progress.set_total(raw.len() as u64);

    let mut records = Vec::with_capacity(raw.len());
    for (i, row) in raw.iter().enumerate() {
        records.push(normalize_row(i + 1, row)?);
        progress.inc(1);
    }

    progress.finish(format!("Normalized {} records", records.len()));
    log::debug!(
        "Normalized {} records with {} known columns",
        records.len(),
        columns.len()
    );

    Ok(LocationTable::new(records, columns))
}

/// Normalizes one raw record. `row` is 1-based and only used in errors.
///
/// # Errors
///
/// Returns [`SourceError`] if a required column is absent or any present
/// cell is malformed.
pub fn normalize_row(row: usize, raw: &RawRecord) -> Result<LocationRecord, SourceError> {
    for column in Column::REQUIRED {
        if !raw.contains_key(column.as_ref()) {
            return Err(SourceError::MissingField {
                row,
                column: column.to_string(),
            });
        }
    }

    let cell = |column: Column| raw.get(column.as_ref());
    let malformed = |column: Column| {
        move |message: String| SourceError::MalformedValue {
            row,
            column: column.to_string(),
            message,
        }
    };
    let count = |column: Column| parse_count(cell(column)).map_err(malformed(column));
    let flag = |column: Column| parse_flag(cell(column)).map_err(malformed(column));

    let coordinates = parse_coordinates(cell(Column::Latitude), cell(Column::Longitude))
        .map_err(|message| SourceError::MalformedCoordinates { row, message })?;

    Ok(LocationRecord {
        name: parse_text(cell(Column::Name)),
        address: parse_text(cell(Column::Address)),
        city: parse_text(cell(Column::City)),
        coordinates,
        rating: parse_rating(cell(Column::Rating)).map_err(malformed(Column::Rating))?,
        reviews_count: count(Column::ReviewsCount)?,
        photos_count: count(Column::PhotosCount)?,
        poi: PoiCounts {
            shopping_centers: count(Column::NearbyShoppingCentersCount)?,
            cafes: count(Column::NearbyCafesCount)?,
            restaurants: count(Column::NearbyRestaurantsCount)?,
            banks: count(Column::NearbyBanksCount)?,
            metro_stations: count(Column::NearbyMetroCount)?,
            transit_stops: count(Column::PublicTransportStopsCount)?,
            anchor_tenants: count(Column::AnchorTenantsCount)?,
        },
        walkability_score: parse_f64(cell(Column::WalkabilityScore))
            .map_err(malformed(Column::WalkabilityScore))?,
        is_modern_facade: flag(Column::IsModernFacade)?,
        has_parking: flag(Column::HasParking)?,
        has_delivery: flag(Column::HasDelivery)?,
        established_year: parse_year(cell(Column::EstablishedYear))
            .map_err(malformed(Column::EstablishedYear))?,
        operator: None,
    })
}
