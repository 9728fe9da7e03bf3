#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Location data sources and ingestion.
//!
//! The map-service scraper is an external collaborator: it produces raw,
//! loosely typed records. A [`LocationSource`] hands those records over,
//! [`ingest`] normalizes them into a [`LocationTable`], [`combine`] merges
//! and deduplicates batches, and [`operator`] tags each record with its
//! operator network.
//!
//! [`LocationTable`]: outlet_map_location_models::LocationTable

pub mod combine;
pub mod file_source;
pub mod ingest;
pub mod operator;
pub mod parsing;
pub mod progress;

use std::path::PathBuf;

use outlet_map_location_models::OrgType;

/// One record as exported by the scraper: column name to JSON value.
pub type RawRecord = serde_json::Map<String, serde_json::Value>;

/// Errors that can occur during data source operations.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// I/O error (file read/write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reading or writing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// A required column is absent from the input header.
    #[error("Missing required column '{column}'")]
    MissingColumn { column: String },

    /// A row does not carry a required column at all.
    #[error("Row {row} is missing required column '{column}'")]
    MissingField { row: usize, column: String },

    /// A cell is present but cannot be interpreted.
    #[error("Malformed value in row {row}, column '{column}': {message}")]
    MalformedValue {
        row: usize,
        column: String,
        message: String,
    },

    /// The latitude/longitude pair of a row is inconsistent or invalid.
    #[error("Malformed coordinates in row {row}: {message}")]
    MalformedCoordinates { row: usize, message: String },

    /// The file structure is not a table of records.
    #[error("Invalid structure in {path}: {message}")]
    InvalidStructure { path: PathBuf, message: String },

    /// The file extension is not one of the supported formats.
    #[error("Unsupported input format: {path}")]
    UnsupportedFormat { path: PathBuf },
}

/// Producer of raw storefront records for one city and organization type.
///
/// The scraper itself lives outside this workspace; implementations of
/// this trait only hand over what it exported.
pub trait LocationSource {
    /// Returns a unique identifier for this source (e.g., `"files"`).
    fn id(&self) -> &str;

    /// Returns every raw record available for `city` and `org_type`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the records exist but cannot be read.
    fn fetch_raw_records(
        &self,
        city: &str,
        org_type: OrgType,
    ) -> Result<Vec<RawRecord>, SourceError>;
}
