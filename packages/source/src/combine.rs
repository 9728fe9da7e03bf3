//! Combining, deduplicating and persisting location tables.

use std::collections::BTreeSet;
use std::path::Path;

use outlet_map_location_models::{Column, LocationRecord, LocationTable, OrgType};

use crate::ingest::{columns_of, normalize_records};
use crate::operator::classify_table;
use crate::progress::{NullProgress, ProgressCallback};
use crate::{LocationSource, SourceError};

/// Concatenates batches, unions their column sets and drops duplicates.
#[must_use]
pub fn combine(batches: Vec<LocationTable>) -> LocationTable {
    let mut combined = LocationTable::default();
    for batch in batches {
        combined.columns.extend(batch.columns);
        combined.records.extend(batch.records);
    }

    let removed = dedupe(&mut combined);
    if removed > 0 {
        log::info!("Dropped {removed} duplicate records while combining");
    }
    combined
}

/// Removes records whose case-insensitive (name, address) pair was already
/// seen, keeping the first occurrence. Returns the number removed.
pub fn dedupe(table: &mut LocationTable) -> usize {
    let before = table.records.len();
    let mut seen = BTreeSet::new();
    table.records.retain(|r| seen.insert(dedupe_key(r)));
    before - table.records.len()
}

fn dedupe_key(record: &LocationRecord) -> (String, String) {
    (record.name.to_lowercase(), record.address.to_lowercase())
}

/// Fetches every (city, org type) batch from `source`, normalizes each one
/// and combines them into a single classified table.
///
/// # Errors
///
/// Returns [`SourceError`] if any batch cannot be fetched or normalized.
pub fn collect_table(
    source: &dyn LocationSource,
    cities: &[String],
    org_types: &[OrgType],
    progress: &dyn ProgressCallback,
) -> Result<LocationTable, SourceError> {
    progress.set_total((cities.len() * org_types.len()) as u64);

    let mut batches = Vec::new();
    for city in cities {
        for org_type in org_types {
            progress.set_message(format!("{city} / {org_type}"));
            let raw = source.fetch_raw_records(city, *org_type)?;
            log::info!(
                "[{}] {} raw records for {city} / {org_type}",
                source.id(),
                raw.len()
            );
            let columns = columns_of(&raw);
            batches.push(normalize_records(&raw, columns, &NullProgress)?);
            progress.inc(1);
        }
    }

    let mut table = combine(batches);
    classify_table(&mut table);
    progress.finish(format!("Collected {} records", table.len()));
    Ok(table)
}

/// Writes a table as CSV using the export column names. Only columns the
/// table declares are written; required columns are always written.
///
/// # Errors
///
/// Returns [`SourceError`] if the file cannot be created or written.
pub fn write_table_csv(table: &LocationTable, path: &Path) -> Result<(), SourceError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let columns: Vec<Column> = Column::all()
        .iter()
        .copied()
        .filter(|c| c.is_required() || table.has_column(*c))
        .collect();

    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(columns.iter().map(AsRef::<str>::as_ref))?;
    for record in &table.records {
        writer.write_record(columns.iter().map(|c| render_cell(record, *c)))?;
    }
    writer.flush()?;

    log::info!("Wrote {} records to {}", table.len(), path.display());
    Ok(())
}

fn render_cell(record: &LocationRecord, column: Column) -> String {
    match column {
        Column::Name => record.name.clone(),
        Column::Address => record.address.clone(),
        Column::City => record.city.clone(),
        Column::IsModernFacade | Column::HasParking | Column::HasDelivery => {
            let flag = match column {
                Column::IsModernFacade => record.is_modern_facade,
                Column::HasParking => record.has_parking,
                _ => record.has_delivery,
            };
            flag.map(|b| b.to_string()).unwrap_or_default()
        }
        other => record
            .numeric(other)
            .map(|v| v.to_string())
            .unwrap_or_default(),
    }
}
