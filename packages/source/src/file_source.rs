//! File-backed [`LocationSource`] reading scraper exports from disk.
//!
//! The scraper writes one file per city and organization type named
//! `<org_type>_<city_code>.csv` (or `.json`). Exports that omit the `city`
//! column get it filled in from the requested city.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use outlet_map_location_models::{Column, OrgType};
use serde_json::Value;

use crate::ingest::{read_csv_records, read_json_records};
use crate::{LocationSource, RawRecord, SourceError};

pub struct FileSource {
    dir: PathBuf,
    city_codes: BTreeMap<String, String>,
}

impl FileSource {
    #[must_use]
    pub const fn new(dir: PathBuf, city_codes: BTreeMap<String, String>) -> Self {
        Self { dir, city_codes }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn city_code(&self, city: &str) -> String {
        self.city_codes
            .get(city)
            .cloned()
            .unwrap_or_else(|| city.to_lowercase().replace(' ', "_"))
    }

    /// Candidate export paths for a city and org type, CSV first.
    #[must_use]
    pub fn export_paths(&self, city: &str, org_type: OrgType) -> [PathBuf; 2] {
        let stem = format!("{org_type}_{}", self.city_code(city));
        [
            self.dir.join(format!("{stem}.csv")),
            self.dir.join(format!("{stem}.json")),
        ]
    }
}

impl LocationSource for FileSource {
    fn id(&self) -> &str {
        "files"
    }

    fn fetch_raw_records(
        &self,
        city: &str,
        org_type: OrgType,
    ) -> Result<Vec<RawRecord>, SourceError> {
        let [csv_path, json_path] = self.export_paths(city, org_type);

        let mut records = if csv_path.exists() {
            read_csv_records(&csv_path)?.0
        } else if json_path.exists() {
            read_json_records(&json_path)?
        } else {
            log::warn!(
                "No export for {city} / {org_type} in {}",
                self.dir.display()
            );
            return Ok(Vec::new());
        };

        let city_column = Column::City;
        let city_key = city_column.as_ref();
        for record in &mut records {
            let missing = record.get(city_key).is_none_or(Value::is_null);
            if missing {
                record.insert(city_key.to_string(), Value::String(city.to_string()));
            }
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes() -> BTreeMap<String, String> {
        [("Москва".to_string(), "msk".to_string())].into()
    }

    #[test]
    fn builds_export_paths_from_city_code() {
        let source = FileSource::new(PathBuf::from("data/raw"), codes());
        let [csv, json] = source.export_paths("Москва", OrgType::ShoppingCenter);
        assert_eq!(csv, PathBuf::from("data/raw/shopping_center_msk.csv"));
        assert_eq!(json, PathBuf::from("data/raw/shopping_center_msk.json"));
    }

    #[test]
    fn missing_export_yields_no_records() {
        let dir = std::env::temp_dir().join("outlet_map_file_source_missing_test");
        let _ = std::fs::remove_dir_all(&dir);
        let source = FileSource::new(dir, codes());
        let records = source.fetch_raw_records("Москва", OrgType::Bank).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn fills_in_missing_city() {
        let dir = std::env::temp_dir().join("outlet_map_file_source_city_test");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("tele2_msk.csv"),
            "name,address,latitude,longitude\nTele2,Арбат 1,55.75,37.59\n",
        )
        .unwrap();

        let source = FileSource::new(dir.clone(), codes());
        let records = source.fetch_raw_records("Москва", OrgType::Tele2).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["city"], Value::String("Москва".to_string()));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
