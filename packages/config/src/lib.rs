#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Analysis configuration.
//!
//! The complete default configuration lives in `defaults.toml`, which is
//! baked into the binary at compile time via [`include_str!`]. A user file
//! only needs to name the keys it changes: it is merged into the defaults
//! table by table before deserialization.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("../defaults.toml");

/// Errors that can occur while loading a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Reading the config file failed.
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The file is not valid TOML or does not match the schema.
    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Serializing the effective config failed.
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A value is syntactically valid but unusable.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Thresholds for the gap detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapConfig {
    /// Own-brand locations per 100k residents below which a city is
    /// considered underserved.
    pub min_per_100k: f64,
    /// Infrastructure rows need strictly more shopping centers than this.
    pub min_shopping_centers: u32,
    /// Infrastructure rows need strictly more metro stations than this.
    pub min_metro_stations: u32,
    /// Infrastructure rows need strictly more anchor tenants than this.
    pub min_anchor_tenants: u32,
}

/// Mean-distance boundaries for density classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DensityConfig {
    pub high_below_km: f64,
    pub low_above_km: f64,
}

/// Coordinate clustering used to find demand hot spots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandConfig {
    pub eps_degrees: f64,
    pub min_points: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitorConfig {
    pub low_share: f64,
    pub high_share: f64,
    pub close_km: f64,
}

/// Feature clustering parameters. `k` and the DBSCAN radius are fixed
/// constants, not selected adaptively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusteringConfig {
    pub k: usize,
    pub dbscan_eps: f64,
    pub dbscan_min_points: usize,
    pub min_rows: usize,
    pub seed: u64,
    pub max_elbow_k: usize,
    pub max_iterations: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EfficiencyConfig {
    pub min_rows: usize,
    pub test_fraction: f64,
    pub folds: usize,
    pub seed: u64,
    pub trees: usize,
    pub boosting_stages: usize,
    pub learning_rate: f64,
    pub forest_max_depth: usize,
    pub boosting_max_depth: usize,
    /// Extend the feature set with the boolean amenity flags.
    pub include_flags: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapConfig {
    /// Latitude, longitude used when no location has coordinates.
    pub center: [f64; 2],
    pub zoom: u8,
    /// Operator label -> CSS color.
    pub colors: BTreeMap<String, String>,
}

impl MapConfig {
    /// Color for an operator label, gray when unconfigured.
    #[must_use]
    pub fn color_for(&self, label: &str) -> &str {
        self.colors.get(label).map_or("#808080", String::as_str)
    }
}

/// Effective configuration for a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Radius within which an own-brand location covers a competitor.
    pub coverage_radius_km: f64,
    /// Radius within which an own-brand location covers an
    /// infrastructure-rich spot.
    pub infrastructure_radius_km: f64,
    pub model_cache_path: PathBuf,
    /// Only meaningful to the external scraper.
    pub headless: bool,
    pub output_dir: PathBuf,
    /// Directory holding scraper exports for the file source.
    pub data_dir: PathBuf,
    pub cities: Vec<String>,
    /// City name -> residents.
    pub population: BTreeMap<String, u64>,
    /// City name -> short code used in export file names.
    pub city_codes: BTreeMap<String, String>,
    pub gaps: GapConfig,
    pub density: DensityConfig,
    pub demand: DemandConfig,
    pub competitors: CompetitorConfig,
    pub clustering: ClusteringConfig,
    pub efficiency: EfficiencyConfig,
    pub map: MapConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        toml::from_str(DEFAULTS_TOML)
            .unwrap_or_else(|e| panic!("Failed to parse embedded defaults.toml: {e}"))
    }
}

impl AnalysisConfig {
    /// Parses a (possibly partial) TOML document on top of the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if either document is invalid TOML, the merged
    /// result does not match the schema, or validation fails.
    pub fn from_toml_str(overrides: &str) -> Result<Self, ConfigError> {
        let mut base: toml::Table = toml::from_str(DEFAULTS_TOML)?;
        let overlay: toml::Table = toml::from_str(overrides)?;
        merge_tables(&mut base, overlay);

        let config: Self = toml::Value::Table(base).try_into()?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a config file and merges it into the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is invalid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Loads `path` when given, otherwise returns the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the given file cannot be loaded.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        path.map_or_else(|| Ok(Self::default()), Self::load)
    }

    /// Renders the effective configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Population of a city, if it is in the reference table.
    #[must_use]
    pub fn population_of(&self, city: &str) -> Option<u64> {
        self.population.get(city).copied()
    }

    /// Short code for a city, falling back to the lowercased name.
    #[must_use]
    pub fn city_code(&self, city: &str) -> String {
        self.city_codes
            .get(city)
            .cloned()
            .unwrap_or_else(|| city.to_lowercase().replace(' ', "_"))
    }

    /// Checks value ranges that the schema cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first bad key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("coverage_radius_km", self.coverage_radius_km),
            ("infrastructure_radius_km", self.infrastructure_radius_km),
            ("demand.eps_degrees", self.demand.eps_degrees),
            ("clustering.dbscan_eps", self.clustering.dbscan_eps),
            ("efficiency.learning_rate", self.efficiency.learning_rate),
            ("gaps.min_per_100k", self.gaps.min_per_100k),
        ];
        for (key, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(invalid(key, format!("must be positive, got {value}")));
            }
        }

        if self.density.high_below_km > self.density.low_above_km {
            return Err(invalid(
                "density",
                "high_below_km must not exceed low_above_km".to_string(),
            ));
        }
        if self.clustering.k == 0 {
            return Err(invalid("clustering.k", "must be at least 1".to_string()));
        }
        if self.clustering.dbscan_min_points == 0 || self.demand.min_points == 0 {
            return Err(invalid(
                "min_points",
                "must be at least 1".to_string(),
            ));
        }
        let fraction = self.efficiency.test_fraction;
        if !(fraction > 0.0 && fraction < 1.0) {
            return Err(invalid(
                "efficiency.test_fraction",
                format!("must be in (0, 1), got {fraction}"),
            ));
        }
        if self.efficiency.folds < 2 {
            return Err(invalid("efficiency.folds", "must be at least 2".to_string()));
        }
        if self.efficiency.trees == 0 || self.efficiency.boosting_stages == 0 {
            return Err(invalid(
                "efficiency",
                "trees and boosting_stages must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

fn invalid(key: &str, message: String) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message,
    }
}

/// Recursively merges `overlay` into `base`. Nested tables merge key by
/// key; every other value replaces the base value.
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match value {
            toml::Value::Table(incoming) => match base.get_mut(&key) {
                Some(toml::Value::Table(existing)) => merge_tables(existing, incoming),
                _ => {
                    base.insert(key, toml::Value::Table(incoming));
                }
            },
            value => {
                base.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_defaults_parse_and_validate() {
        let config = AnalysisConfig::default();
        config.validate().unwrap();
        assert!((config.coverage_radius_km - 1.5).abs() < f64::EPSILON);
        assert_eq!(config.clustering.k, 3);
        assert_eq!(config.efficiency.folds, 5);
        assert_eq!(config.population_of("Москва"), Some(12_600_000));
        assert_eq!(config.map.color_for("Tele2"), "#00A2FF");
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let config = AnalysisConfig::from_toml_str(
            r#"
            coverage_radius_km = 3.0

            [clustering]
            k = 4

            [population]
            "Тула" = 470000
            "#,
        )
        .unwrap();

        assert!((config.coverage_radius_km - 3.0).abs() < f64::EPSILON);
        assert_eq!(config.clustering.k, 4);
        assert_eq!(config.clustering.dbscan_min_points, 5);
        assert_eq!(config.population_of("Тула"), Some(470_000));
        assert_eq!(config.population_of("Казань"), Some(1_250_000));
    }

    #[test]
    fn rejects_non_positive_radius() {
        let err = AnalysisConfig::from_toml_str("coverage_radius_km = 0.0").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "coverage_radius_km"));
    }

    #[test]
    fn rejects_bad_test_fraction() {
        let err = AnalysisConfig::from_toml_str("[efficiency]\ntest_fraction = 1.0").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn rejects_wrong_type() {
        let err = AnalysisConfig::from_toml_str("headless = \"yes\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn city_code_falls_back_to_lowercase_name() {
        let config = AnalysisConfig::default();
        assert_eq!(config.city_code("Казань"), "kzn");
        assert_eq!(config.city_code("Нижний Тагил"), "нижний_тагил");
    }

    #[test]
    fn effective_config_round_trips_through_toml() {
        let config = AnalysisConfig::default();
        let rendered = config.to_toml_string().unwrap();
        let reparsed = AnalysisConfig::from_toml_str(&rendered).unwrap();
        assert_eq!(config, reparsed);
    }

    #[test]
    fn load_reads_file_from_disk() {
        let dir = std::env::temp_dir().join("outlet_map_config_load_test");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "output_dir = \"out\"\n").unwrap();

        let config = AnalysisConfig::load(&path).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("out"));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
