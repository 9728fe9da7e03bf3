//! On-disk model cache.
//!
//! A trained model is stored as a MessagePack artifact together with the
//! feature names it was trained on and a caller-defined training report.
//! [`load`] never fails hard: every reason the artifact cannot be used is
//! a [`CacheMiss`] variant, and the caller retrains.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::{ModelError, TrainedModel};

/// Bumped whenever the artifact layout changes.
pub const CACHE_FORMAT_VERSION: u32 = 1;

/// A cached model plus everything needed to check it is still usable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedModel<R> {
    pub format_version: u32,
    pub feature_names: Vec<String>,
    pub model: TrainedModel,
    pub report: R,
}

impl<R> CachedModel<R> {
    #[must_use]
    pub const fn new(feature_names: Vec<String>, model: TrainedModel, report: R) -> Self {
        Self {
            format_version: CACHE_FORMAT_VERSION,
            feature_names,
            model,
            report,
        }
    }
}

/// Why a cached model could not be used.
#[derive(Debug, thiserror::Error)]
pub enum CacheMiss {
    #[error("No cached model at {0}")]
    NotFound(PathBuf),

    #[error("Cannot read cached model {path}: {source}")]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Corrupt cached model {path}: {message}")]
    Corrupt { path: PathBuf, message: String },

    #[error("Incompatible cached model: {reason}")]
    Incompatible { reason: String },
}

#[derive(Deserialize)]
struct Header {
    format_version: u32,
}

/// Loads a cached model trained on exactly `expected_features`.
///
/// # Errors
///
/// Returns a [`CacheMiss`] describing why the artifact is unusable.
pub fn load<R: DeserializeOwned>(
    path: &Path,
    expected_features: &[String],
) -> Result<CachedModel<R>, CacheMiss> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(CacheMiss::NotFound(path.to_path_buf()));
        }
        Err(source) => {
            return Err(CacheMiss::Unreadable {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let corrupt = |e: rmp_serde::decode::Error| CacheMiss::Corrupt {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    let header: Header = rmp_serde::from_slice(&bytes).map_err(corrupt)?;
    if header.format_version != CACHE_FORMAT_VERSION {
        return Err(CacheMiss::Incompatible {
            reason: format!(
                "format version {} (expected {CACHE_FORMAT_VERSION})",
                header.format_version
            ),
        });
    }

    let cached: CachedModel<R> = rmp_serde::from_slice(&bytes).map_err(corrupt)?;
    if cached.feature_names != expected_features {
        return Err(CacheMiss::Incompatible {
            reason: format!(
                "trained on features {:?}, current features are {expected_features:?}",
                cached.feature_names
            ),
        });
    }
    if cached.model.n_features() != expected_features.len() {
        return Err(CacheMiss::Incompatible {
            reason: format!(
                "model expects {} features, artifact lists {}",
                cached.model.n_features(),
                expected_features.len()
            ),
        });
    }

    Ok(cached)
}

/// Writes the artifact, creating parent directories as needed.
///
/// # Errors
///
/// Returns an error if encoding or writing fails.
pub fn save<R: Serialize>(path: &Path, cached: &CachedModel<R>) -> Result<(), ModelError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let bytes = rmp_serde::to_vec_named(cached)?;
    std::fs::write(path, bytes)?;
    log::info!("Saved model cache to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;
    use crate::linear::LinearModel;

    fn features() -> Vec<String> {
        vec!["rating".to_string()]
    }

    #[test]
    fn misses_name_the_artifact_path() {
        let path = PathBuf::from("models").join("efficiency.msgpack");
        let miss = CacheMiss::Corrupt {
            path: path.clone(),
            message: "truncated".to_string(),
        };
        assert_eq!(
            miss.to_string(),
            format!("Corrupt cached model {}: truncated", path.display())
        );
        assert!(
            CacheMiss::NotFound(path.clone())
                .to_string()
                .ends_with(&path.display().to_string())
        );
    }

    fn artifact() -> CachedModel<String> {
        let x = array![[1.0], [2.0], [3.0]];
        let y = array![2.0, 4.0, 6.0];
        let model = TrainedModel::Linear(LinearModel::fit(x.view(), y.view()).unwrap());
        CachedModel::new(features(), model, "report".to_string())
    }

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(name);
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn saved_artifact_loads_back() {
        let dir = temp_dir("outlet_map_cache_roundtrip_test");
        let path = dir.join("nested").join("model.msgpack");

        let original = artifact();
        save(&path, &original).unwrap();
        let loaded: CachedModel<String> = load(&path, &features()).unwrap();
        assert_eq!(loaded, original);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = temp_dir("outlet_map_cache_missing_test");
        let miss = load::<String>(&dir.join("model.msgpack"), &features()).unwrap_err();
        assert!(matches!(miss, CacheMiss::NotFound(_)));
    }

    #[test]
    fn garbage_is_corrupt() {
        let dir = temp_dir("outlet_map_cache_corrupt_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("model.msgpack");
        std::fs::write(&path, b"not a model").unwrap();

        let miss = load::<String>(&path, &features()).unwrap_err();
        assert!(matches!(miss, CacheMiss::Corrupt { .. }));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn different_features_are_incompatible() {
        let dir = temp_dir("outlet_map_cache_features_test");
        let path = dir.join("model.msgpack");
        save(&path, &artifact()).unwrap();

        let other = vec!["reviews_count".to_string()];
        let miss = load::<String>(&path, &other).unwrap_err();
        assert!(matches!(miss, CacheMiss::Incompatible { .. }));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn old_format_version_is_incompatible() {
        let dir = temp_dir("outlet_map_cache_version_test");
        let path = dir.join("model.msgpack");
        let mut old = artifact();
        old.format_version = 0;
        save(&path, &old).unwrap();

        let miss = load::<String>(&path, &features()).unwrap_err();
        assert!(matches!(miss, CacheMiss::Incompatible { .. }));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
