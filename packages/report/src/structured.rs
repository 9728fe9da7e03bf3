//! Lossless JSON serialization of an analysis result.

use std::path::Path;

use outlet_map_analytics_models::AnalysisResult;

use crate::{ReportError, write_atomic};

/// Writes `result` as pretty-printed JSON.
///
/// # Errors
///
/// Returns an error if serialization or the write fails.
pub fn write_json(result: &AnalysisResult, path: &Path) -> Result<(), ReportError> {
    let contents = serde_json::to_string_pretty(result)?;
    write_atomic(path, contents.as_bytes())?;
    log::info!("Saved JSON report to {}", path.display());
    Ok(())
}

/// Reads a report written by [`write_json`].
///
/// # Errors
///
/// Returns an error if the file cannot be read or does not hold an
/// analysis result.
pub fn read_json_report(path: &Path) -> Result<AnalysisResult, ReportError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&contents)?)
}
