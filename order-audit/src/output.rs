//! Report files

use audit_core::AuditReport;
use serde::Serialize;
use shared::{AppError, AppResult};
use std::fs;
use std::path::{Path, PathBuf};

pub const SUMMARY_FILE: &str = "summary.json";
pub const DETAILS_FILE: &str = "details.json";
pub const NOT_FOUND_FILE: &str = "not_found.json";
pub const STATS_FILE: &str = "stats.json";

/// Write every report view into `dir`, creating it when needed.
///
/// Returns the written paths.
pub fn write_report(dir: &Path, report: &AuditReport) -> AppResult<Vec<PathBuf>> {
    fs::create_dir_all(dir)
        .map_err(|e| AppError::from(e).with_detail("path", dir.display().to_string()))?;

    let paths = vec![
        write_json(dir, SUMMARY_FILE, &report.summary)?,
        write_json(dir, DETAILS_FILE, &report.details)?,
        write_json(dir, NOT_FOUND_FILE, &report.not_found)?,
        write_json(dir, STATS_FILE, &report.stats)?,
    ];
    tracing::info!(dir = %dir.display(), files = paths.len(), "Report written");
    Ok(paths)
}

fn write_json<T: Serialize + ?Sized>(dir: &Path, name: &str, value: &T) -> AppResult<PathBuf> {
    let path = dir.join(name);
    let json = serde_json::to_vec_pretty(value)?;
    fs::write(&path, json)
        .map_err(|e| AppError::from(e).with_detail("path", path.display().to_string()))?;
    Ok(path)
}
