//! Timestamped snapshot history.
//!
//! `records.json` is archived as `records_<unix-ts>.json` next to it. Only the
//! `retain` newest archives survive a rotation.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use crate::StorageError;

/// One archived copy of the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchivedFile {
    pub path: PathBuf,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PruneFailure {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RotationReport {
    /// The copy made by this rotation; `None` when there was nothing to archive.
    pub archived: Option<PathBuf>,
    /// Archives deleted because they fell outside the retention window.
    pub pruned: Vec<PathBuf>,
    /// Archives that should have been deleted but could not be.
    pub failed: Vec<PruneFailure>,
}

/// Archive `path` under the current unix timestamp and prune old archives.
pub fn rotate(path: impl AsRef<Path>, retain: usize) -> Result<RotationReport, StorageError> {
    rotate_at(path, retain, Utc::now().timestamp())
}

/// [`rotate`] with an explicit timestamp.
///
/// If an archive with that timestamp already exists the timestamp is bumped
/// until the name is free, so rotations within the same second never
/// overwrite each other. `retain` below 1 is treated as 1. A missing `path`
/// is a no-op.
///
/// Deletion failures during pruning are collected in the report and logged;
/// they do not stop the remaining deletions.
pub fn rotate_at(
    path: impl AsRef<Path>,
    retain: usize,
    timestamp: i64,
) -> Result<RotationReport, StorageError> {
    let path = path.as_ref();
    if !path.is_file() {
        return Ok(RotationReport::default());
    }
    let retain = retain.max(1);

    let mut ts = timestamp;
    let mut dst = archive_path(path, ts);
    while dst.exists() {
        ts += 1;
        dst = archive_path(path, ts);
    }

    fs::copy(path, &dst).map_err(|e| StorageError::io(&dst, e))?;
    info!(src = %path.display(), dst = %dst.display(), "snapshot archived");

    let mut report = RotationReport {
        archived: Some(dst),
        ..RotationReport::default()
    };

    let archives = list_archives(path)?;
    let excess = archives.len().saturating_sub(retain);
    for old in archives.into_iter().take(excess) {
        match fs::remove_file(&old.path) {
            Ok(()) => report.pruned.push(old.path),
            Err(e) => {
                warn!(path = %old.path.display(), error = %e, "failed to prune snapshot archive");
                report.failed.push(PruneFailure {
                    path: old.path,
                    reason: e.to_string(),
                });
            }
        }
    }

    Ok(report)
}

/// `dir/records.json` + 1700000000 -> `dir/records_1700000000.json`
pub fn archive_path(path: impl AsRef<Path>, timestamp: i64) -> PathBuf {
    let path = path.as_ref();
    let (stem, ext) = split_name(path);
    path.with_file_name(format!("{stem}_{timestamp}{ext}"))
}

/// Archives of `path`, oldest first.
pub fn list_archives(path: impl AsRef<Path>) -> Result<Vec<ArchivedFile>, StorageError> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let (stem, ext) = split_name(path);
    let prefix = format!("{stem}_");

    let entries = fs::read_dir(&dir).map_err(|e| StorageError::io(&dir, e))?;
    let mut out = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| StorageError::io(&dir, e))?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        let Some(ts) = name
            .strip_prefix(&prefix)
            .and_then(|rest| rest.strip_suffix(ext.as_str()))
            .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|digits| digits.parse::<i64>().ok())
        else {
            continue;
        };
        out.push(ArchivedFile {
            path: entry.path(),
            timestamp: ts,
        });
    }

    out.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.path.cmp(&b.path)));
    Ok(out)
}

/// File stem and extension (with its dot, or empty).
fn split_name(path: &Path) -> (String, String) {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    (stem, ext)
}
