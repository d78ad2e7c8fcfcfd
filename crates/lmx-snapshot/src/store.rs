use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use lmx_schemas::{Record, RecordSet};
use tracing::debug;

use crate::StorageError;

/// Load a snapshot.
pub fn load(path: impl AsRef<Path>) -> Result<RecordSet, StorageError> {
    let path = path.as_ref();
    let raw = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(StorageError::NotFound {
                path: path.to_path_buf(),
            })
        }
        Err(e) => return Err(StorageError::io(path, e)),
    };

    let records: RecordSet =
        serde_json::from_str(&raw).map_err(|e| StorageError::Corrupt {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    debug!(path = %path.display(), records = records.len(), "snapshot loaded");
    Ok(records)
}

/// Write `records` to `path`, creating parent directories.
///
/// The data goes to `{path}.tmp` first and is renamed into place, so a crash
/// mid-write never leaves a truncated snapshot under the final name.
pub fn save(path: impl AsRef<Path>, records: &[Record]) -> Result<(), StorageError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
    }

    let json = serde_json::to_string_pretty(records).map_err(|e| StorageError::io(path, e))?;

    let tmp = with_suffix(path, ".tmp");
    fs::write(&tmp, format!("{json}\n")).map_err(|e| StorageError::io(&tmp, e))?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(StorageError::io(path, e));
    }

    debug!(path = %path.display(), records = records.len(), "snapshot saved");
    Ok(())
}

/// Where the orchestrator stages a new snapshot before rotation.
pub fn staged_path(path: impl AsRef<Path>) -> PathBuf {
    with_suffix(path.as_ref(), ".staged")
}

/// Move a staged snapshot over the live one.
pub fn promote_staged(staged: impl AsRef<Path>, live: impl AsRef<Path>) -> Result<(), StorageError> {
    let (staged, live) = (staged.as_ref(), live.as_ref());
    fs::rename(staged, live).map_err(|e| StorageError::io(live, e))
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut s = path.as_os_str().to_owned();
    s.push(suffix);
    PathBuf::from(s)
}
