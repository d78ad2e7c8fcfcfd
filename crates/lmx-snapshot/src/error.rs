use std::fmt;
use std::path::{Path, PathBuf};

/// Snapshot storage failures.
///
/// `NotFound` on the first run is expected: the orchestrator switches to a
/// full export. `Corrupt` and `Io` abort the run.
#[derive(Debug)]
pub enum StorageError {
    /// The snapshot file does not exist.
    NotFound { path: PathBuf },
    /// The file exists but is not an array of `{attr: [values]}` objects.
    Corrupt { path: PathBuf, reason: String },
    /// Any other filesystem failure (read, write, copy, rename, listing).
    Io { path: PathBuf, reason: String },
}

impl StorageError {
    pub(crate) fn io(path: &Path, err: impl fmt::Display) -> Self {
        StorageError::Io {
            path: path.to_path_buf(),
            reason: err.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::NotFound { path } => {
                write!(f, "snapshot not found: {}", path.display())
            }
            StorageError::Corrupt { path, reason } => {
                write!(f, "snapshot corrupt: {}: {reason}", path.display())
            }
            StorageError::Io { path, reason } => {
                write!(f, "snapshot io failure: {}: {reason}", path.display())
            }
        }
    }
}

impl std::error::Error for StorageError {}
