use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum MappingError {
    /// A field descriptor is not in `tttiis` notation.
    InvalidDescriptor { descriptor: String, reason: String },
    /// XML serialization failed for a document.
    Serialize { path: PathBuf, reason: String },
    /// Filesystem failure while writing a document.
    Io { path: PathBuf, reason: String },
    /// Cancelled between records or documents.
    Cancelled,
}

impl MappingError {
    pub(crate) fn io(path: &std::path::Path, err: impl fmt::Display) -> Self {
        MappingError::Io {
            path: path.to_path_buf(),
            reason: err.to_string(),
        }
    }
}

impl fmt::Display for MappingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MappingError::InvalidDescriptor { descriptor, reason } => {
                write!(f, "invalid field descriptor '{descriptor}': {reason}")
            }
            MappingError::Serialize { path, reason } => {
                write!(f, "marcxml serialization failed for {}: {reason}", path.display())
            }
            MappingError::Io { path, reason } => {
                write!(f, "output io failure: {}: {reason}", path.display())
            }
            MappingError::Cancelled => write!(f, "mapping cancelled"),
        }
    }
}

impl std::error::Error for MappingError {}
