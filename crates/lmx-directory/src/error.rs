use std::fmt;

/// Directory fetch failures. All are fatal to the run: no partial result is
/// returned or trusted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    /// Could not open or initialise the connection.
    Connect(String),
    /// The bind was refused.
    Bind(String),
    /// The server rejected or failed a search request.
    Search(String),
    /// A value was not valid text in the configured encoding.
    Decode {
        attribute: String,
        reason: String,
    },
    /// The request itself is unusable (e.g. zero page size).
    InvalidRequest(String),
    /// The fetch was cancelled between pages.
    Cancelled { pages_read: usize },
}

impl fmt::Display for DirectoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirectoryError::Connect(msg) => write!(f, "directory connection failed: {msg}"),
            DirectoryError::Bind(msg) => write!(f, "directory bind failed: {msg}"),
            DirectoryError::Search(msg) => write!(f, "directory search failed: {msg}"),
            DirectoryError::Decode { attribute, reason } => {
                write!(f, "cannot decode attribute '{attribute}': {reason}")
            }
            DirectoryError::InvalidRequest(msg) => write!(f, "invalid search request: {msg}"),
            DirectoryError::Cancelled { pages_read } => {
                write!(f, "directory fetch cancelled after {pages_read} page(s)")
            }
        }
    }
}

impl std::error::Error for DirectoryError {}
