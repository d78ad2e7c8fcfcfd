use lmx_schemas::{DiffEntry, DiffStatus};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which input of [`crate::diff`] violated a precondition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    /// The freshly fetched set.
    Current,
    /// The stored snapshot.
    Previous,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Current => f.write_str("current"),
            Side::Previous => f.write_str("previous"),
        }
    }
}

/// Data precondition violations. Both abort the run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReconcileError {
    /// The same identifier appears twice within one record set.
    DuplicateKey { key: String, side: Side },
    /// A record has no value for the key attribute.
    MissingKey {
        attribute: String,
        index: usize,
        side: Side,
    },
}

impl fmt::Display for ReconcileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileError::DuplicateKey { key, side } => {
                write!(f, "duplicate key '{key}' in {side} record set")
            }
            ReconcileError::MissingKey {
                attribute,
                index,
                side,
            } => write!(
                f,
                "record #{index} in {side} record set has no '{attribute}' value"
            ),
        }
    }
}

impl std::error::Error for ReconcileError {}

/// Per-status counts of a diff.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    pub added: usize,
    pub changed: usize,
    pub removed: usize,
}

impl DiffSummary {
    pub fn of(entries: &[DiffEntry]) -> Self {
        let mut s = Self::default();
        for e in entries {
            match e.status {
                DiffStatus::Added => s.added += 1,
                DiffStatus::Changed => s.changed += 1,
                DiffStatus::Removed => s.removed += 1,
            }
        }
        s
    }

    pub fn total(&self) -> usize {
        self.added + self.changed + self.removed
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

impl fmt::Display for DiffSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "added={} changed={} removed={}",
            self.added, self.changed, self.removed
        )
    }
}
