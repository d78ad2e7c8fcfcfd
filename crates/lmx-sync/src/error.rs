use std::fmt;

use lmx_directory::DirectoryError;
use lmx_marc::MappingError;
use lmx_reconcile::ReconcileError;
use lmx_snapshot::StorageError;

use crate::{FailureKind, SyncState, TransitionError};

#[derive(Debug)]
pub enum SyncErrorKind {
    Directory(DirectoryError),
    Storage(StorageError),
    Reconcile(ReconcileError),
    Mapping(MappingError),
    /// Cancellation observed by the orchestrator itself between stages.
    Cancelled,
    IllegalTransition(TransitionError),
}

/// A failed run: the stage it was in and what went wrong.
#[derive(Debug)]
pub struct SyncError {
    pub stage: SyncState,
    pub kind: SyncErrorKind,
}

impl SyncError {
    pub fn new(stage: SyncState, kind: SyncErrorKind) -> Self {
        Self { stage, kind }
    }

    pub fn failure_kind(&self) -> FailureKind {
        match &self.kind {
            SyncErrorKind::Directory(DirectoryError::Cancelled { .. })
            | SyncErrorKind::Mapping(MappingError::Cancelled)
            | SyncErrorKind::Cancelled => FailureKind::Cancelled,
            SyncErrorKind::Directory(_) => FailureKind::Directory,
            SyncErrorKind::Storage(_) => FailureKind::Storage,
            SyncErrorKind::Reconcile(_) => FailureKind::Reconcile,
            SyncErrorKind::Mapping(_) => FailureKind::Mapping,
            SyncErrorKind::IllegalTransition(_) => FailureKind::Internal,
        }
    }
}

impl fmt::Display for SyncErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncErrorKind::Directory(e) => e.fmt(f),
            SyncErrorKind::Storage(e) => e.fmt(f),
            SyncErrorKind::Reconcile(e) => e.fmt(f),
            SyncErrorKind::Mapping(e) => e.fmt(f),
            SyncErrorKind::Cancelled => f.write_str("sync cancelled"),
            SyncErrorKind::IllegalTransition(e) => e.fmt(f),
        }
    }
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sync failed while {}: {}", self.stage, self.kind)
    }
}

impl std::error::Error for SyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            SyncErrorKind::Directory(e) => Some(e),
            SyncErrorKind::Storage(e) => Some(e),
            SyncErrorKind::Reconcile(e) => Some(e),
            SyncErrorKind::Mapping(e) => Some(e),
            SyncErrorKind::IllegalTransition(e) => Some(e),
            SyncErrorKind::Cancelled => None,
        }
    }
}
