//! Run state machine.
//!
//! ```text
//! Idle -> Fetching -> Diffing -> Mapping -> Writing -> Rotating -> Done
//!             |          |                                 ^
//!             |          +---- (no changes) ---------------+---> Done
//!             +-- (no snapshot / full mode) --> Mapping
//!
//! any non-terminal state -> Failed(kind)
//! ```

use std::fmt;

use serde::Serialize;

/// Why a run ended in [`SyncState::Failed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Directory,
    Storage,
    Reconcile,
    Mapping,
    Cancelled,
    /// An orchestrator bug: an illegal state transition.
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Idle,
    Fetching,
    Diffing,
    Mapping,
    Writing,
    Rotating,
    /// **Terminal.**
    Done,
    /// **Terminal.**
    Failed(FailureKind),
}

impl SyncState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed(_))
    }

    /// Validate and perform one transition.
    pub fn advance(self, next: SyncState) -> Result<SyncState, TransitionError> {
        use SyncState::*;
        let legal = match (self, next) {
            (from, Failed(_)) => !from.is_terminal(),
            (Idle, Fetching) => true,
            (Fetching, Diffing) | (Fetching, Mapping) => true,
            (Diffing, Mapping) | (Diffing, Done) => true,
            (Mapping, Writing) => true,
            (Writing, Rotating) => true,
            (Rotating, Done) => true,
            _ => false,
        };
        if legal {
            Ok(next)
        } else {
            Err(TransitionError {
                from: self,
                to: next,
            })
        }
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncState::Idle => f.write_str("idle"),
            SyncState::Fetching => f.write_str("fetching"),
            SyncState::Diffing => f.write_str("diffing"),
            SyncState::Mapping => f.write_str("mapping"),
            SyncState::Writing => f.write_str("writing"),
            SyncState::Rotating => f.write_str("rotating"),
            SyncState::Done => f.write_str("done"),
            SyncState::Failed(kind) => write!(f, "failed({kind:?})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionError {
    pub from: SyncState,
    pub to: SyncState,
}

impl fmt::Display for TransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "illegal sync transition: {} -> {}", self.from, self.to)
    }
}

impl std::error::Error for TransitionError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incremental_path_is_legal() {
        let mut s = SyncState::Idle;
        for next in [
            SyncState::Fetching,
            SyncState::Diffing,
            SyncState::Mapping,
            SyncState::Writing,
            SyncState::Rotating,
            SyncState::Done,
        ] {
            s = s.advance(next).unwrap();
        }
        assert!(s.is_terminal());
    }

    #[test]
    fn full_export_skips_diffing() {
        let s = SyncState::Fetching.advance(SyncState::Mapping).unwrap();
        assert_eq!(s, SyncState::Mapping);
    }

    #[test]
    fn unchanged_run_finishes_from_diffing() {
        assert_eq!(
            SyncState::Diffing.advance(SyncState::Done).unwrap(),
            SyncState::Done
        );
    }

    #[test]
    fn skipping_writing_is_illegal() {
        let err = SyncState::Mapping.advance(SyncState::Rotating).unwrap_err();
        assert_eq!(err.from, SyncState::Mapping);
        assert_eq!(err.to, SyncState::Rotating);
    }

    #[test]
    fn failed_reachable_from_any_non_terminal_state() {
        for s in [
            SyncState::Idle,
            SyncState::Fetching,
            SyncState::Diffing,
            SyncState::Mapping,
            SyncState::Writing,
            SyncState::Rotating,
        ] {
            assert!(s.advance(SyncState::Failed(FailureKind::Storage)).is_ok());
        }
        let failed = SyncState::Failed(FailureKind::Mapping);
        assert!(failed.advance(SyncState::Failed(FailureKind::Storage)).is_err());
        assert!(SyncState::Done.advance(SyncState::Fetching).is_err());
    }
}
