//! lmx-sync
//!
//! Run orchestration: fetch -> diff against the stored snapshot -> map ->
//! write documents -> rotate the snapshot.
//!
//! The snapshot is only replaced after every output document was written. A
//! run that fails or is cancelled before [`SyncState::Rotating`] leaves the
//! live snapshot untouched.

mod error;
mod orchestrator;
mod report;
mod settings;
mod state;

pub use error::{SyncError, SyncErrorKind};
pub use orchestrator::{OutputTarget, SyncJob, SyncMode, SyncOrchestrator};
pub use report::{write_report, FetchCounts, SyncOutcome, SyncReport, REPORT_SCHEMA_VERSION};
pub use settings::{fetch_options, ldap_settings, mapper_from_config, search_request};
pub use state::{FailureKind, SyncState, TransitionError};
