//! lmx-snapshot
//!
//! Persistence of the last fetched record set (the snapshot) plus a bounded
//! history of timestamped copies.
//!
//! File format: a JSON array of records, each record an object mapping
//! attribute name to an array of string values.
//!
//! Single-writer: nothing here locks the snapshot path. Running two syncs
//! against the same path at once is an operational error.

mod error;
mod rotate;
mod store;

pub use error::StorageError;
pub use rotate::{archive_path, list_archives, rotate, rotate_at, ArchivedFile, PruneFailure, RotationReport};
pub use store::{load, promote_staged, save, staged_path};
