//! lmx-reconcile
//!
//! Three-way reconciliation of a freshly fetched record set against the last
//! stored snapshot.
//!
//! - Record in current only => Added
//! - Record in both, structurally different => Changed
//! - Record in previous only => Removed
//! - Duplicate or missing key on either side => error, never resolved silently
//!
//! Deterministic, pure logic. No IO.

mod engine;
mod types;

pub use engine::{check_keys, diff, diff_by_key};
pub use types::*;
