//! lmx-schemas
//!
//! Shared data model for the directory sync pipeline: records as fetched from
//! the directory (or loaded from a snapshot) and the tagged diff entries the
//! reconciler produces. No IO.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Attribute carrying the stable numeric identifier of a directory record.
pub const DEFAULT_KEY_ATTRIBUTE: &str = "employeeID";

/// One directory entry: attribute name -> values.
///
/// Directory attributes are multi-valued by design, so every attribute maps to
/// a sequence even when it is semantically single-valued. Equality is
/// structural: same attribute set, same value sequences in the same order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    attrs: BTreeMap<String, Vec<String>>,
}

/// Records in server-returned (or snapshot) order.
pub type RecordSet = Vec<Record>;

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record where every attribute has exactly one value.
    pub fn from_single_values<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut r = Self::new();
        for (k, v) in pairs {
            r.push_value(k, v);
        }
        r
    }

    /// Builder form of [`Record::push_value`].
    pub fn with(mut self, attr: impl Into<String>, value: impl Into<String>) -> Self {
        self.push_value(attr, value);
        self
    }

    /// Replace all values of `attr`.
    pub fn insert(&mut self, attr: impl Into<String>, values: Vec<String>) {
        self.attrs.insert(attr.into(), values);
    }

    /// Append one value to `attr`, creating the attribute if needed.
    pub fn push_value(&mut self, attr: impl Into<String>, value: impl Into<String>) {
        self.attrs.entry(attr.into()).or_default().push(value.into());
    }

    pub fn get(&self, attr: &str) -> Option<&[String]> {
        self.attrs.get(attr).map(|v| v.as_slice())
    }

    /// First value of `attr`. An attribute present with an empty value list
    /// counts as absent.
    pub fn first(&self, attr: &str) -> Option<&str> {
        self.attrs
            .get(attr)
            .and_then(|v| v.first())
            .map(|s| s.as_str())
    }

    pub fn contains(&self, attr: &str) -> bool {
        self.attrs.contains_key(attr)
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.attrs.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }
}

impl FromIterator<(String, Vec<String>)> for Record {
    fn from_iter<T: IntoIterator<Item = (String, Vec<String>)>>(iter: T) -> Self {
        Self {
            attrs: iter.into_iter().collect(),
        }
    }
}

/// Classification of one record by the reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffStatus {
    Added,
    Changed,
    Removed,
}

impl DiffStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiffStatus::Added => "added",
            DiffStatus::Changed => "changed",
            DiffStatus::Removed => "removed",
        }
    }
}

impl fmt::Display for DiffStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `(status, record)`. Added/Changed carry the fetched record; Removed carries
/// the last stored record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffEntry {
    pub status: DiffStatus,
    pub record: Record,
}

impl DiffEntry {
    pub fn new(status: DiffStatus, record: Record) -> Self {
        Self { status, record }
    }

    pub fn is_removal(&self) -> bool {
        self.status == DiffStatus::Removed
    }
}

/// Cooperative cancellation shared between a caller and a running sync.
///
/// Clones observe the same flag. Checked between pages, records and output
/// documents, never mid-request.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_shape_is_attr_to_value_array() {
        let r = Record::new()
            .with("employeeID", "42")
            .with("mail", "a@example.org")
            .with("mail", "b@example.org");

        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "employeeID": ["42"],
                "mail": ["a@example.org", "b@example.org"]
            })
        );

        let back: Record = serde_json::from_value(json).unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn empty_value_list_reads_as_absent() {
        let mut r = Record::new();
        r.insert("sn", Vec::new());
        assert!(r.contains("sn"));
        assert_eq!(r.first("sn"), None);
    }

    #[test]
    fn equality_is_value_order_sensitive() {
        let a = Record::new().with("mail", "a").with("mail", "b");
        let b = Record::new().with("mail", "b").with("mail", "a");
        assert_ne!(a, b);
    }

    #[test]
    fn diff_status_serializes_lowercase() {
        let e = DiffEntry::new(DiffStatus::Removed, Record::new());
        let v = serde_json::to_value(&e).unwrap();
        assert_eq!(v["status"], "removed");
        assert!(e.is_removal());
    }

    #[test]
    fn cancel_is_visible_through_clones() {
        let flag = CancelFlag::new();
        let seen_by_worker = flag.clone();
        assert!(!seen_by_worker.is_cancelled());
        flag.cancel();
        assert!(seen_by_worker.is_cancelled());
    }
}
