use std::collections::HashMap;

use lmx_schemas::{DiffEntry, DiffStatus, Record, DEFAULT_KEY_ATTRIBUTE};

use crate::{ReconcileError, Side};

/// Index a record set by key. Fails on a missing or repeated key.
fn index_by_key<'a>(
    records: &'a [Record],
    key_attr: &str,
    side: Side,
) -> Result<HashMap<&'a str, &'a Record>, ReconcileError> {
    let mut index = HashMap::with_capacity(records.len());
    for (i, record) in records.iter().enumerate() {
        let key = record
            .first(key_attr)
            .ok_or_else(|| ReconcileError::MissingKey {
                attribute: key_attr.to_string(),
                index: i,
                side,
            })?;
        if index.insert(key, record).is_some() {
            return Err(ReconcileError::DuplicateKey {
                key: key.to_string(),
                side,
            });
        }
    }
    Ok(index)
}

/// Check that every record carries `key_attr` and no key repeats.
///
/// Used where a set is persisted without being diffed (full exports), so a
/// snapshot that could never be reconciled is not written.
pub fn check_keys(records: &[Record], key_attr: &str) -> Result<(), ReconcileError> {
    index_by_key(records, key_attr, Side::Current).map(|_| ())
}

/// Diff keyed on [`DEFAULT_KEY_ATTRIBUTE`].
pub fn diff(current: &[Record], previous: &[Record]) -> Result<Vec<DiffEntry>, ReconcileError> {
    diff_by_key(current, previous, DEFAULT_KEY_ATTRIBUTE)
}

/// Classify `current` against `previous`.
///
/// Output order: Added/Changed in `current` order, then Removed in `previous`
/// order. Callers must not rely on interleaving between the two groups.
///
/// "Changed" is full-record structural equality. Value sequences compare in
/// stored order, so a directory that reorders a multi-valued attribute between
/// fetches reports the record as changed.
pub fn diff_by_key(
    current: &[Record],
    previous: &[Record],
    key_attr: &str,
) -> Result<Vec<DiffEntry>, ReconcileError> {
    let cur_index = index_by_key(current, key_attr, Side::Current)?;
    let prev_index = index_by_key(previous, key_attr, Side::Previous)?;

    let mut out = Vec::new();

    for record in current {
        // Key presence was checked while indexing.
        let Some(key) = record.first(key_attr) else {
            continue;
        };
        match prev_index.get(key) {
            None => out.push(DiffEntry::new(DiffStatus::Added, record.clone())),
            Some(stored) if *stored != record => {
                out.push(DiffEntry::new(DiffStatus::Changed, record.clone()))
            }
            Some(_) => {}
        }
    }

    for record in previous {
        let Some(key) = record.first(key_attr) else {
            continue;
        };
        if !cur_index.contains_key(key) {
            out.push(DiffEntry::new(DiffStatus::Removed, record.clone()));
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DiffSummary;

    fn rec(id: &str, name: &str) -> Record {
        Record::new().with("employeeID", id).with("displayName", name)
    }

    #[test]
    fn identical_sets_produce_no_entries() {
        let a = vec![rec("1", "A"), rec("2", "B")];
        assert!(diff(&a, &a).unwrap().is_empty());
    }

    #[test]
    fn attribute_value_change_is_changed() {
        let prev = vec![rec("1", "A")];
        let cur = vec![rec("1", "A2")];
        let out = diff(&cur, &prev).unwrap();
        assert_eq!(out, vec![DiffEntry::new(DiffStatus::Changed, rec("1", "A2"))]);
    }

    #[test]
    fn attribute_only_on_one_side_is_changed() {
        let prev = vec![rec("1", "A")];
        let cur = vec![rec("1", "A").with("mail", "a@example.org")];
        let out = diff(&cur, &prev).unwrap();
        assert_eq!(DiffSummary::of(&out).changed, 1);

        // and the other direction
        let out = diff(&prev, &cur).unwrap();
        assert_eq!(DiffSummary::of(&out).changed, 1);
    }

    #[test]
    fn duplicate_in_previous_is_reported_with_side() {
        let prev = vec![rec("7", "A"), rec("7", "B")];
        let err = diff(&[], &prev).unwrap_err();
        assert_eq!(
            err,
            ReconcileError::DuplicateKey {
                key: "7".to_string(),
                side: Side::Previous
            }
        );
    }

    #[test]
    fn missing_key_is_reported_with_index() {
        let cur = vec![rec("1", "A"), Record::new().with("sn", "X")];
        let err = diff(&cur, &[]).unwrap_err();
        assert!(matches!(
            err,
            ReconcileError::MissingKey { index: 1, side: Side::Current, .. }
        ));
    }

    #[test]
    fn custom_key_attribute() {
        let prev = vec![Record::new().with("uid", "x")];
        let cur = vec![Record::new().with("uid", "y")];
        let out = diff_by_key(&cur, &prev, "uid").unwrap();
        assert_eq!(
            DiffSummary::of(&out),
            DiffSummary {
                added: 1,
                changed: 0,
                removed: 1
            }
        );
    }

    #[test]
    fn check_keys_flags_missing_key() {
        let records = vec![rec("1", "A"), Record::new().with("displayName", "no id")];
        assert!(check_keys(&records[..1], "employeeID").is_ok());
        assert!(matches!(
            check_keys(&records, "employeeID"),
            Err(ReconcileError::MissingKey { index: 1, .. })
        ));
    }
}
