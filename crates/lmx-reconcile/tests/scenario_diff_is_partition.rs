//! Exhaustive check over small record universes:
//! - diff(A, A) is empty
//! - every id of A is Added, Changed or silent (never two of them)
//! - every id of B missing from A is Removed exactly once

use std::collections::{BTreeMap, BTreeSet};

use lmx_reconcile::diff;
use lmx_schemas::{DiffStatus, Record};

/// Each of 4 ids is absent, present with value "x", or present with "y".
fn universe() -> Vec<Vec<Record>> {
    let mut out = Vec::new();
    for mut code in 0..81u32 {
        let mut set = Vec::new();
        for id in 0..4 {
            match code % 3 {
                1 => set.push(Record::new().with("employeeID", id.to_string()).with("v", "x")),
                2 => set.push(Record::new().with("employeeID", id.to_string()).with("v", "y")),
                _ => {}
            }
            code /= 3;
        }
        out.push(set);
    }
    out
}

fn ids(set: &[Record]) -> BTreeSet<String> {
    set.iter()
        .map(|r| r.first("employeeID").unwrap().to_string())
        .collect()
}

#[test]
fn diff_of_a_set_with_itself_is_empty() {
    for a in universe() {
        assert!(diff(&a, &a).unwrap().is_empty());
    }
}

#[test]
fn diff_partitions_identifiers() {
    let sets = universe();
    for a in &sets {
        for b in &sets {
            let out = diff(a, b).unwrap();

            let mut seen: BTreeMap<String, DiffStatus> = BTreeMap::new();
            for e in &out {
                let id = e.record.first("employeeID").unwrap().to_string();
                assert!(
                    seen.insert(id.clone(), e.status).is_none(),
                    "id {id} classified twice"
                );
            }

            let a_ids = ids(a);
            let b_ids = ids(b);

            for (id, status) in &seen {
                match status {
                    DiffStatus::Added => {
                        assert!(a_ids.contains(id) && !b_ids.contains(id))
                    }
                    DiffStatus::Changed => {
                        assert!(a_ids.contains(id) && b_ids.contains(id))
                    }
                    DiffStatus::Removed => {
                        assert!(!a_ids.contains(id) && b_ids.contains(id))
                    }
                }
            }

            for id in b_ids.difference(&a_ids) {
                assert_eq!(seen.get(id), Some(&DiffStatus::Removed));
            }
        }
    }
}
