use lmx_reconcile::*;
use lmx_schemas::{DiffEntry, DiffStatus, Record};

fn rec(id: &str, name: &str) -> Record {
    Record::new().with("employeeID", id).with("name", name)
}

#[test]
fn scenario_snapshot_1_2_fetch_1_3() {
    let previous = vec![rec("1", "A"), rec("2", "B")];
    let current = vec![rec("1", "A"), rec("3", "C")];

    let out = diff(&current, &previous).unwrap();

    assert_eq!(
        out,
        vec![
            DiffEntry::new(DiffStatus::Added, rec("3", "C")),
            DiffEntry::new(DiffStatus::Removed, rec("2", "B")),
        ]
    );
}

#[test]
fn added_and_changed_follow_current_order_removed_follow_previous_order() {
    let previous = vec![rec("5", "E"), rec("1", "A"), rec("9", "I"), rec("2", "B")];
    let current = vec![rec("4", "D"), rec("1", "A*"), rec("3", "C"), rec("2", "B")];

    let out = diff(&current, &previous).unwrap();
    let ids: Vec<(DiffStatus, &str)> = out
        .iter()
        .map(|e| (e.status, e.record.first("employeeID").unwrap()))
        .collect();

    assert_eq!(
        ids,
        vec![
            (DiffStatus::Added, "4"),
            (DiffStatus::Changed, "1"),
            (DiffStatus::Added, "3"),
            (DiffStatus::Removed, "5"),
            (DiffStatus::Removed, "9"),
        ]
    );
}

#[test]
fn removed_entries_carry_the_stored_record() {
    let stored = rec("8", "old").with("mail", "x@example.org");
    let out = diff(&[], std::slice::from_ref(&stored)).unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].record, stored);
}

#[test]
fn reordered_multi_values_are_reported_changed() {
    let previous = vec![rec("1", "A").with("mail", "a").with("mail", "b")];
    let current = vec![rec("1", "A").with("mail", "b").with("mail", "a")];
    let out = diff(&current, &previous).unwrap();
    assert_eq!(DiffSummary::of(&out).changed, 1);
}
