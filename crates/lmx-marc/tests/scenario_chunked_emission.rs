//! Chunked MARCXML emission: document count, order preservation across files,
//! unbounded single-file output, and no leftover temp files.

use std::fs;
use std::path::Path;

use lmx_marc::{emit, emit_with_cancel, FieldDescriptor, MappedElement, MappingError};
use lmx_schemas::CancelFlag;
use tempfile::tempdir;

fn elements(n: usize) -> Vec<MappedElement> {
    let desc = FieldDescriptor::parse("035__a").unwrap();
    (0..n)
        .map(|i| {
            let mut el = MappedElement::new();
            el.add(&desc, format!("AUTHOR|(SzGeCERN){i}"));
            el
        })
        .collect()
}

fn ids_in(path: &Path) -> Vec<String> {
    let xml = fs::read_to_string(path).unwrap();
    xml.match_indices("AUTHOR|(SzGeCERN)")
        .map(|(at, _)| {
            let rest = &xml[at + "AUTHOR|(SzGeCERN)".len()..];
            rest[..rest.find('<').unwrap()].to_string()
        })
        .collect()
}

#[test]
fn ten_elements_in_chunks_of_four_make_three_files_in_order() {
    let dir = tempdir().unwrap();
    let base = dir.path().join("out").join("records.xml");

    let written = emit(&elements(10), 4, &base).unwrap();

    let names: Vec<String> = written
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["records_000.xml", "records_001.xml", "records_002.xml"]);

    let per_file: Vec<usize> = written.iter().map(|p| ids_in(p).len()).collect();
    assert_eq!(per_file, vec![4, 4, 2]);

    let all: Vec<String> = written.iter().flat_map(|p| ids_in(p)).collect();
    let expected: Vec<String> = (0..10).map(|i| i.to_string()).collect();
    assert_eq!(all, expected);

    assert!(!base.exists(), "bounded output never writes the bare base name");
    for entry in fs::read_dir(base.parent().unwrap()).unwrap() {
        let name = entry.unwrap().file_name().to_string_lossy().into_owned();
        assert!(!name.ends_with(".tmp"), "leftover temp file {name}");
    }
}

#[test]
fn chunk_size_zero_writes_one_unsuffixed_file() {
    let dir = tempdir().unwrap();
    let base = dir.path().join("records.xml");

    let written = emit(&elements(10), 0, &base).unwrap();

    assert_eq!(written, vec![base.clone()]);
    assert_eq!(ids_in(&base).len(), 10);
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn no_elements_bounded_writes_nothing() {
    let dir = tempdir().unwrap();
    let written = emit(&[], 500, dir.path().join("records.xml")).unwrap();
    assert!(written.is_empty());
}

#[test]
fn cancelled_emission_leaves_no_final_file() {
    let dir = tempdir().unwrap();
    let base = dir.path().join("records.xml");
    let cancel = CancelFlag::new();
    cancel.cancel();

    let err = emit_with_cancel(&elements(3), 2, &base, &cancel).unwrap_err();
    assert!(matches!(err, MappingError::Cancelled));
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn unencodable_value_fails_before_any_file_is_written() {
    let dir = tempdir().unwrap();
    let base = dir.path().join("records.xml");
    let mut els = elements(3);
    els[2].add(&FieldDescriptor::parse("1001_a").unwrap(), "Doe\u{1}Jane");

    let err = emit(&els, 0, &base).unwrap_err();
    match err {
        MappingError::Serialize { path, reason } => {
            assert_eq!(path, base);
            assert!(reason.contains("U+0001"), "{reason}");
        }
        other => panic!("expected Serialize, got {other:?}"),
    }
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}
