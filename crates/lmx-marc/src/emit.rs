use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use lmx_schemas::CancelFlag;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use tracing::{debug, info};

use crate::{Field, MappedElement, MappingError};

pub const MARC21_SLIM_NS: &str = "http://www.loc.gov/MARC21/slim";

/// Split elements into documents of at most `chunk_size` elements.
///
/// `chunk_size <= 0` means unbounded: exactly one document, even when empty.
/// Otherwise `ceil(N / chunk_size)` documents, none for an empty input.
pub fn chunk(elements: &[MappedElement], chunk_size: i64) -> Vec<&[MappedElement]> {
    match usize::try_from(chunk_size) {
        Ok(size) if size > 0 => elements.chunks(size).collect(),
        _ => vec![elements],
    }
}

/// `{stem}_{index:03}{ext}` next to `base`.
pub fn chunk_path(base: &Path, index: usize) -> PathBuf {
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match base.extension() {
        Some(ext) => format!("{stem}_{index:03}.{}", ext.to_string_lossy()),
        None => format!("{stem}_{index:03}"),
    };
    base.with_file_name(name)
}

/// Serialize one document as MARCXML slim.
///
/// Fails on a value holding a character XML 1.0 cannot carry (most C0
/// controls, U+FFFE, U+FFFF), naming the field and the offending code point.
pub fn to_marcxml(elements: &[MappedElement]) -> Result<Vec<u8>, String> {
    let mut w = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    write_document(&mut w, elements).map_err(|e| e.to_string())?;
    let mut bytes = w.into_inner().into_inner();
    bytes.push(b'\n');
    Ok(bytes)
}

fn write_document<W: std::io::Write>(
    w: &mut Writer<W>,
    elements: &[MappedElement],
) -> Result<(), Box<dyn std::error::Error>> {
    w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut root = BytesStart::new("collection");
    root.push_attribute(("xmlns", MARC21_SLIM_NS));
    if elements.is_empty() {
        w.write_event(Event::Empty(root))?;
        return Ok(());
    }
    w.write_event(Event::Start(root))?;

    for el in elements {
        w.write_event(Event::Start(BytesStart::new("record")))?;
        for field in el.fields() {
            match field {
                Field::Control { tag, value } => {
                    check_xml_chars(tag, None, value)?;
                    let mut start = BytesStart::new("controlfield");
                    start.push_attribute(("tag", tag.as_str()));
                    w.write_event(Event::Start(start))?;
                    w.write_event(Event::Text(BytesText::new(value)))?;
                    w.write_event(Event::End(BytesEnd::new("controlfield")))?;
                }
                Field::Data(df) => {
                    let (ind1, ind2) = (df.ind1.to_string(), df.ind2.to_string());
                    let mut start = BytesStart::new("datafield");
                    start.push_attribute(("tag", df.tag.as_str()));
                    start.push_attribute(("ind1", ind1.as_str()));
                    start.push_attribute(("ind2", ind2.as_str()));
                    w.write_event(Event::Start(start))?;
                    for sf in &df.subfields {
                        check_xml_chars(&df.tag, Some(sf.code), &sf.value)?;
                        let code = sf.code.to_string();
                        let mut sub = BytesStart::new("subfield");
                        sub.push_attribute(("code", code.as_str()));
                        w.write_event(Event::Start(sub))?;
                        w.write_event(Event::Text(BytesText::new(&sf.value)))?;
                        w.write_event(Event::End(BytesEnd::new("subfield")))?;
                    }
                    w.write_event(Event::End(BytesEnd::new("datafield")))?;
                }
            }
        }
        w.write_event(Event::End(BytesEnd::new("record")))?;
    }

    w.write_event(Event::End(BytesEnd::new("collection")))?;
    Ok(())
}

fn is_xml_char(c: char) -> bool {
    matches!(
        c,
        '\t' | '\n'
            | '\r'
            | '\u{20}'..='\u{D7FF}'
            | '\u{E000}'..='\u{FFFD}'
            | '\u{10000}'..='\u{10FFFF}'
    )
}

fn check_xml_chars(tag: &str, code: Option<char>, value: &str) -> Result<(), String> {
    match value.chars().find(|c| !is_xml_char(*c)) {
        None => Ok(()),
        Some(bad) => {
            let field = match code {
                Some(code) => format!("{tag}${code}"),
                None => tag.to_string(),
            };
            Err(format!(
                "field {field} value {value:?} contains U+{:04X}, not allowed in XML 1.0",
                bad as u32
            ))
        }
    }
}

/// Write `elements` as MARCXML documents derived from `base_path`.
///
/// See [`chunk`] for how many documents are produced. Unbounded output is
/// written to `base_path` itself, chunked output to [`chunk_path`] names.
/// Returns the written paths in order.
pub fn emit(
    elements: &[MappedElement],
    chunk_size: i64,
    base_path: impl AsRef<Path>,
) -> Result<Vec<PathBuf>, MappingError> {
    emit_with_cancel(elements, chunk_size, base_path, &CancelFlag::new())
}

/// [`emit`] with a cancellation check before each document.
///
/// Every document goes to `{name}.tmp` and is renamed into place, so neither
/// a failure nor a cancellation leaves a partial file under a final name.
pub fn emit_with_cancel(
    elements: &[MappedElement],
    chunk_size: i64,
    base_path: impl AsRef<Path>,
    cancel: &CancelFlag,
) -> Result<Vec<PathBuf>, MappingError> {
    let base = base_path.as_ref();
    if let Some(parent) = base.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| MappingError::io(parent, e))?;
    }

    let bounded = chunk_size > 0;
    let docs = chunk(elements, chunk_size);
    let mut written = Vec::with_capacity(docs.len());

    for (i, doc) in docs.iter().enumerate() {
        if cancel.is_cancelled() {
            return Err(MappingError::Cancelled);
        }
        let path = if bounded {
            chunk_path(base, i)
        } else {
            base.to_path_buf()
        };

        let bytes = to_marcxml(doc).map_err(|reason| MappingError::Serialize {
            path: path.clone(),
            reason,
        })?;
        write_atomic(&path, &bytes)?;

        debug!(path = %path.display(), records = doc.len(), "marcxml document written");
        written.push(path);
    }

    info!(
        base = %base.display(),
        documents = written.len(),
        records = elements.len(),
        "marcxml emission complete"
    );
    Ok(written)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), MappingError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, bytes).map_err(|e| MappingError::io(&tmp, e))?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(MappingError::io(path, e));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FieldDescriptor;

    fn element(id: &str) -> MappedElement {
        let mut el = MappedElement::new();
        el.add(&FieldDescriptor::parse("035__a").unwrap(), id);
        el
    }

    #[test]
    fn chunk_counts() {
        let els: Vec<_> = (0..7).map(|i| element(&i.to_string())).collect();
        assert_eq!(chunk(&els, 3).iter().map(|c| c.len()).collect::<Vec<_>>(), vec![3, 3, 1]);
        assert_eq!(chunk(&els, 7).len(), 1);
        assert_eq!(chunk(&els, 0).len(), 1);
        assert_eq!(chunk(&els, -5)[0].len(), 7);
        assert!(chunk(&[], 3).is_empty());
        assert_eq!(chunk(&[], 0).len(), 1);
    }

    #[test]
    fn chunk_path_suffixes_before_extension() {
        assert_eq!(
            chunk_path(Path::new("out/records.xml"), 2),
            PathBuf::from("out/records_002.xml")
        );
        assert_eq!(chunk_path(Path::new("records"), 0), PathBuf::from("records_000"));
    }

    #[test]
    fn marcxml_shape_and_escaping() {
        let mut el = MappedElement::new();
        el.add(&FieldDescriptor::parse("001").unwrap(), "42");
        el.add(&FieldDescriptor::parse("1001_a").unwrap(), "O'Brien & <Sons>");
        let xml = String::from_utf8(to_marcxml(&[el]).unwrap()).unwrap();

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<collection xmlns=\"http://www.loc.gov/MARC21/slim\">"));
        assert!(xml.contains("<controlfield tag=\"001\">42</controlfield>"));
        assert!(xml.contains("<datafield tag=\"100\" ind1=\"1\" ind2=\" \">"));
        assert!(xml.contains("&amp; &lt;Sons&gt;"));
        assert!(xml.contains("\n  <record>"));
    }

    #[test]
    fn control_character_in_value_is_refused() {
        let mut el = MappedElement::new();
        el.add(&FieldDescriptor::parse("100__a").unwrap(), "Doe\u{1}Jane");
        let err = to_marcxml(&[el]).unwrap_err();
        assert!(err.contains("100$a"), "{err}");
        assert!(err.contains("U+0001"), "{err}");
    }

    #[test]
    fn tab_newline_and_astral_characters_pass() {
        let mut el = MappedElement::new();
        el.add(&FieldDescriptor::parse("001").unwrap(), "a\tb\nc\u{1F600}");
        assert!(to_marcxml(&[el]).is_ok());
    }

    #[test]
    fn empty_document_is_empty_collection() {
        let xml = String::from_utf8(to_marcxml(&[]).unwrap()).unwrap();
        assert!(xml.contains("<collection xmlns=\"http://www.loc.gov/MARC21/slim\"/>"));
    }
}
