use lmx_schemas::Record;

use crate::{DirectoryError, RawEntry};

/// Wire encoding of attribute values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextEncoding {
    #[default]
    Utf8,
    /// ISO-8859-1. Every byte is a valid code point, so decoding never fails.
    Latin1,
}

/// What to do with an entry holding a value that does not decode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DecodePolicy {
    /// Fail the whole fetch.
    #[default]
    Propagate,
    /// Drop the entry, log it, and carry on.
    SkipRecord,
}

impl TextEncoding {
    pub fn decode(&self, bytes: &[u8]) -> Result<String, String> {
        match self {
            TextEncoding::Utf8 => std::str::from_utf8(bytes)
                .map(|s| s.to_string())
                .map_err(|e| e.to_string()),
            TextEncoding::Latin1 => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
        }
    }
}

/// Decode every value of `entry`. The first failure is reported with its
/// attribute name.
pub(crate) fn decode_entry(entry: &RawEntry, encoding: TextEncoding) -> Result<Record, DirectoryError> {
    let mut record = Record::new();
    for (attr, values) in &entry.attrs {
        let mut decoded = Vec::with_capacity(values.len());
        for v in values {
            let s = encoding.decode(v).map_err(|reason| DirectoryError::Decode {
                attribute: attr.clone(),
                reason,
            })?;
            decoded.push(s);
        }
        record.insert(attr.clone(), decoded);
    }
    Ok(record)
}
