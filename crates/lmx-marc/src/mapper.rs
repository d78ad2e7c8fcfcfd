use chrono::NaiveDate;
use lmx_schemas::{CancelFlag, DiffEntry, DiffStatus, Record, DEFAULT_KEY_ATTRIBUTE};
use tracing::debug;

use crate::{FieldDescriptor, FieldMapping, MappedElement, MappingError};

/// Provenance prefix for CERN person identifiers.
pub const DEFAULT_IDENTIFIER_PREFIX: &str = "AUTHOR|(SzGeCERN)";

const REMOVAL_TAG: &str = "595";
const REMOVAL_NOTE: &str = "REMOVED FROM SOURCE";

/// A constant field appended to every element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedField {
    pub descriptor: FieldDescriptor,
    pub value: String,
}

impl FixedField {
    pub fn new(descriptor: FieldDescriptor, value: impl Into<String>) -> Self {
        Self {
            descriptor,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapperConfig {
    /// Attribute whose value gets `identifier_prefix` (the reconciliation key).
    pub identifier_attribute: String,
    pub identifier_prefix: String,
    pub fixed_fields: Vec<FixedField>,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            identifier_attribute: DEFAULT_KEY_ATTRIBUTE.to_string(),
            identifier_prefix: DEFAULT_IDENTIFIER_PREFIX.to_string(),
            fixed_fields: cern_fixed_fields(),
        }
    }
}

fn cern_fixed_fields() -> Vec<FixedField> {
    let field = |tag: &str, ind1: char, code: char, repeatable: bool, value: &str| FixedField {
        descriptor: FieldDescriptor {
            tag: tag.to_string(),
            ind1,
            ind2: ' ',
            subfield: Some(code),
            repeatable,
        },
        value: value.to_string(),
    };
    vec![
        field("371", ' ', 'v', false, "CERN LDAP"),
        field("690", 'C', 'a', true, "CERN"),
        field("980", ' ', 'a', true, "PEOPLE"),
        field("980", ' ', 'a', true, "AUTHORITY"),
    ]
}

/// Downstream identifier registry, consulted before emitting a retraction.
pub trait IdentifierLookup {
    /// `key` is the prefixed identifier as it appears in the output.
    fn exists(&self, key: &str) -> bool;
}

/// Treats every identifier as known downstream.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeKnown;

impl IdentifierLookup for AssumeKnown {
    fn exists(&self, _key: &str) -> bool {
        true
    }
}

impl<F> IdentifierLookup for F
where
    F: Fn(&str) -> bool,
{
    fn exists(&self, key: &str) -> bool {
        self(key)
    }
}

/// Record -> MARC element mapper.
#[derive(Debug, Clone)]
pub struct Mapper {
    mapping: FieldMapping,
    config: MapperConfig,
    cancel: CancelFlag,
}

impl Default for Mapper {
    fn default() -> Self {
        Self::new(FieldMapping::cern_people(), MapperConfig::default())
    }
}

impl Mapper {
    pub fn new(mapping: FieldMapping, config: MapperConfig) -> Self {
        Self {
            mapping,
            config,
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn mapping(&self) -> &FieldMapping {
        &self.mapping
    }

    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    /// Output identifier of `record`, or `None` when it lacks the attribute.
    pub fn prefixed_identifier(&self, record: &Record) -> Option<String> {
        record
            .first(&self.config.identifier_attribute)
            .map(|id| format!("{}{id}", self.config.identifier_prefix))
    }

    /// Map one record. Rules run in declared order; only the first value of a
    /// multi-valued attribute is used.
    pub fn map_record(&self, record: &Record) -> MappedElement {
        let mut el = MappedElement::new();
        for rule in self.mapping.iter() {
            let value = match record.first(&rule.attribute) {
                Some(v) => v,
                None => continue,
            };
            if rule.attribute == self.config.identifier_attribute {
                el.add(&rule.descriptor, format!("{}{value}", self.config.identifier_prefix));
            } else {
                el.add(&rule.descriptor, value);
            }
        }
        for fixed in &self.config.fixed_fields {
            el.add(&fixed.descriptor, fixed.value.clone());
        }
        el
    }

    pub fn map_records(&self, records: &[Record]) -> Result<Vec<MappedElement>, MappingError> {
        let mut out = Vec::with_capacity(records.len());
        for record in records {
            self.check_cancel()?;
            out.push(self.map_record(record));
        }
        Ok(out)
    }

    /// Map diff entries in order; removals are annotated with `removal_date`.
    pub fn map_diff(
        &self,
        entries: &[DiffEntry],
        removal_date: NaiveDate,
    ) -> Result<Vec<MappedElement>, MappingError> {
        self.map_diff_with_lookup(entries, removal_date, &AssumeKnown)
    }

    /// Like [`Mapper::map_diff`], but a removal whose identifier `lookup` does
    /// not know is dropped: there is nothing downstream to retract.
    pub fn map_diff_with_lookup(
        &self,
        entries: &[DiffEntry],
        removal_date: NaiveDate,
        lookup: &dyn IdentifierLookup,
    ) -> Result<Vec<MappedElement>, MappingError> {
        let mut out = Vec::with_capacity(entries.len());
        for entry in entries {
            self.check_cancel()?;
            if entry.status == DiffStatus::Removed {
                let known = self
                    .prefixed_identifier(&entry.record)
                    .map(|key| lookup.exists(&key))
                    .unwrap_or(false);
                if !known {
                    debug!(
                        id = entry.record.first(&self.config.identifier_attribute).unwrap_or(""),
                        "removed record unknown downstream; skipped"
                    );
                    continue;
                }
            }

            let mut el = self.map_record(&entry.record);
            if entry.status == DiffStatus::Removed {
                annotate_removal(&mut el, removal_date);
            }
            out.push(el);
        }
        Ok(out)
    }

    fn check_cancel(&self) -> Result<(), MappingError> {
        if self.cancel.is_cancelled() {
            return Err(MappingError::Cancelled);
        }
        Ok(())
    }
}

fn annotate_removal(el: &mut MappedElement, date: NaiveDate) {
    let field = |code: char| FieldDescriptor {
        tag: REMOVAL_TAG.to_string(),
        ind1: ' ',
        ind2: ' ',
        subfield: Some(code),
        repeatable: true,
    };
    el.add(&field('a'), REMOVAL_NOTE);
    el.add(&field('c'), date.format("%Y-%m-%d").to_string());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jane() -> Record {
        Record::new()
            .with("employeeID", "123456")
            .with("givenName", "Jane")
            .with("sn", "Doe")
            .with("mail", "jane.doe@cern.ch")
            .with("mail", "jd@cern.ch")
            .with("telephoneNumber", "+41 22 76 71111")
    }

    #[test]
    fn identifier_gets_provenance_prefix() {
        let el = Mapper::default().map_record(&jane());
        assert_eq!(el.subfield_values("035", 'a'), vec!["AUTHOR|(SzGeCERN)123456"]);
    }

    #[test]
    fn only_first_value_is_mapped() {
        let el = Mapper::default().map_record(&jane());
        assert_eq!(el.subfield_values("371", 'm'), vec!["jane.doe@cern.ch"]);
    }

    #[test]
    fn fixed_371_merges_into_mapped_371() {
        let el = Mapper::default().map_record(&jane());
        let f371: Vec<_> = el.data_fields("371").collect();
        assert_eq!(f371.len(), 1);
        let codes: Vec<char> = f371[0].subfields.iter().map(|s| s.code).collect();
        assert_eq!(codes, vec!['k', 'm', 'v']);
    }

    #[test]
    fn record_without_mapped_attributes_gets_fixed_fields_only() {
        let el = Mapper::default().map_record(&Record::new().with("cn", "svc-account"));
        assert!(el.subfield_values("035", 'a').is_empty());
        assert_eq!(el.subfield_values("371", 'v'), vec!["CERN LDAP"]);
        assert_eq!(el.subfield_values("980", 'a'), vec!["PEOPLE", "AUTHORITY"]);
        assert_eq!(el.data_fields("690").next().unwrap().ind1, 'C');
    }

    #[test]
    fn closure_works_as_lookup() {
        let known = |key: &str| key.ends_with("123456");
        assert!(known.exists("AUTHOR|(SzGeCERN)123456"));
        assert!(!known.exists("AUTHOR|(SzGeCERN)9"));
    }

    #[test]
    fn cancelled_mapper_stops() {
        let cancel = CancelFlag::new();
        cancel.cancel();
        let mapper = Mapper::default().with_cancel(cancel);
        assert!(matches!(mapper.map_records(&[jane()]), Err(MappingError::Cancelled)));
    }
}
