use crate::FieldDescriptor;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subfield {
    pub code: char,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataField {
    pub tag: String,
    pub ind1: char,
    pub ind2: char,
    pub subfields: Vec<Subfield>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    Control { tag: String, value: String },
    Data(DataField),
}

/// One MARC record: fields in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappedElement {
    fields: Vec<Field>,
}

impl MappedElement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Place `value` according to `desc`.
    ///
    /// Control descriptors add a control field; a non-repeatable control tag
    /// keeps its first value. Data descriptors append a subfield to the first
    /// data field with the same tag and indicators, or open a new data field
    /// when none exists or the descriptor is repeatable.
    pub fn add(&mut self, desc: &FieldDescriptor, value: impl Into<String>) {
        let value = value.into();
        let Some(code) = desc.subfield else {
            let exists = self
                .fields
                .iter()
                .any(|f| matches!(f, Field::Control { tag, .. } if *tag == desc.tag));
            if desc.repeatable || !exists {
                self.fields.push(Field::Control {
                    tag: desc.tag.clone(),
                    value,
                });
            }
            return;
        };

        let subfield = Subfield { code, value };
        if !desc.repeatable {
            if let Some(df) = self.fields.iter_mut().find_map(|f| match f {
                Field::Data(df) if df.tag == desc.tag && df.ind1 == desc.ind1 && df.ind2 == desc.ind2 => {
                    Some(df)
                }
                _ => None,
            }) {
                df.subfields.push(subfield);
                return;
            }
        }
        self.fields.push(Field::Data(DataField {
            tag: desc.tag.clone(),
            ind1: desc.ind1,
            ind2: desc.ind2,
            subfields: vec![subfield],
        }));
    }

    pub fn data_fields<'a, 't>(&'a self, tag: &'t str) -> impl Iterator<Item = &'a DataField> + 't
    where
        'a: 't,
    {
        self.fields.iter().filter_map(move |f| match f {
            Field::Data(df) if df.tag == tag => Some(df),
            _ => None,
        })
    }

    pub fn control(&self, tag: &str) -> Option<&str> {
        self.fields.iter().find_map(|f| match f {
            Field::Control { tag: t, value } if t == tag => Some(value.as_str()),
            _ => None,
        })
    }

    /// Every value of subfield `code` across all `tag` data fields, in order.
    pub fn subfield_values(&self, tag: &str, code: char) -> Vec<&str> {
        self.data_fields(tag)
            .flat_map(|df| df.subfields.iter())
            .filter(|sf| sf.code == code)
            .map(|sf| sf.value.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> FieldDescriptor {
        FieldDescriptor::parse(s).unwrap()
    }

    #[test]
    fn non_repeatable_reuses_matching_datafield() {
        let mut el = MappedElement::new();
        el.add(&d("371__k"), "+41 22 767 1111");
        el.add(&d("371__m"), "jane.doe@cern.ch");
        assert_eq!(el.data_fields("371").count(), 1);
        assert_eq!(el.subfield_values("371", 'm'), vec!["jane.doe@cern.ch"]);
    }

    #[test]
    fn indicators_distinguish_datafields() {
        let mut el = MappedElement::new();
        el.add(&d("1000_a"), "Jane");
        el.add(&d("1001_a"), "Doe");
        el.add(&d("100__a"), "Jane Doe");
        assert_eq!(el.data_fields("100").count(), 3);
    }

    #[test]
    fn repeatable_opens_new_datafield_each_time() {
        let mut el = MappedElement::new();
        el.add(&d("980__a").repeatable(), "PEOPLE");
        el.add(&d("980__a").repeatable(), "AUTHORITY");
        assert_eq!(el.data_fields("980").count(), 2);
    }

    #[test]
    fn lookups_outlive_the_tag_argument() {
        let mut el = MappedElement::new();
        el.add(&d("980__a").repeatable(), "PEOPLE");
        el.add(&d("980__a").repeatable(), "AUTHORITY");

        let found: Vec<&DataField> = {
            let tag = String::from("980");
            el.data_fields(&tag).collect()
        };
        let values = {
            let tag = "980".to_string();
            el.subfield_values(&tag, 'a')
        };

        assert_eq!(found.len(), 2);
        assert_eq!(values, vec!["PEOPLE", "AUTHORITY"]);
    }

    #[test]
    fn non_repeatable_control_keeps_first_value() {
        let mut el = MappedElement::new();
        el.add(&d("001"), "first");
        el.add(&d("001"), "second");
        assert_eq!(el.control("001"), Some("first"));
        assert_eq!(el.fields().len(), 1);
    }
}
