use std::fmt;

use crate::MappingError;

/// Target of one mapping rule: tag, two indicators, optional subfield code.
///
/// A descriptor without a subfield code addresses a control field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub tag: String,
    pub ind1: char,
    pub ind2: char,
    pub subfield: Option<char>,
    /// When false, a second value for the same tag + indicators is added to the
    /// existing data field instead of opening a new one.
    pub repeatable: bool,
}

impl FieldDescriptor {
    /// Parse compact `tttiis` notation: `"035__a"`, `"1001_a"`, `"690C_a"`.
    ///
    /// `_` in an indicator position is a blank; alphabetic indicators are
    /// upper-cased. `"ttt"` and `"tttii"` are accepted for control fields.
    pub fn parse(s: &str) -> Result<Self, MappingError> {
        let invalid = |reason: &str| MappingError::InvalidDescriptor {
            descriptor: s.to_string(),
            reason: reason.to_string(),
        };

        let chars: Vec<char> = s.chars().collect();
        if !matches!(chars.len(), 3 | 5 | 6) {
            return Err(invalid("expected 3, 5 or 6 characters"));
        }

        let tag: String = chars[..3].iter().collect();
        if !tag.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(invalid("tag must be alphanumeric"));
        }

        let (ind1, ind2) = if chars.len() >= 5 {
            (normalize_indicator(chars[3]), normalize_indicator(chars[4]))
        } else {
            (' ', ' ')
        };
        for ind in [ind1, ind2] {
            if !(ind == ' ' || ind.is_ascii_alphanumeric()) {
                return Err(invalid("indicator must be alphanumeric, '_' or blank"));
            }
        }

        let subfield = match chars.get(5) {
            Some(c) if c.is_ascii_alphanumeric() => Some(*c),
            Some(_) => return Err(invalid("subfield code must be alphanumeric")),
            None => None,
        };

        Ok(Self {
            tag,
            ind1,
            ind2,
            subfield,
            repeatable: false,
        })
    }

    pub fn repeatable(mut self) -> Self {
        self.repeatable = true;
        self
    }

    pub fn is_control(&self) -> bool {
        self.subfield.is_none()
    }
}

fn normalize_indicator(c: char) -> char {
    if c == '_' {
        ' '
    } else {
        c.to_ascii_uppercase()
    }
}

impl fmt::Display for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ind = |c: char| if c == ' ' { '_' } else { c };
        write!(f, "{}{}{}", self.tag, ind(self.ind1), ind(self.ind2))?;
        if let Some(code) = self.subfield {
            write!(f, "{code}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRule {
    pub attribute: String,
    pub descriptor: FieldDescriptor,
}

/// Ordered mapping rules. Output field order follows declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMapping {
    rules: Vec<FieldRule>,
}

impl FieldMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, attribute: impl Into<String>, descriptor: FieldDescriptor) -> &mut Self {
        self.rules.push(FieldRule {
            attribute: attribute.into(),
            descriptor,
        });
        self
    }

    /// Build from `(attribute, "tttiis")` pairs; all fields non-repeatable.
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self, MappingError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut m = Self::new();
        for (attr, desc) in pairs {
            m.push(attr, FieldDescriptor::parse(desc)?);
        }
        Ok(m)
    }

    /// CERN people profile: directory attributes to MARC 21 authority fields.
    pub fn cern_people() -> Self {
        const RULES: [(&str, &str); 15] = [
            ("employeeID", "035__a"),
            ("givenName", "1000_a"),
            ("sn", "1001_a"),
            ("displayName", "100__a"),
            ("facsimileTelephoneNumber", "371__f"),
            ("telephoneNumber", "371__k"),
            ("mobile", "371__l"),
            ("mail", "371__m"),
            ("department", "371__d"),
            ("cernGroup", "371__g"),
            ("description", "371__h"),
            ("division", "371__i"),
            ("extensionAttribute12", "371__j"),
            ("cernInstituteName", "371__0"),
            ("extensionAttribute11", "371__1"),
        ];
        let rules = RULES
            .iter()
            .filter_map(|(attr, desc)| {
                FieldDescriptor::parse(desc).ok().map(|descriptor| FieldRule {
                    attribute: attr.to_string(),
                    descriptor,
                })
            })
            .collect();
        Self { rules }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldRule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Attributes the mapping reads, in rule order (useful as a fetch allow-list).
    pub fn attributes(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.attribute.as_str()).collect()
    }
}
