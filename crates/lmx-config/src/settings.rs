use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::LoadedConfig;

/// Attributes requested from the directory by default. The built-in field map
/// covers exactly these.
pub const DEFAULT_ATTRIBUTES: &[&str] = &[
    "employeeID",
    "givenName",
    "sn",
    "displayName",
    "facsimileTelephoneNumber",
    "telephoneNumber",
    "mobile",
    "mail",
    "department",
    "cernGroup",
    "description",
    "division",
    "extensionAttribute12",
    "cernInstituteName",
    "extensionAttribute11",
];

/// Typed view of the merged configuration. Every key has a default, so an
/// empty document is a valid configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub directory: DirectoryConfig,
    pub snapshot: SnapshotConfig,
    pub output: OutputConfig,
    pub mapping: MappingConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeSetting {
    Base,
    #[serde(alias = "one_level")]
    Onelevel,
    #[default]
    Subtree,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncodingSetting {
    #[default]
    #[serde(alias = "utf-8")]
    Utf8,
    #[serde(alias = "iso-8859-1")]
    Latin1,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodeFailureSetting {
    #[default]
    Propagate,
    SkipRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    pub url: String,
    pub base_dn: String,
    pub scope: ScopeSetting,
    pub filter: String,
    /// Empty = all attributes.
    pub attributes: Vec<String>,
    pub page_size: u32,
    pub bind_dn: Option<String>,
    /// NAME of the env var holding the bind password, never the password.
    pub bind_password_env: Option<String>,
    pub encoding: EncodingSetting,
    pub decode_failure: DecodeFailureSetting,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            url: "ldap://xldap.cern.ch:389".to_string(),
            base_dn: "OU=Users,OU=Organic Units,DC=cern,DC=ch".to_string(),
            scope: ScopeSetting::Subtree,
            filter: "(&(objectClass=*)(employeeType=Primary))".to_string(),
            attributes: DEFAULT_ATTRIBUTES.iter().map(|s| s.to_string()).collect(),
            page_size: 250,
            bind_dn: None,
            bind_password_env: None,
            encoding: EncodingSetting::Utf8,
            decode_failure: DecodeFailureSetting::Propagate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    pub path: String,
    /// Number of timestamped archives kept after rotation.
    pub retain: usize,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            path: "records.json".to_string(),
            retain: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Base path for full exports (first run, `--full`, `export`).
    pub full_path: String,
    /// Base path for incremental update documents.
    pub updates_path: String,
    /// Records per full-export document; `<= 0` writes a single document.
    pub chunk_size: i64,
    /// Records per update document; `<= 0` writes a single document.
    pub update_chunk_size: i64,
    pub report_path: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            full_path: "records.xml".to_string(),
            updates_path: "records_updated.xml".to_string(),
            chunk_size: 500,
            update_chunk_size: 0,
            report_path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingConfig {
    pub identifier_attribute: String,
    pub identifier_prefix: String,
    /// Replaces the built-in field map when present. Order is output order.
    pub fields: Option<Vec<FieldRule>>,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            identifier_attribute: "employeeID".to_string(),
            identifier_prefix: "AUTHOR|(SzGeCERN)".to_string(),
            fields: None,
        }
    }
}

/// `attribute` -> compact MARC field notation such as `"371__m"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRule {
    pub attribute: String,
    pub field: String,
    #[serde(default)]
    pub repeatable: bool,
}

impl SyncConfig {
    pub fn from_json(config_json: &Value) -> Result<Self> {
        let cfg: SyncConfig =
            serde_json::from_value(config_json.clone()).context("invalid sync config")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_loaded(loaded: &LoadedConfig) -> Result<Self> {
        Self::from_json(&loaded.config_json)
    }

    fn validate(&self) -> Result<()> {
        if self.directory.page_size == 0 {
            bail!("CONFIG_INVALID /directory/page_size must be positive");
        }
        if self.directory.url.trim().is_empty() {
            bail!("CONFIG_INVALID /directory/url must not be empty");
        }
        if self.snapshot.path.trim().is_empty() {
            bail!("CONFIG_INVALID /snapshot/path must not be empty");
        }
        if self.mapping.identifier_attribute.trim().is_empty() {
            bail!("CONFIG_INVALID /mapping/identifier_attribute must not be empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_layered_yaml_from_strings;

    #[test]
    fn empty_document_yields_defaults() {
        let loaded = load_layered_yaml_from_strings(&[""]).unwrap();
        let cfg = SyncConfig::from_loaded(&loaded).unwrap();
        assert_eq!(cfg, SyncConfig::default());
        assert_eq!(cfg.directory.page_size, 250);
        assert_eq!(cfg.directory.attributes.len(), 15);
        assert_eq!(cfg.mapping.identifier_prefix, "AUTHOR|(SzGeCERN)");
    }

    #[test]
    fn enums_parse_from_snake_case() {
        let yaml = r#"
directory:
  scope: onelevel
  encoding: latin1
  decode_failure: skip_record
"#;
        let loaded = load_layered_yaml_from_strings(&[yaml]).unwrap();
        let cfg = SyncConfig::from_loaded(&loaded).unwrap();
        assert_eq!(cfg.directory.scope, ScopeSetting::Onelevel);
        assert_eq!(cfg.directory.encoding, EncodingSetting::Latin1);
        assert_eq!(cfg.directory.decode_failure, DecodeFailureSetting::SkipRecord);
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let loaded = load_layered_yaml_from_strings(&["directory:\n  page_size: 0\n"]).unwrap();
        let err = SyncConfig::from_loaded(&loaded).unwrap_err();
        assert!(format!("{err:#}").contains("page_size"));
    }

    #[test]
    fn field_rules_keep_declared_order() {
        let yaml = r#"
mapping:
  fields:
    - { attribute: mail, field: "371__m" }
    - { attribute: employeeID, field: "035__a" }
    - { attribute: cernGroup, field: "371__g", repeatable: true }
"#;
        let loaded = load_layered_yaml_from_strings(&[yaml]).unwrap();
        let cfg = SyncConfig::from_loaded(&loaded).unwrap();
        let fields = cfg.mapping.fields.unwrap();
        let attrs: Vec<&str> = fields.iter().map(|f| f.attribute.as_str()).collect();
        assert_eq!(attrs, vec!["mail", "employeeID", "cernGroup"]);
        assert!(fields[2].repeatable);
    }
}
