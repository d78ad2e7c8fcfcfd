//! Typed config -> runtime values.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use lmx_config::secrets::ResolvedSecrets;
use lmx_config::{
    DecodeFailureSetting, DirectoryConfig, EncodingSetting, MappingConfig, ScopeSetting,
    SyncConfig,
};
use lmx_directory::{
    CancelFlag, DecodePolicy, FetchOptions, LdapSettings, SearchRequest, SearchScope, TextEncoding,
};
use lmx_marc::{FieldDescriptor, FieldMapping, Mapper, MapperConfig};

use crate::{OutputTarget, SyncJob, SyncMode};

pub fn search_request(cfg: &DirectoryConfig) -> SearchRequest {
    let scope = match cfg.scope {
        ScopeSetting::Base => SearchScope::Base,
        ScopeSetting::Onelevel => SearchScope::OneLevel,
        ScopeSetting::Subtree => SearchScope::Subtree,
    };
    SearchRequest::new(cfg.filter.clone(), cfg.page_size)
        .with_base(cfg.base_dn.clone())
        .with_scope(scope)
        .with_attributes(cfg.attributes.iter().cloned())
}

pub fn fetch_options(cfg: &DirectoryConfig, cancel: CancelFlag) -> FetchOptions {
    FetchOptions {
        encoding: match cfg.encoding {
            EncodingSetting::Utf8 => TextEncoding::Utf8,
            EncodingSetting::Latin1 => TextEncoding::Latin1,
        },
        decode_policy: match cfg.decode_failure {
            DecodeFailureSetting::Propagate => DecodePolicy::Propagate,
            DecodeFailureSetting::SkipRecord => DecodePolicy::SkipRecord,
        },
        cancel,
    }
}

pub fn ldap_settings(cfg: &DirectoryConfig, secrets: &ResolvedSecrets) -> LdapSettings {
    LdapSettings {
        url: cfg.url.clone(),
        bind_dn: cfg.bind_dn.clone(),
        bind_password: secrets.bind_password.clone(),
        connect_timeout: Duration::from_secs(30),
    }
}

/// Built-in CERN field map unless the config lists its own fields.
pub fn mapper_from_config(cfg: &MappingConfig) -> Result<Mapper> {
    let mapping = match &cfg.fields {
        None => FieldMapping::cern_people(),
        Some(rules) => {
            let mut m = FieldMapping::new();
            for rule in rules {
                let mut desc = FieldDescriptor::parse(&rule.field)
                    .with_context(|| format!("CONFIG_INVALID /mapping/fields: {}", rule.attribute))?;
                desc.repeatable = rule.repeatable;
                m.push(rule.attribute.clone(), desc);
            }
            m
        }
    };
    let config = MapperConfig {
        identifier_attribute: cfg.identifier_attribute.clone(),
        identifier_prefix: cfg.identifier_prefix.clone(),
        ..MapperConfig::default()
    };
    Ok(Mapper::new(mapping, config))
}

impl SyncJob {
    pub fn from_config(cfg: &SyncConfig, mode: SyncMode, cancel: CancelFlag) -> Self {
        Self {
            request: search_request(&cfg.directory),
            fetch: fetch_options(&cfg.directory, cancel),
            key_attribute: cfg.mapping.identifier_attribute.clone(),
            snapshot_path: PathBuf::from(&cfg.snapshot.path),
            retain: cfg.snapshot.retain,
            full_output: OutputTarget {
                path: PathBuf::from(&cfg.output.full_path),
                chunk_size: cfg.output.chunk_size,
            },
            update_output: OutputTarget {
                path: PathBuf::from(&cfg.output.updates_path),
                chunk_size: cfg.output.update_chunk_size,
            },
            mode,
            config_hash: None,
        }
    }

    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        self.config_hash = Some(hash.into());
        self
    }
}
