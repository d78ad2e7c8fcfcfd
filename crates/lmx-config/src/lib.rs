//! lmx-config
//!
//! Layered YAML configuration for the sync pipeline.
//!
//! - YAML documents are merged in order (later overrides earlier) into JSON.
//! - The merged document is hashed (SHA-256 of its canonical JSON) so every
//!   run report can name the exact configuration it ran with.
//! - Secret-looking literals are refused; the bind password is always read
//!   from an env var named in the config (see [`secrets`]).
//! - [`report_unused_keys`] flags keys nothing reads, which catches typos like
//!   `directory/pagesize`.
//! - [`SyncConfig`] is the typed view the pipeline consumes.

pub mod secrets;
mod settings;

pub use settings::*;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fs;

/// Known secret-like prefixes. A leaf string starting with one of these
/// aborts loading with CONFIG_SECRET_DETECTED.
const SECRET_PREFIXES: &[&str] = &[
    "-----BEGIN", // PEM private keys
    "{SSHA}",     // LDAP salted hashes
    "{SHA}",
    "{CRYPT}",
    "ghp_",   // GitHub PAT
    "glpat-", // GitLab PAT
    "AKIA",   // AWS access key ID
];

/// Keys whose value is itself a secret when written inline.
const SECRET_KEYS: &[&str] = &["bind_password", "password"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigMode {
    /// Incremental sync against the stored snapshot.
    Sync,
    /// One-shot export, no snapshot involved.
    Export,
}

impl ConfigMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigMode::Sync => "SYNC",
            ConfigMode::Export => "EXPORT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnusedKeyPolicy {
    Warn,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnusedKeyReport {
    pub mode: String,
    pub consumed_prefixes: Vec<String>,
    /// Sorted.
    pub unused_leaf_pointers: Vec<String>,
}

impl UnusedKeyReport {
    pub fn is_clean(&self) -> bool {
        self.unused_leaf_pointers.is_empty()
    }
}

const DIRECTORY_POINTERS: &[&str] = &[
    "/directory/url",
    "/directory/base_dn",
    "/directory/scope",
    "/directory/filter",
    "/directory/attributes",
    "/directory/page_size",
    "/directory/bind_dn",
    "/directory/bind_password_env",
    "/directory/encoding",
    "/directory/decode_failure",
];

const MAPPING_POINTERS: &[&str] = &[
    "/mapping/identifier_attribute",
    "/mapping/identifier_prefix",
    "/mapping/fields",
];

/// JSON-pointer prefixes read by the pipeline in each mode. Keep in step with
/// [`SyncConfig`].
pub fn consumed_pointers_for_mode(mode: ConfigMode) -> Vec<&'static str> {
    let mut out: Vec<&'static str> = Vec::new();
    out.extend_from_slice(DIRECTORY_POINTERS);
    out.extend_from_slice(MAPPING_POINTERS);
    match mode {
        ConfigMode::Sync => out.extend_from_slice(&[
            "/snapshot/path",
            "/snapshot/retain",
            "/output/full_path",
            "/output/updates_path",
            "/output/chunk_size",
            "/output/update_chunk_size",
            "/output/report_path",
        ]),
        ConfigMode::Export => out.extend_from_slice(&["/output/full_path", "/output/chunk_size"]),
    }
    out
}

/// Leaf keys of `config_json` that no consumed pointer for `mode` covers.
///
/// With [`UnusedKeyPolicy::Fail`] a non-empty result is an error.
pub fn report_unused_keys(
    mode: ConfigMode,
    config_json: &Value,
    policy: UnusedKeyPolicy,
) -> Result<UnusedKeyReport> {
    let consumed: BTreeSet<&'static str> = consumed_pointers_for_mode(mode).into_iter().collect();
    let unused: BTreeSet<String> = leaf_pointers(config_json)
        .into_iter()
        .filter(|leaf| !consumed.iter().any(|c| covers(c, leaf)))
        .collect();

    let report = UnusedKeyReport {
        mode: mode.as_str().to_string(),
        consumed_prefixes: consumed.iter().map(|c| c.to_string()).collect(),
        unused_leaf_pointers: unused.into_iter().collect(),
    };

    if policy == UnusedKeyPolicy::Fail && !report.is_clean() {
        let shown: Vec<&str> = report
            .unused_leaf_pointers
            .iter()
            .take(12)
            .map(String::as_str)
            .collect();
        bail!(
            "CONFIG_UNUSED_KEYS (mode={}): {} key(s) not read by lmx, check spelling: {}",
            report.mode,
            report.unused_leaf_pointers.len(),
            shown.join(", ")
        );
    }

    Ok(report)
}

/// `/output/chunk_size` covers itself and anything below it, never a sibling
/// such as `/output/chunk_size_x`.
fn covers(prefix: &str, leaf: &str) -> bool {
    match leaf.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// JSON pointers of every scalar in `v`. Array elements are indexed.
fn leaf_pointers(v: &Value) -> Vec<String> {
    fn walk(v: &Value, at: &mut String, out: &mut Vec<String>) {
        let mark = at.len();
        match v {
            Value::Object(map) => {
                for (key, child) in map {
                    at.push('/');
                    at.push_str(&key.replace('~', "~0").replace('/', "~1"));
                    walk(child, at, out);
                    at.truncate(mark);
                }
            }
            Value::Array(items) => {
                for (i, child) in items.iter().enumerate() {
                    at.push('/');
                    at.push_str(&i.to_string());
                    walk(child, at, out);
                    at.truncate(mark);
                }
            }
            _ if at.is_empty() => out.push("/".to_string()),
            _ => out.push(at.clone()),
        }
    }

    let mut out = Vec::new();
    walk(v, &mut String::new(), &mut out);
    out
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
}

pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let mut docs: Vec<String> = Vec::new();
    for p in paths {
        let raw =
            fs::read_to_string(p).with_context(|| format!("failed to read yaml path: {p}"))?;
        docs.push(raw);
    }

    let doc_refs: Vec<&str> = docs.iter().map(|s| s.as_str()).collect();
    load_layered_yaml_from_strings(&doc_refs)
}

/// Merge YAML documents in order; a later layer overrides an earlier one key
/// by key, and replaces non-mapping values wholesale.
pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    let mut merged = Value::Object(serde_json::Map::new());
    for (layer, raw) in yaml_docs.iter().enumerate() {
        let doc: serde_yaml::Value =
            serde_yaml::from_str(raw).with_context(|| format!("invalid yaml in layer {layer}"))?;
        // An empty document parses as null.
        if doc.is_null() {
            continue;
        }
        let doc = serde_json::to_value(doc)
            .with_context(|| format!("layer {layer} is not representable as json"))?;
        overlay(&mut merged, doc);
    }

    enforce_no_secret_literals(&merged)?;

    let canonical_json =
        serde_json::to_string(&sorted(&merged)).context("canonical json serialize failed")?;
    let config_hash = hex::encode(Sha256::digest(canonical_json.as_bytes()));
    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config_json: merged,
    })
}

fn overlay(base: &mut Value, top: Value) {
    match (base, top) {
        (Value::Object(base_map), Value::Object(top_map)) => {
            for (key, value) in top_map {
                match base_map.get_mut(&key) {
                    Some(slot) => overlay(slot, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

/// Copy of `v` with object keys sorted at every depth; the hash must not
/// depend on key order in the YAML.
fn sorted(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, child)| (k.clone(), sorted(child)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
        other => other.clone(),
    }
}

fn enforce_no_secret_literals(v: &Value) -> Result<()> {
    for ptr in leaf_pointers(v) {
        let last = ptr.rsplit('/').next().unwrap_or_default();
        if SECRET_KEYS.contains(&last) {
            bail!(
                "CONFIG_SECRET_DETECTED leaf={} value=REDACTED \
                 (store the env var name under bind_password_env instead)",
                ptr
            );
        }
        if let Some(s) = v.pointer(&ptr).and_then(|val| val.as_str()) {
            if looks_like_secret(s) {
                bail!("CONFIG_SECRET_DETECTED leaf={} value=REDACTED", ptr);
            }
        }
    }
    Ok(())
}

fn looks_like_secret(s: &str) -> bool {
    let t = s.trim();
    if t.len() < 8 {
        return false;
    }
    SECRET_PREFIXES.iter().any(|p| t.starts_with(p))
}
