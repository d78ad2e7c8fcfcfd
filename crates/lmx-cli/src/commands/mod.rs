//! Command handlers for `lmx`.
//!
//! Shared config loading and directory connection live here; each subcommand
//! has its own module.

pub mod diff;
pub mod export;
pub mod sync;

use anyhow::{Context, Result};
use lmx_config::secrets::resolve_secrets;
use lmx_config::{
    load_layered_yaml, report_unused_keys, ConfigMode, LoadedConfig, SyncConfig, UnusedKeyPolicy,
};
use lmx_directory::{CancelFlag, LdapDirectory};
use tracing::warn;

pub fn load_config(paths: &[String]) -> Result<LoadedConfig> {
    let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
    load_layered_yaml(&path_refs)
}

/// Load, check for unused keys, and extract the typed config.
pub fn load_sync_config(
    paths: &[String],
    mode: ConfigMode,
    policy: UnusedKeyPolicy,
) -> Result<(LoadedConfig, SyncConfig)> {
    let loaded = load_config(paths)?;
    let report = report_unused_keys(mode, &loaded.config_json, policy)?;
    for ptr in &report.unused_leaf_pointers {
        warn!(mode = mode.as_str(), pointer = %ptr, "config key is not used");
    }
    let cfg = SyncConfig::from_loaded(&loaded)?;
    Ok((loaded, cfg))
}

pub async fn connect(cfg: &SyncConfig) -> Result<LdapDirectory> {
    let secrets = resolve_secrets(&cfg.directory)?;
    let settings = lmx_sync::ldap_settings(&cfg.directory, &secrets);
    LdapDirectory::connect(&settings)
        .await
        .with_context(|| format!("cannot open directory at {}", cfg.directory.url))
}

/// Flag that flips on Ctrl-C. The run stops at the next page, record or
/// document boundary.
pub fn cancel_on_ctrl_c() -> CancelFlag {
    let cancel = CancelFlag::new();
    let flag = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; stopping at next boundary");
            flag.cancel();
        }
    });
    cancel
}
