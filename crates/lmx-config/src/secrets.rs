//! Runtime secret resolution.
//!
//! Config YAML stores only env var NAMES. [`resolve_secrets`] is called once at
//! startup and the result passed to constructors. Error messages name the
//! variable, never its value, and `Debug` redacts values.

use anyhow::{bail, Result};

use crate::DirectoryConfig;

#[derive(Clone, Default)]
pub struct ResolvedSecrets {
    /// Directory bind password. `None` for anonymous binds.
    pub bind_password: Option<String>,
}

impl std::fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSecrets")
            .field(
                "bind_password",
                &self.bind_password.as_ref().map(|_| "<REDACTED>"),
            )
            .finish()
    }
}

/// Resolve a named environment variable; unset or blank is `None`.
fn resolve_env(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

/// A `bind_dn` with a named password variable requires that variable to be
/// set. A `bind_dn` without one is an unauthenticated simple bind.
pub fn resolve_secrets(directory: &DirectoryConfig) -> Result<ResolvedSecrets> {
    let Some(var) = directory.bind_password_env.as_deref() else {
        return Ok(ResolvedSecrets::default());
    };

    if directory.bind_dn.is_none() {
        bail!(
            "SECRETS_UNUSED: /directory/bind_password_env is set ('{}') but /directory/bind_dn is not",
            var
        );
    }

    match resolve_env(var) {
        Some(pw) => Ok(ResolvedSecrets {
            bind_password: Some(pw),
        }),
        None => bail!(
            "SECRETS_MISSING: required env var '{}' (directory bind password) is not set or empty",
            var
        ),
    }
}
