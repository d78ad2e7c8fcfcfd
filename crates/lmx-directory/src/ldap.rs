//! LDAP transport on `ldap3`, using the simple paged results control.

use std::time::Duration;

use async_trait::async_trait;
use ldap3::controls::{Control, ControlType, PagedResults, RawControl};
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, Scope, SearchEntry};
use tracing::{debug, warn};

use crate::{DirectoryConnection, DirectoryError, Page, RawEntry, SearchRequest, SearchScope};

/// Bind password is passed resolved; it is never logged.
#[derive(Clone)]
pub struct LdapSettings {
    pub url: String,
    pub bind_dn: Option<String>,
    pub bind_password: Option<String>,
    pub connect_timeout: Duration,
}

impl std::fmt::Debug for LdapSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LdapSettings")
            .field("url", &self.url)
            .field("bind_dn", &self.bind_dn)
            .field("bind_password", &self.bind_password.as_ref().map(|_| "<REDACTED>"))
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

impl LdapSettings {
    pub fn anonymous(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            bind_dn: None,
            bind_password: None,
            connect_timeout: Duration::from_secs(30),
        }
    }
}

/// One protocol-v3 LDAP session, owned by a single fetch.
pub struct LdapDirectory {
    ldap: Ldap,
}

impl LdapDirectory {
    /// Connect and, when a bind DN is configured, perform a simple bind.
    pub async fn connect(settings: &LdapSettings) -> Result<Self, DirectoryError> {
        debug!(url = %settings.url, "connecting to directory");

        let conn_settings = LdapConnSettings::new().set_conn_timeout(settings.connect_timeout);
        let (conn, mut ldap) = LdapConnAsync::with_settings(conn_settings, &settings.url)
            .await
            .map_err(|e| DirectoryError::Connect(format!("{}: {e}", settings.url)))?;

        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!(error = %e, "ldap connection driver error");
            }
        });

        if let Some(bind_dn) = settings.bind_dn.as_deref() {
            let password = settings.bind_password.as_deref().unwrap_or("");
            ldap.simple_bind(bind_dn, password)
                .await
                .and_then(|res| res.success())
                .map_err(|e| DirectoryError::Bind(format!("{bind_dn}: {e}")))?;
            debug!(bind_dn, "directory bind ok");
        }

        Ok(Self { ldap })
    }

    /// Close the session. Errors are logged, not returned.
    pub async fn close(mut self) {
        if let Err(e) = self.ldap.unbind().await {
            warn!(error = %e, "ldap unbind failed");
        }
    }
}

fn to_scope(scope: SearchScope) -> Scope {
    match scope {
        SearchScope::Base => Scope::Base,
        SearchScope::OneLevel => Scope::OneLevel,
        SearchScope::Subtree => Scope::Subtree,
    }
}

fn to_raw_entry(entry: SearchEntry) -> RawEntry {
    let mut raw = RawEntry::new(entry.dn);
    for (attr, values) in entry.attrs {
        raw.attrs
            .entry(attr)
            .or_default()
            .extend(values.into_iter().map(String::into_bytes));
    }
    for (attr, values) in entry.bin_attrs {
        raw.attrs.entry(attr).or_default().extend(values);
    }
    raw
}

#[async_trait]
impl DirectoryConnection for LdapDirectory {
    fn name(&self) -> &'static str {
        "ldap"
    }

    async fn search_page(
        &mut self,
        req: &SearchRequest,
        cookie: &[u8],
    ) -> Result<Page, DirectoryError> {
        let size = i32::try_from(req.page_size)
            .map_err(|_| DirectoryError::InvalidRequest(format!("page_size {} too large", req.page_size)))?;
        let control: RawControl = PagedResults {
            size,
            cookie: cookie.to_vec(),
        }
        .into();

        let attrs: Vec<&str> = req.attributes.iter().map(String::as_str).collect();
        let result = self
            .ldap
            .with_controls(vec![control])
            .search(&req.base, to_scope(req.scope), &req.filter, attrs)
            .await
            .map_err(|e| DirectoryError::Search(e.to_string()))?;

        let (entries, res) = result
            .success()
            .map_err(|e| DirectoryError::Search(e.to_string()))?;

        let cookie = res.ctrls.iter().find_map(|ctrl| match ctrl {
            Control(Some(ControlType::PagedResults), raw) => {
                Some(raw.parse::<PagedResults>().cookie)
            }
            _ => None,
        });

        Ok(Page {
            entries: entries
                .into_iter()
                .map(SearchEntry::construct)
                .map(to_raw_entry)
                .collect(),
            cookie,
        })
    }
}
