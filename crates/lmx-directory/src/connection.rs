use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::DirectoryError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SearchScope {
    Base,
    OneLevel,
    #[default]
    Subtree,
}

/// One paged search. `attributes` empty means "all attributes".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub base: String,
    pub scope: SearchScope,
    pub filter: String,
    pub attributes: Vec<String>,
    /// Upper bound on entries per page; does not bound the total.
    pub page_size: u32,
}

impl SearchRequest {
    pub fn new(filter: impl Into<String>, page_size: u32) -> Self {
        Self {
            base: String::new(),
            scope: SearchScope::Subtree,
            filter: filter.into(),
            attributes: Vec::new(),
            page_size,
        }
    }

    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = base.into();
        self
    }

    pub fn with_scope(mut self, scope: SearchScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_attributes<I, S>(mut self, attrs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes = attrs.into_iter().map(Into::into).collect();
        self
    }
}

/// A directory entry before text decoding: values as received on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEntry {
    pub dn: String,
    pub attrs: BTreeMap<String, Vec<Vec<u8>>>,
}

impl RawEntry {
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attrs: BTreeMap::new(),
        }
    }

    pub fn with(mut self, attr: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.attrs.entry(attr.into()).or_default().push(value.into());
        self
    }
}

/// One page of results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub entries: Vec<RawEntry>,
    /// Continuation cookie from the paging control. `None` when the response
    /// carried no paging control at all.
    pub cookie: Option<Vec<u8>>,
}

impl Page {
    /// True when no further page should be requested.
    pub fn is_last(&self) -> bool {
        self.cookie.as_ref().map(|c| c.is_empty()).unwrap_or(true)
    }
}

/// Directory transport contract.
///
/// A connection is owned by exactly one fetch for its whole page sequence.
/// Implementations must be `Send` so a fetch can run on any runtime worker.
#[async_trait]
pub trait DirectoryConnection: Send {
    /// Human-readable transport name (e.g. `"ldap"`, `"memory"`).
    fn name(&self) -> &'static str;

    /// Issue one page request carrying `cookie` (empty for the first page).
    async fn search_page(
        &mut self,
        req: &SearchRequest,
        cookie: &[u8],
    ) -> Result<Page, DirectoryError>;
}
