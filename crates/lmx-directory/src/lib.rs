//! lmx-directory
//!
//! Cursor-paginated directory fetch.
//!
//! This crate owns the connection seam ([`DirectoryConnection`]), the paging
//! loop ([`fetch`]) and two transports: [`MemoryDirectory`] (scripted pages)
//! and, behind the `ldap` feature, [`LdapDirectory`].
//! It does **not** diff, map or persist anything.

mod connection;
mod decode;
mod error;
mod fetch;
mod memory;

#[cfg(feature = "ldap")]
mod ldap;

pub use connection::{DirectoryConnection, Page, RawEntry, SearchRequest, SearchScope};
pub use decode::{DecodePolicy, TextEncoding};
pub use error::DirectoryError;
pub use fetch::{fetch, FetchOptions, FetchOutcome, FetchStats};
pub use lmx_schemas::CancelFlag;
pub use memory::MemoryDirectory;

#[cfg(feature = "ldap")]
pub use ldap::{LdapDirectory, LdapSettings};
