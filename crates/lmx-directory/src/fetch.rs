use lmx_schemas::{CancelFlag, RecordSet};
use tracing::{debug, info, warn};

use crate::decode::decode_entry;
use crate::{DecodePolicy, DirectoryConnection, DirectoryError, SearchRequest, TextEncoding};

// ---------------------------------------------------------------------------
// Options / outcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    pub encoding: TextEncoding,
    pub decode_policy: DecodePolicy,
    pub cancel: CancelFlag,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchStats {
    pub pages: usize,
    pub entries: usize,
    /// Entries dropped under [`DecodePolicy::SkipRecord`].
    pub skipped: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchOutcome {
    /// Every decoded entry, pages concatenated in receipt order.
    pub records: RecordSet,
    pub stats: FetchStats,
}

// ---------------------------------------------------------------------------
// Paging loop
// ---------------------------------------------------------------------------

/// Retrieve the complete result set for `req`, following the paging cookie
/// until the server signals the end.
///
/// The first request carries an empty cookie. A page whose cookie is empty, or
/// which carried no paging control at all, is the last one. Any transport error
/// aborts the fetch and discards what was buffered.
pub async fn fetch<C>(
    conn: &mut C,
    req: &SearchRequest,
    options: &FetchOptions,
) -> Result<FetchOutcome, DirectoryError>
where
    C: DirectoryConnection + ?Sized,
{
    if req.page_size == 0 {
        return Err(DirectoryError::InvalidRequest(
            "page_size must be positive".to_string(),
        ));
    }
    if req.filter.trim().is_empty() {
        return Err(DirectoryError::InvalidRequest(
            "filter must not be empty".to_string(),
        ));
    }

    let mut records = RecordSet::new();
    let mut stats = FetchStats::default();
    let mut cookie: Vec<u8> = Vec::new();

    loop {
        if options.cancel.is_cancelled() {
            return Err(DirectoryError::Cancelled {
                pages_read: stats.pages,
            });
        }

        let page = conn.search_page(req, &cookie).await?;
        stats.pages += 1;
        let last = page.is_last();
        debug!(
            transport = conn.name(),
            page = stats.pages,
            entries = page.entries.len(),
            last,
            "directory page received"
        );

        for entry in &page.entries {
            stats.entries += 1;
            match decode_entry(entry, options.encoding) {
                Ok(record) => records.push(record),
                Err(err) => match options.decode_policy {
                    DecodePolicy::Propagate => return Err(err),
                    DecodePolicy::SkipRecord => {
                        warn!(dn = %entry.dn, error = %err, "skipping undecodable entry");
                        stats.skipped += 1;
                    }
                },
            }
        }

        match page.cookie {
            Some(next) if !next.is_empty() => cookie = next,
            _ => break,
        }
    }

    info!(
        transport = conn.name(),
        pages = stats.pages,
        records = records.len(),
        skipped = stats.skipped,
        "directory fetch complete"
    );

    Ok(FetchOutcome { records, stats })
}
