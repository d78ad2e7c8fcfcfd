use std::collections::VecDeque;

use async_trait::async_trait;

use crate::{DirectoryConnection, DirectoryError, Page, RawEntry, SearchRequest};

/// Scripted transport: hands out pre-built pages in order.
///
/// Each page after the first must be requested with the cookie the previous
/// page returned; a mismatch is a `Search` error, the same way a server
/// rejects a stale cookie. Requests are recorded for inspection.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    pages: VecDeque<Result<Page, DirectoryError>>,
    expected_cookie: Vec<u8>,
    requests: Vec<(SearchRequest, Vec<u8>)>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Split `entries` into pages of `page_size` chained by numbered cookies.
    /// An empty list yields a single empty final page.
    pub fn paged(entries: Vec<RawEntry>, page_size: usize) -> Self {
        let size = page_size.max(1);
        let mut out = Self::new();
        if entries.is_empty() {
            out.pages.push_back(Ok(Page {
                entries: Vec::new(),
                cookie: Some(Vec::new()),
            }));
            return out;
        }
        let chunks: Vec<Vec<RawEntry>> = entries.chunks(size).map(|c| c.to_vec()).collect();
        let n = chunks.len();
        for (i, chunk) in chunks.into_iter().enumerate() {
            let cookie = if i + 1 < n {
                format!("page-{}", i + 1).into_bytes()
            } else {
                Vec::new()
            };
            out.pages.push_back(Ok(Page {
                entries: chunk,
                cookie: Some(cookie),
            }));
        }
        out
    }

    /// Append an explicit page.
    pub fn push_page(&mut self, page: Page) -> &mut Self {
        self.pages.push_back(Ok(page));
        self
    }

    /// Append a failure served in place of the next page.
    pub fn push_error(&mut self, err: DirectoryError) -> &mut Self {
        self.pages.push_back(Err(err));
        self
    }

    /// Every `(request, cookie)` received so far.
    pub fn requests(&self) -> &[(SearchRequest, Vec<u8>)] {
        &self.requests
    }
}

#[async_trait]
impl DirectoryConnection for MemoryDirectory {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn search_page(
        &mut self,
        req: &SearchRequest,
        cookie: &[u8],
    ) -> Result<Page, DirectoryError> {
        self.requests.push((req.clone(), cookie.to_vec()));

        if cookie != self.expected_cookie.as_slice() {
            return Err(DirectoryError::Search(format!(
                "unexpected paging cookie {:?}",
                String::from_utf8_lossy(cookie)
            )));
        }

        let page = self
            .pages
            .pop_front()
            .ok_or_else(|| DirectoryError::Search("no more scripted pages".to_string()))??;

        self.expected_cookie = page.cookie.clone().unwrap_or_default();
        Ok(page)
    }
}
