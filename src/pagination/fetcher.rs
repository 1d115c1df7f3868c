//! Paged fetcher
//!
//! Learns the total record count from a metadata probe, then requests
//! `$skip = 0, p, 2p, …` strictly one after another until `skip >= total`.
//! Termination is decided by the count, never by an empty or short page.

use super::types::{Page, PageCursor};
use crate::error::{Error, Result};
use crate::http::{HttpClient, RequestConfig};
use crate::query::QuerySpec;
use futures::stream::{self, Stream};
use serde_json::Value;
use tracing::{debug, info};

/// Sequential page source for one query
#[derive(Debug)]
pub struct PagedFetcher<'a> {
    client: &'a HttpClient,
    query: &'a QuerySpec,
    cursor: PageCursor,
}

impl<'a> PagedFetcher<'a> {
    /// Create a fetcher; nothing is requested until the first call
    pub fn new(client: &'a HttpClient, query: &'a QuerySpec) -> Result<Self> {
        Ok(Self {
            client,
            query,
            cursor: PageCursor::new(query.page_size())?,
        })
    }

    /// Skip the probe when the total is already known
    #[must_use]
    pub fn with_total(mut self, total: u64) -> Self {
        self.cursor.resolve_total(total);
        self
    }

    /// Current cursor
    pub fn cursor(&self) -> &PageCursor {
        &self.cursor
    }

    /// Ask upstream for the total record count.
    ///
    /// Sends the query's select/filter with `$top=1` and
    /// `$inlinecount=allpages`, then reads `metadata.count`.
    pub async fn probe_total(&mut self) -> Result<u64> {
        let total = probe_total(self.client, self.query).await?;
        self.cursor.resolve_total(total);
        Ok(total)
    }

    /// Fetch the next page, probing first if the total is unknown.
    ///
    /// Returns `Ok(None)` once the cursor reaches the total.
    pub async fn next_page(&mut self) -> Result<Option<Page>> {
        if self.cursor.total().is_none() {
            self.probe_total().await?;
        }

        let Some(skip) = self.cursor.next_skip() else {
            return Ok(None);
        };

        let params = self.query.page_params(skip)?;
        let body = self
            .client
            .get_text(
                self.query.dataset_url().as_str(),
                RequestConfig::with_query(params),
            )
            .await?;

        let page = Page {
            index: self.cursor.pages_issued(),
            skip,
            expected_records: self.cursor.expected_records_at(skip).unwrap_or_default(),
            body,
        };
        self.cursor.advance();

        info!(
            "Fetched page {}/{} (skip={}, {} bytes)",
            page.index + 1,
            self.cursor.expected_pages().unwrap_or_default(),
            skip,
            page.body.len()
        );
        Ok(Some(page))
    }

    /// Lazy sequence of pages; the next request is sent only when polled
    pub fn into_stream(self) -> impl Stream<Item = Result<Page>> + 'a {
        stream::try_unfold(self, |mut fetcher| async move {
            let page = fetcher.next_page().await?;
            Ok::<_, Error>(page.map(|page| (page, fetcher)))
        })
    }
}

/// Total record count for a query, read from the probe's `metadata.count`
pub async fn probe_total(client: &HttpClient, query: &QuerySpec) -> Result<u64> {
    let body: Value = client
        .get_json(
            query.dataset_url().as_str(),
            RequestConfig::with_query(query.probe_params()),
        )
        .await?;

    let total = extract_count(&body)?;
    debug!("Metadata probe for {} reported {total} records", query.dataset_name());
    Ok(total)
}

fn extract_count(body: &Value) -> Result<u64> {
    let count = body
        .get("metadata")
        .and_then(|m| m.get("count"))
        .ok_or_else(|| Error::decode("metadata probe response has no metadata.count"))?;

    count
        .as_u64()
        .or_else(|| count.as_str().and_then(|s| s.parse().ok()))
        .ok_or_else(|| Error::decode(format!("metadata.count is not a count: {count}")))
}

#[cfg(test)]
mod count_tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_count() {
        assert_eq!(extract_count(&json!({"metadata": {"count": 25}})).unwrap(), 25);
        assert_eq!(extract_count(&json!({"metadata": {"count": "7"}})).unwrap(), 7);
        assert!(extract_count(&json!({"metadata": {}})).is_err());
        assert!(extract_count(&json!({"metadata": {"count": -1}})).is_err());
        assert!(extract_count(&json!({"Things": []})).is_err());
    }
}
