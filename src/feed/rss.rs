//! RSS and Atom feed
//!
//! Each entry is a release: the title is the version, the content (or the
//! summary) the notes, and the first alternate link the URL. Entries are
//! yielded in document order.

use crate::error::{Error, Result};
use crate::feed::{
    FeedKind, FeedQuery, ReleaseFeed, ReleaseStream, RssQuery, find_in_stream, query_mismatch,
};
use crate::types::Release;
use async_trait::async_trait;
use feed_rs::model::Entry;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

fn entry_release(entry: Entry) -> Option<Release> {
    let version = entry.title.map(|t| t.content.trim().to_string())?;
    if version.is_empty() {
        return None;
    }
    let notes = entry
        .content
        .and_then(|c| c.body)
        .or_else(|| entry.summary.map(|s| s.content))
        .unwrap_or_default();
    let url = entry
        .links
        .iter()
        .find(|l| l.rel.as_deref().is_none_or(|rel| rel == "alternate"))
        .or_else(|| entry.links.first())
        .map(|l| l.href.clone())
        .unwrap_or_default();
    Some(Release {
        version,
        notes,
        url,
    })
}

/// Feed of the entries of an RSS or Atom document
#[derive(Debug, Clone)]
pub struct RssFeed {
    client: Client,
}

impl RssFeed {
    /// Create an RSS feed; the document URL comes with each query
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::Platform(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }

    async fn entries(&self, url: &str) -> Result<Vec<Release>> {
        debug!(url, "Fetching feed document");
        let body = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        let feed = feed_rs::parser::parse(body.as_ref())
            .map_err(|e| Error::Parse(format!("invalid feed document {url}: {e}")))?;
        Ok(feed.entries.into_iter().filter_map(entry_release).collect())
    }
}

#[async_trait]
impl ReleaseFeed for RssFeed {
    fn releases(&self, query: &FeedQuery) -> ReleaseStream {
        let FeedQuery::Rss(RssQuery { url }) = query else {
            return ReleaseStream::failed(query_mismatch(FeedKind::Rss, query));
        };
        let feed = self.clone();
        let url = url.clone();
        ReleaseStream::spawn(None, move |mut tx| async move {
            let releases = match feed.entries(&url).await {
                Ok(releases) => releases,
                Err(e) => {
                    tx.fail(e).await;
                    return;
                }
            };
            for release in releases {
                if !tx.send(release).await {
                    return;
                }
            }
        })
    }

    async fn release(&self, version: &str, query: &FeedQuery) -> Result<Option<Release>> {
        if !matches!(query, FeedQuery::Rss(_)) {
            return Err(query_mismatch(FeedKind::Rss, query));
        }
        find_in_stream(self.releases(query), version).await
    }
}
