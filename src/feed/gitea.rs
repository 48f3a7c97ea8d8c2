//! Gitea releases and tags feed

use crate::error::{Error, Result};
use crate::feed::link::next_page_from;
use crate::feed::{
    FeedKind, FeedQuery, GiteaQuery, ReleaseFeed, ReleaseSender, ReleaseStream, query_mismatch,
};
use crate::types::Release;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Default page size of a Gitea instance
pub const DEFAULT_PAGE_SIZE: u32 = 30;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Deserialize)]
struct GiteaRelease {
    tag_name: String,
    #[serde(default)]
    body: String,
    #[serde(default)]
    html_url: String,
}

#[derive(Deserialize)]
struct GiteaTag {
    name: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    commit: Option<GiteaTagCommit>,
}

#[derive(Deserialize)]
struct GiteaTagCommit {
    #[serde(default)]
    url: String,
}

impl From<GiteaRelease> for Release {
    fn from(r: GiteaRelease) -> Self {
        Self {
            version: r.tag_name,
            notes: r.body,
            url: r.html_url,
        }
    }
}

impl From<GiteaTag> for Release {
    fn from(t: GiteaTag) -> Self {
        Self {
            version: t.name,
            notes: t.message,
            url: t.commit.map(|c| c.url).unwrap_or_default(),
        }
    }
}

/// Feed backed by a Gitea instance's API
#[derive(Debug, Clone)]
pub struct GiteaFeed {
    client: Client,
    url: String,
    token: Option<String>,
    page_size: u32,
    limit: usize,
}

impl GiteaFeed {
    /// Create a new Gitea feed for the instance at `url`
    ///
    /// A `limit` of `None` or 0 means one page.
    pub fn new(
        url: &str,
        token: Option<String>,
        page_size: Option<u32>,
        limit: Option<usize>,
    ) -> Result<Self> {
        let page_size = page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        if page_size == 0 {
            return Err(Error::Config(
                "gitea feed page_size must be positive".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::GiteaApi(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: url.trim_end_matches('/').to_string(),
            token,
            page_size,
            limit: limit.filter(|&l| l > 0).unwrap_or(page_size as usize),
        })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api/v1{path}", self.url)
    }

    fn request(&self, path: &str) -> RequestBuilder {
        let req = self.client.get(self.api_url(path));
        match &self.token {
            Some(token) => req.header("Authorization", format!("token {token}")),
            None => req,
        }
    }

    async fn get_page<T: DeserializeOwned>(
        &self,
        path: &str,
        page: u32,
    ) -> Result<(Vec<T>, Option<u32>)> {
        debug!(path, page, limit = self.page_size, "Fetching Gitea page");
        let response = self
            .request(path)
            .query(&[("limit", self.page_size), ("page", page)])
            .send()
            .await?
            .error_for_status()
            .map_err(|e| Error::GiteaApi(e.to_string()))?;

        let next = next_page_from(response.headers());
        let items = response.json().await?;
        Ok((items, next))
    }

    async fn get_optional<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        let response = self.request(path).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let item = response
            .error_for_status()
            .map_err(|e| Error::GiteaApi(e.to_string()))?
            .json()
            .await?;
        Ok(Some(item))
    }

    async fn fetch_page(
        &self,
        query: &GiteaQuery,
        page: u32,
    ) -> Result<(Vec<Release>, Option<u32>)> {
        let base = format!("/repos/{}/{}", query.owner, query.repo);
        if query.tags {
            let (tags, next) = self
                .get_page::<GiteaTag>(&format!("{base}/tags"), page)
                .await?;
            Ok((tags.into_iter().map(Release::from).collect(), next))
        } else {
            let (releases, next) = self
                .get_page::<GiteaRelease>(&format!("{base}/releases"), page)
                .await?;
            Ok((releases.into_iter().map(Release::from).collect(), next))
        }
    }

    async fn produce(self, query: GiteaQuery, mut tx: ReleaseSender) {
        let mut page = Some(1);
        while let Some(current) = page {
            if tx.is_cancelled() {
                return;
            }
            match self.fetch_page(&query, current).await {
                Ok((releases, next)) => {
                    for release in releases {
                        if !tx.send(release).await {
                            return;
                        }
                    }
                    page = next;
                }
                Err(e) => {
                    tx.fail(e).await;
                    return;
                }
            }
        }
    }
}

#[async_trait]
impl ReleaseFeed for GiteaFeed {
    fn releases(&self, query: &FeedQuery) -> ReleaseStream {
        let FeedQuery::Gitea(query) = query else {
            return ReleaseStream::failed(query_mismatch(FeedKind::Gitea, query));
        };
        let feed = self.clone();
        let query = query.clone();
        ReleaseStream::spawn(Some(self.limit), move |tx| feed.produce(query, tx))
    }

    async fn release(&self, version: &str, query: &FeedQuery) -> Result<Option<Release>> {
        let FeedQuery::Gitea(query) = query else {
            return Err(query_mismatch(FeedKind::Gitea, query));
        };
        let base = format!("/repos/{}/{}", query.owner, query.repo);
        let tag = urlencoding::encode(version);

        if query.tags {
            let found: Option<GiteaTag> = self.get_optional(&format!("{base}/tags/{tag}")).await?;
            Ok(found.map(Release::from))
        } else {
            let found: Option<GiteaRelease> = self
                .get_optional(&format!("{base}/releases/tags/{tag}"))
                .await?;
            Ok(found.map(Release::from))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn query(tags: bool) -> FeedQuery {
        FeedQuery::Gitea(GiteaQuery {
            owner: "gitea".to_string(),
            repo: "tea".to_string(),
            tags,
        })
    }

    #[tokio::test]
    async fn test_tags_follow_link_header() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let _p1 = server
            .mock("GET", "/api/v1/repos/gitea/tea/tags")
            .match_query(Matcher::UrlEncoded("page".into(), "1".into()))
            .with_header("content-type", "application/json")
            .with_header(
                "link",
                &format!(
                    r#"<{url}/api/v1/repos/gitea/tea/tags?page=2&limit=1>; rel="next",<{url}/api/v1/repos/gitea/tea/tags?page=2&limit=1>; rel="last""#
                ),
            )
            .with_body(r#"[{"name":"v0.9.2","message":"fix","commit":{"url":"c1"}}]"#)
            .create_async()
            .await;
        let _p2 = server
            .mock("GET", "/api/v1/repos/gitea/tea/tags")
            .match_query(Matcher::UrlEncoded("page".into(), "2".into()))
            .with_header("content-type", "application/json")
            .with_body(r#"[{"name":"v0.9.1","message":"","commit":null}]"#)
            .create_async()
            .await;

        let feed = GiteaFeed::new(&url, None, Some(1), Some(5)).unwrap();
        let mut stream = feed.releases(&query(true));

        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.version, "v0.9.2");
        assert_eq!(first.notes, "fix");
        assert_eq!(first.url, "c1");
        assert_eq!(stream.next().await.unwrap().unwrap().version, "v0.9.1");
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_release_lookup_sends_token() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/api/v1/repos/gitea/tea/releases/tags/v1.0.0")
            .match_header("authorization", "token secret")
            .with_header("content-type", "application/json")
            .with_body(r#"{"tag_name":"v1.0.0","body":"notes","html_url":"h"}"#)
            .create_async()
            .await;
        let _missing = server
            .mock("GET", "/api/v1/repos/gitea/tea/releases/tags/v2.0.0")
            .with_status(404)
            .create_async()
            .await;

        let feed = GiteaFeed::new(&server.url(), Some("secret".to_string()), None, None).unwrap();
        let found = feed.release("v1.0.0", &query(false)).await.unwrap().unwrap();
        assert_eq!(found.notes, "notes");
        assert!(feed.release("v2.0.0", &query(false)).await.unwrap().is_none());
    }

    #[test]
    fn test_default_limit_is_page_size() {
        let feed = GiteaFeed::new("https://gitea.com/", None, None, None).unwrap();
        assert_eq!(feed.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(feed.limit, DEFAULT_PAGE_SIZE as usize);
        assert_eq!(feed.api_url("/x"), "https://gitea.com/api/v1/x");

        let feed = GiteaFeed::new("https://gitea.com", None, Some(7), Some(0)).unwrap();
        assert_eq!(feed.limit, 7);
    }
}
