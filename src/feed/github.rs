//! GitHub releases and tags feed

use crate::error::{Error, Result};
use crate::feed::link::next_page_from;
use crate::feed::{
    FeedKind, FeedQuery, GitHubQuery, ReleaseFeed, ReleaseSender, ReleaseStream, query_mismatch,
};
use crate::types::Release;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Public GitHub API
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Default and maximum page size of the GitHub list endpoints
pub const MAX_PAGE_SIZE: u32 = 100;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Deserialize)]
struct GhRelease {
    tag_name: String,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    html_url: String,
    #[serde(default)]
    prerelease: bool,
}

impl From<GhRelease> for Release {
    fn from(r: GhRelease) -> Self {
        Self {
            version: r.tag_name,
            notes: r.body.unwrap_or_default(),
            url: r.html_url,
        }
    }
}

#[derive(Deserialize)]
struct GhTag {
    name: String,
    commit: GhTagCommit,
}

#[derive(Deserialize)]
struct GhTagCommit {
    #[serde(default)]
    url: String,
}

#[derive(Deserialize)]
struct GhRef {
    object: GhRefObject,
}

#[derive(Deserialize)]
struct GhRefObject {
    #[serde(default)]
    url: String,
}

/// Feed backed by the GitHub REST API
#[derive(Debug, Clone)]
pub struct GitHubFeed {
    client: Client,
    api_url: String,
    token: Option<String>,
    page_size: u32,
    limit: usize,
}

impl GitHubFeed {
    /// Create a new GitHub feed
    ///
    /// `api_url` defaults to the public API; a `limit` of `None` or 0 means one page.
    pub fn new(
        api_url: Option<&str>,
        token: Option<String>,
        page_size: Option<u32>,
        limit: Option<usize>,
    ) -> Result<Self> {
        let page_size = page_size.unwrap_or(MAX_PAGE_SIZE);
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(Error::Config(format!(
                "github feed page_size must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .user_agent(concat!("regex-updater/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::GitHubApi(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_url: api_url
                .unwrap_or(DEFAULT_API_URL)
                .trim_end_matches('/')
                .to_string(),
            token,
            page_size,
            limit: limit.filter(|&l| l > 0).unwrap_or(page_size as usize),
        })
    }

    fn request(&self, path: &str) -> RequestBuilder {
        let mut req = self
            .client
            .get(format!("{}{path}", self.api_url))
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28");
        if let Some(token) = &self.token {
            req = req.header("Authorization", format!("Bearer {token}"));
        }
        req
    }

    async fn get_page<T: DeserializeOwned>(
        &self,
        path: &str,
        page: u32,
    ) -> Result<(Vec<T>, Option<u32>)> {
        debug!(path, page, per_page = self.page_size, "Fetching GitHub page");
        let response = self
            .request(path)
            .query(&[("per_page", self.page_size), ("page", page)])
            .send()
            .await?
            .error_for_status()
            .map_err(|e| Error::GitHubApi(e.to_string()))?;

        let next = next_page_from(response.headers());
        let items = response.json().await?;
        Ok((items, next))
    }

    async fn get_optional<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        let response = self.request(path).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!(path, "GitHub returned 404");
            return Ok(None);
        }
        let item = response
            .error_for_status()
            .map_err(|e| Error::GitHubApi(e.to_string()))?
            .json()
            .await?;
        Ok(Some(item))
    }

    async fn fetch_page(
        &self,
        query: &GitHubQuery,
        page: u32,
    ) -> Result<(Vec<Release>, Option<u32>)> {
        let base = format!("/repos/{}/{}", query.owner, query.repo);
        if query.tags {
            let (tags, next) = self.get_page::<GhTag>(&format!("{base}/tags"), page).await?;
            let releases = tags
                .into_iter()
                .map(|t| Release {
                    version: t.name,
                    notes: String::new(),
                    url: t.commit.url,
                })
                .collect();
            Ok((releases, next))
        } else {
            let (releases, next) = self
                .get_page::<GhRelease>(&format!("{base}/releases"), page)
                .await?;
            let releases = releases
                .into_iter()
                .filter(|r| query.include_prereleases || !r.prerelease)
                .map(Release::from)
                .collect();
            Ok((releases, next))
        }
    }

    async fn produce(self, query: GitHubQuery, mut tx: ReleaseSender) {
        let mut page = Some(1);
        while let Some(current) = page {
            if tx.is_cancelled() {
                return;
            }
            let (releases, next) = match self.fetch_page(&query, current).await {
                Ok(result) => result,
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
            page = next;
        }
    }
}

#[async_trait]
impl ReleaseFeed for GitHubFeed {
    fn releases(&self, query: &FeedQuery) -> ReleaseStream {
        let FeedQuery::GitHub(query) = query else {
            return ReleaseStream::failed(query_mismatch(FeedKind::GitHub, query));
        };
        let feed = self.clone();
        let query = query.clone();
        ReleaseStream::spawn(Some(self.limit), move |tx| feed.produce(query, tx))
    }

    async fn release(&self, version: &str, query: &FeedQuery) -> Result<Option<Release>> {
        let FeedQuery::GitHub(query) = query else {
            return Err(query_mismatch(FeedKind::GitHub, query));
        };
        let base = format!("/repos/{}/{}", query.owner, query.repo);
        let tag = urlencoding::encode(version);

        if query.tags {
            let found: Option<GhRef> = self
                .get_optional(&format!("{base}/git/ref/tags/{tag}"))
                .await?;
            return Ok(found.map(|r| Release {
                version: version.to_string(),
                notes: String::new(),
                url: r.object.url,
            }));
        }

        let found: Option<GhRelease> = self
            .get_optional(&format!("{base}/releases/tags/{tag}"))
            .await?;
        Ok(found
            .filter(|r| query.include_prereleases || !r.prerelease)
            .map(Release::from))
    }
}
