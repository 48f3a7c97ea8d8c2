//! Release feeds
//!
//! A feed lists the releases of some upstream project, newest first, and can
//! look a single release up by its version. Which project to ask about is
//! described per update by a [`FeedQuery`].

mod container;
mod factory;
mod gitea;
mod github;
pub mod link;
mod pypi;
mod rss;
mod stream;

pub use container::ContainerRegistryFeed;
pub use factory::create_feed;
pub use gitea::GiteaFeed;
pub use github::{GitHubFeed, MAX_PAGE_SIZE as GITHUB_MAX_PAGE_SIZE};
pub use pypi::PyPiFeed;
pub use rss::RssFeed;
pub use stream::{ReleaseSender, ReleaseStream};

use crate::error::{Error, Result};
use crate::types::Release;
use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;
use url::Url;

/// Source of releases for one or more updates
#[async_trait]
pub trait ReleaseFeed: Send + Sync {
    /// Stream releases for `query`, newest first
    ///
    /// Failures are delivered as the final item of the stream.
    fn releases(&self, query: &FeedQuery) -> ReleaseStream;

    /// Look up one release by its exact version, `None` if it does not exist
    async fn release(&self, version: &str, query: &FeedQuery) -> Result<Option<Release>>;
}

/// The kinds of feed that can be configured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedKind {
    /// GitHub releases or tags
    GitHub,
    /// Gitea releases or tags
    Gitea,
    /// Python Package Index
    PyPi,
    /// OCI/Docker registry tags
    ContainerRegistry,
    /// RSS or Atom entries
    Rss,
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GitHub => write!(f, "github"),
            Self::Gitea => write!(f, "gitea"),
            Self::PyPi => write!(f, "pypi"),
            Self::ContainerRegistry => write!(f, "container_registry"),
            Self::Rss => write!(f, "rss"),
        }
    }
}

/// Per-update parameters for a GitHub feed
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GitHubQuery {
    /// Repository owner
    pub owner: String,
    /// Repository name
    pub repo: String,
    /// List tags instead of releases
    #[serde(default)]
    pub tags: bool,
    /// Keep releases GitHub marks as prereleases
    #[serde(default)]
    pub include_prereleases: bool,
}

/// Per-update parameters for a Gitea feed
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GiteaQuery {
    /// Repository owner
    pub owner: String,
    /// Repository name
    pub repo: String,
    /// List tags instead of releases
    #[serde(default)]
    pub tags: bool,
}

/// Per-update parameters for a PyPI feed
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PyPiQuery {
    /// Project name on the index
    pub project: String,
}

/// Per-update parameters for a container registry feed
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContainerQuery {
    /// Repository in the registry, e.g. `library/alpine`
    pub repo: String,
}

/// Per-update parameters for an RSS/Atom feed
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RssQuery {
    /// Feed URL; each entry's title is a version
    pub url: String,
}

/// What to ask a feed about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedQuery {
    /// A GitHub repository
    GitHub(GitHubQuery),
    /// A Gitea repository
    Gitea(GiteaQuery),
    /// A PyPI project
    PyPi(PyPiQuery),
    /// A registry repository
    ContainerRegistry(ContainerQuery),
    /// An RSS/Atom document
    Rss(RssQuery),
}

impl FeedQuery {
    /// The feed kind this query is meant for
    pub const fn kind(&self) -> FeedKind {
        match self {
            Self::GitHub(_) => FeedKind::GitHub,
            Self::Gitea(_) => FeedKind::Gitea,
            Self::PyPi(_) => FeedKind::PyPi,
            Self::ContainerRegistry(_) => FeedKind::ContainerRegistry,
            Self::Rss(_) => FeedKind::Rss,
        }
    }
}

impl FeedKind {
    /// Decode an update's feed parameters for this kind of feed
    pub fn decode_query(self, params: serde_yaml::Value) -> Result<FeedQuery> {
        let params = match params {
            serde_yaml::Value::Null => serde_yaml::Value::Mapping(serde_yaml::Mapping::new()),
            other => other,
        };
        let invalid = |e: serde_yaml::Error| Error::Config(format!("{self} feed parameters: {e}"));

        let query = match self {
            Self::GitHub => {
                let q: GitHubQuery = serde_yaml::from_value(params).map_err(invalid)?;
                require(&[("owner", &q.owner), ("repo", &q.repo)])?;
                FeedQuery::GitHub(q)
            }
            Self::Gitea => {
                let q: GiteaQuery = serde_yaml::from_value(params).map_err(invalid)?;
                require(&[("owner", &q.owner), ("repo", &q.repo)])?;
                FeedQuery::Gitea(q)
            }
            Self::PyPi => {
                let q: PyPiQuery = serde_yaml::from_value(params).map_err(invalid)?;
                require(&[("project", &q.project)])?;
                FeedQuery::PyPi(q)
            }
            Self::ContainerRegistry => {
                let q: ContainerQuery = serde_yaml::from_value(params).map_err(invalid)?;
                require(&[("repo", &q.repo)])?;
                FeedQuery::ContainerRegistry(q)
            }
            Self::Rss => {
                let q: RssQuery = serde_yaml::from_value(params).map_err(invalid)?;
                require(&[("url", &q.url)])?;
                let url = Url::parse(&q.url)
                    .map_err(|e| Error::Config(format!("feed parameter `url` {:?}: {e}", q.url)))?;
                if !matches!(url.scheme(), "http" | "https") {
                    return Err(Error::Config(format!(
                        "feed parameter `url` {:?} must be an http(s) URL",
                        q.url
                    )));
                }
                FeedQuery::Rss(q)
            }
        };
        Ok(query)
    }
}

fn require(fields: &[(&str, &String)]) -> Result<()> {
    for (name, value) in fields {
        if value.trim().is_empty() {
            return Err(Error::Config(format!("feed parameter `{name}` is required")));
        }
    }
    Ok(())
}

/// Look `version` up by scanning a feed's release stream
///
/// For feeds with no endpoint for a single release. Stops at the first match.
pub(crate) async fn find_in_stream(
    mut stream: ReleaseStream,
    version: &str,
) -> Result<Option<Release>> {
    while let Some(item) = stream.next().await {
        let release = item?;
        if release.version == version {
            return Ok(Some(release));
        }
    }
    Ok(None)
}

/// Error for a query handed to a feed of another kind
pub(crate) fn query_mismatch(expected: FeedKind, query: &FeedQuery) -> Error {
    Error::Config(format!(
        "{expected} feed cannot serve a {} query",
        query.kind()
    ))
}
