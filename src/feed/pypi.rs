//! PyPI JSON API feed

use crate::error::{Error, Result};
use crate::feed::{FeedKind, FeedQuery, PyPiQuery, ReleaseFeed, ReleaseStream, query_mismatch};
use crate::types::Release;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// The public index
pub const DEFAULT_URL: &str = "https://pypi.org";

const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Deserialize)]
struct ProjectJson {
    info: ProjectInfo,
    #[serde(default)]
    releases: HashMap<String, Vec<ReleaseFile>>,
}

#[derive(Deserialize)]
struct ProjectInfo {
    #[serde(default)]
    project_url: String,
}

#[derive(Deserialize)]
struct ReleaseFile {
    #[serde(default)]
    comment_text: Option<String>,
    upload_time_iso_8601: DateTime<Utc>,
    #[serde(default)]
    yanked: bool,
}

impl ProjectJson {
    /// The first file of a release, unless the release is empty or yanked
    fn first_file(&self, version: &str) -> Option<&ReleaseFile> {
        self.releases
            .get(version)
            .and_then(|files| files.first())
            .filter(|f| !f.yanked)
    }

    fn release(&self, version: &str) -> Option<Release> {
        let file = self.first_file(version)?;
        Some(Release {
            version: version.to_string(),
            notes: file.comment_text.clone().unwrap_or_default(),
            url: format!("{}/{version}", self.info.project_url.trim_end_matches('/')),
        })
    }

    /// Available releases, most recently uploaded first
    fn newest_first(&self) -> Vec<Release> {
        let mut versions: Vec<(&str, DateTime<Utc>)> = self
            .releases
            .keys()
            .filter_map(|v| Some((v.as_str(), self.first_file(v)?.upload_time_iso_8601)))
            .collect();
        versions.sort_by(|a, b| b.1.cmp(&a.1));
        versions
            .into_iter()
            .filter_map(|(v, _)| self.release(v))
            .collect()
    }
}

/// Feed backed by the PyPI JSON API
#[derive(Debug, Clone)]
pub struct PyPiFeed {
    client: Client,
    url: String,
}

impl PyPiFeed {
    /// Create a feed for the index at `url` (defaults to pypi.org)
    pub fn new(url: Option<&str>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::Platform(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: url.unwrap_or(DEFAULT_URL).trim_end_matches('/').to_string(),
        })
    }

    async fn project(&self, project: &str) -> Result<Option<ProjectJson>> {
        let url = format!("{}/pypi/{}/json", self.url, urlencoding::encode(project));
        debug!(%url, "Fetching PyPI project");

        let response = self.client.get(&url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let data = response.error_for_status()?.json().await?;
        Ok(Some(data))
    }
}

#[async_trait]
impl ReleaseFeed for PyPiFeed {
    fn releases(&self, query: &FeedQuery) -> ReleaseStream {
        let FeedQuery::PyPi(PyPiQuery { project }) = query else {
            return ReleaseStream::failed(query_mismatch(FeedKind::PyPi, query));
        };
        let feed = self.clone();
        let project = project.clone();
        ReleaseStream::spawn(None, move |mut tx| async move {
            let releases = match feed.project(&project).await {
                Ok(Some(data)) => data.newest_first(),
                Ok(None) => {
                    let err = Error::Platform(format!("PyPI project {project} not found"));
                    tx.fail(err).await;
                    return;
                }
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
        let FeedQuery::PyPi(PyPiQuery { project }) = query else {
            return Err(query_mismatch(FeedKind::PyPi, query));
        };
        Ok(self
            .project(project)
            .await?
            .and_then(|data| data.release(version)))
    }
}
