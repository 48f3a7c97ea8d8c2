//! Gitea platform service implementation

use crate::auth::GiteaCredentials;
use crate::config::GiteaRepoConfig;
use crate::error::{Error, Result};
use crate::feed::link::next_page_from;
use crate::platform::{PlatformService, encode_path, parse_pr_number};
use crate::types::{FileChange, Platform, PlatformConfig, PullRequest, RepoFile};
use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Default request timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Gitea's default `MAX_RESPONSE_ITEMS`
pub const DEFAULT_PAGE_SIZE: u32 = 50;

#[derive(Deserialize)]
struct GiteaRepository {
    default_branch: String,
}

#[derive(Deserialize)]
struct GiteaUser {
    login: String,
}

#[derive(Deserialize)]
struct GiteaLabel {
    id: i64,
    name: String,
}

#[derive(Deserialize)]
struct GiteaIssue {
    number: u64,
}

#[derive(Deserialize)]
struct GiteaPullRequest {
    number: u64,
    #[serde(default)]
    html_url: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    body: String,
    state: String,
    #[serde(default)]
    mergeable: bool,
    head: GiteaBranch,
}

#[derive(Deserialize)]
struct GiteaBranch {
    #[serde(rename = "ref")]
    ref_field: String,
}

impl From<GiteaPullRequest> for PullRequest {
    fn from(pr: GiteaPullRequest) -> Self {
        Self {
            number: pr.number,
            id: format!("!{}", pr.number),
            html_url: pr.html_url,
            head_ref: pr.head.ref_field,
            title: pr.title,
            body: pr.body,
            is_open: pr.state == "open",
            is_mergeable: pr.mergeable,
        }
    }
}

#[derive(Deserialize)]
struct GiteaContents {
    path: String,
    sha: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    encoding: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Serialize)]
struct Identity<'a> {
    name: &'a str,
    email: &'a str,
}

#[derive(Serialize)]
struct UpdateFilePayload<'a> {
    message: &'a str,
    branch: &'a str,
    new_branch: &'a str,
    sha: &'a str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    author: Option<Identity<'a>>,
}

#[derive(Serialize)]
struct CreatePrPayload<'a> {
    head: &'a str,
    base: &'a str,
    title: &'a str,
    body: &'a str,
    labels: &'a [i64],
}

/// Gitea service using reqwest
pub struct GiteaService {
    client: Client,
    url: String,
    credentials: GiteaCredentials,
    config: PlatformConfig,
    username: String,
    committer: Option<(String, String)>,
    labels: Vec<String>,
    label_ids: Vec<i64>,
    page_size: u32,
}

impl GiteaService {
    /// Connect to the repository described by `repo`
    ///
    /// Looks up the authenticated user, the default branch when no base
    /// branch is configured, and the ids of the configured labels.
    pub async fn connect(credentials: GiteaCredentials, repo: &GiteaRepoConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::GiteaApi(format!("Failed to create HTTP client: {e}")))?;

        let mut service = Self {
            client,
            url: repo.url.trim_end_matches('/').to_string(),
            credentials,
            config: PlatformConfig {
                platform: Platform::Gitea,
                owner: repo.owner.clone(),
                repo: repo.repo.clone(),
                base_branch: repo.base_branch.clone().unwrap_or_default(),
            },
            username: String::new(),
            committer: repo
                .committer_name
                .clone()
                .zip(repo.committer_email.clone()),
            labels: repo.labels.clone(),
            label_ids: Vec::new(),
            page_size: repo.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        };

        let user: GiteaUser = service.get_json("/user", &[]).await?;
        service.username = user.login;

        if service.config.base_branch.is_empty() {
            let info: GiteaRepository = service.get_json(&service.repo_path(""), &[]).await?;
            service.config.base_branch = info.default_branch;
        }

        service.label_ids = service.resolve_labels().await?;
        debug!(
            user = %service.username,
            base_branch = %service.config.base_branch,
            "Connected to Gitea"
        );
        Ok(service)
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api/v1{path}", self.url)
    }

    fn repo_path(&self, path: &str) -> String {
        format!("/repos/{}/{}{path}", self.config.owner, self.config.repo)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.credentials
            .apply(self.client.request(method, self.api_url(path)))
    }

    async fn send(request: RequestBuilder) -> Result<Response> {
        request
            .send()
            .await?
            .error_for_status()
            .map_err(|e| Error::GiteaApi(e.to_string()))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let response = Self::send(self.request(Method::GET, path).query(query)).await?;
        Ok(response.json().await?)
    }

    async fn resolve_labels(&self) -> Result<Vec<i64>> {
        if self.labels.is_empty() {
            return Ok(Vec::new());
        }

        let mut found = Vec::new();
        let mut page = Some(1);
        while let Some(current) = page {
            let response = Self::send(
                self.request(Method::GET, &self.repo_path("/labels"))
                    .query(&[("limit", self.page_size), ("page", current)]),
            )
            .await?;
            page = next_page_from(response.headers());
            let labels: Vec<GiteaLabel> = response.json().await?;
            found.extend(labels.into_iter().filter(|l| self.labels.contains(&l.name)));
        }

        if found.len() != self.labels.len() {
            let names: Vec<_> = found.iter().map(|l| l.name.as_str()).collect();
            return Err(Error::Config(format!(
                "could not find all labels: found {names:?}"
            )));
        }
        Ok(found.into_iter().map(|l| l.id).collect())
    }

    async fn get_pr(&self, number: u64) -> Result<PullRequest> {
        let pr: GiteaPullRequest = self
            .get_json(&self.repo_path(&format!("/pulls/{number}")), &[])
            .await?;
        Ok(pr.into())
    }

    async fn delete_branch(&self, name: &str) -> Result<()> {
        let path = self.repo_path(&format!("/branches/{}", urlencoding::encode(name)));
        Self::send(self.request(Method::DELETE, &path)).await?;
        Ok(())
    }
}

#[async_trait]
impl PlatformService for GiteaService {
    async fn get_file(&self, path: &str) -> Result<RepoFile> {
        debug!(path, "fetching file");
        let contents: GiteaContents = self
            .get_json(
                &self.repo_path(&format!("/contents/{}", encode_path(path))),
                &[("ref", self.config.base_branch.clone())],
            )
            .await?;

        if contents.kind != "file" {
            return Err(Error::GiteaApi(format!(
                "{path} is a {}, not a file",
                contents.kind
            )));
        }
        if contents.encoding.as_deref() != Some("base64") {
            return Err(Error::GiteaApi(format!(
                "unsupported encoding {:?} for {path}",
                contents.encoding
            )));
        }
        let encoded: String = contents
            .content
            .ok_or_else(|| Error::GiteaApi(format!("no content for {path}")))?
            .split_whitespace()
            .collect();
        let content = BASE64
            .decode(encoded)
            .map_err(|e| Error::Parse(format!("invalid content for {path}: {e}")))?;

        Ok(RepoFile {
            path: contents.path,
            content,
            sha: contents.sha,
        })
    }

    async fn find_pr(&self, token: &str) -> Result<Option<PullRequest>> {
        let mut query = vec![
            ("q", format!("\"{token}\"")),
            ("state", "all".to_string()),
            ("type", "pulls".to_string()),
            ("created_by", self.username.clone()),
        ];
        if !self.labels.is_empty() {
            query.push(("labels", self.labels.join(",")));
        }

        let issues: Vec<GiteaIssue> = self.get_json(&self.repo_path("/issues"), &query).await?;
        match issues.first() {
            Some(issue) => Ok(Some(self.get_pr(issue.number).await?)),
            None => Ok(None),
        }
    }

    async fn create_update_pr(
        &self,
        change: &FileChange<'_>,
        branch: &str,
        title: &str,
        body: &str,
    ) -> Result<String> {
        debug!(branch, title, "creating PR");
        let payload = UpdateFilePayload {
            message: change.commit_message,
            branch: &self.config.base_branch,
            new_branch: branch,
            sha: change.old_sha,
            content: BASE64.encode(change.content),
            author: self
                .committer
                .as_ref()
                .map(|(name, email)| Identity { name, email }),
        };
        let path = self.repo_path(&format!("/contents/{}", encode_path(change.path)));
        Self::send(self.request(Method::PUT, &path).json(&payload)).await?;

        let pr = CreatePrPayload {
            head: branch,
            base: &self.config.base_branch,
            title,
            body,
            labels: &self.label_ids,
        };
        let created: GiteaIssue = Self::send(
            self.request(Method::POST, &self.repo_path("/pulls"))
                .json(&pr),
        )
        .await?
        .json()
        .await?;
        Ok(format!("!{}", created.number))
    }

    async fn comment_on_pr(&self, pr: &PullRequest, text: &str) -> Result<()> {
        let path = self.repo_path(&format!("/issues/{}/comments", pr.number));
        Self::send(
            self.request(Method::POST, &path)
                .json(&serde_json::json!({ "body": text })),
        )
        .await?;
        Ok(())
    }

    async fn close_pr(&self, pr: &PullRequest) -> Result<()> {
        let path = self.repo_path(&format!("/pulls/{}", pr.number));
        Self::send(
            self.request(Method::PATCH, &path)
                .json(&serde_json::json!({ "state": "closed" })),
        )
        .await?;
        Ok(())
    }

    /// Gitea has no API for moving refs, so the PR is replaced by a new one
    /// with the same branch name, title and body
    async fn update_pr_branch(&self, pr: &PullRequest, change: &FileChange<'_>) -> Result<()> {
        debug!(pr = %pr.id, "recreating PR");
        self.close_pr(pr).await?;
        self.delete_branch(&pr.head_ref).await?;
        self.create_update_pr(change, &pr.head_ref, &pr.title, &pr.body)
            .await?;
        Ok(())
    }

    async fn delete_pr_branch(&self, id: &str) -> Result<String> {
        let number = parse_pr_number(id)?;
        if number == 0 {
            return Err(Error::Parse(format!("{id} is not a valid PR index")));
        }
        let pr = self.get_pr(number).await?;
        self.delete_branch(&pr.head_ref).await?;
        Ok(pr.head_ref)
    }

    fn config(&self) -> &PlatformConfig {
        &self.config
    }
}
