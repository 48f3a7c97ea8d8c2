//! GitHub platform service implementation

use crate::auth::{GitHubCredentials, github_client};
use crate::config::GitHubRepoConfig;
use crate::error::{Error, Result};
use crate::platform::{PlatformService, encode_path, parse_pr_number};
use crate::types::{FileChange, Platform, PlatformConfig, PullRequest, RepoFile};
use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use octocrab::Octocrab;
use octocrab::models::InstallationId;
use octocrab::params::repos::Reference;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Deserialize)]
struct ContentResponse {
    path: String,
    sha: String,
    #[serde(default)]
    content: String,
}

#[derive(Serialize)]
struct SearchParams<'a> {
    q: &'a str,
    sort: &'a str,
    order: &'a str,
}

#[derive(Deserialize)]
struct SearchResults {
    items: Vec<SearchItem>,
}

#[derive(Deserialize)]
struct SearchItem {
    number: u64,
}

#[derive(Deserialize)]
struct GhPullRequest {
    number: u64,
    #[serde(default)]
    html_url: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    body: Option<String>,
    state: String,
    #[serde(default)]
    mergeable: Option<bool>,
    head: GhBranch,
}

#[derive(Deserialize)]
struct GhBranch {
    #[serde(rename = "ref")]
    ref_field: String,
}

impl From<GhPullRequest> for PullRequest {
    fn from(pr: GhPullRequest) -> Self {
        Self {
            number: pr.number,
            id: format!("#{}", pr.number),
            html_url: pr.html_url,
            head_ref: pr.head.ref_field,
            title: pr.title,
            body: pr.body.unwrap_or_default(),
            is_open: pr.state == "open",
            // GitHub reports null while mergeability is still being computed
            is_mergeable: pr.mergeable.unwrap_or(true),
        }
    }
}

#[derive(Deserialize)]
struct GhRepository {
    default_branch: String,
}

#[derive(Deserialize)]
struct GhRef {
    object: GhObject,
}

#[derive(Deserialize)]
struct GhObject {
    sha: String,
}

#[derive(Serialize)]
struct UpdateFilePayload<'a> {
    message: &'a str,
    content: String,
    sha: &'a str,
    branch: &'a str,
}

#[derive(Deserialize)]
struct RepoInstallation {
    id: u64,
    app_slug: String,
}

#[derive(Deserialize)]
struct UpdateFileResponse {
    commit: GhObject,
}

/// GitHub service using octocrab
pub struct GitHubService {
    client: Octocrab,
    config: PlatformConfig,
    labels: Vec<String>,
    /// Search qualifier for PRs we opened, `@me` or `app/<slug>`
    author: String,
}

impl GitHubService {
    /// Connect to the repository described by `repo`
    ///
    /// Resolves the configured labels and, when no base branch is
    /// configured, the repository's default branch.
    ///
    /// App credentials act through the app's installation on the repository.
    pub async fn connect(credentials: &GitHubCredentials, repo: &GitHubRepoConfig) -> Result<Self> {
        let client = github_client(credentials, repo.url.as_deref())?;
        let (client, author) = match credentials {
            GitHubCredentials::Token(_) => (client, "@me".to_string()),
            GitHubCredentials::App { .. } => {
                let installation: RepoInstallation = client
                    .get(
                        format!("/repos/{}/{}/installation", repo.owner, repo.repo),
                        None::<&()>,
                    )
                    .await
                    .map_err(|e| {
                        Error::Auth(format!(
                            "GitHub App is not installed on {}/{}: {e}",
                            repo.owner, repo.repo
                        ))
                    })?;
                debug!(id = installation.id, slug = %installation.app_slug, "Using app installation");
                (
                    client.installation(InstallationId(installation.id))?,
                    format!("app/{}", installation.app_slug),
                )
            }
        };

        let base_branch = match &repo.base_branch {
            Some(branch) => branch.clone(),
            None => {
                let info: GhRepository = client
                    .get(format!("/repos/{}/{}", repo.owner, repo.repo), None::<&()>)
                    .await?;
                info.default_branch
            }
        };

        let mut service = Self {
            client,
            config: PlatformConfig {
                platform: Platform::GitHub,
                owner: repo.owner.clone(),
                repo: repo.repo.clone(),
                base_branch,
            },
            labels: Vec::new(),
            author,
        };
        service.labels = service.resolve_labels(&repo.labels).await?;
        debug!(base_branch = %service.config.base_branch, labels = ?service.labels, "Connected to GitHub");
        Ok(service)
    }

    fn route(&self, path: &str) -> String {
        format!("/repos/{}/{}{path}", self.config.owner, self.config.repo)
    }

    async fn resolve_labels(&self, wanted: &[String]) -> Result<Vec<String>> {
        if wanted.is_empty() {
            return Ok(Vec::new());
        }
        let first = self
            .client
            .issues(&self.config.owner, &self.config.repo)
            .list_labels_for_repo()
            .per_page(100)
            .send()
            .await?;
        let all = self.client.all_pages(first).await?;

        let found: Vec<String> = all
            .into_iter()
            .map(|label| label.name)
            .filter(|name| wanted.contains(name))
            .collect();
        if found.len() != wanted.len() {
            return Err(Error::Config(format!(
                "could not find all labels: found {found:?}"
            )));
        }
        Ok(found)
    }

    async fn get_pr(&self, number: u64) -> Result<PullRequest> {
        let pr: GhPullRequest = self
            .client
            .get(self.route(&format!("/pulls/{number}")), None::<&()>)
            .await?;
        Ok(pr.into())
    }

    async fn base_head_sha(&self) -> Result<String> {
        let head: GhRef = self
            .client
            .get(
                self.route(&format!("/git/ref/heads/{}", self.config.base_branch)),
                None::<&()>,
            )
            .await?;
        Ok(head.object.sha)
    }

    async fn create_branch(&self, name: &str) -> Result<()> {
        let sha = self.base_head_sha().await?;
        self.client
            .repos(&self.config.owner, &self.config.repo)
            .create_ref(&Reference::Branch(name.to_string()), sha)
            .await?;
        Ok(())
    }

    async fn delete_branch(&self, name: &str) -> Result<()> {
        self.client
            .repos(&self.config.owner, &self.config.repo)
            .delete_ref(&Reference::Branch(name.to_string()))
            .await?;
        Ok(())
    }

    /// Commit `change` on `branch`, returning the new commit SHA
    async fn commit_file(&self, change: &FileChange<'_>, branch: &str) -> Result<String> {
        let payload = UpdateFilePayload {
            message: change.commit_message,
            content: BASE64.encode(change.content),
            sha: change.old_sha,
            branch,
        };
        let response: UpdateFileResponse = self
            .client
            .put(
                self.route(&format!("/contents/{}", encode_path(change.path))),
                Some(&payload),
            )
            .await?;
        Ok(response.commit.sha)
    }
}

#[async_trait]
impl PlatformService for GitHubService {
    async fn get_file(&self, path: &str) -> Result<RepoFile> {
        debug!(path, "fetching file");
        let file: ContentResponse = self
            .client
            .get(
                self.route(&format!("/contents/{}", encode_path(path))),
                Some(&[("ref", self.config.base_branch.as_str())]),
            )
            .await?;

        let encoded: String = file.content.split_whitespace().collect();
        let content = BASE64
            .decode(encoded)
            .map_err(|e| Error::Parse(format!("invalid content for {path}: {e}")))?;
        Ok(RepoFile {
            path: file.path,
            content,
            sha: file.sha,
        })
    }

    async fn find_pr(&self, token: &str) -> Result<Option<PullRequest>> {
        let mut query = format!(
            "\"{token}\" in:body is:pr repo:{}/{} author:{}",
            self.config.owner, self.config.repo, self.author
        );
        for label in &self.labels {
            query.push_str(&format!(" label:\"{label}\""));
        }
        debug!(%query, "searching for PR");

        let results: SearchResults = self
            .client
            .get(
                "/search/issues",
                Some(&SearchParams {
                    q: &query,
                    sort: "created",
                    order: "desc",
                }),
            )
            .await?;

        match results.items.first() {
            Some(item) => Ok(Some(self.get_pr(item.number).await?)),
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
        self.create_branch(branch).await?;
        self.commit_file(change, branch).await?;

        let pr = self
            .client
            .pulls(&self.config.owner, &self.config.repo)
            .create(title, branch, &self.config.base_branch)
            .body(body)
            .send()
            .await?;

        if !self.labels.is_empty() {
            self.client
                .issues(&self.config.owner, &self.config.repo)
                .add_labels(pr.number, &self.labels)
                .await?;
        }
        Ok(format!("#{}", pr.number))
    }

    async fn comment_on_pr(&self, pr: &PullRequest, text: &str) -> Result<()> {
        self.client
            .issues(&self.config.owner, &self.config.repo)
            .create_comment(pr.number, text)
            .await?;
        Ok(())
    }

    async fn close_pr(&self, pr: &PullRequest) -> Result<()> {
        self.client
            .pulls(&self.config.owner, &self.config.repo)
            .update(pr.number)
            .state(octocrab::params::pulls::State::Closed)
            .send()
            .await?;
        Ok(())
    }

    async fn update_pr_branch(&self, pr: &PullRequest, change: &FileChange<'_>) -> Result<()> {
        let temp = format!("{}-temp", pr.head_ref);
        debug!(pr = %pr.id, %temp, "rebuilding PR branch");
        self.create_branch(&temp).await?;
        let sha = self.commit_file(change, &temp).await?;

        let _: serde_json::Value = self
            .client
            .patch(
                self.route(&format!("/git/refs/heads/{}", pr.head_ref)),
                Some(&serde_json::json!({ "sha": sha, "force": true })),
            )
            .await?;

        self.delete_branch(&temp).await
    }

    async fn delete_pr_branch(&self, id: &str) -> Result<String> {
        let number = parse_pr_number(id)?;
        if number == 0 {
            return Err(Error::Parse(format!("{id} is not a valid PR number")));
        }
        let pr = self.get_pr(number).await?;
        self.delete_branch(&pr.head_ref).await?;
        Ok(pr.head_ref)
    }

    fn config(&self) -> &PlatformConfig {
        &self.config
    }
}
