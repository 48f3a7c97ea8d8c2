//! Repository platforms
//!
//! A [`PlatformService`] reads the tracked files and manages the PRs of the
//! repository being updated, on GitHub or Gitea.

mod factory;
mod gitea;
mod github;

pub use factory::create_platform_service;
pub use gitea::GiteaService;
pub use github::GitHubService;

use crate::error::Result;
use crate::types::{FileChange, PlatformConfig, PullRequest, RepoFile};
use async_trait::async_trait;

/// Platform service trait for file and PR operations
///
/// This trait abstracts GitHub and Gitea, allowing the same update logic to
/// work with either platform.
#[async_trait]
pub trait PlatformService: Send + Sync {
    /// Fetch a file from the base branch
    async fn get_file(&self, path: &str) -> Result<RepoFile>;

    /// Find the most recent PR (open or closed) whose body contains `token`
    async fn find_pr(&self, token: &str) -> Result<Option<PullRequest>>;

    /// Commit `change` to a new branch and open a PR for it
    ///
    /// Returns the display id of the new PR.
    async fn create_update_pr(
        &self,
        change: &FileChange<'_>,
        branch: &str,
        title: &str,
        body: &str,
    ) -> Result<String>;

    /// Leave a comment on a PR
    async fn comment_on_pr(&self, pr: &PullRequest, text: &str) -> Result<()>;

    /// Close a PR
    async fn close_pr(&self, pr: &PullRequest) -> Result<()>;

    /// Replace the PR's branch with `change` applied to the current base
    async fn update_pr_branch(&self, pr: &PullRequest, change: &FileChange<'_>) -> Result<()>;

    /// Delete the head branch of the PR with display id `id`
    ///
    /// Returns the name of the deleted branch.
    async fn delete_pr_branch(&self, id: &str) -> Result<String>;

    /// Get the platform configuration
    fn config(&self) -> &PlatformConfig;
}

/// Parse a display id (`#12`, `!12`, or a bare `12`) into a PR number
pub fn parse_pr_number(id: &str) -> Result<u64> {
    let digits = id.trim().trim_start_matches(['#', '!']);
    digits
        .parse()
        .map_err(|_| crate::error::Error::Parse(format!("invalid PR id {id:?}")))
}

/// Percent-encode each segment of a repository file path for a URL route
pub(crate) fn encode_path(path: &str) -> String {
    path.trim_start_matches('/')
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_path_keeps_separators() {
        assert_eq!(encode_path("charts/values.yaml"), "charts/values.yaml");
        assert_eq!(encode_path("/docs/my file#1.md"), "docs/my%20file%231.md");
        assert_eq!(encode_path("a/100%/b?.txt"), "a/100%25/b%3F.txt");
    }

    #[test]
    fn test_parse_pr_number() {
        assert_eq!(parse_pr_number("#12").unwrap(), 12);
        assert_eq!(parse_pr_number("!7").unwrap(), 7);
        assert_eq!(parse_pr_number(" 3 ").unwrap(), 3);
        assert!(parse_pr_number("#abc").is_err());
        assert!(parse_pr_number("").is_err());
    }
}
