//! Core types for regex-updater

use serde::{Deserialize, Serialize};

/// One version announcement from a release feed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    /// Version identifier as published (tag name, PyPI version, ...)
    pub version: String,
    /// Release notes, possibly empty
    pub notes: String,
    /// Web URL for the release
    pub url: String,
}

impl Release {
    /// Create a release with only a version set
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            ..Self::default()
        }
    }
}

/// A file fetched from the base branch of the repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoFile {
    /// Path within the repository
    pub path: String,
    /// Raw file content
    pub content: Vec<u8>,
    /// Blob SHA of the file on the base branch
    pub sha: String,
}

/// A pull request / merge request found on the platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    /// PR number (or Gitea index)
    pub number: u64,
    /// Display id used in comments and logs (`#12`, `!12`)
    pub id: String,
    /// Web URL for the PR
    pub html_url: String,
    /// Head branch name
    pub head_ref: String,
    /// PR title
    pub title: String,
    /// PR body / description
    pub body: String,
    /// Whether the PR is open
    pub is_open: bool,
    /// Whether the platform reports the PR as mergeable
    pub is_mergeable: bool,
}

/// A rewrite of one file, committed with a message
#[derive(Debug, Clone, Copy)]
pub struct FileChange<'a> {
    /// Path within the repository
    pub path: &'a str,
    /// Blob SHA the change is based on
    pub old_sha: &'a str,
    /// New file content
    pub content: &'a [u8],
    /// Commit message
    pub commit_message: &'a str,
}

/// Supported hosting platforms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Platform {
    /// GitHub or GitHub Enterprise
    GitHub,
    /// Gitea or Forgejo
    Gitea,
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GitHub => write!(f, "GitHub"),
            Self::Gitea => write!(f, "Gitea"),
        }
    }
}

/// Platform configuration resolved at startup
#[derive(Debug, Clone)]
pub struct PlatformConfig {
    /// Platform type
    pub platform: Platform,
    /// Repository owner (user or organization)
    pub owner: String,
    /// Repository name
    pub repo: String,
    /// Branch PRs are opened against
    pub base_branch: String,
}
