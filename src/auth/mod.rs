//! Authentication for GitHub and Gitea
//!
//! Tokens come from the config file, environment variables, or (GitHub) the
//! `gh` CLI. A GitHub repository can also be accessed as a GitHub App
//! installation.

mod gitea;
mod github;

pub use gitea::{GiteaAuthConfig, GiteaCredentials, get_gitea_auth, test_gitea_auth};
pub use github::{
    GitHubAuthConfig, GitHubCredentials, get_github_auth, github_client, test_github_auth,
};

use std::env;

/// Source of authentication token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthSource {
    /// Token set in the config file
    Config,
    /// Token from CLI tool (gh)
    Cli,
    /// Token from environment variable
    EnvVar,
}

/// First non-empty value among the given environment variables
fn env_token(vars: &[&str]) -> Option<String> {
    vars.iter()
        .filter_map(|var| env::var(var).ok())
        .find(|token| !token.is_empty())
}
