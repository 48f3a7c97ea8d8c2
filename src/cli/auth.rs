//! Auth command - test and explain repository credentials

use crate::cli::style::{Stylize, check};
use anstream::println;
use regex_updater::auth::{get_gitea_auth, get_github_auth, test_gitea_auth, test_github_auth};
use regex_updater::config::{Config, RepositoryConfig};
use regex_updater::error::Result;
use regex_updater::types::Platform;
use std::path::Path;

/// Test the credentials of the configured repository
pub async fn run_auth_test(config_path: &Path) -> Result<()> {
    let config = Config::load(config_path)?;
    match &config.repository {
        RepositoryConfig::GitHub(repo) => {
            println!("Testing GitHub authentication...");
            let auth = get_github_auth(repo).await?;
            let username = test_github_auth(&auth, repo.url.as_deref()).await?;
            println!("{} Authenticated as: {}", check(), username.accent());
            println!("Token source: {:?}", auth.source);
        }
        RepositoryConfig::Gitea(repo) => {
            println!("Testing Gitea authentication...");
            let auth = get_gitea_auth(repo)?;
            let username = test_gitea_auth(&repo.url, &auth).await?;
            println!("{} Authenticated as: {}", check(), username.accent());
            println!("Credential source: {:?}", auth.source);
            println!("Instance: {}", repo.url.muted());
        }
    }
    Ok(())
}

/// Show authentication setup instructions
pub fn run_auth_setup(platform: Platform) {
    match platform {
        Platform::GitHub => {
            println!("{}", "GitHub Authentication Setup".emphasis());
            println!("===========================");
            println!();
            println!("Option 1: Config file");
            println!("  Set repository.token in the config");
            println!();
            println!("Option 2: Environment variable");
            println!("  Set REPOSITORY_GITHUB_TOKEN, GITHUB_TOKEN or GH_TOKEN");
            println!();
            println!("Option 3: GitHub CLI");
            println!("  Install: https://cli.github.com/");
            println!("  Run: gh auth login");
            println!();
            println!("Option 4: GitHub App");
            println!("  Set repository.app_id and repository.app_private_key_path");
            println!("  (or repository.app_private_key with the PEM contents).");
            println!("  The app must be installed on the repository.");
            println!();
            println!("For GitHub Enterprise:");
            println!("  Set repository.url to your API base, e.g. https://github.example.com/api/v3");
        }
        Platform::Gitea => {
            println!("{}", "Gitea Authentication Setup".emphasis());
            println!("==========================");
            println!();
            println!("Option 1: Access token");
            println!("  Set repository.token, REPOSITORY_GITEA_TOKEN or GITEA_TOKEN");
            println!();
            println!("Option 2: Basic auth");
            println!("  Set repository.username and repository.password");
            println!();
            println!("Any string setting can come from the environment:");
            println!("  REPOSITORY_<TYPE>_<FIELD>, e.g. REPOSITORY_GITEA_PASSWORD");
            println!("  FEED_<NAME>_<FIELD>, e.g. FEED_GITEA_TOKEN for a feed named `gitea`");
        }
    }
}
