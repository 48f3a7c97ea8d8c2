//! Platform service factory
//!
//! Creates platform services based on configuration.

use crate::auth::{get_gitea_auth, get_github_auth};
use crate::config::RepositoryConfig;
use crate::error::Result;
use crate::platform::{GitHubService, GiteaService, PlatformService};

/// Create a platform service from configuration
///
/// Handles authentication and client construction for both GitHub and Gitea.
pub async fn create_platform_service(
    config: &RepositoryConfig,
) -> Result<Box<dyn PlatformService>> {
    match config {
        RepositoryConfig::GitHub(repo) => {
            let auth = get_github_auth(repo).await?;
            Ok(Box::new(
                GitHubService::connect(&auth.credentials, repo).await?,
            ))
        }
        RepositoryConfig::Gitea(repo) => {
            let auth = get_gitea_auth(repo)?;
            Ok(Box::new(GiteaService::connect(auth.credentials, repo).await?))
        }
    }
}
