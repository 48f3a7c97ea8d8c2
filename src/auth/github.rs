//! GitHub authentication
//!
//! A repository is accessed either with a token or as a GitHub App. App
//! credentials are an app id and an RSA private key; the installation is
//! looked up per repository when the service connects.

use crate::auth::{AuthSource, env_token};
use crate::config::GitHubRepoConfig;
use crate::error::{Error, Result};
use octocrab::Octocrab;
use octocrab::models::AppId;
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;
use url::Url;

/// How requests to GitHub are authenticated
#[derive(Clone, PartialEq, Eq)]
pub enum GitHubCredentials {
    /// Personal or installation access token
    Token(String),
    /// GitHub App id and PEM encoded private key
    App {
        /// Numeric app id
        app_id: u64,
        /// RSA private key in PEM format
        private_key: String,
    },
}

impl std::fmt::Debug for GitHubCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Token(_) => f.write_str("Token(..)"),
            Self::App { app_id, .. } => write!(f, "App({app_id})"),
        }
    }
}

/// GitHub authentication configuration
#[derive(Debug, Clone)]
pub struct GitHubAuthConfig {
    /// Credentials to send
    pub credentials: GitHubCredentials,
    /// Where they were obtained from
    pub source: AuthSource,
}

impl GitHubAuthConfig {
    const fn token(token: String, source: AuthSource) -> Self {
        Self {
            credentials: GitHubCredentials::Token(token),
            source,
        }
    }
}

/// Host `gh` should be asked about, `None` for github.com
///
/// Enterprise API bases look like `https://github.example.com/api/v3`.
fn enterprise_host(api_url: Option<&str>) -> Option<String> {
    let url = Url::parse(api_url?).ok()?;
    let host = url.host_str()?;
    (host != "api.github.com" && host != "github.com").then(|| host.to_string())
}

/// Resolve the credentials for a GitHub repository
///
/// Priority:
/// 1. `app_id` with `app_private_key` or `app_private_key_path`
/// 2. `token` from the config file (or `REPOSITORY_GITHUB_TOKEN`)
/// 3. gh CLI (`gh auth token`, with `--hostname` for Enterprise)
/// 4. `GITHUB_TOKEN` or `GH_TOKEN` environment variables
pub async fn get_github_auth(repo: &GitHubRepoConfig) -> Result<GitHubAuthConfig> {
    if let Some(app_id) = repo.app_id {
        let private_key = match (&repo.app_private_key, &repo.app_private_key_path) {
            (Some(key), _) => key.clone(),
            (None, Some(path)) => tokio::fs::read_to_string(path)
                .await
                .map_err(|e| Error::Auth(format!("Cannot read {path}: {e}")))?,
            (None, None) => {
                return Err(Error::Auth(
                    "`app_id` needs `app_private_key` or `app_private_key_path`".to_string(),
                ));
            }
        };
        return Ok(GitHubAuthConfig {
            credentials: GitHubCredentials::App {
                app_id,
                private_key,
            },
            source: AuthSource::Config,
        });
    }
    if let Some(token) = repo.token.clone().filter(|t| !t.is_empty()) {
        return Ok(GitHubAuthConfig::token(token, AuthSource::Config));
    }
    if let Some(token) = gh_cli_token(enterprise_host(repo.url.as_deref()).as_deref()).await {
        return Ok(GitHubAuthConfig::token(token, AuthSource::Cli));
    }
    if let Some(token) = env_token(&["GITHUB_TOKEN", "GH_TOKEN"]) {
        return Ok(GitHubAuthConfig::token(token, AuthSource::EnvVar));
    }

    Err(Error::Auth(
        "No GitHub authentication found. Set `repository.token` or `repository.app_id`, run `gh auth login` or set GITHUB_TOKEN"
            .to_string(),
    ))
}

/// Build an octocrab client for `credentials`
///
/// App clients authenticate as the app itself; call
/// [`Octocrab::installation`] to act on a repository.
pub fn github_client(credentials: &GitHubCredentials, api_url: Option<&str>) -> Result<Octocrab> {
    let mut builder = match credentials {
        GitHubCredentials::Token(token) => Octocrab::builder().personal_token(token.clone()),
        GitHubCredentials::App {
            app_id,
            private_key,
        } => {
            let key = jsonwebtoken::EncodingKey::from_rsa_pem(private_key.as_bytes())
                .map_err(|e| Error::Auth(format!("Invalid GitHub App private key: {e}")))?;
            Octocrab::builder().app(AppId(*app_id), key)
        }
    };
    if let Some(url) = api_url {
        builder = builder
            .base_uri(url)
            .map_err(|e| Error::GitHubApi(e.to_string()))?;
    }
    builder
        .build()
        .map_err(|e| Error::GitHubApi(e.to_string()))
}

/// Ask the gh CLI for its token; `None` if gh is missing or logged out
async fn gh_cli_token(host: Option<&str>) -> Option<String> {
    let mut cmd = Command::new("gh");
    cmd.args(["auth", "token"]);
    if let Some(host) = host {
        cmd.args(["--hostname", host]);
    }

    let output = cmd.output().await.ok()?;
    if !output.status.success() {
        debug!(?host, "gh CLI has no token");
        return None;
    }
    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!token.is_empty()).then_some(token)
}

#[derive(Deserialize)]
struct AuthenticatedApp {
    slug: String,
}

/// Test GitHub authentication
///
/// Returns the login of the token's user, or `app/<slug>` for an app.
pub async fn test_github_auth(config: &GitHubAuthConfig, api_url: Option<&str>) -> Result<String> {
    let octocrab = github_client(&config.credentials, api_url)?;

    match config.credentials {
        GitHubCredentials::Token(_) => {
            let user = octocrab
                .current()
                .user()
                .await
                .map_err(|e| Error::Auth(format!("Invalid token: {e}")))?;
            Ok(user.login)
        }
        GitHubCredentials::App { .. } => {
            let app: AuthenticatedApp = octocrab
                .get("/app", None::<&()>)
                .await
                .map_err(|e| Error::Auth(format!("Invalid GitHub App credentials: {e}")))?;
            Ok(format!("app/{}", app.slug))
        }
    }
}
