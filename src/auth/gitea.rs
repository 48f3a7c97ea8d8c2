//! Gitea authentication

use crate::auth::{AuthSource, env_token};
use crate::config::GiteaRepoConfig;
use crate::error::{Error, Result};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;

/// How requests to Gitea are authenticated
#[derive(Clone, PartialEq, Eq)]
pub enum GiteaCredentials {
    /// Access token
    Token(String),
    /// Username and password
    Basic {
        /// Username
        username: String,
        /// Password
        password: String,
    },
}

impl std::fmt::Debug for GiteaCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Token(_) => f.write_str("Token(..)"),
            Self::Basic { username, .. } => write!(f, "Basic({username})"),
        }
    }
}

impl GiteaCredentials {
    /// Attach these credentials to a request
    pub fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Self::Token(token) => request.header("Authorization", format!("token {token}")),
            Self::Basic { username, password } => request.basic_auth(username, Some(password)),
        }
    }
}

/// Gitea authentication configuration
#[derive(Debug, Clone)]
pub struct GiteaAuthConfig {
    /// Credentials to send
    pub credentials: GiteaCredentials,
    /// Where they were obtained from
    pub source: AuthSource,
}

/// Get Gitea authentication
///
/// Priority:
/// 1. `token` from the config file (or `REPOSITORY_GITEA_TOKEN`)
/// 2. `username` and `password` from the config file
/// 3. `GITEA_TOKEN` environment variable
pub fn get_gitea_auth(config: &GiteaRepoConfig) -> Result<GiteaAuthConfig> {
    if let Some(token) = config.token.as_ref().filter(|t| !t.is_empty()) {
        return Ok(GiteaAuthConfig {
            credentials: GiteaCredentials::Token(token.clone()),
            source: AuthSource::Config,
        });
    }

    if let (Some(username), Some(password)) = (&config.username, &config.password) {
        return Ok(GiteaAuthConfig {
            credentials: GiteaCredentials::Basic {
                username: username.clone(),
                password: password.clone(),
            },
            source: AuthSource::Config,
        });
    }

    if let Some(token) = env_token(&["GITEA_TOKEN"]) {
        return Ok(GiteaAuthConfig {
            credentials: GiteaCredentials::Token(token),
            source: AuthSource::EnvVar,
        });
    }

    Err(Error::Auth(
        "No Gitea authentication found. Set `repository.token` or REPOSITORY_GITEA_TOKEN"
            .to_string(),
    ))
}

#[derive(Deserialize)]
struct GiteaUser {
    login: String,
}

/// Test Gitea authentication, returning the login of the authenticated user
pub async fn test_gitea_auth(url: &str, config: &GiteaAuthConfig) -> Result<String> {
    let url = format!("{}/api/v1/user", url.trim_end_matches('/'));

    let user: GiteaUser = config
        .credentials
        .apply(Client::new().get(&url))
        .send()
        .await?
        .error_for_status()
        .map_err(|e| Error::Auth(format!("Invalid credentials: {e}")))?
        .json()
        .await?;

    Ok(user.login)
}
