//! Error types for regex-updater

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while configuring or running updates
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid configuration (regex, template, feed reference, ...)
    #[error("config error: {0}")]
    Config(String),

    /// The update regex did not match the tracked file
    #[error("no match found for regex in {path}")]
    Extraction {
        /// Path of the tracked file
        path: String,
    },

    /// A version string is not a valid semantic version
    #[error("error parsing {version:?} as a semantic version: {reason}")]
    VersionParse {
        /// The offending version string
        version: String,
        /// Why parsing failed
        reason: String,
    },

    /// A release source failed while streaming or looking up releases
    #[error("release source error: {0}")]
    Source(Box<Error>),

    /// A read against the repository failed (file fetch, PR search)
    #[error("{action}: {source}")]
    Repository {
        /// What was being done
        action: String,
        /// Underlying failure
        source: Box<Error>,
    },

    /// A reconciliation write failed (create, comment, close, rebase)
    #[error("{action}: {source}")]
    Write {
        /// What was being done
        action: String,
        /// Underlying failure
        source: Box<Error>,
    },

    /// A template could not be rendered
    #[error("template error: {0}")]
    Render(String),

    /// The spliced content no longer matches the update regex
    #[error("new content for {path} did not match the regex")]
    RoundTrip {
        /// Path of the tracked file
        path: String,
    },

    /// Failure while processing a specific update
    #[error("update {name}: {source}")]
    Update {
        /// Update name
        name: String,
        /// Underlying failure
        source: Box<Error>,
    },

    /// GitHub API error
    #[error("GitHub API error: {0}")]
    GitHubApi(String),

    /// Gitea API error
    #[error("Gitea API error: {0}")]
    GiteaApi(String),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Authentication error
    #[error("authentication error: {0}")]
    Auth(String),

    /// Generic platform error
    #[error("platform error: {0}")]
    Platform(String),

    /// Parse error
    #[error("parse error: {0}")]
    Parse(String),

    /// YAML decoding error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<octocrab::Error> for Error {
    fn from(err: octocrab::Error) -> Self {
        Self::GitHubApi(err.to_string())
    }
}

impl Error {
    /// Wrap a collaborator failure from a release source
    pub fn feed(err: Self) -> Self {
        Self::Source(Box::new(err))
    }

    /// Wrap a failed repository read with what was being attempted
    pub fn repository(action: impl Into<String>, err: Self) -> Self {
        Self::Repository {
            action: action.into(),
            source: Box::new(err),
        }
    }

    /// Wrap a failed reconciliation write with what was being attempted
    pub fn write(action: impl Into<String>, err: Self) -> Self {
        Self::Write {
            action: action.into(),
            source: Box::new(err),
        }
    }

    /// Name of the update this error belongs to, if tagged
    pub fn update_name(&self) -> Option<&str> {
        match self {
            Self::Update { name, .. } => Some(name),
            _ => None,
        }
    }
}
