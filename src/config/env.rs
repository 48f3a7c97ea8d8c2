//! Environment overrides for string config fields
//!
//! Once the file is parsed, every string field of the repository section can
//! be replaced by `REPOSITORY_<TYPE>_<FIELD>` (e.g. `REPOSITORY_GITHUB_TOKEN`)
//! and every string field of the feed called `<name>` by
//! `FEED_<NAME>_<FIELD>` (e.g. `FEED_INTERNAL_URL`). Empty variables are
//! ignored. Non-alphanumeric characters in feed names become `_`.

use super::{
    ContainerFeedConfig, FeedConfig, GitHubFeedConfig, GitHubRepoConfig, GiteaFeedConfig,
    GiteaRepoConfig, PyPiFeedConfig, RepositoryConfig,
};

/// Reads one variable, `None` when unset or empty
pub type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Lookup against the process environment
pub fn process_env(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.is_empty())
}

/// Variable prefix for the repository section of type `kind`
pub fn repository_prefix(kind: &str) -> String {
    format!("REPOSITORY_{}_", kind.to_ascii_uppercase())
}

/// Variable prefix for the feed called `name`
pub fn feed_prefix(name: &str) -> String {
    let name: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect();
    format!("FEED_{name}_")
}

/// A config section whose string fields can be set from the environment
pub(crate) trait EnvOverride {
    /// Replace fields that have a non-empty `<prefix><FIELD>` variable
    fn apply_env(&mut self, prefix: &str, lookup: Lookup<'_>);
}

trait EnvField {
    fn set_from_env(&mut self, value: String);
}

impl EnvField for String {
    fn set_from_env(&mut self, value: String) {
        *self = value;
    }
}

impl EnvField for Option<String> {
    fn set_from_env(&mut self, value: String) {
        *self = Some(value);
    }
}

macro_rules! env_fields {
    ($ty:ty { $($field:ident),* $(,)? }) => {
        impl EnvOverride for $ty {
            fn apply_env(&mut self, prefix: &str, lookup: Lookup<'_>) {
                $(
                    let var = format!("{prefix}{}", stringify!($field).to_ascii_uppercase());
                    if let Some(value) = lookup(&var) {
                        tracing::debug!(%var, "Config field set from environment");
                        EnvField::set_from_env(&mut self.$field, value);
                    }
                )*
            }
        }
    };
}

env_fields!(GitHubRepoConfig {
    owner,
    repo,
    token,
    url,
    base_branch,
    app_private_key,
    app_private_key_path,
});

env_fields!(GiteaRepoConfig {
    url,
    owner,
    repo,
    token,
    username,
    password,
    committer_name,
    committer_email,
    base_branch,
});

env_fields!(GitHubFeedConfig { token, url });
env_fields!(GiteaFeedConfig { url, token });
env_fields!(PyPiFeedConfig { url });
env_fields!(ContainerFeedConfig { url, token });

impl RepositoryConfig {
    pub(crate) fn apply_env(&mut self, lookup: Lookup<'_>) {
        let prefix = repository_prefix(self.kind_name());
        match self {
            Self::GitHub(c) => c.apply_env(&prefix, lookup),
            Self::Gitea(c) => c.apply_env(&prefix, lookup),
        }
    }
}

impl FeedConfig {
    pub(crate) fn apply_env(&mut self, name: &str, lookup: Lookup<'_>) {
        let prefix = feed_prefix(name);
        match self {
            Self::GitHub(c) => c.apply_env(&prefix, lookup),
            Self::Gitea(c) => c.apply_env(&prefix, lookup),
            Self::PyPi(c) => c.apply_env(&prefix, lookup),
            Self::ContainerRegistry(c) => c.apply_env(&prefix, lookup),
            Self::Rss(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_prefixes() {
        assert_eq!(repository_prefix("github"), "REPOSITORY_GITHUB_");
        assert_eq!(feed_prefix("gh"), "FEED_GH_");
        assert_eq!(feed_prefix("my-gitea"), "FEED_MY_GITEA_");
    }

    #[test]
    fn test_overrides_string_fields_only_when_set() {
        let env = vars(&[
            ("REPOSITORY_GITHUB_TOKEN", "from-env"),
            ("REPOSITORY_GITHUB_BASE_BRANCH", "develop"),
        ]);
        let lookup = |k: &str| env.get(k).cloned();
        let mut repo = RepositoryConfig::GitHub(GitHubRepoConfig {
            owner: "acme".to_string(),
            token: Some("from-file".to_string()),
            ..GitHubRepoConfig::default()
        });
        repo.apply_env(&lookup);

        let RepositoryConfig::GitHub(c) = repo else {
            panic!("repository type changed");
        };
        assert_eq!(c.token.as_deref(), Some("from-env"));
        assert_eq!(c.base_branch.as_deref(), Some("develop"));
        assert_eq!(c.owner, "acme");
        assert_eq!(c.url, None);
    }

    #[test]
    fn test_feed_overrides_use_feed_name() {
        let env = vars(&[("FEED_MY_REGISTRY_URL", "https://registry.example.com")]);
        let lookup = |k: &str| env.get(k).cloned();
        let mut feed = FeedConfig::ContainerRegistry(ContainerFeedConfig::default());
        feed.apply_env("my-registry", &lookup);

        let FeedConfig::ContainerRegistry(c) = feed else {
            panic!("feed type changed");
        };
        assert_eq!(c.url, "https://registry.example.com");
        assert_eq!(c.token, None);
    }
}
