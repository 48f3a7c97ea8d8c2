//! Configuration file loading and validation
//!
//! The config is a YAML document (default `.regexupdater.yml`) with a
//! `repository`, a set of named `feeds`, the `updates` to process and
//! optional `templates`. Raw sections are decoded into typed structs and
//! then compiled into [`Update`]s, which is where the regexes, replace rules
//! and per-update feed parameters are checked. String fields can be
//! overridden from the environment, see [`env`].

pub mod env;

use crate::error::{Error, Result};
use crate::feed::{FeedKind, FeedQuery, GITHUB_MAX_PAGE_SIZE};
use crate::update::Templates;
use regex::Regex;
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

pub use env::{feed_prefix, repository_prefix};
use tracing::debug;
use url::Url;

/// Config file used when `--config` is not given
pub const DEFAULT_CONFIG_PATH: &str = ".regexupdater.yml";

/// Top-level configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Repository the tracked files live in
    pub repository: RepositoryConfig,
    /// Release feeds by name
    pub feeds: BTreeMap<String, FeedConfig>,
    /// Updates to process, in order
    pub updates: Vec<UpdateConfig>,
    /// PR and branch templates
    #[serde(default)]
    pub templates: TemplateConfig,
}

/// Repository section, tagged by `type`
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum RepositoryConfig {
    /// GitHub or GitHub Enterprise
    #[serde(rename = "github")]
    GitHub(GitHubRepoConfig),
    /// Gitea or Forgejo
    #[serde(rename = "gitea")]
    Gitea(GiteaRepoConfig),
}

/// GitHub repository settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GitHubRepoConfig {
    /// Repository owner
    pub owner: String,
    /// Repository name
    pub repo: String,
    /// Personal access token
    pub token: Option<String>,
    /// GitHub App id; authenticates as the app's installation on the repository
    pub app_id: Option<u64>,
    /// GitHub App private key (PEM)
    pub app_private_key: Option<String>,
    /// Path to the GitHub App private key
    pub app_private_key_path: Option<String>,
    /// API base URL for GitHub Enterprise
    pub url: Option<String>,
    /// Branch PRs target, defaults to the repository default branch
    pub base_branch: Option<String>,
    /// Labels to search for and apply to PRs
    pub labels: Vec<String>,
}

/// Gitea repository settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GiteaRepoConfig {
    /// Instance URL
    pub url: String,
    /// Repository owner
    pub owner: String,
    /// Repository name
    pub repo: String,
    /// API token
    pub token: Option<String>,
    /// Basic auth user
    pub username: Option<String>,
    /// Basic auth password
    pub password: Option<String>,
    /// Commit author name
    pub committer_name: Option<String>,
    /// Commit author email
    pub committer_email: Option<String>,
    /// Branch PRs target, defaults to the repository default branch
    pub base_branch: Option<String>,
    /// Labels to search for and apply to PRs
    pub labels: Vec<String>,
    /// Page size used when listing labels
    pub page_size: Option<u32>,
}

/// A named feed, tagged by `type`
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum FeedConfig {
    /// GitHub releases or tags
    #[serde(rename = "github")]
    GitHub(GitHubFeedConfig),
    /// Gitea releases or tags
    #[serde(rename = "gitea")]
    Gitea(GiteaFeedConfig),
    /// PyPI project releases
    #[serde(rename = "pypi")]
    PyPi(PyPiFeedConfig),
    /// Tags of an OCI/Docker registry repository
    #[serde(rename = "container_registry")]
    ContainerRegistry(ContainerFeedConfig),
    /// Entries of an RSS or Atom feed
    #[serde(rename = "rss")]
    Rss(RssFeedConfig),
}

/// GitHub feed settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GitHubFeedConfig {
    /// API token
    pub token: Option<String>,
    /// API base URL for GitHub Enterprise
    pub url: Option<String>,
    /// Items per page (max 100)
    pub page_size: Option<u32>,
    /// Maximum number of releases to scan, one page when unset or 0
    pub limit: Option<usize>,
}

/// Gitea feed settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GiteaFeedConfig {
    /// Instance URL
    pub url: String,
    /// API token
    pub token: Option<String>,
    /// Items per page
    pub page_size: Option<u32>,
    /// Maximum number of releases to scan, one page when unset or 0
    pub limit: Option<usize>,
}

/// PyPI feed settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PyPiFeedConfig {
    /// Index URL
    pub url: Option<String>,
}

/// Container registry feed settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContainerFeedConfig {
    /// Registry URL, e.g. `https://registry-1.docker.io`
    pub url: String,
    /// Bearer token; without one the registry's token service is asked
    pub token: Option<String>,
    /// Tags per page (`n`), registry default when unset
    pub page_size: Option<u32>,
    /// Maximum number of tags to scan, unlimited when unset or 0
    pub limit: Option<usize>,
}

/// RSS/Atom feed settings; the feed URL is given per update
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RssFeedConfig {}

impl FeedConfig {
    /// Which kind of feed this is
    pub const fn kind(&self) -> FeedKind {
        match self {
            Self::GitHub(_) => FeedKind::GitHub,
            Self::Gitea(_) => FeedKind::Gitea,
            Self::PyPi(_) => FeedKind::PyPi,
            Self::ContainerRegistry(_) => FeedKind::ContainerRegistry,
            Self::Rss(_) => FeedKind::Rss,
        }
    }

    fn validate(&self, name: &str) -> Result<()> {
        let ctx = |e: Error| Error::Config(format!("feed {name}: {}", strip_config(&e)));
        match self {
            Self::GitHub(c) => {
                if let Some(url) = &c.url {
                    check_url("url", url).map_err(ctx)?;
                }
                if c.page_size.is_some_and(|size| !(1..=GITHUB_MAX_PAGE_SIZE).contains(&size)) {
                    return Err(ctx(Error::Config(format!(
                        "page_size must be between 1 and {GITHUB_MAX_PAGE_SIZE}"
                    ))));
                }
            }
            Self::Gitea(c) => {
                check_url("url", &c.url).map_err(ctx)?;
                if c.page_size == Some(0) {
                    return Err(ctx(Error::Config("page_size must be positive".to_string())));
                }
            }
            Self::PyPi(c) => {
                if let Some(url) = &c.url {
                    check_url("url", url).map_err(ctx)?;
                }
            }
            Self::ContainerRegistry(c) => {
                check_url("url", &c.url).map_err(ctx)?;
                if c.page_size == Some(0) {
                    return Err(ctx(Error::Config("page_size must be positive".to_string())));
                }
            }
            Self::Rss(_) => {}
        }
        Ok(())
    }
}

/// How to treat an open PR for an older version
///
/// Required in the config file; [`Update::new`] starts from `Ignore`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExistingPrPolicy {
    /// Leave the old PR alone and open nothing new
    Stop,
    /// Open the new PR, then close the old one pointing at it
    Close,
    /// Open the new PR and leave the old one open
    #[default]
    Ignore,
}

/// A `find`/`replace` regex rewrite
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReplaceConfig {
    /// Pattern to search for
    pub find: String,
    /// Replacement, may reference groups as `$1` or `${name}`
    pub replace: String,
}

/// Reference to a named feed plus the per-update parameters for it
#[derive(Debug, Clone, Deserialize)]
pub struct FeedRef {
    /// Name of a feed under `feeds`
    pub name: String,
    /// Remaining keys, decoded according to the feed's type
    #[serde(flatten)]
    pub params: BTreeMap<String, serde_yaml::Value>,
}

/// Secondary feed check
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SecondaryFeedConfig {
    /// Feed that must also have the new version
    pub feed: FeedRef,
    /// Rewrite applied to the new version before the lookup
    pub replace: Option<ReplaceConfig>,
}

/// One update entry as written in the config file
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateConfig {
    /// Unique name, also the identity of the update's PRs
    pub name: String,
    /// Path of the tracked file in the repository
    pub path: String,
    /// Regex with exactly one capture group around the version
    pub regex: String,
    /// Primary release feed
    pub feed: FeedRef,
    /// Compare versions as plain strings
    #[serde(default)]
    pub is_not_semver: bool,
    /// Write the normalised semantic version instead of the raw one
    #[serde(default)]
    pub use_semver: bool,
    /// Allow prerelease versions
    #[serde(default)]
    pub prerelease: bool,
    /// Rewrite applied to each release version before comparing
    pub pre_replace: Option<ReplaceConfig>,
    /// Feed that must also publish the new version
    pub secondary_feed: Option<SecondaryFeedConfig>,
    /// Policy for open PRs for older versions
    pub existing_pr: ExistingPrPolicy,
}

/// Optional template overrides
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplateConfig {
    /// PR title
    pub pr_title: Option<String>,
    /// PR body; the metadata footer is appended automatically
    pub pr_body: Option<String>,
    /// Commit message
    pub commit_msg: Option<String>,
    /// Head branch name
    pub branch: Option<String>,
}

/// A compiled regex rewrite
#[derive(Debug, Clone)]
pub struct Replace {
    regex: Regex,
    replacement: String,
}

impl Replace {
    /// Compile a rewrite rule
    pub fn new(find: &str, replacement: &str) -> Result<Self> {
        let regex = Regex::new(find)
            .map_err(|e| Error::Config(format!("invalid replace regex {find:?}: {e}")))?;
        Ok(Self {
            regex,
            replacement: replacement.to_string(),
        })
    }

    fn from_config(cfg: &ReplaceConfig) -> Result<Self> {
        Self::new(&cfg.find, &cfg.replace)
    }

    /// Replace every match in `input`
    pub fn apply(&self, input: &str) -> String {
        self.regex
            .replace_all(input, self.replacement.as_str())
            .into_owned()
    }
}

/// A feed name bound to decoded parameters
#[derive(Debug, Clone)]
pub struct FeedBinding {
    /// Name of the feed
    pub name: String,
    /// Parameters for the feed
    pub query: FeedQuery,
}

/// Compiled secondary feed check
#[derive(Debug, Clone)]
pub struct SecondaryFeed {
    /// Feed to look the version up in
    pub feed: FeedBinding,
    /// Rewrite applied to the version first
    pub replace: Option<Replace>,
}

/// A validated, ready-to-run update
#[derive(Debug, Clone)]
pub struct Update {
    /// Unique update name
    pub name: String,
    /// Path of the tracked file
    pub path: String,
    /// Multi-line regex with one capture group
    pub regex: regex::bytes::Regex,
    /// Parse and compare versions semantically
    pub semver: bool,
    /// Splice the normalised semantic version
    pub use_semver: bool,
    /// Allow prereleases
    pub prerelease: bool,
    /// Rewrite applied to release versions
    pub pre_replace: Option<Replace>,
    /// Primary feed
    pub feed: FeedBinding,
    /// Optional secondary feed
    pub secondary: Option<SecondaryFeed>,
    /// Policy for open PRs for older versions
    pub existing_pr: ExistingPrPolicy,
}

impl Update {
    /// Build a semver update with default options
    ///
    /// The pattern is compiled in multi-line mode and must contain exactly
    /// one capture group.
    pub fn new(
        name: impl Into<String>,
        path: impl Into<String>,
        pattern: &str,
        feed: FeedBinding,
    ) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            path: path.into(),
            regex: compile_update_regex(pattern)?,
            semver: true,
            use_semver: false,
            prerelease: false,
            pre_replace: None,
            feed,
            secondary: None,
            existing_pr: ExistingPrPolicy::default(),
        })
    }

    /// Apply the pre-replace rule to a release version
    pub fn transform(&self, version: &str) -> String {
        self.pre_replace
            .as_ref()
            .map_or_else(|| version.to_string(), |r| r.apply(version))
    }
}

/// Compile an update regex in multi-line mode and check its group count
pub fn compile_update_regex(pattern: &str) -> Result<regex::bytes::Regex> {
    let regex = regex::bytes::Regex::new(&format!("(?m){pattern}"))
        .map_err(|e| Error::Config(format!("invalid regex {pattern:?}: {e}")))?;
    // group 0 is the whole match
    if regex.captures_len() != 2 {
        return Err(Error::Config(
            "the regex must have exactly 1 capture group".to_string(),
        ));
    }
    Ok(regex)
}

fn check_required(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::Config(format!("`{field}` is required")));
    }
    Ok(())
}

fn check_url(field: &str, value: &str) -> Result<()> {
    check_required(field, value)?;
    let url = Url::parse(value).map_err(|e| Error::Config(format!("`{field}` {value:?}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::Config(format!(
            "`{field}` {value:?} must be an http(s) URL"
        )));
    }
    Ok(())
}

fn strip_config(err: &Error) -> String {
    match err {
        Error::Config(msg) => msg.clone(),
        other => other.to_string(),
    }
}

fn check_github_app(c: &GitHubRepoConfig) -> Result<()> {
    match (c.app_id, &c.app_private_key, &c.app_private_key_path) {
        (None, None, None) => Ok(()),
        (Some(_), Some(_), Some(_)) => Err(Error::Config(
            "set only one of `app_private_key` and `app_private_key_path`".to_string(),
        )),
        (Some(_), None, None) => Err(Error::Config(
            "`app_private_key` or `app_private_key_path` is required with `app_id`".to_string(),
        )),
        (None, _, _) => Err(Error::Config(
            "`app_id` is required with a GitHub App private key".to_string(),
        )),
        (Some(_), _, Some(path)) => {
            if Path::new(path).is_file() {
                Ok(())
            } else {
                Err(Error::Config(format!(
                    "`app_private_key_path` {path:?} is not a file"
                )))
            }
        }
        (Some(_), Some(_), None) => Ok(()),
    }
}

impl RepositoryConfig {
    /// The `type` tag of this section
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::GitHub(_) => "github",
            Self::Gitea(_) => "gitea",
        }
    }

    fn validate(&self) -> Result<()> {
        let ctx = |e: Error| Error::Config(format!("repository: {}", strip_config(&e)));
        match self {
            Self::GitHub(c) => {
                check_required("owner", &c.owner).map_err(ctx)?;
                check_required("repo", &c.repo).map_err(ctx)?;
                if let Some(url) = &c.url {
                    check_url("url", url).map_err(ctx)?;
                }
                check_github_app(c).map_err(ctx)?;
            }
            Self::Gitea(c) => {
                check_url("url", &c.url).map_err(ctx)?;
                check_required("owner", &c.owner).map_err(ctx)?;
                check_required("repo", &c.repo).map_err(ctx)?;
                if c.username.is_some() && c.password.is_none() {
                    return Err(ctx(Error::Config(
                        "`password` is required with `username`".to_string(),
                    )));
                }
                if c.committer_name.is_some() && c.committer_email.is_none() {
                    return Err(ctx(Error::Config(
                        "`committer_email` is required with `committer_name`".to_string(),
                    )));
                }
            }
        }
        Ok(())
    }
}

impl Config {
    /// Read, parse and validate a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Loading config");
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse a config document, apply environment overrides and validate
    pub fn parse(contents: &str) -> Result<Self> {
        Self::parse_with_env(contents, &env::process_env)
    }

    /// [`parse`](Self::parse) with overrides read through `lookup`
    pub fn parse_with_env(contents: &str, lookup: env::Lookup<'_>) -> Result<Self> {
        let mut config: Self = serde_yaml::from_str(contents)?;
        config.repository.apply_env(lookup);
        for (name, feed) in &mut config.feeds {
            feed.apply_env(name, lookup);
        }
        config.validate()?;
        Ok(config)
    }

    /// Check everything that can be checked without network access
    pub fn validate(&self) -> Result<()> {
        self.repository.validate()?;

        if self.feeds.is_empty() {
            return Err(Error::Config("at least one feed is required".to_string()));
        }
        for (name, feed) in &self.feeds {
            feed.validate(name)?;
        }

        if self.updates.is_empty() {
            return Err(Error::Config("at least one update is required".to_string()));
        }
        let mut names = HashSet::new();
        for update in &self.updates {
            if !names.insert(update.name.as_str()) {
                return Err(Error::Config(format!(
                    "duplicate update name {:?}",
                    update.name
                )));
            }
        }
        self.compile_updates()?;

        Templates::from_config(&self.templates)?;
        Ok(())
    }

    /// Compile every update
    pub fn compile_updates(&self) -> Result<Vec<Update>> {
        self.updates.iter().map(|u| self.compile_update(u)).collect()
    }

    fn bind_feed(&self, feed: &FeedRef) -> Result<FeedBinding> {
        let cfg = self
            .feeds
            .get(&feed.name)
            .ok_or_else(|| Error::Config(format!("feed {:?} does not exist", feed.name)))?;
        let params = serde_yaml::Value::Mapping(
            feed.params
                .iter()
                .map(|(k, v)| (serde_yaml::Value::String(k.clone()), v.clone()))
                .collect(),
        );
        Ok(FeedBinding {
            name: feed.name.clone(),
            query: cfg.kind().decode_query(params)?,
        })
    }

    fn compile_update(&self, cfg: &UpdateConfig) -> Result<Update> {
        let ctx = |e: Error| Error::Config(format!("update {}: {}", cfg.name, strip_config(&e)));

        check_required("name", &cfg.name).map_err(ctx)?;
        check_required("path", &cfg.path).map_err(ctx)?;
        check_required("regex", &cfg.regex).map_err(ctx)?;

        let feed = self.bind_feed(&cfg.feed).map_err(ctx)?;
        let mut update = Update::new(&cfg.name, &cfg.path, &cfg.regex, feed).map_err(ctx)?;
        update.semver = !cfg.is_not_semver;
        update.use_semver = cfg.use_semver;
        update.prerelease = cfg.prerelease;
        update.existing_pr = cfg.existing_pr;
        update.pre_replace = cfg
            .pre_replace
            .as_ref()
            .map(Replace::from_config)
            .transpose()
            .map_err(ctx)?;

        if let Some(secondary) = &cfg.secondary_feed {
            update.secondary = Some(SecondaryFeed {
                feed: self.bind_feed(&secondary.feed).map_err(ctx)?,
                replace: secondary
                    .replace
                    .as_ref()
                    .map(Replace::from_config)
                    .transpose()
                    .map_err(ctx)?,
            });
        }

        Ok(update)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{ContainerQuery, GitHubQuery, RssQuery};
    use std::collections::HashMap;
    use std::io::Write;

    const VALID: &str = r#"
repository:
  type: github
  owner: acme
  repo: infra
  labels: [dependencies]
feeds:
  gh:
    type: github
  pypi:
    type: pypi
updates:
  - name: traefik
    path: charts/values.yaml
    regex: 'image: traefik:v(\S+)'
    feed:
      name: gh
      owner: traefik
      repo: traefik
    pre_replace:
      find: '^v'
      replace: ''
    existing_pr: close
  - name: black
    path: requirements.txt
    regex: '^black==(.+)$'
    is_not_semver: true
    existing_pr: ignore
    feed:
      name: pypi
      project: black
    secondary_feed:
      feed:
        name: gh
        owner: psf
        repo: black
        tags: true
"#;

    #[test]
    fn test_parse_valid_config() {
        let config = Config::parse_with_env(VALID, &|_| None).unwrap();
        let updates = config.compile_updates().unwrap();
        assert_eq!(updates.len(), 2);

        let traefik = &updates[0];
        assert!(traefik.semver);
        assert_eq!(traefik.existing_pr, ExistingPrPolicy::Close);
        assert_eq!(traefik.transform("v2.9.1"), "2.9.1");
        assert_eq!(
            traefik.feed.query,
            FeedQuery::GitHub(GitHubQuery {
                owner: "traefik".to_string(),
                repo: "traefik".to_string(),
                tags: false,
                include_prereleases: false,
            })
        );

        let black = &updates[1];
        assert!(!black.semver);
        assert_eq!(black.existing_pr, ExistingPrPolicy::Ignore);
        assert_eq!(black.secondary.as_ref().unwrap().feed.name, "gh");
    }

    fn with_feeds(feeds: &str, update: &str) -> String {
        format!("repository: {{type: github, owner: a, repo: b}}\nfeeds: {feeds}\nupdates:\n{update}")
    }

    fn with_update(update: &str) -> String {
        with_feeds("{gh: {type: github}}", update)
    }

    fn parse(doc: &str) -> Result<Config> {
        Config::parse_with_env(doc, &|_| None)
    }

    #[test]
    fn test_regex_group_count_enforced() {
        let none = with_update(
            "  - {name: x, path: f, regex: 'v\\d+', existing_pr: stop, feed: {name: gh, owner: o, repo: r}}",
        );
        let two = with_update(
            "  - {name: x, path: f, regex: '(a)(b)', existing_pr: stop, feed: {name: gh, owner: o, repo: r}}",
        );

        for doc in [none, two] {
            let err = parse(&doc).unwrap_err();
            assert!(err.to_string().contains("exactly 1 capture group"), "{err}");
        }
    }

    #[test]
    fn test_unknown_feed_rejected() {
        let doc = with_update("  - {name: x, path: f, regex: '(.*)', existing_pr: stop, feed: {name: nope}}");
        let err = parse(&doc).unwrap_err();
        assert!(err.to_string().contains("does not exist"), "{err}");
    }

    #[test]
    fn test_feed_params_checked_against_feed_type() {
        let doc = with_update(
            "  - {name: x, path: f, regex: '(.*)', existing_pr: stop, feed: {name: gh, project: black}}",
        );
        assert!(matches!(parse(&doc), Err(Error::Config(_))));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let u = "  - {name: x, path: f, regex: '(.*)', existing_pr: stop, feed: {name: gh, owner: o, repo: r}}\n";
        let doc = with_update(&format!("{u}{u}"));
        let err = parse(&doc).unwrap_err();
        assert!(err.to_string().contains("duplicate"), "{err}");
    }

    #[test]
    fn test_existing_pr_policy_is_required() {
        let missing = with_update("  - {name: x, path: f, regex: '(.*)', feed: {name: gh, owner: o, repo: r}}");
        let err = parse(&missing).unwrap_err();
        assert!(err.to_string().contains("existing_pr"), "{err}");

        let invalid = with_update(
            "  - {name: x, path: f, regex: '(.*)', existing_pr: merge, feed: {name: gh, owner: o, repo: r}}",
        );
        assert!(matches!(parse(&invalid), Err(Error::Yaml(_))));
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let doc = with_update(
            "  - {name: x, path: f, regex: '(.*)', existing_pr: stop, colour: red, feed: {name: gh, owner: o, repo: r}}",
        );
        assert!(parse(&doc).is_err());
    }

    #[test]
    fn test_bad_templates_rejected() {
        let update = with_update(
            "  - {name: x, path: f, regex: '(.*)', existing_pr: stop, feed: {name: gh, owner: o, repo: r}}",
        );
        for template in ["'Bump {{ name'", "'{{ version }}'"] {
            let doc = format!("{update}\ntemplates:\n  pr_title: {template}\n");
            assert!(matches!(parse(&doc), Err(Error::Config(_))), "{template}");
        }
    }

    #[test]
    fn test_gitea_repository_requires_url() {
        let doc = "repository: {type: gitea, url: 'not a url', owner: a, repo: b}\nfeeds: {gh: {type: github}}\nupdates:\n  - {name: x, path: f, regex: '(.*)', existing_pr: stop, feed: {name: gh, owner: o, repo: r}}";
        let err = parse(doc).unwrap_err();
        assert!(err.to_string().contains("repository"), "{err}");
    }

    #[test]
    fn test_replace_expands_groups() {
        let r = Replace::new(r"^(\d+)_(\d+)$", "$1.$2").unwrap();
        assert_eq!(r.apply("1_2"), "1.2");
        assert!(Replace::new("(", "").is_err());
    }

    #[test]
    fn test_container_and_rss_feeds() {
        let doc = with_feeds(
            "{hub: {type: container_registry, url: 'https://registry-1.docker.io', page_size: 50}, news: {type: rss}}",
            "  - {name: alpine, path: Dockerfile, regex: 'alpine:(\\S+)', existing_pr: close, feed: {name: hub, repo: library/alpine}}\n  - {name: logrus, path: go.mod, regex: 'logrus (\\S+)', existing_pr: stop, feed: {name: news, url: 'https://github.com/sirupsen/logrus/releases.atom'}}",
        );
        let updates = parse(&doc).unwrap().compile_updates().unwrap();
        assert_eq!(
            updates[0].feed.query,
            FeedQuery::ContainerRegistry(ContainerQuery {
                repo: "library/alpine".to_string(),
            })
        );
        assert_eq!(
            updates[1].feed.query,
            FeedQuery::Rss(RssQuery {
                url: "https://github.com/sirupsen/logrus/releases.atom".to_string(),
            })
        );

        let no_url = with_feeds(
            "{hub: {type: container_registry}}",
            "  - {name: a, path: f, regex: '(.*)', existing_pr: stop, feed: {name: hub, repo: library/alpine}}",
        );
        assert!(parse(&no_url).is_err());
        let bad_rss = with_feeds(
            "{news: {type: rss}}",
            "  - {name: a, path: f, regex: '(.*)', existing_pr: stop, feed: {name: news, url: 'ftp://x'}}",
        );
        assert!(matches!(parse(&bad_rss), Err(Error::Config(_))));
    }

    #[test]
    fn test_github_app_settings() {
        let update =
            "  - {name: x, path: f, regex: '(.*)', existing_pr: stop, feed: {name: gh, owner: o, repo: r}}";
        let doc = |repo: &str| {
            format!("repository: {{type: github, owner: a, repo: b, {repo}}}\nfeeds: {{gh: {{type: github}}}}\nupdates:\n{update}")
        };

        assert!(parse(&doc("app_id: 12, app_private_key: 'pem'")).is_ok());
        assert!(parse(&doc("app_id: 12")).is_err());
        assert!(parse(&doc("app_private_key: 'pem'")).is_err());
        assert!(parse(&doc("app_id: 12, app_private_key: 'pem', app_private_key_path: k.pem")).is_err());
        assert!(parse(&doc("app_id: 12, app_private_key_path: /nonexistent/key.pem")).is_err());

        let mut key = tempfile::NamedTempFile::new().unwrap();
        key.write_all(b"pem").unwrap();
        let path = key.path().display().to_string();
        assert!(parse(&doc(&format!("app_id: 12, app_private_key_path: '{path}'"))).is_ok());
    }

    #[test]
    fn test_environment_overrides_before_validation() {
        let doc = "repository: {type: gitea, url: 'not a url', owner: a, repo: b}\nfeeds: {my-gitea: {type: gitea, url: 'https://gitea.com'}}\nupdates:\n  - {name: x, path: f, regex: '(.*)', existing_pr: stop, feed: {name: my-gitea, owner: o, repo: r}}";
        let env: HashMap<&str, &str> = [
            ("REPOSITORY_GITEA_URL", "https://git.example.com"),
            ("REPOSITORY_GITEA_TOKEN", "repo-token"),
            ("FEED_MY_GITEA_TOKEN", "feed-token"),
            ("REPOSITORY_GITHUB_TOKEN", "ignored"),
        ]
        .into_iter()
        .collect();
        let lookup = |k: &str| env.get(k).map(|v| (*v).to_string());

        let config = Config::parse_with_env(doc, &lookup).unwrap();
        let RepositoryConfig::Gitea(repo) = &config.repository else {
            panic!("expected a gitea repository");
        };
        assert_eq!(repo.url, "https://git.example.com");
        assert_eq!(repo.token.as_deref(), Some("repo-token"));
        let Some(FeedConfig::Gitea(feed)) = config.feeds.get("my-gitea") else {
            panic!("expected a gitea feed");
        };
        assert_eq!(feed.token.as_deref(), Some("feed-token"));
    }

    #[test]
    fn test_absent_fields_can_come_from_environment() {
        let doc = "repository: {type: github, repo: infra}\nfeeds: {hub: {type: container_registry}}\nupdates:\n  - {name: x, path: f, regex: '(.*)', existing_pr: ignore, feed: {name: hub, repo: library/alpine}}";
        let none = |_: &str| None::<String>;
        let err = Config::parse_with_env(doc, &none).unwrap_err().to_string();
        assert!(err.contains("`owner` is required"), "{err}");

        let env: HashMap<&str, &str> = [
            ("REPOSITORY_GITHUB_OWNER", "acme"),
            ("FEED_HUB_URL", "https://registry-1.docker.io"),
        ]
        .into_iter()
        .collect();
        let lookup = |k: &str| env.get(k).map(|v| (*v).to_string());
        let config = Config::parse_with_env(doc, &lookup).unwrap();
        let RepositoryConfig::GitHub(repo) = &config.repository else {
            panic!("expected a github repository");
        };
        assert_eq!(repo.owner, "acme");
    }

    #[test]
    #[serial_test::serial]
    #[allow(unsafe_code)]
    fn test_parse_reads_process_environment() {
        let doc = with_update(
            "  - {name: x, path: f, regex: '(.*)', existing_pr: stop, feed: {name: gh, owner: o, repo: r}}",
        );
        // SAFETY: environment tests are serialised
        unsafe { std::env::set_var("FEED_GH_URL", "https://ghe.example.com/api/v3") };
        let config = Config::parse(&doc);
        unsafe { std::env::remove_var("FEED_GH_URL") };

        let config = config.unwrap();
        let Some(FeedConfig::GitHub(feed)) = config.feeds.get("gh") else {
            panic!("expected a github feed");
        };
        assert_eq!(feed.url.as_deref(), Some("https://ghe.example.com/api/v3"));
    }
}
