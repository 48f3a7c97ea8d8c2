//! Feed factory
//!
//! Turns a configured feed into a ready-to-use [`ReleaseFeed`].

use crate::config::FeedConfig;
use crate::error::Result;
use crate::feed::{ContainerRegistryFeed, GitHubFeed, GiteaFeed, PyPiFeed, ReleaseFeed, RssFeed};
use std::sync::Arc;

fn token(configured: Option<&String>) -> Option<String> {
    configured.filter(|t| !t.is_empty()).cloned()
}

/// Create a feed from configuration
///
/// Environment overrides have already been applied to `config`.
pub fn create_feed(config: &FeedConfig) -> Result<Arc<dyn ReleaseFeed>> {
    match config {
        FeedConfig::GitHub(c) => Ok(Arc::new(GitHubFeed::new(
            c.url.as_deref(),
            token(c.token.as_ref()),
            c.page_size,
            c.limit,
        )?)),
        FeedConfig::Gitea(c) => Ok(Arc::new(GiteaFeed::new(
            &c.url,
            token(c.token.as_ref()),
            c.page_size,
            c.limit,
        )?)),
        FeedConfig::PyPi(c) => Ok(Arc::new(PyPiFeed::new(c.url.as_deref())?)),
        FeedConfig::ContainerRegistry(c) => Ok(Arc::new(ContainerRegistryFeed::new(
            &c.url,
            token(c.token.as_ref()),
            c.page_size,
            c.limit,
        )?)),
        FeedConfig::Rss(_) => Ok(Arc::new(RssFeed::new()?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        ContainerFeedConfig, GitHubFeedConfig, PyPiFeedConfig, RssFeedConfig,
    };

    #[test]
    fn test_empty_token_is_anonymous() {
        let empty = String::new();
        let set = "abc".to_string();
        assert_eq!(token(Some(&empty)), None);
        assert_eq!(token(Some(&set)), Some(set.clone()));
        assert_eq!(token(None), None);
    }

    #[test]
    fn test_create_feeds() {
        assert!(create_feed(&FeedConfig::GitHub(GitHubFeedConfig::default())).is_ok());
        assert!(create_feed(&FeedConfig::PyPi(PyPiFeedConfig::default())).is_ok());
        assert!(create_feed(&FeedConfig::Rss(RssFeedConfig::default())).is_ok());
        let registry = ContainerFeedConfig {
            url: "https://registry-1.docker.io".to_string(),
            ..ContainerFeedConfig::default()
        };
        assert!(create_feed(&FeedConfig::ContainerRegistry(registry)).is_ok());
        let bad = FeedConfig::GitHub(GitHubFeedConfig {
            page_size: Some(500),
            ..GitHubFeedConfig::default()
        });
        assert!(create_feed(&bad).is_err());
    }
}
