//! Test data factories for regex-updater types

#![allow(dead_code)]

use super::mock_feed::MockFeed;
use super::mock_platform::MockPlatformService;
use regex_updater::config::{FeedBinding, Replace, SecondaryFeed, Update};
use regex_updater::feed::{FeedQuery, PyPiQuery, ReleaseFeed};
use regex_updater::platform::PlatformService;
use regex_updater::types::PullRequest;
use regex_updater::update::{PrMetadata, Templates, Updater};
use std::collections::HashMap;
use std::sync::Arc;

/// Path of the tracked file used throughout the tests
pub const DOCKERFILE: &str = "Dockerfile";

/// Update regex matching `FROM python:<version>`
pub const PYTHON_REGEX: &str = r"^FROM python:(\S+)$";

/// A Dockerfile pinned to `version`
pub fn dockerfile(version: &str) -> String {
    format!("FROM python:{version}\nRUN pip install -r requirements.txt\n")
}

/// Bind the feed called `name` to a placeholder query
pub fn binding(name: &str) -> FeedBinding {
    FeedBinding {
        name: name.to_string(),
        query: FeedQuery::PyPi(PyPiQuery {
            project: "python".to_string(),
        }),
    }
}

/// A semver update named `python` reading [`DOCKERFILE`] from feed `primary`
pub fn make_update() -> Update {
    Update::new("python", DOCKERFILE, PYTHON_REGEX, binding("primary")).unwrap()
}

/// Add a secondary feed check against feed `secondary`
pub fn with_secondary(mut update: Update, replace: Option<(&str, &str)>) -> Update {
    update.secondary = Some(SecondaryFeed {
        feed: binding("secondary"),
        replace: replace.map(|(find, with)| Replace::new(find, with).unwrap()),
    });
    update
}

/// A PR opened by an earlier run for `version`
pub fn make_pr(number: u64, update: &str, version: &str) -> PullRequest {
    let meta = PrMetadata::new(update, version);
    PullRequest {
        number,
        id: format!("#{number}"),
        html_url: format!("https://github.com/test/repo/pull/{number}"),
        head_ref: format!("update/{update}-{version}"),
        title: format!("Bump {update} to {version}"),
        body: meta.append_to("Some description"),
        is_open: true,
        is_mergeable: true,
    }
}

/// The same PR, closed
pub fn closed(pr: PullRequest) -> PullRequest {
    PullRequest {
        is_open: false,
        ..pr
    }
}

/// The same PR, reported as not mergeable
pub fn unmergeable(pr: PullRequest) -> PullRequest {
    PullRequest {
        is_mergeable: false,
        ..pr
    }
}

/// An updater over a mock platform and named mock feeds
pub fn make_updater(
    platform: &Arc<MockPlatformService>,
    feeds: Vec<(&str, Arc<MockFeed>)>,
    templates: Templates,
    dry_run: bool,
) -> Updater {
    let platform: Arc<dyn PlatformService> = platform.clone();
    let feeds: HashMap<String, Arc<dyn ReleaseFeed>> = feeds
        .into_iter()
        .map(|(name, feed)| (name.to_string(), feed as Arc<dyn ReleaseFeed>))
        .collect();
    Updater::new(platform, feeds, templates, dry_run)
}
