//! Scripted release feed for testing

#![allow(dead_code)]

use async_trait::async_trait;
use regex_updater::error::{Error, Result};
use regex_updater::feed::{FeedQuery, ReleaseFeed, ReleaseStream};
use regex_updater::types::Release;
use std::collections::HashMap;
use std::sync::Mutex;

/// Feed that streams a fixed list and answers lookups from a map
pub struct MockFeed {
    releases: Vec<Release>,
    stream_error: Option<String>,
    lookup: HashMap<String, Release>,
    lookup_error: Option<String>,
    lookup_calls: Mutex<Vec<String>>,
    stream_calls: Mutex<usize>,
}

impl MockFeed {
    /// Stream `versions`, newest first, each with placeholder notes and URL
    pub fn new(versions: &[&str]) -> Self {
        let releases = versions.iter().map(|v| release(v)).collect();
        Self {
            releases,
            stream_error: None,
            lookup: HashMap::new(),
            lookup_error: None,
            lookup_calls: Mutex::new(Vec::new()),
            stream_calls: Mutex::new(0),
        }
    }

    /// End the stream with an error after the listed releases
    pub fn failing_with(mut self, msg: &str) -> Self {
        self.stream_error = Some(msg.to_string());
        self
    }

    /// Versions `release()` will find
    pub fn with_lookup(mut self, versions: &[&str]) -> Self {
        self.lookup = versions.iter().map(|v| (v.to_string(), release(v))).collect();
        self
    }

    /// Make `release()` fail
    pub fn failing_lookup(mut self, msg: &str) -> Self {
        self.lookup_error = Some(msg.to_string());
        self
    }

    pub fn lookup_calls(&self) -> Vec<String> {
        self.lookup_calls.lock().unwrap().clone()
    }

    pub fn stream_calls(&self) -> usize {
        *self.stream_calls.lock().unwrap()
    }
}

/// A release with predictable notes and URL
pub fn release(version: &str) -> Release {
    Release {
        version: version.to_string(),
        notes: format!("Notes for {version}"),
        url: format!("https://example.com/releases/{version}"),
    }
}

#[async_trait]
impl ReleaseFeed for MockFeed {
    fn releases(&self, _query: &FeedQuery) -> ReleaseStream {
        *self.stream_calls.lock().unwrap() += 1;
        let releases = self.releases.clone();
        let error = self.stream_error.clone();
        ReleaseStream::spawn(None, move |mut tx| async move {
            for release in releases {
                if !tx.send(release).await {
                    return;
                }
            }
            if let Some(msg) = error {
                tx.fail(Error::Platform(msg)).await;
            }
        })
    }

    async fn release(&self, version: &str, _query: &FeedQuery) -> Result<Option<Release>> {
        self.lookup_calls.lock().unwrap().push(version.to_string());
        if let Some(msg) = &self.lookup_error {
            return Err(Error::Platform(msg.clone()));
        }
        Ok(self.lookup.get(version).cloned())
    }
}
