//! Mock platform service for testing
//!
//! Not every helper is used by every test binary.

#![allow(dead_code)]

use async_trait::async_trait;
use regex_updater::error::{Error, Result};
use regex_updater::platform::PlatformService;
use regex_updater::types::{FileChange, Platform, PlatformConfig, PullRequest, RepoFile};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// Call record for `create_update_pr`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePrCall {
    pub path: String,
    pub old_sha: String,
    pub content: String,
    pub commit_message: String,
    pub branch: String,
    pub title: String,
    pub body: String,
}

/// Call record for `update_pr_branch`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateBranchCall {
    pub pr_number: u64,
    pub old_sha: String,
    pub content: String,
    pub commit_message: String,
}

/// Call record for `comment_on_pr`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentCall {
    pub pr_number: u64,
    pub text: String,
}

/// In-memory platform with call tracking
///
/// Features:
/// - Files served from a path map, with a fresh SHA per read if requested
/// - Auto-incrementing PR numbers
/// - Configurable `find_pr` response
/// - Error injection for failure path testing
pub struct MockPlatformService {
    config: PlatformConfig,
    next_pr_number: AtomicU64,
    files: Mutex<HashMap<String, RepoFile>>,
    sha_sequence: Mutex<Vec<String>>,
    existing_pr: Mutex<Option<PullRequest>>,
    // Call tracking
    get_file_calls: Mutex<Vec<String>>,
    find_pr_calls: Mutex<Vec<String>>,
    create_pr_calls: Mutex<Vec<CreatePrCall>>,
    comment_calls: Mutex<Vec<CommentCall>>,
    close_calls: Mutex<Vec<u64>>,
    update_branch_calls: Mutex<Vec<UpdateBranchCall>>,
    delete_branch_calls: Mutex<Vec<String>>,
    // Error injection
    error_on_get_file: Mutex<Option<String>>,
    error_on_find_pr: Mutex<Option<String>>,
    error_on_create_pr: Mutex<Option<String>>,
    error_on_close: Mutex<Option<String>>,
}

impl MockPlatformService {
    /// Create a mock serving no files
    pub fn new() -> Self {
        Self::with_config(PlatformConfig {
            platform: Platform::GitHub,
            owner: "test".to_string(),
            repo: "repo".to_string(),
            base_branch: "main".to_string(),
        })
    }

    /// Create a mock with a specific config
    pub fn with_config(config: PlatformConfig) -> Self {
        Self {
            config,
            next_pr_number: AtomicU64::new(100),
            files: Mutex::new(HashMap::new()),
            sha_sequence: Mutex::new(Vec::new()),
            existing_pr: Mutex::new(None),
            get_file_calls: Mutex::new(Vec::new()),
            find_pr_calls: Mutex::new(Vec::new()),
            create_pr_calls: Mutex::new(Vec::new()),
            comment_calls: Mutex::new(Vec::new()),
            close_calls: Mutex::new(Vec::new()),
            update_branch_calls: Mutex::new(Vec::new()),
            delete_branch_calls: Mutex::new(Vec::new()),
            error_on_get_file: Mutex::new(None),
            error_on_find_pr: Mutex::new(None),
            error_on_create_pr: Mutex::new(None),
            error_on_close: Mutex::new(None),
        }
    }

    /// Serve `content` at `path` with blob SHA `sha`
    pub fn with_file(self, path: &str, content: &str, sha: &str) -> Self {
        self.files.lock().unwrap().insert(
            path.to_string(),
            RepoFile {
                path: path.to_string(),
                content: content.as_bytes().to_vec(),
                sha: sha.to_string(),
            },
        );
        self
    }

    /// SHAs handed out by successive reads, overriding the stored one
    pub fn with_sha_sequence(self, shas: &[&str]) -> Self {
        *self.sha_sequence.lock().unwrap() = shas.iter().rev().map(ToString::to_string).collect();
        self
    }

    /// Set the PR returned by `find_pr`
    pub fn with_existing_pr(self, pr: PullRequest) -> Self {
        *self.existing_pr.lock().unwrap() = Some(pr);
        self
    }

    /// Make `get_file` fail
    pub fn fail_get_file(&self, msg: &str) {
        *self.error_on_get_file.lock().unwrap() = Some(msg.to_string());
    }

    /// Make `find_pr` fail
    pub fn fail_find_pr(&self, msg: &str) {
        *self.error_on_find_pr.lock().unwrap() = Some(msg.to_string());
    }

    /// Make `create_update_pr` fail
    pub fn fail_create_pr(&self, msg: &str) {
        *self.error_on_create_pr.lock().unwrap() = Some(msg.to_string());
    }

    /// Make `close_pr` fail
    pub fn fail_close(&self, msg: &str) {
        *self.error_on_close.lock().unwrap() = Some(msg.to_string());
    }

    pub fn get_file_calls(&self) -> Vec<String> {
        self.get_file_calls.lock().unwrap().clone()
    }

    pub fn find_pr_calls(&self) -> Vec<String> {
        self.find_pr_calls.lock().unwrap().clone()
    }

    pub fn create_pr_calls(&self) -> Vec<CreatePrCall> {
        self.create_pr_calls.lock().unwrap().clone()
    }

    pub fn comment_calls(&self) -> Vec<CommentCall> {
        self.comment_calls.lock().unwrap().clone()
    }

    pub fn close_calls(&self) -> Vec<u64> {
        self.close_calls.lock().unwrap().clone()
    }

    pub fn update_branch_calls(&self) -> Vec<UpdateBranchCall> {
        self.update_branch_calls.lock().unwrap().clone()
    }

    pub fn delete_branch_calls(&self) -> Vec<String> {
        self.delete_branch_calls.lock().unwrap().clone()
    }

    /// Number of calls that changed something on the platform
    pub fn write_count(&self) -> usize {
        self.create_pr_calls.lock().unwrap().len()
            + self.comment_calls.lock().unwrap().len()
            + self.close_calls.lock().unwrap().len()
            + self.update_branch_calls.lock().unwrap().len()
            + self.delete_branch_calls.lock().unwrap().len()
    }

    /// Assert that a comment containing `needle` was left on `pr_number`
    pub fn assert_commented(&self, pr_number: u64, needle: &str) {
        let calls = self.comment_calls();
        assert!(
            calls
                .iter()
                .any(|c| c.pr_number == pr_number && c.text.contains(needle)),
            "Expected comment on #{pr_number} containing {needle:?} but got: {calls:?}"
        );
    }
}

fn injected(slot: &Mutex<Option<String>>) -> Result<()> {
    match slot.lock().unwrap().as_ref() {
        Some(msg) => Err(Error::Platform(msg.clone())),
        None => Ok(()),
    }
}

#[async_trait]
impl PlatformService for MockPlatformService {
    async fn get_file(&self, path: &str) -> Result<RepoFile> {
        self.get_file_calls.lock().unwrap().push(path.to_string());
        injected(&self.error_on_get_file)?;

        let mut file = self
            .files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| Error::Platform(format!("{path} not found")))?;
        if let Some(sha) = self.sha_sequence.lock().unwrap().pop() {
            file.sha = sha;
        }
        Ok(file)
    }

    async fn find_pr(&self, token: &str) -> Result<Option<PullRequest>> {
        self.find_pr_calls.lock().unwrap().push(token.to_string());
        injected(&self.error_on_find_pr)?;
        Ok(self.existing_pr.lock().unwrap().clone())
    }

    async fn create_update_pr(
        &self,
        change: &FileChange<'_>,
        branch: &str,
        title: &str,
        body: &str,
    ) -> Result<String> {
        self.create_pr_calls.lock().unwrap().push(CreatePrCall {
            path: change.path.to_string(),
            old_sha: change.old_sha.to_string(),
            content: String::from_utf8_lossy(change.content).into_owned(),
            commit_message: change.commit_message.to_string(),
            branch: branch.to_string(),
            title: title.to_string(),
            body: body.to_string(),
        });
        injected(&self.error_on_create_pr)?;

        let number = self.next_pr_number.fetch_add(1, Ordering::SeqCst);
        Ok(format!("#{number}"))
    }

    async fn comment_on_pr(&self, pr: &PullRequest, text: &str) -> Result<()> {
        self.comment_calls.lock().unwrap().push(CommentCall {
            pr_number: pr.number,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn close_pr(&self, pr: &PullRequest) -> Result<()> {
        self.close_calls.lock().unwrap().push(pr.number);
        injected(&self.error_on_close)
    }

    async fn update_pr_branch(&self, pr: &PullRequest, change: &FileChange<'_>) -> Result<()> {
        self.update_branch_calls
            .lock()
            .unwrap()
            .push(UpdateBranchCall {
                pr_number: pr.number,
                old_sha: change.old_sha.to_string(),
                content: String::from_utf8_lossy(change.content).into_owned(),
                commit_message: change.commit_message.to_string(),
            });
        Ok(())
    }

    async fn delete_pr_branch(&self, id: &str) -> Result<String> {
        self.delete_branch_calls.lock().unwrap().push(id.to_string());
        Ok(format!("update/{}", id.trim_start_matches('#')))
    }

    fn config(&self) -> &PlatformConfig {
        &self.config
    }
}
