//! Progress callback trait for interface-agnostic updates
//!
//! Lets the CLI (or anything else driving an [`Updater`](super::Updater))
//! follow along while an update runs.

use crate::error::Error;
use crate::types::PullRequest;
use async_trait::async_trait;
use std::fmt;

/// Update phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Fetching the tracked file and extracting the current version
    ReadingFile,
    /// Looking for a PR opened by an earlier run
    FindingExistingPr,
    /// Walking the primary feed for a newer release
    Scanning,
    /// Confirming the release in the secondary feed
    CheckingSecondary,
    /// Deciding what to do about existing PRs and writing changes
    Reconciling,
    /// Update finished
    Complete,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ReadingFile => "reading file",
            Self::FindingExistingPr => "finding existing PR",
            Self::Scanning => "scanning releases",
            Self::CheckingSecondary => "checking secondary feed",
            Self::Reconciling => "reconciling",
            Self::Complete => "complete",
        };
        f.write_str(s)
    }
}

/// Progress callback trait
///
/// Every callback receives the name of the update it concerns, so one
/// implementation can follow several updates.
#[async_trait]
pub trait ProgressCallback: Send + Sync {
    /// Called when entering a new phase
    async fn on_phase(&self, update: &str, phase: Phase);

    /// Called when a PR is created
    async fn on_pr_created(&self, update: &str, pr_id: &str);

    /// Called when an existing PR is closed
    async fn on_pr_closed(&self, update: &str, pr: &PullRequest);

    /// Called when an existing PR is brought back onto the base branch
    async fn on_pr_rebased(&self, update: &str, pr: &PullRequest);

    /// Called when an error occurs
    async fn on_error(&self, update: &str, error: &Error);

    /// Called with a general status message
    async fn on_message(&self, update: &str, message: &str);
}

/// No-op progress callback for testing or when progress isn't needed
pub struct NoopProgress;

#[async_trait]
impl ProgressCallback for NoopProgress {
    async fn on_phase(&self, _update: &str, _phase: Phase) {}
    async fn on_pr_created(&self, _update: &str, _pr_id: &str) {}
    async fn on_pr_closed(&self, _update: &str, _pr: &PullRequest) {}
    async fn on_pr_rebased(&self, _update: &str, _pr: &PullRequest) {}
    async fn on_error(&self, _update: &str, _error: &Error) {}
    async fn on_message(&self, _update: &str, _message: &str) {}
}
