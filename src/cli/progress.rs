//! CLI progress callback with styled output

use crate::cli::style::{Stream, Stylize, check, cross, dash, hyperlink, pause};
use anstream::{eprintln, println};
use async_trait::async_trait;
use regex_updater::error::Error;
use regex_updater::types::PullRequest;
use regex_updater::update::{Phase, ProgressCallback, UpdateOutcome, UpdateReport};

/// CLI progress callback that prints to stdout with styled output
///
/// Verbose mode also prints every engine phase.
pub struct CliProgress {
    /// Show phases and messages
    pub verbose: bool,
}

impl CliProgress {
    /// Create progress that prints phases too
    pub const fn verbose() -> Self {
        Self { verbose: true }
    }

    /// Create progress that prints only PR events and outcomes
    pub const fn compact() -> Self {
        Self { verbose: false }
    }

    /// Print the one-line summary of a finished update
    pub fn report(&self, report: &UpdateReport) {
        let name = report.name.as_str();
        match &report.outcome {
            UpdateOutcome::UpToDate => {
                println!(
                    "{} {} is up to date at {}",
                    dash(),
                    name.emphasis(),
                    report.current.accent()
                );
            }
            UpdateOutcome::Skipped { version } => {
                println!(
                    "{} {}: {} is not in the secondary feed yet",
                    pause(),
                    name.emphasis(),
                    version.accent()
                );
            }
            UpdateOutcome::Stopped { existing } => {
                println!(
                    "{} {}: blocked by open PR {}",
                    pause(),
                    name.emphasis(),
                    existing.accent()
                );
            }
            UpdateOutcome::ExistingPr { id, rebased } => {
                let note = if *rebased { ", branch updated" } else { "" };
                println!(
                    "{} {}: PR {} already open{}",
                    dash(),
                    name.emphasis(),
                    id.accent(),
                    note.muted()
                );
            }
            UpdateOutcome::Created {
                version,
                pr,
                superseded,
            } => {
                let pr = pr.as_deref().unwrap_or("(dry run)");
                println!(
                    "{} {}: {} -> {} in {}",
                    check(),
                    name.emphasis(),
                    report.current.accent(),
                    version.accent(),
                    pr.accent()
                );
                if let Some(old) = superseded {
                    println!("  superseded {}", old.muted());
                }
            }
        }
    }
}

#[async_trait]
impl ProgressCallback for CliProgress {
    async fn on_phase(&self, update: &str, phase: Phase) {
        if self.verbose && phase != Phase::Complete {
            println!("{} {}...", update.accent(), phase.to_string().muted());
        }
    }

    async fn on_pr_created(&self, update: &str, pr_id: &str) {
        if self.verbose {
            println!("  {} Created PR {} for {}", check(), pr_id.accent(), update.emphasis());
        }
    }

    async fn on_pr_closed(&self, update: &str, pr: &PullRequest) {
        let id = if self.verbose {
            hyperlink(Stream::Stdout, &pr.id, &pr.html_url)
        } else {
            pr.id.clone()
        };
        println!("  {} Closed PR {} for {}", check(), id.accent(), update.emphasis());
    }

    async fn on_pr_rebased(&self, update: &str, pr: &PullRequest) {
        println!(
            "  {} Updated branch {} of PR {} for {}",
            check(),
            pr.head_ref.muted(),
            pr.id.accent(),
            update.emphasis()
        );
    }

    async fn on_error(&self, update: &str, err: &Error) {
        eprintln!(
            "{} {}: {}",
            cross(),
            update.emphasis().for_stderr(),
            err.to_string().error()
        );
    }

    async fn on_message(&self, update: &str, message: &str) {
        if self.verbose {
            println!("  {} {}", update.muted(), message);
        }
    }
}
