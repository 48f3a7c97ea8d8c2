//! Update engine
//!
//! [`Updater::process`] takes one configured update from the tracked file
//! to an open PR (or a reason not to open one):
//!
//! 1. Read the file and extract the current version
//! 2. Find the PR an earlier run opened, closing it if it is now redundant
//! 3. Scan the primary feed for a newer release
//! 4. Confirm the release in the secondary feed, if configured
//! 5. Reconcile with the existing PR and write the changes

mod execute;
mod plan;
pub mod prmeta;
mod progress;
mod rewrite;
mod scan;
mod template;

pub use plan::{Reconciliation, is_redundant, reconcile};
pub use prmeta::{PrMetadata, update_id};
pub use progress::{NoopProgress, Phase, ProgressCallback};
pub use rewrite::{extract_version, splice, version_span};
pub use scan::{ReleaseDecision, check_release, find_new_release};
pub use template::{RenderedPr, Template, TemplateData, Templates};

use crate::config::{Config, SecondaryFeed, Update};
use crate::error::{Error, Result};
use crate::feed::{ReleaseFeed, create_feed};
use crate::platform::{PlatformService, create_platform_service};
use crate::types::FileChange;
use crate::version::Version;
use execute::Executor;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{Instrument, info, info_span, warn};

/// How an update ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// No newer release
    UpToDate,
    /// The secondary feed does not have the new version yet
    Skipped {
        /// Version that was found
        version: String,
    },
    /// An open PR for an older version blocks the update
    Stopped {
        /// Id of the blocking PR
        existing: String,
    },
    /// A PR for the new version already exists
    ExistingPr {
        /// Its id
        id: String,
        /// Its branch was rebuilt
        rebased: bool,
    },
    /// A new PR was opened
    Created {
        /// Version proposed
        version: String,
        /// Id of the new PR, `None` in dry-run mode
        pr: Option<String>,
        /// Id of an older PR that was closed in its favour
        superseded: Option<String>,
    },
}

/// Summary of one processed update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateReport {
    /// Update name
    pub name: String,
    /// Version found in the file
    pub current: Version,
    /// What happened
    pub outcome: UpdateOutcome,
    /// Id of a redundant PR that was closed
    pub closed_redundant: Option<String>,
}

/// Runs updates against one repository
pub struct Updater {
    platform: Arc<dyn PlatformService>,
    feeds: HashMap<String, Arc<dyn ReleaseFeed>>,
    templates: Templates,
    dry_run: bool,
}

impl Updater {
    /// Create an updater from ready-made collaborators
    pub fn new(
        platform: Arc<dyn PlatformService>,
        feeds: HashMap<String, Arc<dyn ReleaseFeed>>,
        templates: Templates,
        dry_run: bool,
    ) -> Self {
        Self {
            platform,
            feeds,
            templates,
            dry_run,
        }
    }

    /// Build the platform and every feed named in `config`
    pub async fn from_config(config: &Config, dry_run: bool) -> Result<Self> {
        let templates = Templates::from_config(&config.templates)?;
        let feeds = config
            .feeds
            .iter()
            .map(|(name, cfg)| Ok((name.clone(), create_feed(cfg)?)))
            .collect::<Result<HashMap<_, _>>>()?;
        let platform = create_platform_service(&config.repository).await?;
        Ok(Self::new(Arc::from(platform), feeds, templates, dry_run))
    }

    /// Whether writes are replaced by log lines
    pub const fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// The repository platform
    pub fn platform(&self) -> &dyn PlatformService {
        self.platform.as_ref()
    }

    fn feed(&self, name: &str) -> Result<&dyn ReleaseFeed> {
        self.feeds
            .get(name)
            .map(|feed| &**feed)
            .ok_or_else(|| Error::Config(format!("feed {name:?} does not exist")))
    }

    /// Read the version currently in the update's file
    pub async fn current_version(&self, update: &Update) -> Result<Version> {
        let tag = |e| Error::Update {
            name: update.name.clone(),
            source: Box::new(e),
        };
        let file = self
            .platform
            .get_file(&update.path)
            .await
            .map_err(|e| tag(Error::repository("retrieving file", e)))?;
        let raw = extract_version(update, &file.content).map_err(tag)?;
        Version::new(raw, update.semver).map_err(tag)
    }

    /// Delete the head branch of a PR, returning the branch name
    pub async fn delete_pr_branch(&self, id: &str) -> Result<String> {
        if self.dry_run {
            info!("DRY RUN: Would delete branch of PR {id}");
            return Ok(String::new());
        }
        self.platform.delete_pr_branch(id).await
    }

    /// Process one update
    ///
    /// Every error is wrapped in [`Error::Update`] carrying the update name.
    pub async fn process(
        &self,
        update: &Update,
        progress: &dyn ProgressCallback,
    ) -> Result<UpdateReport> {
        let span = info_span!("update", name = %update.name);
        let result = self.run(update, progress).instrument(span).await;
        match result {
            Ok(report) => {
                progress.on_phase(&update.name, Phase::Complete).await;
                Ok(report)
            }
            Err(e) => {
                progress.on_error(&update.name, &e).await;
                Err(Error::Update {
                    name: update.name.clone(),
                    source: Box::new(e),
                })
            }
        }
    }

    #[allow(clippy::too_many_lines)]
    async fn run(&self, update: &Update, progress: &dyn ProgressCallback) -> Result<UpdateReport> {
        let name = update.name.as_str();
        let exec = Executor {
            platform: self.platform.as_ref(),
            progress,
            update: name,
            dry_run: self.dry_run,
        };

        progress.on_phase(name, Phase::ReadingFile).await;
        let file = self
            .platform
            .get_file(&update.path)
            .await
            .map_err(|e| Error::repository("retrieving file", e))?;
        let span = version_span(update, &file.content)?;
        let raw = extract_version(update, &file.content)?;
        let current = Version::new(raw, update.semver)?;

        let mut report = UpdateReport {
            name: name.to_string(),
            current: current.clone(),
            outcome: UpdateOutcome::UpToDate,
            closed_redundant: None,
        };

        progress.on_phase(name, Phase::FindingExistingPr).await;
        let mut existing = self
            .platform
            .find_pr(&update_id(name))
            .await
            .map_err(|e| Error::repository("searching for existing PR", e))?;
        let meta = existing
            .as_ref()
            .map(|pr| PrMetadata::decode(&pr.body))
            .unwrap_or_default();

        if let Some(pr) = existing.take_if(|pr| is_redundant(pr, &meta, &current)) {
            exec.close_redundant(&pr).await?;
            report.closed_redundant = Some(pr.id);
        }

        progress.on_phase(name, Phase::Scanning).await;
        let stream = self.feed(&update.feed.name)?.releases(&update.feed.query);
        let Some(found) = find_new_release(update, &current, stream).await? else {
            info!("Already up to date");
            progress.on_message(name, "Already up to date").await;
            return Ok(report);
        };

        if let Some(secondary) = &update.secondary {
            progress.on_phase(name, Phase::CheckingSecondary).await;
            if !self.secondary_has(secondary, found.version.as_raw()).await? {
                warn!(version = found.version.as_raw(), "Secondary feed does not have version");
                report.outcome = UpdateOutcome::Skipped {
                    version: found.version.as_raw().to_string(),
                };
                return Ok(report);
            }
        }

        progress.on_phase(name, Phase::Reconciling).await;
        info!(from = %current, to = %found.version, "Updating");
        let replacement = if update.use_semver {
            found.version.to_string()
        } else {
            found.version.as_raw().to_string()
        };
        let new_content = splice(update, &file.content, span, &replacement)?;

        let data = TemplateData {
            name,
            url: &found.release.url,
            old: &current,
            new: &found.version,
            release_notes: &found.release.notes,
        };

        match reconcile(existing.as_ref(), &meta, &found.version, update.existing_pr) {
            Reconciliation::Existing { rebase } => {
                let Some(pr) = existing else {
                    return Ok(report);
                };
                if rebase {
                    let commit_message = self.templates.commit_message(&data);
                    let latest = self
                        .platform
                        .get_file(&update.path)
                        .await
                        .map_err(|e| Error::repository("retrieving file", e))?;
                    let change = FileChange {
                        path: &update.path,
                        old_sha: &latest.sha,
                        content: &new_content,
                        commit_message: &commit_message,
                    };
                    exec.rebase(&pr, &change).await?;
                }
                report.outcome = UpdateOutcome::ExistingPr { id: pr.id, rebased: rebase };
            }
            Reconciliation::Stop => {
                report.outcome = UpdateOutcome::Stopped {
                    existing: existing.map(|pr| pr.id).unwrap_or_default(),
                };
            }
            Reconciliation::Create { supersede } => {
                let meta = PrMetadata::new(name, found.version.to_string());
                let rendered = self.templates.render(&data, &meta)?;
                let change = FileChange {
                    path: &update.path,
                    old_sha: &file.sha,
                    content: &new_content,
                    commit_message: &rendered.commit_message,
                };
                let pr = exec.create_pr(&change, &rendered).await?;
                let superseded = match supersede {
                    Some(old) => {
                        exec.supersede(&old, pr.as_deref()).await?;
                        Some(old.id)
                    }
                    None => None,
                };
                report.outcome = UpdateOutcome::Created {
                    version: found.version.to_string(),
                    pr,
                    superseded,
                };
            }
        }

        Ok(report)
    }

    async fn secondary_has(&self, secondary: &SecondaryFeed, version: &str) -> Result<bool> {
        let version = secondary
            .replace
            .as_ref()
            .map_or_else(|| version.to_string(), |r| r.apply(version));
        let found = self
            .feed(&secondary.feed.name)?
            .release(&version, &secondary.feed.query)
            .await
            .map_err(Error::feed)?;
        Ok(found.is_some())
    }
}
