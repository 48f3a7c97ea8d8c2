//! Reconciliation writes
//!
//! Every remote mutation the engine performs goes through [`Executor`]. In
//! dry-run mode each write is replaced by a `DRY RUN:` log line and a
//! progress message.

use crate::error::{Error, Result};
use crate::platform::PlatformService;
use crate::types::{FileChange, PullRequest};
use crate::update::progress::ProgressCallback;
use crate::update::template::RenderedPr;
use tracing::info;

pub(crate) struct Executor<'a> {
    pub platform: &'a dyn PlatformService,
    pub progress: &'a dyn ProgressCallback,
    pub update: &'a str,
    pub dry_run: bool,
}

impl Executor<'_> {
    async fn dry(&self, action: String) {
        let message = format!("Would {}", lowercase_first(&action));
        info!("DRY RUN: {message}");
        self.progress.on_message(self.update, &message).await;
    }

    async fn comment_and_close(&self, pr: &PullRequest, comment: &str) -> Result<()> {
        self.platform
            .comment_on_pr(pr, comment)
            .await
            .map_err(|e| Error::write(format!("leaving comment on PR {}", pr.id), e))?;
        self.platform
            .close_pr(pr)
            .await
            .map_err(|e| Error::write(format!("closing PR {}", pr.id), e))?;
        self.progress.on_pr_closed(self.update, pr).await;
        Ok(())
    }

    /// Close a PR proposing the version the file already uses
    pub async fn close_redundant(&self, pr: &PullRequest) -> Result<()> {
        info!(pr = %pr.id, "Closing existing PR (redundant)");
        if self.dry_run {
            self.dry(format!("Close redundant PR {}", pr.id)).await;
            return Ok(());
        }
        let comment = format!(
            "`{}` is already using this version. This PR is no longer necessary.",
            self.update
        );
        self.comment_and_close(pr, &comment).await
    }

    /// Open the update PR, returning its id (`None` in dry-run mode)
    pub async fn create_pr(
        &self,
        change: &FileChange<'_>,
        rendered: &RenderedPr,
    ) -> Result<Option<String>> {
        if self.dry_run {
            self.dry(format!(
                "Create PR {:?}, updating file {:?}",
                rendered.title, change.path
            ))
            .await;
            return Ok(None);
        }

        let id = self
            .platform
            .create_update_pr(change, &rendered.branch, &rendered.title, &rendered.body)
            .await
            .map_err(|e| Error::write("creating PR", e))?;
        info!(pr = %id, "Created PR");
        self.progress.on_pr_created(self.update, &id).await;
        Ok(Some(id))
    }

    /// Close an older PR in favour of `new_id`
    pub async fn supersede(&self, old: &PullRequest, new_id: Option<&str>) -> Result<()> {
        let new_id = new_id.unwrap_or_default();
        if self.dry_run {
            self.dry(format!("Close PR {} as superseded", old.id)).await;
            return Ok(());
        }
        self.comment_and_close(old, &format!("Superseded by {new_id}"))
            .await
    }

    /// Rebuild an unmergeable PR's branch from the current base
    pub async fn rebase(&self, pr: &PullRequest, change: &FileChange<'_>) -> Result<()> {
        info!(pr = %pr.id, "Existing PR is not mergeable, updating its branch");
        if self.dry_run {
            self.dry(format!("Update branch of PR {}", pr.id)).await;
            return Ok(());
        }
        self.platform
            .update_pr_branch(pr, change)
            .await
            .map_err(|e| Error::write(format!("updating branch of PR {}", pr.id), e))?;
        self.progress.on_pr_rebased(self.update, pr).await;
        Ok(())
    }
}

fn lowercase_first(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_lowercase().chain(chars).collect()
    })
}
