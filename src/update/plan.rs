//! Reconciliation planning
//!
//! Pure decisions about an existing PR, kept apart from the side effects in
//! [`execute`](super::execute) so they can be tested without a platform.

use crate::config::ExistingPrPolicy;
use crate::types::PullRequest;
use crate::update::prmeta::PrMetadata;
use crate::version::Version;
use tracing::{info, warn};

/// What to do once a newer release has been found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// A PR for this exact version already exists
    Existing {
        /// The PR is open and not mergeable, so its branch should be rebuilt
        rebase: bool,
    },
    /// An open PR for an older version blocks new PRs
    Stop,
    /// Open a new PR
    Create {
        /// Older PR to close once the new one exists
        supersede: Option<PullRequest>,
    },
}

/// Whether an existing PR already proposes the version the file is using
pub fn is_redundant(pr: &PullRequest, meta: &PrMetadata, current: &Version) -> bool {
    pr.is_open && !meta.version.is_empty() && meta.version == current.to_string()
}

/// Decide how a new release interacts with the PR found for the update
pub fn reconcile(
    existing: Option<&PullRequest>,
    meta: &PrMetadata,
    new_version: &Version,
    policy: ExistingPrPolicy,
) -> Reconciliation {
    let Some(pr) = existing else {
        return Reconciliation::Create { supersede: None };
    };

    if !meta.is_valid() {
        warn!(pr = %pr.id, "Existing PR metadata is invalid");
        return Reconciliation::Create { supersede: None };
    }

    if meta.version == new_version.to_string() {
        info!(pr = %pr.id, "Found existing PR for the same version");
        return Reconciliation::Existing {
            rebase: pr.is_open && !pr.is_mergeable,
        };
    }

    if !pr.is_open {
        info!(pr = %pr.id, version = %meta.version, "Found closed PR for an older version");
        return Reconciliation::Create { supersede: None };
    }

    match policy {
        ExistingPrPolicy::Stop => {
            info!(pr = %pr.id, "Found PR for an older version and the policy is stop");
            Reconciliation::Stop
        }
        ExistingPrPolicy::Close => {
            info!(pr = %pr.id, "Closing PR for an older version");
            Reconciliation::Create {
                supersede: Some(pr.clone()),
            }
        }
        ExistingPrPolicy::Ignore => Reconciliation::Create { supersede: None },
    }
}
