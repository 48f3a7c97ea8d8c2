//! Release scanning
//!
//! Walks a release stream, newest first, until it can tell whether a version
//! newer than the current one exists.

use crate::config::Update;
use crate::error::{Error, Result};
use crate::feed::ReleaseStream;
use crate::types::Release;
use crate::version::Version;
use std::cmp::Ordering;
use tracing::{debug, info};

/// How a single release relates to the current version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseDecision {
    /// The release as the feed reported it
    pub release: Release,
    /// Its version after the pre-replace transform
    pub version: Version,
    /// The release is not newer than the current version
    pub older_or_equal: bool,
}

/// Classify one release against the current version
///
/// Returns `None` for releases the update does not want (prereleases).
pub fn check_release(
    update: &Update,
    current: &Version,
    release: Release,
) -> Result<Option<ReleaseDecision>> {
    let transformed = update.transform(&release.version);

    if !update.semver {
        let older_or_equal = transformed == current.as_raw();
        return Ok(Some(ReleaseDecision {
            release,
            version: Version::raw(transformed),
            older_or_equal,
        }));
    }

    let version = Version::semver(transformed)?;
    if version.is_prerelease() && !update.prerelease {
        info!("Skipping version {version}: is a prerelease");
        return Ok(None);
    }

    let ordering = version.compare(current).ok_or_else(|| Error::VersionParse {
        version: current.as_raw().to_string(),
        reason: "not parsed as a semantic version".to_string(),
    })?;
    debug!(candidate = %version, current = %current, ?ordering, "Compared release");

    Ok(Some(ReleaseDecision {
        release,
        version,
        older_or_equal: ordering != Ordering::Greater,
    }))
}

/// Find the first release newer than `current`
///
/// Stops at the first release that is not newer, relying on the stream
/// being ordered newest first. Stream errors are wrapped in
/// [`Error::Source`].
pub async fn find_new_release(
    update: &Update,
    current: &Version,
    mut stream: ReleaseStream,
) -> Result<Option<ReleaseDecision>> {
    let mut seen = 0usize;
    let result = loop {
        let Some(item) = stream.next().await else {
            break Ok(None);
        };
        seen += 1;
        let release = match item {
            Ok(release) => release,
            Err(e) => break Err(Error::feed(e)),
        };
        match check_release(update, current, release) {
            Ok(Some(decision)) if decision.older_or_equal => break Ok(None),
            Ok(Some(decision)) => break Ok(Some(decision)),
            Ok(None) => {}
            Err(e) => break Err(e),
        }
    };
    stream.cancel();
    debug!(seen, "Release scan finished");
    result
}
