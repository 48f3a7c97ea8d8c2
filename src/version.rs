//! Version model
//!
//! A [`Version`] keeps the raw identifier exactly as it appeared (after any
//! pre-replace transform) next to an optional parsed semantic version.
//! Parsing accepts the loose forms release tags use in practice: a leading
//! `v`, and one to three numeric components.

use crate::error::{Error, Result};
use regex::Regex;
use semver::{BuildMetadata, Prerelease};
use std::cmp::Ordering;
use std::fmt;
use std::sync::OnceLock;

/// A version string with an optional semantic interpretation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    raw: String,
    parsed: Option<semver::Version>,
}

fn loose_semver_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^v?(\d+)(?:\.(\d+))?(?:\.(\d+))?(?:-([0-9A-Za-z.-]+))?(?:\+([0-9A-Za-z.-]+))?$",
        )
        .expect("hardcoded version regex is valid")
    })
}

/// Parse a version string leniently into a semantic version
pub fn parse_semver(raw: &str) -> Result<semver::Version> {
    let invalid = |reason: &str| Error::VersionParse {
        version: raw.to_string(),
        reason: reason.to_string(),
    };

    let caps = loose_semver_regex()
        .captures(raw.trim())
        .ok_or_else(|| invalid("invalid semantic version"))?;

    let component = |idx: usize| -> Result<u64> {
        caps.get(idx)
            .map_or(Ok(0), |m| m.as_str().parse::<u64>())
            .map_err(|e| invalid(&e.to_string()))
    };

    let mut version = semver::Version::new(component(1)?, component(2)?, component(3)?);
    if let Some(pre) = caps.get(4) {
        version.pre = Prerelease::new(pre.as_str()).map_err(|e| invalid(&e.to_string()))?;
    }
    if let Some(build) = caps.get(5) {
        version.build =
            BuildMetadata::new(build.as_str()).map_err(|e| invalid(&e.to_string()))?;
    }
    Ok(version)
}

impl Version {
    /// A version compared by plain string equality only
    pub fn raw(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            parsed: None,
        }
    }

    /// A version that must parse as a semantic version
    pub fn semver(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        let parsed = parse_semver(&raw)?;
        Ok(Self {
            raw,
            parsed: Some(parsed),
        })
    }

    /// Build a version in the mode the update asks for
    pub fn new(raw: impl Into<String>, semver: bool) -> Result<Self> {
        if semver {
            Self::semver(raw)
        } else {
            Ok(Self::raw(raw))
        }
    }

    /// The identifier as it appeared
    pub fn as_raw(&self) -> &str {
        &self.raw
    }

    /// The parsed semantic version, if any
    pub const fn parsed(&self) -> Option<&semver::Version> {
        self.parsed.as_ref()
    }

    /// True iff the parsed form carries a prerelease tag
    pub fn is_prerelease(&self) -> bool {
        self.parsed.as_ref().is_some_and(|v| !v.pre.is_empty())
    }

    /// Compare by semantic version precedence
    ///
    /// Defined only when both sides are parsed. Build metadata is ignored.
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (&self.parsed, &other.parsed) {
            (Some(a), Some(b)) => Some(a.cmp_precedence(b)),
            _ => None,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.parsed {
            Some(v) => write!(f, "{v}"),
            None => f.write_str(&self.raw),
        }
    }
}
