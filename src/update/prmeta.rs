//! PR metadata footer
//!
//! Every PR carries a small JSON footer identifying the update and target
//! version, so later runs can recognise their own PRs.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Only this many trailing lines of a body are searched for the footer
const FOOTER_LINES: usize = 3;

/// Stable identifier of an update, derived from its name
pub fn update_id(name: &str) -> String {
    format!("{:x}", Sha256::digest(name.as_bytes()))
}

/// Metadata embedded in the body of every PR this tool opens
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrMetadata {
    /// Update id, see [`update_id`]
    pub id: String,
    /// Update name
    pub update: String,
    /// Normalised target version
    pub version: String,
}

impl PrMetadata {
    /// Metadata for a PR moving `update` to `version`
    pub fn new(update: &str, version: impl Into<String>) -> Self {
        Self {
            id: update_id(update),
            update: update.to_string(),
            version: version.into(),
        }
    }

    /// Metadata is usable only with both an id and a version
    pub fn is_valid(&self) -> bool {
        !self.id.is_empty() && !self.version.is_empty()
    }

    /// Footer appended to the PR body
    pub fn footer(&self) -> String {
        let json = serde_json::json!({
            "id": self.id,
            "update": self.update,
            "version": self.version,
        });
        format!("---\n`{json}`")
    }

    /// Append the footer to a rendered body
    pub fn append_to(&self, body: &str) -> String {
        format!("{body}\n{}", self.footer())
    }

    /// Recover metadata from a PR body
    ///
    /// Returns empty metadata when no footer line is found.
    pub fn decode(body: &str) -> Self {
        let lines: Vec<&str> = body.split('\n').collect();
        let tail = &lines[lines.len().saturating_sub(FOOTER_LINES)..];
        tail.iter()
            .map(|line| line.trim_end_matches('\r'))
            .filter(|line| line.len() > 2 && line.starts_with('`') && line.ends_with('`'))
            .find_map(|line| serde_json::from_str(&line[1..line.len() - 1]).ok())
            .unwrap_or_default()
    }
}
