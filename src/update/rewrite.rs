//! Version extraction and splicing

use crate::config::Update;
use crate::error::{Error, Result};
use std::ops::Range;

/// Byte range of the version captured by the update's regex
pub fn version_span(update: &Update, content: &[u8]) -> Result<Range<usize>> {
    update
        .regex
        .captures(content)
        .and_then(|caps| caps.get(1))
        .map(|m| m.range())
        .ok_or_else(|| Error::Extraction {
            path: update.path.clone(),
        })
}

/// The captured version as text
pub fn extract_version(update: &Update, content: &[u8]) -> Result<String> {
    let span = version_span(update, content)?;
    String::from_utf8(content[span].to_vec()).map_err(|_| Error::Extraction {
        path: update.path.clone(),
    })
}

/// Replace the captured span with `replacement`
///
/// The result must still match the regex with its group participating.
pub fn splice(
    update: &Update,
    content: &[u8],
    span: Range<usize>,
    replacement: &str,
) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(content.len() - span.len() + replacement.len());
    out.extend_from_slice(&content[..span.start]);
    out.extend_from_slice(replacement.as_bytes());
    out.extend_from_slice(&content[span.end..]);

    if version_span(update, &out).is_err() {
        return Err(Error::RoundTrip {
            path: update.path.clone(),
        });
    }
    Ok(out)
}
