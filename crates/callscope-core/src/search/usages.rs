//! Literal text search over indexed files

use super::snippet::truncate_chars;
use crate::error::Result;
use crate::index::RepoIndex;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Lines of a usage hit are cut to this many characters
pub const MAX_LINE_CHARS: usize = 300;

/// One line containing a searched needle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageHit {
    /// Root-relative file path
    pub file: String,
    /// 1-based
    pub line: usize,
    pub text: String,
}

/// Pattern for a literal needle. Word boundaries are added on ends that are
/// identifier characters so `bar` does not match inside `foobar`.
fn needle_pattern(needle: &str) -> Result<Regex> {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let mut pattern = String::new();
    if needle.chars().next().is_some_and(is_word) {
        pattern.push_str(r"\b");
    }
    pattern.push_str(&regex::escape(needle));
    if needle.chars().last().is_some_and(is_word) {
        pattern.push_str(r"\b");
    }
    Ok(Regex::new(&pattern)?)
}

/// Find up to `max_hits` lines containing `needle`, in file then line order.
///
/// Unreadable files are skipped.
pub fn find_usages(index: &RepoIndex, needle: &str, max_hits: usize) -> Result<Vec<UsageHit>> {
    let needle = needle.trim();
    if needle.is_empty() || max_hits == 0 {
        return Ok(Vec::new());
    }
    let pattern = needle_pattern(needle)?;

    let mut hits = Vec::new();
    for file in index.searchable_files() {
        let bytes = match std::fs::read(file.absolute_path()) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::debug!(path = %file.relative_path, error = %e, "skipping unreadable file");
                continue;
            }
        };
        let text = String::from_utf8_lossy(&bytes);
        for (i, line) in text.lines().enumerate() {
            if !pattern.is_match(line) {
                continue;
            }
            hits.push(UsageHit {
                file: file.relative_path.clone(),
                line: i + 1,
                text: truncate_chars(line.trim(), MAX_LINE_CHARS).to_string(),
            });
            if hits.len() >= max_hits {
                return Ok(hits);
            }
        }
    }
    Ok(hits)
}
