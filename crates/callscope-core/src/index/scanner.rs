//! File scanning for indexing

use crate::config::ScanConfig;
use crate::error::{Error, Result};
use glob::Pattern;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Scan result
#[derive(Debug, Clone)]
pub struct ScanResult {
    pub path: PathBuf,
    /// Path relative to the scanned root, always `/`-separated
    pub relative_path: String,
}

/// Scan directory for files matching the configured pattern, in sorted order.
///
/// Unreadable entries below the root are skipped; an unreadable root is an
/// [`Error::Index`].
pub fn scan_files(root: &Path, options: &ScanConfig) -> Result<Vec<ScanResult>> {
    let pattern = Pattern::new(&options.pattern)?;
    let mut results = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(options.follow_symlinks)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !should_skip(e, options));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                return Err(Error::Index(format!(
                    "cannot read repository root {}: {}",
                    root.display(),
                    e
                )));
            }
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path
            .strip_prefix(root)
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_else(|_| path.to_string_lossy().to_string())
            .replace('\\', "/");

        if pattern.matches(&relative) {
            results.push(ScanResult {
                path: path.to_path_buf(),
                relative_path: relative,
            });
        }
    }

    Ok(results)
}

fn should_skip(entry: &DirEntry, options: &ScanConfig) -> bool {
    // The root itself may live under a hidden directory (e.g. a temp dir).
    if entry.depth() == 0 {
        return false;
    }

    let name = entry.file_name().to_string_lossy();

    if options.exclude_hidden && name.starts_with('.') {
        return true;
    }

    if entry.file_type().is_dir() && options.exclude_dirs.iter().any(|d| name == *d) {
        return true;
    }

    false
}
