//! Discovering artwork files under the library directory.

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use crate::error::Error;

/// Extensions the decoder is built with (lowercase, without dot).
pub const ARTWORK_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub recursive: bool,
    /// `None` means unlimited.
    pub max_depth: Option<usize>,
    pub follow_links: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            recursive: true,
            max_depth: None,
            follow_links: true,
        }
    }
}

#[must_use]
pub fn is_artwork(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| {
            ARTWORK_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// Collect artwork under `root`, sorted by path.
///
/// # Errors
/// [`Error::BadDir`] if `root` is not a directory, [`Error::EmptyScan`] if
/// nothing was found.
pub fn scan_library(root: &Path, opts: &ScanOptions) -> Result<Vec<PathBuf>, Error> {
    if !root.is_dir() {
        return Err(Error::BadDir(root.to_string_lossy().into_owned()));
    }

    let mut walk = WalkDir::new(root).follow_links(opts.follow_links);
    if !opts.recursive {
        walk = walk.max_depth(1);
    } else if let Some(depth) = opts.max_depth {
        walk = walk.max_depth(depth);
    }

    let mut found: Vec<PathBuf> = walk
        .into_iter()
        .filter_entry(|e| !is_hidden_dir(e))
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file() && is_artwork(e.path()))
        .map(DirEntry::into_path)
        .collect();
    found.sort();
    debug!(root = %root.display(), count = found.len(), "library scan complete");

    if found.is_empty() {
        return Err(Error::EmptyScan);
    }
    Ok(found)
}

fn is_hidden_dir(entry: &DirEntry) -> bool {
    // The root itself may be a dot-dir (tempfile).
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|n| n.starts_with('.'))
}
