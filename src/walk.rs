//! Content file discovery.
//!
//! Walks the blog directory recursively and collects every file whose name
//! ends with the content extension. Hidden entries (names starting with `.`)
//! are pruned together with their subtrees, so editor swap files and `.git`
//! never reach the extractor.
//!
//! The walk never fails. A directory that cannot be listed, including a
//! missing root, is logged with its path and contributes nothing; siblings
//! are still visited.

use std::path::{Path, PathBuf};
use tracing::error;
use walkdir::{DirEntry, WalkDir};

/// Files found by a walk, plus the number of unreadable entries skipped.
#[derive(Debug, Default)]
pub(crate) struct WalkOutcome {
    pub files: Vec<PathBuf>,
    pub errors: usize,
}

/// Recursively list files under `root` whose name ends with `extension`.
///
/// `extension` may be given with or without its leading dot (`"mdx"` and
/// `".mdx"` are equivalent). Returned paths are absolute, in file-name order
/// within each directory.
pub fn walk(root: &Path, extension: &str) -> Vec<PathBuf> {
    walk_collect(root, extension).files
}

pub(crate) fn walk_collect(root: &Path, extension: &str) -> WalkOutcome {
    let suffix = format!(".{}", extension.trim_start_matches('.'));
    let mut outcome = WalkOutcome::default();
    let root = std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf());

    let walker = WalkDir::new(&root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e));

    for entry in walker {
        match entry {
            Ok(entry) => {
                if entry.file_type().is_file() && has_suffix(&entry, &suffix) {
                    outcome.files.push(entry.into_path());
                }
            }
            Err(err) => {
                let path = err
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| root.to_path_buf());
                error!(path = %path.display(), "cannot read content directory: {err}");
                outcome.errors += 1;
            }
        }
    }

    outcome
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

fn has_suffix(entry: &DirEntry, suffix: &str) -> bool {
    entry.file_name().to_string_lossy().ends_with(suffix)
}
