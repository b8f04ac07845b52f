//! Front matter extraction.
//!
//! A content file is a YAML block fenced by `---` lines, followed by the
//! body:
//!
//! ```text
//! ---
//! title: How Thick Should a Slab Be?
//! slug: slab-thickness
//! date: 2024-06-01
//! cover: /public/images/slab.jpg
//! category: slabs
//! ---
//! Body in Markdown/MDX...
//! ```
//!
//! Documents without `title` or `slug` are dropped, as are files that cannot
//! be read or whose front matter is not valid YAML. Each failure is logged
//! with the file path and affects only that file.

use crate::types::{ContentRecord, Metadata};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, warn};

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("front matter is not valid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("front matter is missing required field `{0}`")]
    MissingField(&'static str),
}

/// Read one file into a [`ContentRecord`], or `None` if it must be skipped.
///
/// `public_prefix` is stripped from the front of `cover` values
/// (`/public/img/a.png` → `/img/a.png`).
pub fn extract(path: &Path, public_prefix: &str) -> Option<ContentRecord> {
    match try_extract(path, public_prefix) {
        Ok(record) => Some(record),
        Err(ExtractError::MissingField(field)) => {
            warn!(path = %path.display(), "skipping document without `{field}`");
            None
        }
        Err(err) => {
            error!(path = %path.display(), "skipping unreadable document: {err}");
            None
        }
    }
}

/// Extract every path, in parallel, keeping input order and dropping failures.
pub fn extract_all(paths: &[PathBuf], public_prefix: &str) -> Vec<ContentRecord> {
    paths
        .par_iter()
        .filter_map(|path| extract(path, public_prefix))
        .collect()
}

pub fn try_extract(path: &Path, public_prefix: &str) -> Result<ContentRecord, ExtractError> {
    let content = fs::read_to_string(path)?;
    let (front, body) = split_front_matter(&content);

    let mut metadata: Metadata = match front {
        Some(yaml) if !yaml.trim().is_empty() => serde_yaml::from_str(yaml)?,
        _ => Metadata::default(),
    };

    if metadata.slug.trim().is_empty() {
        return Err(ExtractError::MissingField("slug"));
    }
    if metadata.title.trim().is_empty() {
        return Err(ExtractError::MissingField("title"));
    }

    if let Some(cover) = metadata.cover.take() {
        metadata.cover = Some(strip_public_prefix(&cover, public_prefix));
    }

    Ok(ContentRecord {
        absolute_path: path.to_path_buf(),
        body: body.to_string(),
        metadata,
    })
}

/// Split `content` into its front matter block (without fences) and body.
///
/// Returns `(None, content)` when the file does not open with a `---` fence
/// or the block is never closed. The closing fence may be `---` or `...`.
pub fn split_front_matter(content: &str) -> (Option<&str>, &str) {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);

    let Some(rest) = strip_fence_line(content, "---") else {
        return (None, content);
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed == "---" || trimmed == "..." {
            let front = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return (Some(front), body);
        }
        offset += line.len();
    }

    (None, content)
}

/// If `text` starts with a line consisting of exactly `fence`, return what follows.
fn strip_fence_line<'a>(text: &'a str, fence: &str) -> Option<&'a str> {
    let rest = text.strip_prefix(fence)?;
    rest.strip_prefix("\r\n").or_else(|| rest.strip_prefix('\n'))
}

fn strip_public_prefix(cover: &str, prefix: &str) -> String {
    if prefix.is_empty() {
        return cover.to_string();
    }
    match cover.strip_prefix(prefix) {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest.to_string(),
        _ => cover.to_string(),
    }
}
