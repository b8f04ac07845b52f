//! Content inventory.
//!
//! Runs the same walk and extraction as the content cache, but keeps the
//! bookkeeping the cache throws away: which files were dropped, which slugs
//! collide, how many directories could not be read. The `scan` command
//! writes the result to `manifest.json`; `check` only prints it.
//!
//! Scanning never fails on content. Only a broken `config.toml` is an error.

use crate::config::{self, SiteConfig};
use crate::extract;
use crate::query;
use crate::types::{CategoryDescriptor, ContentRecord};
use crate::walk;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Manifest {
    /// Loaded records, in walk order.
    pub records: Vec<ContentRecord>,
    pub categories: Vec<CategoryDescriptor>,
    /// Content files that produced no record.
    pub dropped: Vec<PathBuf>,
    /// Slugs shared by more than one record.
    pub duplicates: Vec<String>,
    /// Directories the walk could not list.
    pub unreadable: usize,
    pub config: SiteConfig,
}

impl Manifest {
    /// Whether the content has nothing worth reporting.
    pub fn is_clean(&self) -> bool {
        self.dropped.is_empty() && self.duplicates.is_empty() && self.unreadable == 0
    }
}

/// Load `config.toml` from `root` and inventory the content under it.
pub fn scan(root: &Path) -> Result<Manifest, ScanError> {
    let config = config::load_config(root)?;
    Ok(scan_with_config(root, config))
}

pub fn scan_with_config(root: &Path, config: SiteConfig) -> Manifest {
    let outcome = walk::walk_collect(&config.blog_dir(root), &config.blog.extension);
    let records = extract::extract_all(&outcome.files, &config.blog.public_prefix);

    let loaded: HashSet<&Path> = records.iter().map(|r| r.absolute_path.as_path()).collect();
    let dropped: Vec<PathBuf> = outcome
        .files
        .iter()
        .filter(|path| !loaded.contains(path.as_path()))
        .cloned()
        .collect();

    let duplicates: Vec<String> = query::duplicate_slugs(&records)
        .into_iter()
        .map(str::to_string)
        .collect();
    for slug in &duplicates {
        warn!(slug = %slug, "duplicate slug, only the first post is reachable");
    }

    let categories = query::load_categories(&config.categories_path(root));

    Manifest {
        records,
        categories,
        dropped,
        duplicates,
        unreadable: outcome.errors,
        config,
    }
}
