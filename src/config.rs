//! Site configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults
//! are overridden by a sparse user file in the content root:
//!
//! ```text
//! content/
//! ├── config.toml              # Site config (optional)
//! ├── categories.json          # Category descriptors
//! └── blog/
//!     ├── slab-thickness.mdx
//!     └── guides/
//!         └── footing-depth.mdx
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [site]
//! title = "Concrete Calculator"
//! base_url = "https://example.com"
//! description = "Guides and calculators for concrete projects."
//!
//! [blog]
//! dir = "blog"                  # Content directory, relative to the content root
//! extension = "mdx"             # Only files with this extension are posts
//! path = "/blog"                # URL prefix for post pages
//! public_prefix = "/public"     # Stripped from the front of `cover` paths
//! categories_file = "categories.json"
//! related_limit = 3             # Related posts shown under each post
//!
//! [feed]
//! title = "Concrete Calculator Blog"
//! s_maxage = 3600               # Shared-cache TTL of /rss.xml, seconds
//! stale_while_revalidate = 86400
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    pub site: SiteSection,
    pub blog: BlogConfig,
    pub feed: FeedConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteSection {
    pub title: String,
    /// Absolute origin of the published site, no trailing path.
    pub base_url: String,
    pub description: String,
}

impl Default for SiteSection {
    fn default() -> Self {
        Self {
            title: "Concrete Calculator".to_string(),
            base_url: "https://example.com".to_string(),
            description: "Guides and calculators for concrete projects.".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BlogConfig {
    pub dir: String,
    pub extension: String,
    pub path: String,
    pub public_prefix: String,
    pub categories_file: String,
    pub related_limit: usize,
}

impl Default for BlogConfig {
    fn default() -> Self {
        Self {
            dir: "blog".to_string(),
            extension: "mdx".to_string(),
            path: "/blog".to_string(),
            public_prefix: "/public".to_string(),
            categories_file: "categories.json".to_string(),
            related_limit: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FeedConfig {
    pub title: String,
    pub s_maxage: u32,
    pub stale_while_revalidate: u32,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            title: "Concrete Calculator Blog".to_string(),
            s_maxage: 3600,
            stale_while_revalidate: 86400,
        }
    }
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let base = &self.site.base_url;
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ConfigError::Validation(
                "site.base_url must start with http:// or https://".into(),
            ));
        }
        if self.blog.extension.trim_start_matches('.').is_empty() {
            return Err(ConfigError::Validation(
                "blog.extension must not be empty".into(),
            ));
        }
        if !self.blog.path.starts_with('/') {
            return Err(ConfigError::Validation(
                "blog.path must start with /".into(),
            ));
        }
        if self.feed.stale_while_revalidate < self.feed.s_maxage {
            return Err(ConfigError::Validation(
                "feed.stale_while_revalidate must be at least feed.s_maxage".into(),
            ));
        }
        Ok(())
    }

    /// URL prefix of post pages, e.g. `https://example.com/blog`.
    pub fn blog_base(&self) -> String {
        format!(
            "{}{}",
            self.site.base_url.trim_end_matches('/'),
            self.blog.path.trim_end_matches('/')
        )
    }

    /// Directory holding the posts.
    pub fn blog_dir(&self, content_root: &Path) -> PathBuf {
        content_root.join(&self.blog.dir)
    }

    pub fn categories_path(&self, content_root: &Path) -> PathBuf {
        content_root.join(&self.blog.categories_file)
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SiteConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = path.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `config.toml` in the content root.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    resolve_config(stock_defaults_value(), load_raw_config(root)?)
}

/// Returns a fully-commented stock `config.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# slab-press configuration
# ========================
# All settings are optional. Values shown below are the defaults.
# Place this file at the content root as config.toml.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Site
# ---------------------------------------------------------------------------
[site]
title = "Concrete Calculator"

# Absolute origin of the published site. Feed links are built from it.
base_url = "https://example.com"

description = "Guides and calculators for concrete projects."

# ---------------------------------------------------------------------------
# Blog content
# ---------------------------------------------------------------------------
[blog]
# Directory of posts, relative to the content root. Searched recursively;
# entries starting with "." are ignored.
dir = "blog"

# Only files ending in this extension are posts.
extension = "mdx"

# URL prefix of post pages: <base_url><path>/<slug>
path = "/blog"

# Stripped from the front of `cover` values in front matter, so
# "/public/images/a.jpg" becomes "/images/a.jpg".
public_prefix = "/public"

# JSON file with category descriptors, relative to the content root.
# Either a bare array or an object with a "categories" array.
categories_file = "categories.json"

# Number of related posts listed under each post.
related_limit = 3

# ---------------------------------------------------------------------------
# RSS feed (/rss.xml)
# ---------------------------------------------------------------------------
[feed]
title = "Concrete Calculator Blog"

# Cache-Control: public, s-maxage=<s_maxage>, stale-while-revalidate=<...>
s_maxage = 3600
stale_while_revalidate = 86400
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = SiteConfig::default();
        assert_eq!(config.blog.extension, "mdx");
        assert_eq!(config.blog.public_prefix, "/public");
        assert_eq!(config.feed.s_maxage, 3600);
        assert_eq!(config.feed.stale_while_revalidate, 86400);
        config.validate().unwrap();
    }

    #[test]
    fn blog_base_joins_origin_and_path() {
        let mut config = SiteConfig::default();
        config.site.base_url = "https://concrete.example/".into();
        config.blog.path = "/guides/".into();
        assert_eq!(config.blog_base(), "https://concrete.example/guides");
    }

    #[test]
    fn parse_partial_config() {
        let config: SiteConfig = toml::from_str(
            r#"
[site]
base_url = "https://concrete.example"
"#,
        )
        .unwrap();
        assert_eq!(config.site.base_url, "https://concrete.example");
        assert_eq!(config.site.title, "Concrete Calculator");
        assert_eq!(config.blog.dir, "blog");
    }

    #[test]
    fn merge_overlay_keeps_base_keys() {
        let base = stock_defaults_value();
        let overlay: toml::Value = toml::from_str("[blog]\nrelated_limit = 5\n").unwrap();
        let merged = merge_toml(base, overlay);
        let config: SiteConfig = merged.try_into().unwrap();
        assert_eq!(config.blog.related_limit, 5);
        assert_eq!(config.blog.extension, "mdx");
    }

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.site.base_url, "https://example.com");
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("config.toml"),
            "[feed]\ntitle = \"Pour Notes\"\ns_maxage = 60\n",
        )
        .unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.feed.title, "Pour Notes");
        assert_eq!(config.feed.s_maxage, 60);
        assert_eq!(config.feed.stale_while_revalidate, 86400);
    }

    #[test]
    fn unknown_keys_rejected() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("config.toml"), "[blog]\nextention = \"md\"\n").unwrap();
        assert!(matches!(
            load_config(tmp.path()),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn invalid_values_rejected() {
        for source in [
            "[site]\nbase_url = \"example.com\"\n",
            "[blog]\nextension = \".\"\n",
            "[blog]\npath = \"blog\"\n",
            "[feed]\ns_maxage = 100\nstale_while_revalidate = 10\n",
        ] {
            let overlay: toml::Value = toml::from_str(source).unwrap();
            assert!(
                matches!(
                    resolve_config(stock_defaults_value(), Some(overlay)),
                    Err(ConfigError::Validation(_))
                ),
                "{source}"
            );
        }
    }

    #[test]
    fn stock_config_toml_parses_to_defaults() {
        let config: SiteConfig = toml::from_str(stock_config_toml()).unwrap();
        let defaults = SiteConfig::default();
        assert_eq!(config.site.base_url, defaults.site.base_url);
        assert_eq!(config.blog.categories_file, defaults.blog.categories_file);
        assert_eq!(config.feed.title, defaults.feed.title);
        config.validate().unwrap();
    }
}
