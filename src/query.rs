//! Read-only queries over the cached collection.
//!
//! Every operation goes through [`ContentCache::get_all`], so a query never
//! touches the filesystem twice within one cache generation. The category
//! list is the exception: it comes from a separate static JSON resource
//! and is read on each call.
//!
//! ## Ordering
//!
//! Listings are newest first. Records whose `date` is missing or does not
//! parse sort as if dated at the Unix epoch, i.e. last. Ties keep cache
//! order (the sort is stable).

use crate::cache::{ContentCache, ContentSource, FsSource};
use crate::feed::parse_date;
use crate::types::{CategoryDescriptor, ContentRecord, ListItem};
use std::cmp::Reverse;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, warn};

#[derive(Error, Debug)]
pub enum CategoryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("expected an array of categories or an object with a `categories` array")]
    Shape,
}

/// Blog queries backed by a [`ContentCache`].
pub struct Blog<S: ContentSource = FsSource> {
    cache: ContentCache<S>,
    categories_path: PathBuf,
}

impl<S: ContentSource> Blog<S> {
    pub fn new(cache: ContentCache<S>, categories_path: impl Into<PathBuf>) -> Self {
        Self {
            cache,
            categories_path: categories_path.into(),
        }
    }

    pub fn cache(&self) -> &ContentCache<S> {
        &self.cache
    }

    /// All posts as listing items, newest first.
    pub fn list_all(&self) -> Vec<ListItem> {
        sorted_items(&self.cache.get_all())
    }

    /// First record with `slug` in cache order.
    pub fn get_by_slug(&self, slug: &str) -> Option<ContentRecord> {
        self.cache
            .get_all()
            .iter()
            .find(|r| r.slug() == slug)
            .cloned()
    }

    /// Posts whose `category` equals `category`, ignoring case.
    pub fn list_by_category(&self, category: &str) -> Vec<ListItem> {
        self.list_all()
            .into_iter()
            .filter(|item| in_category(item, category))
            .collect()
    }

    /// Up to `limit` posts from `category`, excluding `exclude_slug`.
    pub fn list_related(&self, category: &str, exclude_slug: &str, limit: usize) -> Vec<ListItem> {
        self.list_by_category(category)
            .into_iter()
            .filter(|item| item.slug != exclude_slug)
            .take(limit)
            .collect()
    }

    /// Related posts for a record: its explicit `relatedPosts` first, then
    /// same-category posts, up to `limit` in total and without repeats.
    pub fn related_for(&self, record: &ContentRecord, limit: usize) -> Vec<ListItem> {
        let records = self.cache.get_all();
        let own_slug = record.slug();
        let mut related: Vec<ListItem> = Vec::new();

        for slug in &record.metadata.related_posts {
            if related.len() >= limit {
                return related;
            }
            if slug == own_slug || related.iter().any(|r| &r.slug == slug) {
                continue;
            }
            match records.iter().find(|r| r.slug() == slug) {
                Some(found) => related.push(found.list_item()),
                None => warn!(post = own_slug, related = %slug, "unknown related post"),
            }
        }

        if let Some(category) = record.metadata.category.as_deref() {
            let fill = self
                .list_related(category, own_slug, limit)
                .into_iter()
                .filter(|item| !related.iter().any(|r| r.slug == item.slug))
                .collect::<Vec<_>>();
            related.extend(fill);
        }
        related.truncate(limit);
        related
    }

    /// Categories from the static resource; `[]` if it cannot be used.
    pub fn list_categories(&self) -> Vec<CategoryDescriptor> {
        load_categories(&self.categories_path)
    }
}

fn in_category(item: &ListItem, category: &str) -> bool {
    item.category
        .as_deref()
        .is_some_and(|c| c.to_lowercase() == category.to_lowercase())
}

/// Project records into listing items sorted by date, newest first.
pub fn sorted_items(records: &[ContentRecord]) -> Vec<ListItem> {
    sorted_records(records)
        .into_iter()
        .map(ContentRecord::list_item)
        .collect()
}

/// Records in listing order. The sort is stable, so ties keep cache order.
pub fn sorted_records(records: &[ContentRecord]) -> Vec<&ContentRecord> {
    let mut sorted: Vec<&ContentRecord> = records.iter().collect();
    sorted.sort_by_key(|record| {
        Reverse(sort_timestamp(record.metadata.date.as_deref().unwrap_or_default()))
    });
    sorted
}

/// Seconds since the epoch; unparsable or missing dates count as the epoch.
fn sort_timestamp(date: &str) -> i64 {
    parse_date(date).map(|d| d.timestamp()).unwrap_or(0)
}

/// Slugs that appear on more than one record, in first-seen order.
pub fn duplicate_slugs(records: &[ContentRecord]) -> Vec<&str> {
    let mut seen = std::collections::HashSet::new();
    let mut dupes = Vec::new();
    for record in records {
        if !seen.insert(record.slug()) && !dupes.contains(&record.slug()) {
            dupes.push(record.slug());
        }
    }
    dupes
}

/// Read the category resource, logging and returning `[]` on any failure.
pub fn load_categories(path: &Path) -> Vec<CategoryDescriptor> {
    match try_load_categories(path) {
        Ok(categories) => categories,
        Err(err) => {
            error!(path = %path.display(), "cannot load categories: {err}");
            Vec::new()
        }
    }
}

/// Accepts a bare array or `{ "categories": [...] }`.
pub fn try_load_categories(path: &Path) -> Result<Vec<CategoryDescriptor>, CategoryError> {
    let content = fs::read_to_string(path)?;
    let value: serde_json::Value = serde_json::from_str(&content)?;
    let list = match value {
        list @ serde_json::Value::Array(_) => list,
        serde_json::Value::Object(mut map) => match map.remove("categories") {
            Some(list @ serde_json::Value::Array(_)) => list,
            _ => return Err(CategoryError::Shape),
        },
        _ => return Err(CategoryError::Shape),
    };
    Ok(serde_json::from_value(list)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{StaticSource, find_item, fs_blog, item_slugs, record, setup_fixtures};
    use std::fs;
    use tempfile::TempDir;

    fn blog(records: Vec<ContentRecord>) -> Blog<StaticSource> {
        Blog::new(ContentCache::new(StaticSource(records)), "/nonexistent/categories.json")
    }

    fn slugs(items: &[ListItem]) -> Vec<&str> {
        items.iter().map(|i| i.slug.as_str()).collect()
    }

    #[test]
    fn list_all_sorts_newest_first_with_undated_last() {
        let blog = blog(vec![
            record("undated", None, None),
            record("january", Some("2024-01-01"), None),
            record("june", Some("2024-06-01"), None),
        ]);
        let items = blog.list_all();
        assert_eq!(slugs(&items), vec!["june", "january", "undated"]);
        assert_eq!(items[2].date, "");
    }

    #[test]
    fn unparsable_dates_sink_and_keep_cache_order() {
        let blog = blog(vec![
            record("garbage", Some("someday"), None),
            record("undated", None, None),
            record("dated", Some("2020-01-01"), None),
        ]);
        assert_eq!(slugs(&blog.list_all()), vec!["dated", "garbage", "undated"]);
    }

    #[test]
    fn get_by_slug_returns_first_match() {
        let mut first = record("dup", Some("2024-01-01"), None);
        first.metadata.title = "First".into();
        let mut second = record("dup", Some("2024-02-01"), None);
        second.metadata.title = "Second".into();
        let blog = blog(vec![first, second, record("other", None, None)]);

        assert_eq!(blog.get_by_slug("dup").unwrap().metadata.title, "First");
        assert!(blog.get_by_slug("missing").is_none());
    }

    #[test]
    fn category_match_ignores_case() {
        let blog = blog(vec![
            record("a", Some("2024-01-01"), Some("Slabs")),
            record("b", Some("2024-02-01"), Some("slabs")),
            record("c", Some("2024-03-01"), Some("footings")),
            record("d", Some("2024-04-01"), Some("slabs-and-more")),
            record("e", Some("2024-05-01"), None),
        ]);
        assert_eq!(slugs(&blog.list_by_category("SLABS")), vec!["b", "a"]);
        assert!(blog.list_by_category("walls").is_empty());
    }

    #[test]
    fn related_excludes_and_truncates_in_listing_order() {
        let blog = blog(vec![
            record("a", Some("2024-01-01"), Some("slabs")),
            record("b", Some("2024-02-01"), Some("slabs")),
            record("c", Some("2024-03-01"), Some("slabs")),
            record("d", Some("2024-04-01"), Some("slabs")),
        ]);
        assert_eq!(slugs(&blog.list_related("slabs", "c", 2)), vec!["d", "b"]);
        assert_eq!(slugs(&blog.list_related("slabs", "x", 10)), vec!["d", "c", "b", "a"]);
        assert!(blog.list_related("slabs", "a", 0).is_empty());
    }

    #[test]
    fn related_for_prefers_explicit_related_posts() {
        let mut post = record("post", Some("2024-01-01"), Some("slabs"));
        post.metadata.related_posts = vec!["footing".into(), "post".into(), "ghost".into()];
        let blog = blog(vec![
            post.clone(),
            record("footing", Some("2023-01-01"), Some("footings")),
            record("newer-slab", Some("2024-05-01"), Some("slabs")),
            record("older-slab", Some("2022-05-01"), Some("slabs")),
        ]);
        assert_eq!(
            slugs(&blog.related_for(&post, 2)),
            vec!["footing", "newer-slab"]
        );
        assert_eq!(
            slugs(&blog.related_for(&post, 5)),
            vec!["footing", "newer-slab", "older-slab"]
        );
    }

    #[test]
    fn duplicate_slugs_reported_once() {
        let records = vec![
            record("a", None, None),
            record("b", None, None),
            record("a", None, None),
            record("a", None, None),
        ];
        assert_eq!(duplicate_slugs(&records), vec!["a"]);
    }

    #[test]
    fn categories_from_bare_array_or_object() {
        let tmp = TempDir::new().unwrap();
        let bare = tmp.path().join("bare.json");
        fs::write(
            &bare,
            r#"[{"slug":"slabs","name":"Slabs","featureCalculator":"slab"}]"#,
        )
        .unwrap();
        let wrapped = tmp.path().join("wrapped.json");
        fs::write(
            &wrapped,
            r#"{"categories":[{"slug":"walls","name":"Walls","description":"Vertical pours"}]}"#,
        )
        .unwrap();

        let cats = load_categories(&bare);
        assert_eq!(cats.len(), 1);
        assert_eq!(cats[0].feature_calculator.as_deref(), Some("slab"));

        let cats = load_categories(&wrapped);
        assert_eq!(cats[0].slug, "walls");
        assert_eq!(cats[0].description.as_deref(), Some("Vertical pours"));
    }

    #[test]
    fn invalid_category_json_yields_empty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("categories.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            try_load_categories(&path),
            Err(CategoryError::Json(_))
        ));
        assert!(load_categories(&path).is_empty());
    }

    #[test]
    fn unexpected_category_shapes_yield_empty() {
        let tmp = TempDir::new().unwrap();
        for (name, body) in [
            ("string.json", r#""slabs""#),
            ("object.json", r#"{"items":[]}"#),
            ("not-array.json", r#"{"categories":{"slug":"a"}}"#),
        ] {
            let path = tmp.path().join(name);
            fs::write(&path, body).unwrap();
            assert!(
                matches!(try_load_categories(&path), Err(CategoryError::Shape)),
                "{name}"
            );
            assert!(load_categories(&path).is_empty());
        }
    }

    #[test]
    fn missing_category_file_yields_empty() {
        let blog = blog(Vec::new());
        assert!(blog.list_categories().is_empty());
    }

    #[test]
    fn fixture_blog_end_to_end() {
        let tmp = setup_fixtures();
        let config = crate::config::load_config(tmp.path()).unwrap();
        let blog = fs_blog(tmp.path(), &config);

        let items = blog.list_all();
        assert_eq!(
            item_slugs(&items),
            vec!["slab-thickness", "footing-depth", "curing-time"]
        );
        let slab = find_item(&items, "slab-thickness");
        assert_eq!(slab.cover.as_deref(), Some("/images/slab.jpg"));
        assert_eq!(
            item_slugs(&blog.list_by_category("slabs")),
            vec!["slab-thickness", "curing-time"]
        );

        let record = blog.get_by_slug("slab-thickness").unwrap();
        assert_eq!(
            item_slugs(&blog.related_for(&record, 3)),
            vec!["footing-depth", "curing-time"]
        );
        assert_eq!(blog.list_categories().len(), 2);
    }
}
