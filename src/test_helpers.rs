//! Shared test utilities for the slab-press test suite.
//!
//! Provides an in-memory [`ContentSource`], record builders, a fixture
//! content tree on disk, and lookup helpers that panic with the available
//! choices on a miss.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_fixtures();
//! let config = crate::config::load_config(tmp.path()).unwrap();
//! let blog = fs_blog(tmp.path(), &config);
//!
//! let item = find_item(&blog.list_all(), "slab-thickness");
//! assert_eq!(item.category.as_deref(), Some("slabs"));
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::cache::{ContentCache, ContentSource, FsSource};
use crate::config::SiteConfig;
use crate::query::Blog;
use crate::types::{ContentRecord, ListItem, Metadata};

// =========================================================================
// In-memory content
// =========================================================================

/// Serves a fixed set of records on every load.
pub struct StaticSource(pub Vec<ContentRecord>);

impl ContentSource for StaticSource {
    fn load(&self) -> Vec<ContentRecord> {
        self.0.clone()
    }
}

/// A minimal record titled after its slug.
pub fn record(slug: &str, date: Option<&str>, category: Option<&str>) -> ContentRecord {
    ContentRecord {
        absolute_path: PathBuf::from(format!("/content/blog/{slug}.mdx")),
        body: String::new(),
        metadata: Metadata {
            title: format!("Post {slug}"),
            slug: slug.to_string(),
            date: date.map(str::to_string),
            category: category.map(str::to_string),
            ..Metadata::default()
        },
    }
}

// =========================================================================
// Fixture setup
// =========================================================================

/// Fixture posts: `(relative path, file contents)`.
const FIXTURE_POSTS: &[(&str, &str)] = &[
    (
        "blog/slab-thickness.mdx",
        "---\n\
         title: How Thick Should a Slab Be?\n\
         slug: slab-thickness\n\
         date: 2024-06-01\n\
         excerpt: Four inches is not always enough.\n\
         cover: /public/images/slab.jpg\n\
         category: slabs\n\
         calculator: slab\n\
         relatedPosts:\n  - footing-depth\n\
         ---\n\
         # Slab thickness\n\n\
         Most patios use **4 inches**.\n\n\
         <script>alert('x')</script>\n",
    ),
    (
        "blog/guides/footing-depth.mdx",
        "---\n\
         title: Footing Depth Basics\n\
         slug: footing-depth\n\
         date: 2024-01-15\n\
         category: footings\n\
         ---\n\
         Dig below the frost line.\n",
    ),
    (
        "blog/curing-time.mdx",
        "---\n\
         title: Curing Time\n\
         slug: curing-time\n\
         date: 2023-11-02\n\
         category: Slabs\n\
         ---\n\
         Keep it wet for a week.\n",
    ),
    ("blog/untitled.mdx", "---\nslug: untitled\n---\nNo title.\n"),
    ("blog/.draft.mdx", "---\ntitle: Draft\nslug: draft\n---\n"),
    ("blog/notes.md", "---\ntitle: Notes\nslug: notes\n---\n"),
];

const FIXTURE_CATEGORIES: &str = r#"{
  "categories": [
    { "slug": "slabs", "name": "Slabs", "description": "Patios, driveways and floors", "featureCalculator": "slab" },
    { "slug": "footings", "name": "Footings" }
  ]
}"#;

/// Write a small content tree to a temp directory and return it.
///
/// Three valid posts (one nested), one post without a title, one hidden
/// draft, one file with the wrong extension, and a `categories.json`.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    for (rel, contents) in FIXTURE_POSTS {
        write_file(tmp.path(), rel, contents);
    }
    write_file(tmp.path(), "categories.json", FIXTURE_CATEGORIES);
    tmp
}

/// Write `contents` to `root/rel`, creating parent directories.
pub fn write_file(root: &Path, rel: &str, contents: &str) -> PathBuf {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, contents).unwrap();
    path
}

/// A filesystem-backed [`Blog`] over a content root.
pub fn fs_blog(root: &Path, config: &SiteConfig) -> Blog {
    let source = FsSource {
        root: config.blog_dir(root),
        extension: config.blog.extension.clone(),
        public_prefix: config.blog.public_prefix.clone(),
    };
    Blog::new(ContentCache::new(source), config.categories_path(root))
}

// =========================================================================
// Lookups: panic with a clear message on miss
// =========================================================================

/// Find a listing item by slug. Panics if not found.
pub fn find_item<'a>(items: &'a [ListItem], slug: &str) -> &'a ListItem {
    items.iter().find(|i| i.slug == slug).unwrap_or_else(|| {
        let slugs = item_slugs(items);
        panic!("item '{slug}' not found. Available: {slugs:?}")
    })
}

/// Find a record by slug. Panics if not found.
pub fn find_record<'a>(records: &'a [ContentRecord], slug: &str) -> &'a ContentRecord {
    records.iter().find(|r| r.slug() == slug).unwrap_or_else(|| {
        let slugs: Vec<&str> = records.iter().map(|r| r.slug()).collect();
        panic!("record '{slug}' not found. Available: {slugs:?}")
    })
}

/// All item slugs in listing order.
pub fn item_slugs(items: &[ListItem]) -> Vec<&str> {
    items.iter().map(|i| i.slug.as_str()).collect()
}
