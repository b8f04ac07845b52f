//! HTML site generation.
//!
//! Final stage of the build. Reads the collection through a [`Blog`] and
//! writes a static site that any file server can host.
//!
//! ## Generated Pages
//!
//! - **Blog index** (`/index.html`): every post, newest first
//! - **Post pages** (`/blog/{slug}/index.html`): sanitized body, cover,
//!   calculator link, related posts
//! - **Category pages** (`/blog/category/{slug}/index.html`): one per entry of
//!   the categories resource
//! - **Privacy policy** (`/privacy-policy/index.html`): embedded static page
//! - **Feed** (`/rss.xml`) plus a `_headers` file carrying its HTTP headers
//!
//! ## Output Structure
//!
//! ```text
//! dist/
//! ├── index.html
//! ├── style.css
//! ├── rss.xml
//! ├── _headers
//! ├── privacy-policy/
//! │   └── index.html
//! └── blog/
//!     ├── slab-thickness/
//!     │   └── index.html
//!     └── category/
//!         └── slabs/
//!             └── index.html
//! ```
//!
//! `/blog` follows `blog.path` from the config.
//!
//! ## HTML Generation
//!
//! Page chrome uses [maud](https://maud.lambda.xyz/), which escapes every
//! interpolated value. Post bodies are the one place pre-rendered HTML is
//! spliced in, and they only arrive there after
//! [`sanitize`](crate::sanitize::sanitize).

use crate::cache::ContentSource;
use crate::config::SiteConfig;
use crate::feed::{self, Channel, FeedResponse};
use crate::markup::render_post_body;
use crate::query::Blog;
use crate::types::{CategoryDescriptor, ContentRecord, ListItem};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

const CSS: &str = include_str!("../static/style.css");
const PRIVACY_POLICY: &str = include_str!("../static/privacy.md");

/// What a generate run wrote, relative to the output directory.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct GenerateReport {
    /// `(title, page path)` per post, in listing order.
    pub posts: Vec<(String, String)>,
    /// `(name, page path, post count)` per category.
    pub categories: Vec<(String, String, usize)>,
    /// Every other file: index, feed, headers, stylesheet, privacy page.
    pub files: Vec<String>,
    /// Posts or categories whose slug cannot be a path segment.
    pub skipped: Vec<String>,
}

pub fn generate<S: ContentSource>(
    blog: &Blog<S>,
    config: &SiteConfig,
    output_dir: &Path,
) -> Result<GenerateReport, GenerateError> {
    let mut report = GenerateReport::default();
    let site = Site::new(config);
    fs::create_dir_all(output_dir)?;

    let items = blog.list_all();
    let categories = blog.list_categories();

    write_page(output_dir, "style.css", CSS, &mut report.files)?;

    let index = render_index(&site, &items, &categories);
    write_page(output_dir, "index.html", &index.into_string(), &mut report.files)?;

    for item in &items {
        if !is_path_segment(&item.slug) {
            warn!(slug = %item.slug, "slug is not a valid path segment, skipping page");
            report.skipped.push(item.slug.clone());
            continue;
        }
        // list_all and get_by_slug disagree on duplicates; the page shows
        // the record get_by_slug resolves to.
        let Some(record) = blog.get_by_slug(&item.slug) else {
            continue;
        };
        let rel = site.post_file(&item.slug);
        if report.posts.iter().any(|(_, path)| *path == rel) {
            continue;
        }
        let related = blog.related_for(&record, config.blog.related_limit);
        let page = render_post_page(&site, &record, &related, &categories);
        write_file(output_dir, &rel, &page.into_string())?;
        debug!(slug = %item.slug, "generated post page");
        report.posts.push((record.metadata.title.clone(), rel));
    }

    for category in &categories {
        if !is_path_segment(&category.slug) {
            warn!(slug = %category.slug, "category slug is not a valid path segment, skipping page");
            report.skipped.push(category.slug.clone());
            continue;
        }
        let posts = blog.list_by_category(&category.slug);
        let rel = site.category_file(&category.slug);
        let page = render_category_page(&site, category, &posts, &categories);
        write_file(output_dir, &rel, &page.into_string())?;
        report
            .categories
            .push((category.name.clone(), rel, posts.len()));
    }

    let privacy = render_privacy_page(&site, &categories);
    write_page(
        output_dir,
        "privacy-policy/index.html",
        &privacy.into_string(),
        &mut report.files,
    )?;

    let response = feed_response(&items, config);
    write_page(output_dir, "rss.xml", &response.body, &mut report.files)?;
    write_page(output_dir, "_headers", &headers_file(&response), &mut report.files)?;

    info!(
        output = %output_dir.display(),
        posts = report.posts.len(),
        categories = report.categories.len(),
        "site generated"
    );
    Ok(report)
}

/// The `/rss.xml` response for a listing.
pub fn feed_response(items: &[ListItem], config: &SiteConfig) -> FeedResponse {
    let channel = Channel {
        title: config.feed.title.clone(),
        description: config.site.description.clone(),
        site_url: config.site.base_url.clone(),
        blog_base: config.blog_base(),
    };
    feed::rss_response(
        items,
        &channel,
        config.feed.s_maxage,
        config.feed.stale_while_revalidate,
    )
}

/// `_headers` rules (Netlify / Cloudflare Pages format) for the feed.
fn headers_file(response: &FeedResponse) -> String {
    let mut out = String::from("/rss.xml\n");
    for (name, value) in response.headers() {
        out.push_str(&format!("  {name}: {value}\n"));
    }
    out
}

fn write_file(output_dir: &Path, rel: &str, contents: &str) -> std::io::Result<PathBuf> {
    let path = output_dir.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, contents)?;
    Ok(path)
}

fn write_page(
    output_dir: &Path,
    rel: &str,
    contents: &str,
    written: &mut Vec<String>,
) -> std::io::Result<()> {
    write_file(output_dir, rel, contents)?;
    written.push(rel.to_string());
    Ok(())
}

/// Whether `slug` can be used as a single directory name.
fn is_path_segment(slug: &str) -> bool {
    !slug.is_empty()
        && slug != "."
        && slug != ".."
        && !slug.contains(['/', '\\'])
        && !slug.chars().any(char::is_control)
}

// ============================================================================
// URL layout
// ============================================================================

struct Site<'a> {
    config: &'a SiteConfig,
    /// `blog.path` without surrounding slashes; empty when posts live at `/`.
    blog_dir: String,
}

impl<'a> Site<'a> {
    fn new(config: &'a SiteConfig) -> Self {
        Self {
            config,
            blog_dir: config.blog.path.trim_matches('/').to_string(),
        }
    }

    fn blog_prefix(&self) -> String {
        if self.blog_dir.is_empty() {
            String::new()
        } else {
            format!("{}/", self.blog_dir)
        }
    }

    fn post_href(&self, slug: &str) -> String {
        format!("/{}{}/", self.blog_prefix(), slug)
    }

    fn post_file(&self, slug: &str) -> String {
        format!("{}{}/index.html", self.blog_prefix(), slug)
    }

    fn category_href(&self, slug: &str) -> String {
        format!("/{}category/{}/", self.blog_prefix(), slug)
    }

    fn category_file(&self, slug: &str) -> String {
        format!("{}category/{}/index.html", self.blog_prefix(), slug)
    }
}

fn calculator_href(slug: &str) -> String {
    format!("/calculators/{slug}/")
}

/// `June 1, 2024`, or the raw value when it does not parse.
fn display_date(date: &str) -> Option<String> {
    if date.trim().is_empty() {
        return None;
    }
    Some(match feed::parse_date(date) {
        Some(parsed) => parsed.format("%B %-d, %Y").to_string(),
        None => date.to_string(),
    })
}

fn category_name<'c>(categories: &'c [CategoryDescriptor], slug: &'c str) -> &'c str {
    categories
        .iter()
        .find(|c| c.slug.eq_ignore_ascii_case(slug))
        .map(|c| c.name.as_str())
        .unwrap_or(slug)
}

// ============================================================================
// HTML Components
// ============================================================================

/// Renders the base HTML document structure
fn base_document(site: &Site, title: &str, description: Option<&str>, content: Markup) -> Markup {
    let page_title = if title == site.config.site.title {
        title.to_string()
    } else {
        format!("{} | {}", title, site.config.site.title)
    };
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (page_title) }
                @if let Some(desc) = description {
                    meta name="description" content=(desc);
                }
                link rel="stylesheet" href="/style.css";
                link rel="alternate" type="application/rss+xml" title=(site.config.feed.title) href="/rss.xml";
            }
            body {
                (content)
                footer.site-footer {
                    a href="/privacy-policy/" { "Privacy Policy" }
                    " · "
                    a href="/rss.xml" { "RSS" }
                }
            }
        }
    }
}

/// Renders the site header with category navigation
fn site_header(site: &Site, categories: &[CategoryDescriptor], current: Option<&str>) -> Markup {
    html! {
        header.site-header {
            a.site-title href="/" { (site.config.site.title) }
            nav.site-nav {
                ul {
                    @for category in categories {
                        @let is_current = current.is_some_and(|c| c.eq_ignore_ascii_case(&category.slug));
                        li class=[is_current.then_some("current")] {
                            a href=(site.category_href(&category.slug)) { (category.name) }
                        }
                    }
                }
            }
        }
    }
}

/// Renders a post card for listings
fn post_card(site: &Site, item: &ListItem) -> Markup {
    html! {
        article.post-card {
            a href=(site.post_href(&item.slug)) {
                @if let Some(cover) = &item.cover {
                    img src=(cover) alt="" loading="lazy";
                }
                h2 { (item.title) }
            }
            @if let Some(date) = display_date(&item.date) {
                time datetime=(item.date) { (date) }
            }
            @if let Some(excerpt) = &item.excerpt {
                p.excerpt { (excerpt) }
            }
        }
    }
}

fn post_grid(site: &Site, items: &[ListItem]) -> Markup {
    html! {
        div.post-grid {
            @for item in items {
                (post_card(site, item))
            }
        }
    }
}

fn calculator_link(slug: &str) -> Markup {
    html! {
        a.calculator-link href=(calculator_href(slug)) { "Open the calculator" }
    }
}

// ============================================================================
// Page Renderers
// ============================================================================

/// Renders the blog index with every post
fn render_index(site: &Site, items: &[ListItem], categories: &[CategoryDescriptor]) -> Markup {
    let content = html! {
        (site_header(site, categories, None))
        main.index-page {
            h1 { "Blog" }
            @if items.is_empty() {
                p.empty { "No posts yet." }
            } @else {
                (post_grid(site, items))
            }
        }
    };
    base_document(
        site,
        &site.config.site.title,
        Some(&site.config.site.description),
        content,
    )
}

/// Renders a single post
fn render_post_page(
    site: &Site,
    record: &ContentRecord,
    related: &[ListItem],
    categories: &[CategoryDescriptor],
) -> Markup {
    let meta = &record.metadata;
    let body = render_post_body(&record.body);
    let published = meta
        .date
        .as_deref()
        .and_then(|date| display_date(date).map(|shown| (date, shown)));

    let content = html! {
        (site_header(site, categories, meta.category.as_deref()))
        main.post-page {
            article {
                header.post-header {
                    @if let Some(category) = &meta.category {
                        a.post-category href=(site.category_href(category)) {
                            (category_name(categories, category))
                        }
                    }
                    h1 { (meta.title) }
                    @if let Some((date, shown)) = &published {
                        time datetime=(date) { (shown) }
                    }
                }
                @if let Some(cover) = &meta.cover {
                    img.post-cover src=(cover) alt="";
                }
                div.post-body {
                    (PreEscaped(body))
                }
                @if let Some(calculator) = &meta.calculator {
                    aside.post-calculator {
                        (calculator_link(calculator))
                    }
                }
            }
            @if !related.is_empty() {
                section.related-posts {
                    h2 { "Related posts" }
                    (post_grid(site, related))
                }
            }
        }
    };
    base_document(site, &meta.title, meta.excerpt.as_deref(), content)
}

/// Renders a category listing
fn render_category_page(
    site: &Site,
    category: &CategoryDescriptor,
    posts: &[ListItem],
    categories: &[CategoryDescriptor],
) -> Markup {
    let content = html! {
        (site_header(site, categories, Some(&category.slug)))
        main.category-page {
            header.category-header {
                h1 { (category.name) }
                @if let Some(desc) = &category.description {
                    p.category-description { (desc) }
                }
                @if let Some(calculator) = &category.feature_calculator {
                    (calculator_link(calculator))
                }
            }
            @if posts.is_empty() {
                p.empty { "No posts in this category yet." }
            } @else {
                (post_grid(site, posts))
            }
        }
    };
    base_document(site, &category.name, category.description.as_deref(), content)
}

fn render_privacy_page(site: &Site, categories: &[CategoryDescriptor]) -> Markup {
    let content = html! {
        (site_header(site, categories, None))
        main.page {
            (PreEscaped(render_post_body(PRIVACY_POLICY)))
        }
    };
    base_document(site, "Privacy Policy", None, content)
}
