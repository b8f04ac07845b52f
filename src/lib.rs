//! # Slab Press
//!
//! The content engine of a concrete-calculator marketing site: a small blog
//! whose posts are MDX/Markdown files with YAML front matter, published as
//! static pages with category listings and an RSS feed.
//!
//! # Architecture: Ingest, Query, Render
//!
//! ```text
//! content/blog ──walk──▶ paths ──extract──▶ records ──cache──▶ query ──▶ feed / pages
//!                                      post body ──parse──▶ tree ──sanitize──▶ HTML
//! ```
//!
//! Ingestion is forgiving: a file that cannot be read or lacks a title or
//! slug is logged and skipped, never fatal. Everything after ingestion reads
//! from one memoized, immutable collection, so a build touches each content
//! file exactly once.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`walk`] | Recursive discovery of content files, skipping hidden entries |
//! | [`extract`] | Front matter splitting and parsing into [`types::ContentRecord`]s |
//! | [`cache`] | Generation-counted memo of the whole collection |
//! | [`query`] | Listings, slug lookup, categories, related posts |
//! | [`markup`] | Markdown body → element tree → HTML |
//! | [`sanitize`] | Allowlist sanitizer for body trees |
//! | [`feed`] | RSS 2.0 rendering and the `/rss.xml` response |
//! | [`generate`] | Static site rendering with Maud |
//! | [`scan`] | Content inventory for the `scan` and `check` commands |
//! | [`config`] | `config.toml` loading, validation, and merging |
//! | [`types`] | Records, listing items, category descriptors |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Trees, Not Strings, for Untrusted Markup
//!
//! Post bodies are authored content, but they can embed raw HTML. Rather
//! than rendering Markdown straight to a string and scrubbing it afterwards,
//! the body is parsed into a [`markup::Node`] tree and [`sanitize`] walks it
//! with a default-deny allowlist. Raw HTML never gets parsed into elements;
//! it is demoted to text and escaped on output.
//!
//! ## Whole-Collection Cache
//!
//! The blog is small enough that loading every post is cheaper than
//! tracking which ones changed. [`cache::ContentCache`] loads once per
//! generation and [`cache::ContentCache::invalidate`] throws everything away.
//!
//! ## Static Output for a Dynamic Endpoint
//!
//! `/rss.xml` is modelled as a [`feed::FeedResponse`] with its status and
//! headers. The generator writes the body to `rss.xml` and the headers to a
//! `_headers` file that static hosts understand, so no server is needed.

pub mod cache;
pub mod config;
pub mod extract;
pub mod feed;
pub mod generate;
pub mod markup;
pub mod output;
pub mod query;
pub mod sanitize;
pub mod scan;
pub mod types;
pub mod walk;

#[cfg(test)]
pub(crate) mod test_helpers;
