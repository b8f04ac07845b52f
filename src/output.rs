//! CLI output formatting for all pipeline stages.
//!
//! # Information-First Display
//!
//! Output is **information-centric, not file-centric**. Every post leads with
//! its positional index and title; the slug, source file, and other details
//! are indented context lines underneath. The output reads as a content
//! inventory while still letting users trace each post back to its file.
//!
//! # Output Format
//!
//! ## Scan
//!
//! ```text
//! Posts
//! 001 Curing Time
//!     Slug: curing-time
//!     Source: blog/curing-time.mdx
//!     Date: 2023-11-02
//!     Category: Slabs
//!
//! Categories
//! 001 Slabs (2 posts)
//!     Calculator: slab
//!
//! Dropped
//!     blog/untitled.mdx
//!
//! Config
//!     config.toml
//! ```
//!
//! ## Generate
//!
//! ```text
//! Home → index.html
//! Posts
//! 001 Curing Time → blog/curing-time/index.html
//!
//! Categories
//! 001 Slabs (2 posts) → blog/category/slabs/index.html
//!
//! Generated 3 posts, 2 categories, 5 files
//! ```
//!
//! # Architecture
//!
//! Each stage has a `format_*` function (returns `Vec<String>`) for testability
//! and a `print_*` wrapper that writes to stdout. Format functions are pure:
//! no I/O, no side effects.

use crate::generate::GenerateReport;
use crate::scan::Manifest;
use std::path::Path;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Format an entity header: positional index + title, with optional post count.
///
/// ```text
/// 001 Slabs (2 posts)
/// 001 Curing Time
/// ```
fn entity_header(index: usize, title: &str, count: Option<usize>) -> String {
    match count {
        Some(1) => format!("{} {} (1 post)", format_index(index), title),
        Some(n) => format!("{} {} ({} posts)", format_index(index), title, n),
        None => format!("{} {}", format_index(index), title),
    }
}

/// Truncate text to `max` characters, appending `...` if truncated.
fn truncate_desc(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Display `path` relative to `root` when it lives underneath it.
fn relative_display(path: &Path, root: &Path) -> String {
    let root = std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf());
    path.strip_prefix(&root)
        .unwrap_or(path)
        .display()
        .to_string()
}

// ============================================================================
// Scan / check output
// ============================================================================

/// Format the scan inventory.
///
/// Posts are shown in listing order (newest first), then categories with
/// their post counts, then anything that needs attention.
pub fn format_scan_output(manifest: &Manifest, source_root: &Path) -> Vec<String> {
    let mut lines = Vec::new();

    lines.push("Posts".to_string());
    let records = crate::query::sorted_records(&manifest.records);
    let items: Vec<_> = records.iter().map(|r| r.list_item()).collect();
    for (i, (record, item)) in records.iter().zip(&items).enumerate() {
        lines.push(entity_header(i + 1, &item.title, None));
        lines.push(format!("{}Slug: {}", indent(1), item.slug));
        lines.push(format!(
            "{}Source: {}",
            indent(1),
            relative_display(&record.absolute_path, source_root)
        ));
        if !item.date.is_empty() {
            lines.push(format!("{}Date: {}", indent(1), item.date));
        }
        if let Some(category) = &item.category {
            lines.push(format!("{}Category: {}", indent(1), category));
        }
        if let Some(excerpt) = &item.excerpt {
            lines.push(format!("{}Excerpt: {}", indent(1), truncate_desc(excerpt, 40)));
        }
    }

    if !manifest.categories.is_empty() {
        lines.push(String::new());
        lines.push("Categories".to_string());
        for (i, category) in manifest.categories.iter().enumerate() {
            let count = items
                .iter()
                .filter(|item| {
                    item.category
                        .as_deref()
                        .is_some_and(|c| c.eq_ignore_ascii_case(&category.slug))
                })
                .count();
            lines.push(entity_header(i + 1, &category.name, Some(count)));
            if let Some(calculator) = &category.feature_calculator {
                lines.push(format!("{}Calculator: {}", indent(1), calculator));
            }
        }
    }

    if !manifest.dropped.is_empty() {
        lines.push(String::new());
        lines.push("Dropped".to_string());
        for path in &manifest.dropped {
            lines.push(format!("{}{}", indent(1), relative_display(path, source_root)));
        }
    }

    if !manifest.duplicates.is_empty() {
        lines.push(String::new());
        lines.push("Duplicate slugs".to_string());
        for slug in &manifest.duplicates {
            lines.push(format!("{}{}", indent(1), slug));
        }
    }

    if manifest.unreadable > 0 {
        lines.push(String::new());
        lines.push(format!("Unreadable directories: {}", manifest.unreadable));
    }

    lines.push(String::new());
    lines.push("Config".to_string());
    if source_root.join("config.toml").exists() {
        lines.push(format!("{}config.toml", indent(1)));
    } else {
        lines.push(format!("{}(defaults)", indent(1)));
    }

    lines
}

/// Print scan output to stdout.
pub fn print_scan_output(manifest: &Manifest, source_root: &Path) {
    for line in format_scan_output(manifest, source_root) {
        println!("{}", line);
    }
}

// ============================================================================
// Generate output
// ============================================================================

/// Format generate stage output.
///
/// Each entity leads with its positional index and title, followed by `→`
/// and the output path.
pub fn format_generate_output(report: &GenerateReport) -> Vec<String> {
    let mut lines = Vec::new();

    lines.push("Home \u{2192} index.html".to_string());

    lines.push("Posts".to_string());
    for (i, (title, path)) in report.posts.iter().enumerate() {
        lines.push(format!("{} \u{2192} {}", entity_header(i + 1, title, None), path));
    }

    if !report.categories.is_empty() {
        lines.push(String::new());
        lines.push("Categories".to_string());
        for (i, (name, path, count)) in report.categories.iter().enumerate() {
            lines.push(format!(
                "{} \u{2192} {}",
                entity_header(i + 1, name, Some(*count)),
                path
            ));
        }
    }

    if !report.skipped.is_empty() {
        lines.push(String::new());
        lines.push("Skipped (slug is not a path segment)".to_string());
        for slug in &report.skipped {
            lines.push(format!("{}{:?}", indent(1), slug));
        }
    }

    lines.push(format!(
        "Generated {} posts, {} categories, {} files",
        report.posts.len(),
        report.categories.len(),
        report.files.len()
    ));

    lines
}

/// Print generate output to stdout.
pub fn print_generate_output(report: &GenerateReport) {
    for line in format_generate_output(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
