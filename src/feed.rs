//! RSS 2.0 feed rendering.
//!
//! [`render_feed`] is pure and total: item dates that do not parse simply
//! lose their `<pubDate>`, items without an excerpt lose their
//! `<description>`, and nothing ever fails. Titles and descriptions are
//! wrapped in CDATA, with any `]]>` inside them split across two sections.
//!
//! [`rss_response`] wraps the document with the status and headers served at
//! `/rss.xml`.

use crate::types::ListItem;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::fmt::Write as _;

pub const CONTENT_TYPE: &str = "application/rss+xml; charset=utf-8";

/// Channel-level fields of the feed.
#[derive(Debug, Clone)]
pub struct Channel {
    pub title: String,
    pub description: String,
    /// Site home page.
    pub site_url: String,
    /// Post links are `{blog_base}/{slug}`.
    pub blog_base: String,
}

/// What the `/rss.xml` endpoint answers with.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub cache_control: String,
    pub body: String,
}

impl FeedResponse {
    /// `(name, value)` header pairs in response order.
    pub fn headers(&self) -> [(&'static str, &str); 2] {
        [
            ("Content-Type", self.content_type),
            ("Cache-Control", &self.cache_control),
        ]
    }
}

/// Shared-cache TTL plus a longer stale-while-revalidate window.
pub fn cache_control(s_maxage: u32, stale_while_revalidate: u32) -> String {
    format!("public, s-maxage={s_maxage}, stale-while-revalidate={stale_while_revalidate}")
}

pub fn rss_response(
    items: &[ListItem],
    channel: &Channel,
    s_maxage: u32,
    stale_while_revalidate: u32,
) -> FeedResponse {
    FeedResponse {
        status: 200,
        content_type: CONTENT_TYPE,
        cache_control: cache_control(s_maxage, stale_while_revalidate),
        body: render_feed(items, channel, Utc::now()),
    }
}

/// Parse a front matter date.
///
/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM:SS` (UTC), `YYYY-MM-DD` (midnight
/// UTC) and RFC 2822.
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }
    DateTime::parse_from_rfc2822(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Wrap `text` in CDATA, splitting any `]]>` it contains.
pub fn cdata(text: &str) -> String {
    format!("<![CDATA[{}]]>", text.replace("]]>", "]]]]><![CDATA[>"))
}

/// Escape text for use in XML character data.
fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn item_link(blog_base: &str, slug: &str) -> String {
    format!("{}/{}", blog_base.trim_end_matches('/'), slug)
}

/// Render an RSS 2.0 document with one `<item>` per entry of `items`.
///
/// `now` is used for `<lastBuildDate>` only when no item has a usable date.
pub fn render_feed(items: &[ListItem], channel: &Channel, now: DateTime<Utc>) -> String {
    let last_build = items
        .iter()
        .filter_map(|item| parse_date(&item.date))
        .max()
        .unwrap_or(now);

    let mut xml = String::new();
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str("<rss version=\"2.0\">\n");
    xml.push_str("  <channel>\n");
    let _ = writeln!(xml, "    <title>{}</title>", cdata(&channel.title));
    let _ = writeln!(xml, "    <link>{}</link>", xml_escape(&channel.site_url));
    let _ = writeln!(
        xml,
        "    <description>{}</description>",
        cdata(&channel.description)
    );
    xml.push_str("    <language>en</language>\n");
    let _ = writeln!(
        xml,
        "    <lastBuildDate>{}</lastBuildDate>",
        last_build.to_rfc2822()
    );

    for item in items {
        let link = xml_escape(&item_link(&channel.blog_base, &item.slug));
        xml.push_str("    <item>\n");
        let _ = writeln!(xml, "      <title>{}</title>", cdata(&item.title));
        let _ = writeln!(xml, "      <link>{link}</link>");
        let _ = writeln!(xml, "      <guid isPermaLink=\"true\">{link}</guid>");
        if let Some(date) = parse_date(&item.date) {
            let _ = writeln!(xml, "      <pubDate>{}</pubDate>", date.to_rfc2822());
        }
        if let Some(excerpt) = item.excerpt.as_deref().filter(|e| !e.is_empty()) {
            let _ = writeln!(xml, "      <description>{}</description>", cdata(excerpt));
        }
        xml.push_str("    </item>\n");
    }

    xml.push_str("  </channel>\n");
    xml.push_str("</rss>\n");
    xml
}
