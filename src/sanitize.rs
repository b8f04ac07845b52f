//! Allowlist sanitizer for post body trees.
//!
//! Post bodies are authored content, but they may embed raw HTML, and
//! nothing in them is trusted when rendered. [`sanitize`] rewrites a parsed
//! [`Node`] tree in place so that only known elements and attributes
//! survive:
//!
//! - Elements outside [`ALLOWED_TAGS`] are removed together with their
//!   subtree. A disallowed root leaves an empty [`Node::Root`].
//! - [`Node::Raw`] becomes [`Node::Text`] with the same value: still
//!   visible, no longer markup.
//! - Attributes starting with `on` are always removed. That check runs
//!   before any allowlist and no per-tag rule can bring them back.
//! - `data-*`/`aria-*` attributes with plain names, the global allowlist
//!   and the per-tag allowlist are kept; everything else is removed.
//!   `className` is folded into `class`.
//! - `href`, `src` and `srcset` are checked against scheme allowlists.
//!
//! Anything not recognized is discarded, never flagged. Running the
//! sanitizer on its own output changes nothing.

use crate::markup::{Element, Node, PropValue, Properties};

/// Structural, text, table and basic MathML elements.
pub const ALLOWED_TAGS: &[&str] = &[
    // structure
    "article", "aside", "details", "div", "figcaption", "figure", "footer", "header",
    "section", "summary",
    // text
    "a", "abbr", "b", "blockquote", "br", "cite", "code", "dd", "del", "dfn", "dl", "dt",
    "em", "h1", "h2", "h3", "h4", "h5", "h6", "hr", "i", "img", "ins", "kbd", "li", "mark",
    "ol", "p", "pre", "q", "s", "samp", "small", "span", "strong", "sub", "sup", "time", "u",
    "ul", "var",
    // tables
    "caption", "col", "colgroup", "table", "tbody", "td", "tfoot", "th", "thead", "tr",
    // math
    "math", "mfrac", "mi", "mn", "mo", "mrow", "msqrt", "msub", "msubsup", "msup", "mtext",
    "semantics", "annotation",
];

/// Attributes kept on any allowed element.
const GLOBAL_ATTRIBUTES: &[&str] = &[
    "class",
    "className",
    "id",
    "style",
    "title",
    "tabindex",
    "tabIndex",
    "role",
    "dir",
];

const HREF_SCHEMES: &[&str] = &["http", "https", "mailto", "tel", "sms"];
const SRC_SCHEMES: &[&str] = &["http", "https", "data"];

/// Attributes kept only on specific elements.
fn tag_attributes(tag_name: &str) -> &'static [&'static str] {
    match tag_name {
        "a" => &["href", "rel", "target"],
        "img" => &["src", "alt", "width", "height", "srcset", "sizes", "loading", "decoding"],
        "td" | "th" => &["colspan", "colSpan", "rowspan", "rowSpan", "scope", "align"],
        "col" | "colgroup" => &["span"],
        "ol" => &["start", "reversed", "type"],
        "li" => &["value"],
        "details" => &["open"],
        "time" => &["datetime", "dateTime"],
        "math" => &["display"],
        _ => &[],
    }
}

/// Sanitize `tree` in place.
pub fn sanitize(tree: &mut Node) {
    match tree {
        Node::Root(children) => sanitize_children(children),
        Node::Element(el) if !is_allowed_tag(&el.tag_name) => *tree = Node::Root(Vec::new()),
        Node::Element(el) => sanitize_element(el),
        Node::Raw(value) => {
            let text = std::mem::take(value);
            *tree = Node::Text(text);
        }
        Node::Text(_) => {}
    }
}

fn sanitize_children(children: &mut Vec<Node>) {
    children.retain_mut(|child| match child {
        Node::Element(el) => {
            if !is_allowed_tag(&el.tag_name) {
                return false;
            }
            sanitize_element(el);
            true
        }
        Node::Raw(value) => {
            let text = std::mem::take(value);
            *child = Node::Text(text);
            true
        }
        Node::Root(grandchildren) => {
            sanitize_children(grandchildren);
            true
        }
        Node::Text(_) => true,
    });
}

fn sanitize_element(el: &mut Element) {
    sanitize_children(&mut el.children);
    let tag_name = el.tag_name.as_str();
    el.properties = sanitize_properties(tag_name, std::mem::take(&mut el.properties));
}

fn is_allowed_tag(tag_name: &str) -> bool {
    ALLOWED_TAGS.contains(&tag_name)
}

fn sanitize_properties(tag_name: &str, properties: Properties) -> Properties {
    let mut kept: Properties = properties
        .into_iter()
        .filter_map(|(key, value)| {
            let value = sanitize_property(tag_name, &key, value)?;
            Some((key, value))
        })
        .collect();
    merge_class_names(&mut kept);
    kept
}

/// `class` and `className` render to the same attribute; keep one.
fn merge_class_names(properties: &mut Properties) {
    let Some(PropValue::Str(extra)) = properties.remove("className") else {
        return;
    };
    let merged = match properties.remove("class") {
        Some(PropValue::Str(class)) if !class.is_empty() && !extra.is_empty() => {
            format!("{class} {extra}")
        }
        Some(PropValue::Str(class)) if extra.is_empty() => class,
        _ => extra,
    };
    properties.insert("class".to_string(), PropValue::Str(merged));
}

fn sanitize_property(tag_name: &str, key: &str, value: PropValue) -> Option<PropValue> {
    if is_event_handler(key) {
        return None;
    }
    if is_data_or_aria(key) {
        return Some(value);
    }
    let allowed = GLOBAL_ATTRIBUTES.contains(&key) || tag_attributes(tag_name).contains(&key);
    if !allowed {
        return None;
    }
    match key {
        "class" | "className" => normalize_class(value),
        "href" => string_value(value).filter(|url| is_safe_href(url)),
        "src" => string_value(value).filter(|url| is_safe_src(url)),
        "srcset" => string_value(value).filter(|set| is_safe_srcset(set)),
        _ => Some(value),
    }
}

fn is_event_handler(key: &str) -> bool {
    key.get(..2).is_some_and(|prefix| prefix.eq_ignore_ascii_case("on"))
}

/// `data-foo`/`aria-foo` with a plain name, or camel-case `dataFoo`.
fn is_data_or_aria(key: &str) -> bool {
    ["data", "aria"].iter().any(|prefix| {
        key.strip_prefix(prefix).is_some_and(|rest| {
            if let Some(name) = rest.strip_prefix('-') {
                !name.is_empty()
                    && name
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | ':' | '-'))
            } else {
                rest.starts_with(|c: char| c.is_ascii_uppercase())
                    && rest.chars().all(|c| c.is_ascii_alphanumeric())
            }
        })
    })
}

fn normalize_class(value: PropValue) -> Option<PropValue> {
    match value {
        PropValue::Str(s) => Some(PropValue::Str(s)),
        PropValue::List(items) => {
            let joined = items
                .iter()
                .map(|c| c.trim())
                .filter(|c| !c.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            Some(PropValue::Str(joined))
        }
        PropValue::Number(_) | PropValue::Bool(_) => None,
    }
}

fn string_value(value: PropValue) -> Option<PropValue> {
    match value {
        PropValue::Str(s) => Some(PropValue::Str(s)),
        _ => None,
    }
}

/// Strip characters browsers ignore inside a scheme (`java\tscript:`).
fn squash(url: &str) -> String {
    url.chars()
        .filter(|c| !c.is_ascii_whitespace() && !c.is_ascii_control())
        .collect()
}

/// The URL's scheme, if it has one. A `:` after the first `/`, `?` or `#`
/// is part of the path, not a scheme separator.
fn scheme_of(url: &str) -> Option<&str> {
    let end = url.find([':', '/', '?', '#'])?;
    if url.as_bytes()[end] != b':' {
        return None;
    }
    Some(&url[..end])
}

fn has_allowed_scheme(url: &str, schemes: &[&str]) -> bool {
    scheme_of(url).is_some_and(|scheme| schemes.iter().any(|s| s.eq_ignore_ascii_case(scheme)))
}

fn is_safe_href(url: &PropValue) -> bool {
    let PropValue::Str(url) = url else {
        return false;
    };
    let url = squash(url);
    if url.starts_with(['/', '#', '?']) {
        return true;
    }
    match scheme_of(&url) {
        None => true,
        Some(_) => has_allowed_scheme(&url, HREF_SCHEMES),
    }
}

fn is_safe_src_url(url: &str) -> bool {
    let url = squash(url);
    url.starts_with('/') || has_allowed_scheme(&url, SRC_SCHEMES)
}

fn is_safe_src(url: &PropValue) -> bool {
    matches!(url, PropValue::Str(url) if is_safe_src_url(url))
}

/// Every candidate URL in a `srcset` must be a safe `src`.
fn is_safe_srcset(set: &PropValue) -> bool {
    let PropValue::Str(set) = set else {
        return false;
    };
    set.split(',')
        .map(str::trim)
        .filter(|candidate| !candidate.is_empty())
        .all(|candidate| {
            let url = candidate.split_whitespace().next().unwrap_or_default();
            is_safe_src_url(url)
        })
}
