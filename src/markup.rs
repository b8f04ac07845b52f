//! Document trees for post bodies.
//!
//! A body is parsed with pulldown-cmark into a small element tree
//! ([`Node`]) rather than straight to HTML, so that [`sanitize`] can inspect
//! every element and attribute before anything is serialized. HTML embedded
//! in the Markdown source does not get parsed into elements; it arrives as
//! [`Node::Raw`] and is left for the sanitizer to neutralize.
//!
//! ```text
//! body ──parse_body──▶ Node ──sanitize──▶ Node ──render_html──▶ HTML
//! ```
//!
//! [`sanitize`]: crate::sanitize::sanitize

use maud::html;
use pulldown_cmark::{
    Alignment, CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd,
};
use std::collections::BTreeMap;

/// Attribute map of an element. Ordered so rendering is deterministic.
pub type Properties = BTreeMap<String, PropValue>;

#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
    Str(String),
    List(Vec<String>),
    Number(f64),
    Bool(bool),
}

impl From<&str> for PropValue {
    fn from(s: &str) -> Self {
        PropValue::Str(s.to_string())
    }
}

impl From<String> for PropValue {
    fn from(s: String) -> Self {
        PropValue::Str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Root(Vec<Node>),
    Element(Element),
    Text(String),
    /// Markup that bypassed structural parsing.
    Raw(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag_name: String,
    pub properties: Properties,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(tag_name: &str) -> Self {
        Self {
            tag_name: tag_name.to_string(),
            properties: Properties::new(),
            children: Vec::new(),
        }
    }

    pub fn prop(mut self, key: &str, value: impl Into<PropValue>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    pub fn child(mut self, node: Node) -> Self {
        self.children.push(node);
        self
    }
}

impl Node {
    pub fn text(value: &str) -> Self {
        Node::Text(value.to_string())
    }

    pub fn children(&self) -> &[Node] {
        match self {
            Node::Root(children) => children,
            Node::Element(el) => &el.children,
            Node::Text(_) | Node::Raw(_) => &[],
        }
    }

    /// Concatenated text of this node and its descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }
}

fn collect_text(node: &Node, out: &mut String) {
    match node {
        Node::Text(t) | Node::Raw(t) => out.push_str(t),
        _ => node.children().iter().for_each(|c| collect_text(c, out)),
    }
}

/// Elements that never have content or a closing tag.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

pub fn is_void(tag_name: &str) -> bool {
    VOID_ELEMENTS.contains(&tag_name)
}

// ============================================================================
// Markdown → tree
// ============================================================================

/// An open element while building the tree.
///
/// `element: None` frames are transparent: their children are spliced into
/// the parent when the frame closes (HTML blocks, unsupported containers).
struct Frame {
    element: Option<Element>,
    /// Parent element to wrap this one in on close (`pre` around `code`).
    wrap: Option<&'static str>,
    /// Collapse children into an `alt` attribute (images).
    alt_from_children: bool,
    children: Vec<Node>,
}

impl Frame {
    fn element(element: Element) -> Self {
        Self {
            element: Some(element),
            wrap: None,
            alt_from_children: false,
            children: Vec::new(),
        }
    }

    fn transparent() -> Self {
        Self {
            element: None,
            wrap: None,
            alt_from_children: false,
            children: Vec::new(),
        }
    }

    fn close(self) -> Vec<Node> {
        let Some(mut element) = self.element else {
            return self.children;
        };
        if self.alt_from_children {
            let alt = Node::Root(self.children).text_content();
            element.properties.insert("alt".into(), PropValue::Str(alt));
        } else {
            element.children = self.children;
        }
        let node = match self.wrap {
            Some(outer) => Node::Element(Element::new(outer).child(Node::Element(element))),
            None => Node::Element(element),
        };
        vec![node]
    }
}

#[derive(Default)]
struct TableState {
    alignments: Vec<Alignment>,
    in_head: bool,
    cell: usize,
}

fn markdown_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_HEADING_ATTRIBUTES
}

/// Parse a Markdown/MDX body into a [`Node::Root`].
pub fn parse_body(markdown: &str) -> Node {
    let mut stack = vec![Frame::transparent()];
    let mut table = TableState::default();

    for event in Parser::new_ext(markdown, markdown_options()) {
        match event {
            Event::Start(tag) => {
                let frame = open_frame(tag, &mut table);
                stack.push(frame);
            }
            Event::End(end) => {
                if matches!(end, TagEnd::TableHead) {
                    table.in_head = false;
                }
                if stack.len() > 1
                    && let Some(frame) = stack.pop()
                {
                    let nodes = frame.close();
                    push_all(&mut stack, nodes);
                }
            }
            Event::Text(text) => push(&mut stack, Node::text(&text)),
            Event::Code(code) => push(
                &mut stack,
                Node::Element(Element::new("code").child(Node::text(&code))),
            ),
            Event::Html(raw) | Event::InlineHtml(raw) => push(&mut stack, Node::Raw(raw.to_string())),
            Event::FootnoteReference(label) => {
                let link = Element::new("a")
                    .prop("href", format!("#fn-{label}"))
                    .child(Node::text(&label));
                push(
                    &mut stack,
                    Node::Element(
                        Element::new("sup")
                            .prop("class", "footnote-reference")
                            .child(Node::Element(link)),
                    ),
                );
            }
            Event::SoftBreak => push(&mut stack, Node::text("\n")),
            Event::HardBreak => push(&mut stack, Node::Element(Element::new("br"))),
            Event::Rule => push(&mut stack, Node::Element(Element::new("hr"))),
            Event::TaskListMarker(checked) => push(
                &mut stack,
                Node::Element(
                    Element::new("span")
                        .prop("class", "task-list-marker")
                        .prop("data-checked", if checked { "true" } else { "false" })
                        .child(Node::text(if checked { "☑ " } else { "☐ " })),
                ),
            ),
            _ => {}
        }
    }

    // Unbalanced input still yields everything that was parsed.
    while stack.len() > 1 {
        if let Some(frame) = stack.pop() {
            let nodes = frame.close();
            push_all(&mut stack, nodes);
        }
    }
    let root = stack.pop().map(|f| f.children).unwrap_or_default();
    Node::Root(root)
}

fn push(stack: &mut [Frame], node: Node) {
    if let Some(top) = stack.last_mut() {
        top.children.push(node);
    }
}

fn push_all(stack: &mut [Frame], nodes: Vec<Node>) {
    if let Some(top) = stack.last_mut() {
        top.children.extend(nodes);
    }
}

fn open_frame(tag: Tag<'_>, table: &mut TableState) -> Frame {
    match tag {
        Tag::Paragraph => Frame::element(Element::new("p")),
        Tag::Heading {
            level, id, classes, ..
        } => {
            let mut el = Element::new(heading_tag(level));
            if let Some(id) = id {
                el = el.prop("id", id.to_string());
            }
            if !classes.is_empty() {
                let classes = classes.iter().map(|c| c.to_string()).collect();
                el.properties.insert("class".into(), PropValue::List(classes));
            }
            Frame::element(el)
        }
        Tag::BlockQuote(_) => Frame::element(Element::new("blockquote")),
        Tag::CodeBlock(kind) => {
            let mut code = Element::new("code");
            if let CodeBlockKind::Fenced(info) = kind
                && let Some(lang) = info.split_whitespace().next()
            {
                code = code.prop("class", format!("language-{lang}"));
            }
            Frame {
                wrap: Some("pre"),
                ..Frame::element(code)
            }
        }
        Tag::List(Some(start)) => {
            let mut ol = Element::new("ol");
            if start != 1 {
                ol.properties
                    .insert("start".into(), PropValue::Number(start as f64));
            }
            Frame::element(ol)
        }
        Tag::List(None) => Frame::element(Element::new("ul")),
        Tag::Item => Frame::element(Element::new("li")),
        Tag::FootnoteDefinition(label) => Frame::element(
            Element::new("div")
                .prop("class", "footnote-definition")
                .prop("id", format!("fn-{label}"))
                .child(Node::Element(
                    Element::new("sup")
                        .prop("class", "footnote-definition-label")
                        .child(Node::text(&label)),
                )),
        )
        .with_existing_children(),
        Tag::Table(alignments) => {
            table.alignments = alignments;
            Frame::element(Element::new("table"))
        }
        Tag::TableHead => {
            table.in_head = true;
            table.cell = 0;
            Frame {
                wrap: Some("thead"),
                ..Frame::element(Element::new("tr"))
            }
        }
        Tag::TableRow => {
            table.cell = 0;
            Frame::element(Element::new("tr"))
        }
        Tag::TableCell => {
            let mut cell = Element::new(if table.in_head { "th" } else { "td" });
            let align = match table.alignments.get(table.cell) {
                Some(Alignment::Left) => Some("left"),
                Some(Alignment::Center) => Some("center"),
                Some(Alignment::Right) => Some("right"),
                _ => None,
            };
            if let Some(align) = align {
                cell = cell.prop("style", format!("text-align: {align}"));
            }
            table.cell += 1;
            Frame::element(cell)
        }
        Tag::Emphasis => Frame::element(Element::new("em")),
        Tag::Strong => Frame::element(Element::new("strong")),
        Tag::Strikethrough => Frame::element(Element::new("del")),
        Tag::Link {
            dest_url, title, ..
        } => {
            let mut a = Element::new("a").prop("href", dest_url.to_string());
            if !title.is_empty() {
                a = a.prop("title", title.to_string());
            }
            Frame::element(a)
        }
        Tag::Image {
            dest_url, title, ..
        } => {
            let mut img = Element::new("img").prop("src", dest_url.to_string());
            if !title.is_empty() {
                img = img.prop("title", title.to_string());
            }
            Frame {
                alt_from_children: true,
                ..Frame::element(img)
            }
        }
        _ => Frame::transparent(),
    }
}

impl Frame {
    /// Move children preset on the element into the frame so that parsed
    /// content is appended after them.
    fn with_existing_children(mut self) -> Self {
        if let Some(el) = self.element.as_mut() {
            self.children = std::mem::take(&mut el.children);
        }
        self
    }
}

fn heading_tag(level: HeadingLevel) -> &'static str {
    match level {
        HeadingLevel::H1 => "h1",
        HeadingLevel::H2 => "h2",
        HeadingLevel::H3 => "h3",
        HeadingLevel::H4 => "h4",
        HeadingLevel::H5 => "h5",
        HeadingLevel::H6 => "h6",
    }
}

// ============================================================================
// Tree → HTML
// ============================================================================

/// Serialize a tree to HTML.
///
/// Text and attribute values are escaped. [`Node::Raw`] is written verbatim,
/// so only sanitized trees should ever reach a page.
pub fn render_html(node: &Node) -> String {
    let mut out = String::new();
    write_node(node, &mut out);
    out
}

/// Parse, sanitize and serialize a post body in one go.
pub fn render_post_body(markdown: &str) -> String {
    let mut tree = parse_body(markdown);
    crate::sanitize::sanitize(&mut tree);
    render_html(&tree)
}

fn escape(text: &str) -> String {
    html! { (text) }.into_string()
}

fn write_node(node: &Node, out: &mut String) {
    match node {
        Node::Root(children) => children.iter().for_each(|c| write_node(c, out)),
        Node::Text(text) => out.push_str(&escape(text)),
        Node::Raw(raw) => out.push_str(raw),
        Node::Element(el) => {
            out.push('<');
            out.push_str(&el.tag_name);
            for (key, value) in &el.properties {
                write_attribute(key, value, out);
            }
            out.push('>');
            if is_void(&el.tag_name) {
                return;
            }
            el.children.iter().for_each(|c| write_node(c, out));
            out.push_str("</");
            out.push_str(&el.tag_name);
            out.push('>');
        }
    }
}

fn write_attribute(key: &str, value: &PropValue, out: &mut String) {
    if !is_attribute_name(key) {
        return;
    }
    let rendered = match value {
        PropValue::Str(s) => s.clone(),
        PropValue::List(items) => items.join(" "),
        PropValue::Number(n) => n.to_string(),
        PropValue::Bool(false) => return,
        PropValue::Bool(true) => {
            out.push(' ');
            out.push_str(&attribute_name(key));
            return;
        }
    };
    out.push(' ');
    out.push_str(&attribute_name(key));
    out.push_str("=\"");
    out.push_str(&escape(&rendered));
    out.push('"');
}

/// Names that cannot break out of the tag: no whitespace, quotes, `/`, `=`,
/// `<`, `>` or control characters.
fn is_attribute_name(key: &str) -> bool {
    !key.is_empty()
        && key.chars().all(|c| {
            !c.is_whitespace()
                && !c.is_control()
                && !matches!(c, '"' | '\'' | '/' | '=' | '<' | '>')
        })
}

/// Map property names to HTML attribute names (`className` → `class`,
/// `dataFooBar` → `data-foo-bar`).
fn attribute_name(key: &str) -> String {
    if key == "className" {
        return "class".to_string();
    }
    for prefix in ["data", "aria"] {
        if let Some(rest) = key.strip_prefix(prefix)
            && rest.starts_with(|c: char| c.is_ascii_uppercase())
        {
            let mut name = prefix.to_string();
            for c in rest.chars() {
                if c.is_ascii_uppercase() {
                    name.push('-');
                    name.push(c.to_ascii_lowercase());
                } else {
                    name.push(c);
                }
            }
            return name;
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_element(node: &Node) -> &Element {
        match &node.children()[0] {
            Node::Element(el) => el,
            other => panic!("expected element, got {other:?}"),
        }
    }

    #[test]
    fn paragraph_with_emphasis() {
        let tree = parse_body("Mix *well* before **pouring**.");
        assert_eq!(
            render_html(&tree),
            "<p>Mix <em>well</em> before <strong>pouring</strong>.</p>"
        );
    }

    #[test]
    fn fenced_code_gets_language_class_inside_pre() {
        let tree = parse_body("```rust\nlet x = 1;\n```\n");
        assert_eq!(
            render_html(&tree),
            "<pre><code class=\"language-rust\">let x = 1;\n</code></pre>"
        );
    }

    #[test]
    fn inline_html_becomes_raw() {
        let tree = parse_body("Hello <b>there</b>");
        let p = first_element(&tree);
        assert!(p.children.iter().any(|c| matches!(c, Node::Raw(r) if r == "<b>")));
    }

    #[test]
    fn html_block_becomes_raw_at_top_level() {
        let tree = parse_body("<script>alert(1)</script>\n");
        assert!(
            tree.children()
                .iter()
                .all(|c| matches!(c, Node::Raw(_)))
        );
        assert!(tree.text_content().contains("alert(1)"));
    }

    #[test]
    fn image_alt_collected_from_text() {
        let tree = parse_body("![a *wet* slab](/img/slab.jpg)");
        let p = first_element(&tree);
        let Node::Element(img) = &p.children[0] else {
            panic!("expected img");
        };
        assert_eq!(img.tag_name, "img");
        assert_eq!(img.properties["alt"], PropValue::from("a wet slab"));
        assert!(img.children.is_empty());
        assert_eq!(
            render_html(&tree),
            "<p><img alt=\"a wet slab\" src=\"/img/slab.jpg\"></p>"
        );
    }

    #[test]
    fn table_head_cells_are_th() {
        let tree = parse_body("| Size | Bags |\n|:-----|-----:|\n| 4x4 | 3 |\n");
        let html = render_html(&tree);
        assert!(html.starts_with("<table><thead><tr><th style=\"text-align: left\">Size</th>"));
        assert!(html.contains("<td style=\"text-align: right\">3</td>"));
    }

    #[test]
    fn ordered_list_keeps_start() {
        let tree = parse_body("3. three\n4. four\n");
        assert!(render_html(&tree).starts_with("<ol start=\"3\"><li>three</li>"));
    }

    #[test]
    fn text_is_escaped() {
        let tree = Node::Root(vec![Node::text("a < b & \"c\"")]);
        assert_eq!(render_html(&tree), "a &lt; b &amp; &quot;c&quot;");
    }

    #[test]
    fn void_elements_have_no_closing_tag() {
        let tree = Node::Element(Element::new("br").child(Node::text("ignored")));
        assert_eq!(render_html(&tree), "<br>");
    }

    #[test]
    fn camel_case_properties_render_as_attributes() {
        let el = Element::new("span")
            .prop("className", "note")
            .prop("dataTooltipId", "t1")
            .prop("ariaLabel", "Note");
        assert_eq!(
            render_html(&Node::Element(el)),
            "<span aria-label=\"Note\" class=\"note\" data-tooltip-id=\"t1\"></span>"
        );
    }

    #[test]
    fn attribute_names_that_break_out_of_the_tag_are_not_written() {
        let el = Element::new("span")
            .prop("data-x onmouseover=alert(1) y", "z")
            .prop("id\"", "z")
            .prop("title", "kept");
        assert_eq!(
            render_html(&Node::Element(el)),
            "<span title=\"kept\"></span>"
        );
    }

    #[test]
    fn footnote_definition_keeps_label_first() {
        let tree = parse_body("See[^1].\n\n[^1]: The note.\n");
        let html = render_html(&tree);
        assert!(html.contains("<sup class=\"footnote-reference\"><a href=\"#fn-1\">1</a></sup>"));
        assert!(html.contains(
            "<div class=\"footnote-definition\" id=\"fn-1\"><sup class=\"footnote-definition-label\">1</sup><p>The note.</p></div>"
        ));
    }

    #[test]
    fn post_body_is_sanitized_before_rendering() {
        let html = render_post_body("Pour *slowly*.\n\n<script>alert(1)</script>\n");
        assert!(html.starts_with("<p>Pour <em>slowly</em>.</p>"));
        assert!(!html.contains("<script"));
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
    }
}
