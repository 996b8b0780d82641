//! Portable Text body model and HTML rendering

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use super::ImageRef;
use crate::helpers::html_escape;
use crate::image::ImageResolver;

/// A single node of a Portable Text body
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    /// Text block (paragraph, heading, quote or list item)
    Text(TextBlock),
    /// Inline image
    Image(ImageBlock),
    /// Any block kind this renderer has no rule for
    Unknown { kind: String, raw: Value },
}

impl Block {
    /// The `_type` of the block
    pub fn kind(&self) -> &str {
        match self {
            Block::Text(_) => "block",
            Block::Image(_) => "image",
            Block::Unknown { kind, .. } => kind,
        }
    }
}

impl<'de> Deserialize<'de> for Block {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        let kind = raw
            .get("_type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        // Malformed known blocks (such as an image with no asset yet) fall
        // back to the generic rendering instead of failing the whole post
        let parsed = match kind.as_str() {
            "block" => serde_json::from_value(raw.clone()).map(Block::Text),
            "image" => serde_json::from_value(raw.clone()).map(Block::Image),
            _ => return Ok(Block::Unknown { kind, raw }),
        };
        Ok(parsed.unwrap_or_else(|e| {
            tracing::debug!("Malformed {:?} block treated as unknown: {}", kind, e);
            Block::Unknown { kind, raw }
        }))
    }
}

impl Serialize for Block {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::Error as _;

        let mut value = match self {
            Block::Text(block) => serde_json::to_value(block).map_err(S::Error::custom)?,
            Block::Image(block) => serde_json::to_value(block).map_err(S::Error::custom)?,
            Block::Unknown { raw, .. } => return raw.serialize(serializer),
        };
        if let Value::Object(map) = &mut value {
            map.insert("_type".to_string(), Value::String(self.kind().to_string()));
        }
        value.serialize(serializer)
    }
}

/// Text block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    #[serde(rename = "_key", default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default = "default_style")]
    pub style: String,
    #[serde(default)]
    pub children: Vec<Span>,
    #[serde(rename = "markDefs", default)]
    pub mark_defs: Vec<MarkDef>,
    #[serde(rename = "listItem", default, skip_serializing_if = "Option::is_none")]
    pub list_item: Option<ListKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<usize>,
}

fn default_style() -> String {
    "normal".to_string()
}

/// List flavour of a list-item block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListKind {
    Bullet,
    Number,
    #[serde(other)]
    Other,
}

impl ListKind {
    fn tag(self) -> &'static str {
        match self {
            ListKind::Number => "ol",
            ListKind::Bullet | ListKind::Other => "ul",
        }
    }
}

/// Run of text with a uniform set of marks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    #[serde(default)]
    pub text: String,
    /// Decorator names or keys into the block's `markDefs`
    #[serde(default)]
    pub marks: Vec<String>,
}

/// Annotation definition referenced from span marks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkDef {
    #[serde(rename = "_key")]
    pub key: String,
    #[serde(rename = "_type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

/// Image block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageBlock {
    #[serde(flatten)]
    pub image: ImageRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

/// Renders a Portable Text body to HTML
///
/// Rendering never fails: unknown block kinds, unknown marks and images
/// with unusable references degrade to placeholders or plain text.
pub struct PortableTextRenderer<'a> {
    images: &'a ImageResolver,
}

impl<'a> PortableTextRenderer<'a> {
    pub fn new(images: &'a ImageResolver) -> Self {
        Self { images }
    }

    /// Render a sequence of blocks
    pub fn render(&self, blocks: &[Block]) -> String {
        let mut html = String::new();
        // Open lists as (kind, has an unclosed <li>)
        let mut lists: Vec<(ListKind, bool)> = Vec::new();

        for block in blocks {
            match block {
                Block::Text(text) if text.list_item.is_some() => {
                    let kind = text.list_item.unwrap_or(ListKind::Bullet);
                    let level = text.level.unwrap_or(1).max(1);
                    self.open_list_item(&mut html, &mut lists, kind, level);
                    html.push_str(r#"<li class="ml-4 list-disc">"#);
                    html.push_str(&self.render_spans(text));
                    if let Some(top) = lists.last_mut() {
                        top.1 = true;
                    }
                }
                _ => {
                    close_lists(&mut html, &mut lists, 0);
                    html.push_str(&self.render_block(block));
                }
            }
        }

        close_lists(&mut html, &mut lists, 0);
        html
    }

    fn open_list_item(
        &self,
        html: &mut String,
        lists: &mut Vec<(ListKind, bool)>,
        kind: ListKind,
        level: usize,
    ) {
        close_lists(html, lists, level);

        if lists.len() == level {
            let (current, item_open) = lists[level - 1];
            if current != kind {
                close_lists(html, lists, level - 1);
            } else if item_open {
                html.push_str("</li>");
                lists[level - 1].1 = false;
            }
        }

        while lists.len() < level {
            html.push_str(&format!("<{}>", kind.tag()));
            lists.push((kind, false));
        }
    }

    fn render_block(&self, block: &Block) -> String {
        match block {
            Block::Text(text) => {
                let inner = self.render_spans(text);
                match text.style.as_str() {
                    "h1" => format!(r#"<h1 class="text-2xl font-bold my-5">{}</h1>"#, inner),
                    "h2" => format!(r#"<h2 class="text-xl font-bold my-5">{}</h2>"#, inner),
                    style @ ("h3" | "h4" | "h5" | "h6") => {
                        format!("<{}>{}</{}>", style, inner, style)
                    }
                    "blockquote" => format!("<blockquote>{}</blockquote>", inner),
                    _ => format!("<p>{}</p>", inner),
                }
            }
            Block::Image(block) => match self.images.builder(&block.image) {
                Ok(builder) => {
                    let alt = block.image.alt.as_deref().unwrap_or("");
                    let img = format!(
                        r#"<img class="my-5" src="{}" alt="{}">"#,
                        html_escape(&builder.width(1200).auto_format().url()),
                        html_escape(alt)
                    );
                    match &block.caption {
                        Some(caption) => format!(
                            "<figure>{}<figcaption>{}</figcaption></figure>",
                            img,
                            html_escape(caption)
                        ),
                        None => img,
                    }
                }
                Err(e) => {
                    tracing::warn!("Skipping body image: {}", e);
                    String::new()
                }
            },
            Block::Unknown { kind, .. } => {
                tracing::debug!("No rendering rule for block type {:?}", kind);
                format!(r#"<div data-block-type="{}"></div>"#, html_escape(kind))
            }
        }
    }

    fn render_spans(&self, block: &TextBlock) -> String {
        let mut html = String::new();
        for span in &block.children {
            let mut out = html_escape(&span.text).replace('\n', "<br>");
            for mark in &span.marks {
                out = wrap_mark(&out, mark, &block.mark_defs);
            }
            html.push_str(&out);
        }
        html
    }
}

/// Close open lists until only `depth` remain
fn close_lists(html: &mut String, lists: &mut Vec<(ListKind, bool)>, depth: usize) {
    while lists.len() > depth {
        if let Some((kind, item_open)) = lists.pop() {
            if item_open {
                html.push_str("</li>");
            }
            html.push_str(&format!("</{}>", kind.tag()));
        }
    }
}

fn wrap_mark(inner: &str, mark: &str, defs: &[MarkDef]) -> String {
    match mark {
        "strong" => format!("<strong>{}</strong>", inner),
        "em" => format!("<em>{}</em>", inner),
        "code" => format!("<code>{}</code>", inner),
        "underline" => format!(r#"<span class="underline">{}</span>"#, inner),
        "strike-through" => format!("<del>{}</del>", inner),
        key => match defs.iter().find(|d| d.key == key) {
            Some(def) if def.kind == "link" => match def.href.as_deref().filter(|h| is_safe_href(h)) {
                Some(href) => format!(
                    r#"<a href="{}" class="text-blue-500 hover:underline">{}</a>"#,
                    html_escape(href),
                    inner
                ),
                None => inner.to_string(),
            },
            _ => inner.to_string(),
        },
    }
}

fn is_safe_href(href: &str) -> bool {
    let lower = href.trim().to_ascii_lowercase();
    lower.starts_with("http://")
        || lower.starts_with("https://")
        || lower.starts_with("mailto:")
        || lower.starts_with('/')
        || lower.starts_with('#')
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render(body: Value) -> String {
        let blocks: Vec<Block> = serde_json::from_value(body).unwrap();
        let resolver = ImageResolver::new("proj", "production");
        PortableTextRenderer::new(&resolver).render(&blocks)
    }

    fn text(style: &str, value: &str) -> Value {
        json!({ "_type": "block", "style": style, "children": [{ "_type": "span", "text": value, "marks": [] }], "markDefs": [] })
    }

    fn item(kind: &str, level: usize, value: &str) -> Value {
        json!({ "_type": "block", "style": "normal", "listItem": kind, "level": level,
                "children": [{ "_type": "span", "text": value }] })
    }

    #[test]
    fn test_headings_and_paragraphs() {
        let html = render(json!([text("h1", "Title"), text("h2", "Sub"), text("normal", "Body")]));
        assert_eq!(
            html,
            r#"<h1 class="text-2xl font-bold my-5">Title</h1><h2 class="text-xl font-bold my-5">Sub</h2><p>Body</p>"#
        );
    }

    #[test]
    fn test_text_is_escaped() {
        let html = render(json!([text("normal", "<script>alert(1)</script>")]));
        assert_eq!(html, "<p>&lt;script&gt;alert(1)&lt;/script&gt;</p>");
    }

    #[test]
    fn test_link_annotation() {
        let html = render(json!([{
            "_type": "block",
            "style": "normal",
            "markDefs": [{ "_key": "k1", "_type": "link", "href": "https://example.com" }],
            "children": [
                { "_type": "span", "text": "see ", "marks": [] },
                { "_type": "span", "text": "here", "marks": ["k1", "strong"] }
            ]
        }]));
        assert_eq!(
            html,
            r#"<p>see <strong><a href="https://example.com" class="text-blue-500 hover:underline">here</a></strong></p>"#
        );
    }

    #[test]
    fn test_unsafe_link_is_dropped() {
        let html = render(json!([{
            "_type": "block",
            "markDefs": [{ "_key": "k1", "_type": "link", "href": "javascript:alert(1)" }],
            "children": [{ "_type": "span", "text": "click", "marks": ["k1"] }]
        }]));
        assert_eq!(html, "<p>click</p>");
    }

    #[test]
    fn test_lists_are_grouped() {
        let html = render(json!([
            item("bullet", 1, "a"),
            item("bullet", 1, "b"),
            text("normal", "between"),
            item("number", 1, "one")
        ]));
        assert_eq!(
            html,
            concat!(
                r#"<ul><li class="ml-4 list-disc">a</li><li class="ml-4 list-disc">b</li></ul>"#,
                "<p>between</p>",
                r#"<ol><li class="ml-4 list-disc">one</li></ol>"#
            )
        );
    }

    #[test]
    fn test_nested_list() {
        let html = render(json!([
            item("bullet", 1, "a"),
            item("bullet", 2, "a.1"),
            item("bullet", 1, "b")
        ]));
        assert_eq!(
            html,
            concat!(
                r#"<ul><li class="ml-4 list-disc">a"#,
                r#"<ul><li class="ml-4 list-disc">a.1</li></ul>"#,
                r#"</li><li class="ml-4 list-disc">b</li></ul>"#
            )
        );
    }

    #[test]
    fn test_unknown_block_falls_back() {
        let html = render(json!([
            { "_type": "youtube", "url": "https://youtu.be/x" },
            text("normal", "after")
        ]));
        assert_eq!(html, r#"<div data-block-type="youtube"></div><p>after</p>"#);
    }

    #[test]
    fn test_image_block() {
        let html = render(json!([{
            "_type": "image",
            "asset": { "_ref": "image-abc-100x50-png", "_type": "reference" },
            "alt": "diagram"
        }]));
        assert_eq!(
            html,
            r#"<img class="my-5" src="https://cdn.sanity.io/images/proj/production/abc-100x50.png?w=1200&amp;auto=format" alt="diagram">"#
        );
    }

    #[test]
    fn test_broken_image_renders_nothing() {
        let html = render(json!([{ "_type": "image", "asset": { "_ref": "nope" } }]));
        assert_eq!(html, "");
    }

    #[test]
    fn test_image_without_asset_falls_back() {
        let blocks: Vec<Block> = serde_json::from_value(json!([
            text("normal", "before"),
            { "_type": "image", "_key": "k" },
            { "_type": "block", "children": "not a list" }
        ]))
        .unwrap();
        assert!(matches!(&blocks[1], Block::Unknown { kind, .. } if kind == "image"));
        assert!(matches!(&blocks[2], Block::Unknown { kind, .. } if kind == "block"));

        let html = render(json!([text("normal", "before"), { "_type": "image", "_key": "k" }]));
        assert_eq!(html, r#"<p>before</p><div data-block-type="image"></div>"#);
    }

    #[test]
    fn test_block_serialization_keeps_type() {
        let blocks: Vec<Block> = serde_json::from_value(json!([
            text("h1", "x"),
            { "_type": "code", "code": "fn main() {}" }
        ]))
        .unwrap();
        let value = serde_json::to_value(&blocks).unwrap();
        assert_eq!(value[0]["_type"], "block");
        assert_eq!(value[1]["_type"], "code");
        assert_eq!(value[1]["code"], "fn main() {}");
    }
}
