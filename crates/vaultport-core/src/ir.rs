//! Target-agnostic intermediate representation of a transformed document.
//!
//! A closed set of tagged variants: every generator matches on these
//! exhaustively, so adding a node kind is a compile error in each target
//! until it is handled.

use crate::callout::CalloutKind;
use serde::{Deserialize, Serialize};

/// A block-level node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Block {
    Heading {
        level: u8,
        content: Vec<Inline>,
        /// Block reference id (`^id`) attached to this heading
        anchor: Option<String>,
    },
    Paragraph {
        content: Vec<Inline>,
        anchor: Option<String>,
    },
    Code {
        language: Option<String>,
        text: String,
    },
    List {
        ordered: bool,
        /// First number of an ordered list
        start: u64,
        items: Vec<ListItem>,
    },
    Quote {
        blocks: Vec<Block>,
    },
    Callout {
        kind: CalloutKind,
        /// Custom title written after `[!type]`
        title: Option<String>,
        /// `Some(true)` for `-`, `Some(false)` for `+`, `None` when not foldable
        folded: Option<bool>,
        blocks: Vec<Block>,
        anchor: Option<String>,
    },
    Table {
        header: Vec<Vec<Inline>>,
        rows: Vec<Vec<Vec<Inline>>>,
    },
    Rule,
    /// Raw HTML passed through untouched
    Html {
        raw: String,
    },
}

impl Block {
    /// An empty paragraph, used for documents without a body.
    pub fn empty_paragraph() -> Self {
        Block::Paragraph {
            content: Vec::new(),
            anchor: None,
        }
    }

    /// Block reference id attached to this block, if any.
    pub fn anchor(&self) -> Option<&str> {
        match self {
            Block::Heading { anchor, .. }
            | Block::Paragraph { anchor, .. }
            | Block::Callout { anchor, .. } => anchor.as_deref(),
            _ => None,
        }
    }

    /// Attach a block id. Returns false when this kind of block cannot carry one.
    pub fn set_anchor(&mut self, id: String) -> bool {
        match self {
            Block::Heading { anchor, .. }
            | Block::Paragraph { anchor, .. }
            | Block::Callout { anchor, .. } => {
                *anchor = Some(id);
                true
            }
            Block::List { items, .. } => match items.last_mut().and_then(|i| i.blocks.last_mut()) {
                Some(block) => block.set_anchor(id),
                None => false,
            },
            _ => false,
        }
    }

    /// Visible text of this block, stripping all markup.
    pub fn to_plain_text(&self) -> String {
        match self {
            Block::Heading { content, .. } | Block::Paragraph { content, .. } => {
                inline_text(content)
            }
            Block::Code { text, .. } => text.clone(),
            Block::List { items, .. } => items
                .iter()
                .map(ListItem::to_plain_text)
                .collect::<Vec<_>>()
                .join("\n"),
            Block::Quote { blocks } | Block::Callout { blocks, .. } => blocks
                .iter()
                .map(Block::to_plain_text)
                .collect::<Vec<_>>()
                .join("\n"),
            Block::Table { header, rows } => {
                let mut lines = vec![header.iter().map(|c| inline_text(c)).collect::<Vec<_>>().join("\t")];
                for row in rows {
                    lines.push(row.iter().map(|c| inline_text(c)).collect::<Vec<_>>().join("\t"));
                }
                lines.join("\n")
            }
            Block::Rule => String::new(),
            Block::Html { raw } => raw.clone(),
        }
    }
}

/// A list item: optional task checkbox plus nested blocks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListItem {
    /// `Some(checked)` for task items
    pub checked: Option<bool>,
    pub blocks: Vec<Block>,
}

impl ListItem {
    /// Inline content of the leading paragraph, if the item starts with one.
    pub fn lead(&self) -> Option<&[Inline]> {
        match self.blocks.first() {
            Some(Block::Paragraph { content, .. }) => Some(content),
            _ => None,
        }
    }

    /// Blocks after the leading paragraph.
    pub fn rest(&self) -> &[Block] {
        match self.blocks.first() {
            Some(Block::Paragraph { .. }) => &self.blocks[1..],
            _ => &self.blocks,
        }
    }

    pub fn to_plain_text(&self) -> String {
        self.blocks
            .iter()
            .map(Block::to_plain_text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Inline formatting flags carried by a text run.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Marks {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub strong: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub emphasis: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub code: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub strikethrough: bool,
}

impl Marks {
    pub fn is_plain(&self) -> bool {
        *self == Marks::default()
    }
}

/// An inline node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Inline {
    Text {
        value: String,
        #[serde(default, skip_serializing_if = "Marks::is_plain")]
        marks: Marks,
    },
    /// Ordinary markdown link `[text](url)`
    Link { text: String, url: String },
    /// Ordinary markdown image `![alt](src)`
    Image { alt: String, src: String },
    WikiLink(LinkRef),
    Embed(EmbedRef),
    /// Line break inside a paragraph
    Break,
}

impl Inline {
    pub fn text(value: impl Into<String>) -> Self {
        Inline::Text {
            value: value.into(),
            marks: Marks::default(),
        }
    }

    pub fn to_plain_text(&self) -> &str {
        match self {
            Inline::Text { value, .. } => value,
            Inline::Link { text, .. } => text,
            Inline::Image { alt, .. } => alt,
            Inline::WikiLink(link) => &link.display,
            Inline::Embed(embed) => &embed.display,
            Inline::Break => "\n",
        }
    }
}

/// Concatenated visible text of an inline run.
pub fn inline_text(content: &[Inline]) -> String {
    content.iter().map(Inline::to_plain_text).collect()
}

/// A wikilink after resolution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LinkRef {
    pub display: String,
    pub target: LinkTarget,
    pub header: Option<String>,
    pub block_id: Option<String>,
}

/// Where a wikilink points.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LinkTarget {
    Document { path: String },
    Broken { raw: String },
}

impl LinkTarget {
    pub fn path(&self) -> Option<&str> {
        match self {
            LinkTarget::Document { path } => Some(path),
            LinkTarget::Broken { .. } => None,
        }
    }
}

/// An `![[...]]` embed after resolution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbedRef {
    pub display: String,
    pub target: EmbedTarget,
}

/// What an embed refers to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EmbedTarget {
    /// A file copied into the package
    Asset { path: String },
    /// Another note; exported as a link
    Document { path: String },
    Missing { raw: String },
}

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "svg", "webp", "avif"];

/// Whether a relative path names an image by extension.
pub fn is_image_path(path: &str) -> bool {
    path.rsplit_once('.')
        .map(|(_, ext)| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text() {
        let block = Block::Paragraph {
            content: vec![
                Inline::text("See "),
                Inline::WikiLink(LinkRef {
                    display: "Bee".into(),
                    target: LinkTarget::Document { path: "B.md".into() },
                    header: None,
                    block_id: None,
                }),
            ],
            anchor: None,
        };
        assert_eq!(block.to_plain_text(), "See Bee");
    }

    #[test]
    fn test_set_anchor_on_list_descends_into_last_item() {
        let mut list = Block::List {
            ordered: false,
            start: 1,
            items: vec![ListItem {
                checked: None,
                blocks: vec![Block::Paragraph {
                    content: vec![Inline::text("item")],
                    anchor: None,
                }],
            }],
        };
        assert!(list.set_anchor("abc".into()));
        if let Block::List { items, .. } = &list {
            assert_eq!(items[0].blocks[0].anchor(), Some("abc"));
        }
        assert!(!Block::Rule.set_anchor("x".into()));
    }

    #[test]
    fn test_image_detection() {
        assert!(is_image_path("assets/Photo.JPG"));
        assert!(!is_image_path("docs/report.pdf"));
        assert!(!is_image_path("README"));
    }

    #[test]
    fn test_marks_serialization_skips_defaults() {
        let json = serde_json::to_string(&Inline::text("hi")).unwrap();
        assert_eq!(json, r#"{"type":"text","value":"hi"}"#);
    }
}
