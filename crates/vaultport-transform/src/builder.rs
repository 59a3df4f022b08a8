//! pulldown-cmark events to IR blocks.
//!
//! Wikilinks and block markers have already been replaced by placeholder
//! links (`[](wikilink:N)`, `[](anchor:N)`) so that pulldown-cmark places
//! them in the right block. The builder swaps them back for the resolved
//! inline and the block anchor respectively. Only links starting at a
//! recorded splice offset count as placeholders; a link the author wrote
//! with the same URL stays an ordinary link.

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};
use std::collections::HashMap;
use vaultport_core::{Block, Inline, ListItem, Marks, inline_text};
use vaultport_parser::parse_callout_header;

pub(crate) const LINK_SCHEME: &str = "wikilink:";
pub(crate) const ANCHOR_SCHEME: &str = "anchor:";

/// Markdown extensions understood by the exporter.
///
/// GFM blockquote kinds stay disabled: `[!type]` must reach the callout
/// recognizer as plain text.
pub(crate) fn markdown_options() -> Options {
    let mut opts = Options::empty();
    opts.insert(Options::ENABLE_TABLES);
    opts.insert(Options::ENABLE_STRIKETHROUGH);
    opts.insert(Options::ENABLE_TASKLISTS);
    opts
}

/// Result of building one document.
#[derive(Debug, Default)]
pub(crate) struct BuildOutput {
    pub blocks: Vec<Block>,
    /// Identifiers of callouts with no known family, in document order
    pub unknown_callouts: Vec<String>,
}

/// What a spliced placeholder link stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Placeholder {
    /// Index into the resolved wikilink tokens
    Token(usize),
    /// Index into the block anchors
    Anchor(usize),
}

/// Placeholders keyed by the byte offset of their `[` in the spliced markdown.
pub(crate) type Placeholders = HashMap<usize, Placeholder>;

/// Parse placeholder markdown into IR blocks.
pub(crate) fn build_blocks(
    markdown: &str,
    tokens: &[Inline],
    anchors: &[String],
    placeholders: &Placeholders,
) -> BuildOutput {
    let mut builder = IrBuilder::new(tokens, anchors, placeholders);
    for (event, range) in Parser::new_ext(markdown, markdown_options()).into_offset_iter() {
        builder.event(event, range.start);
    }
    builder.finish()
}

// ============================================================================
// Inline buffer
// ============================================================================

#[derive(Debug, Default)]
struct InlineBuf {
    content: Vec<Inline>,
    anchor: Option<String>,
}

impl InlineBuf {
    fn push(&mut self, inline: Inline) {
        if let Inline::Text { value, marks } = &inline
            && let Some(Inline::Text {
                value: last,
                marks: last_marks,
            }) = self.content.last_mut()
            && *last_marks == *marks
        {
            last.push_str(value);
            return;
        }
        self.content.push(inline);
    }

    fn has_content(&self) -> bool {
        !self.content.is_empty() || self.anchor.is_some()
    }

    /// Content with trailing breaks and whitespace removed, plus the anchor.
    fn finish(mut self) -> (Vec<Inline>, Option<String>) {
        loop {
            match self.content.last_mut() {
                Some(Inline::Break) => {
                    self.content.pop();
                }
                Some(Inline::Text { value, .. }) => {
                    let trimmed = value.trim_end().len();
                    if trimmed == 0 {
                        self.content.pop();
                    } else {
                        value.truncate(trimmed);
                        break;
                    }
                }
                _ => break,
            }
        }
        (self.content, self.anchor)
    }
}

// ============================================================================
// Builder state machine
// ============================================================================

#[derive(Debug)]
enum LinkKind {
    External(String),
    Token(usize),
    Anchor(usize),
}

#[derive(Debug)]
enum Frame {
    Paragraph(InlineBuf),
    Heading {
        level: u8,
        buf: InlineBuf,
    },
    Quote(Vec<Block>),
    List {
        ordered: bool,
        start: u64,
        items: Vec<ListItem>,
    },
    Item {
        checked: Option<bool>,
        blocks: Vec<Block>,
        buf: InlineBuf,
    },
    Code {
        language: Option<String>,
        text: String,
    },
    Html(String),
    Table {
        header: Vec<Vec<Inline>>,
        rows: Vec<Vec<Vec<Inline>>>,
        row: Vec<Vec<Inline>>,
    },
    Cell(InlineBuf),
    Link {
        kind: LinkKind,
        buf: InlineBuf,
    },
    Image {
        src: String,
        buf: InlineBuf,
    },
}

struct IrBuilder<'a> {
    stack: Vec<Frame>,
    blocks: Vec<Block>,
    strong: usize,
    emphasis: usize,
    strikethrough: usize,
    tokens: &'a [Inline],
    anchors: &'a [String],
    placeholders: &'a Placeholders,
    unknown_callouts: Vec<String>,
}

impl<'a> IrBuilder<'a> {
    fn new(tokens: &'a [Inline], anchors: &'a [String], placeholders: &'a Placeholders) -> Self {
        Self {
            stack: Vec::new(),
            blocks: Vec::new(),
            strong: 0,
            emphasis: 0,
            strikethrough: 0,
            tokens,
            anchors,
            placeholders,
            unknown_callouts: Vec::new(),
        }
    }

    fn finish(self) -> BuildOutput {
        if !self.stack.is_empty() {
            log::debug!("{} unclosed frames at end of document", self.stack.len());
        }
        BuildOutput {
            blocks: self.blocks,
            unknown_callouts: self.unknown_callouts,
        }
    }

    fn marks(&self) -> Marks {
        Marks {
            strong: self.strong > 0,
            emphasis: self.emphasis > 0,
            code: false,
            strikethrough: self.strikethrough > 0,
        }
    }

    fn classify(&self, url: &str, offset: usize) -> LinkKind {
        match self.placeholders.get(&offset) {
            Some(&Placeholder::Token(n)) if n < self.tokens.len() => LinkKind::Token(n),
            Some(&Placeholder::Anchor(n)) if n < self.anchors.len() => LinkKind::Anchor(n),
            _ => LinkKind::External(url.to_string()),
        }
    }

    /// Innermost frame accepting inline content.
    fn inline_buf(&mut self) -> Option<&mut InlineBuf> {
        match self.stack.last_mut() {
            Some(Frame::Paragraph(buf))
            | Some(Frame::Heading { buf, .. })
            | Some(Frame::Item { buf, .. })
            | Some(Frame::Cell(buf))
            | Some(Frame::Link { buf, .. })
            | Some(Frame::Image { buf, .. }) => Some(buf),
            _ => None,
        }
    }

    fn push_inline(&mut self, inline: Inline) {
        match self.inline_buf() {
            Some(buf) => buf.push(inline),
            None => log::trace!("Dropping inline outside of a text block: {:?}", inline),
        }
    }

    fn text(&mut self, text: &str) {
        match self.stack.last_mut() {
            Some(Frame::Code { text: code, .. }) => code.push_str(text),
            Some(Frame::Html(raw)) => raw.push_str(text),
            _ => {
                if !text.is_empty() {
                    let marks = self.marks();
                    self.push_inline(Inline::Text {
                        value: text.to_string(),
                        marks,
                    });
                }
            }
        }
    }

    /// Tight list items carry text directly; turn it into the item's lead
    /// paragraph before a nested block starts.
    fn flush_item_text(&mut self) {
        if let Some(Frame::Item { blocks, buf, .. }) = self.stack.last_mut()
            && buf.has_content()
        {
            let (content, anchor) = std::mem::take(buf).finish();
            if content.is_empty() {
                if let Some(id) = anchor {
                    attach_anchor(blocks, id);
                }
            } else {
                blocks.push(Block::Paragraph { content, anchor });
            }
        }
    }

    /// Block list of the innermost container.
    fn container(&mut self) -> &mut Vec<Block> {
        let idx = self
            .stack
            .iter()
            .rposition(|f| matches!(f, Frame::Quote(_) | Frame::Item { .. }));
        match idx.and_then(|i| self.stack.get_mut(i)) {
            Some(Frame::Quote(blocks)) | Some(Frame::Item { blocks, .. }) => blocks,
            _ => &mut self.blocks,
        }
    }

    fn push_block(&mut self, block: Block) {
        self.flush_item_text();
        self.container().push(block);
    }

    fn finish_paragraph(&mut self, buf: InlineBuf) {
        let (content, anchor) = buf.finish();
        if content.is_empty() {
            // `^id` alone on its line belongs to the block before it
            if let Some(id) = anchor {
                self.flush_item_text();
                attach_anchor(self.container(), id);
            }
            return;
        }
        self.push_block(Block::Paragraph { content, anchor });
    }

    fn event(&mut self, event: Event<'_>, offset: usize) {
        match event {
            Event::Start(tag) => self.start(tag, offset),
            Event::End(tag) => self.end(tag),
            Event::Text(text) | Event::Html(text) | Event::InlineHtml(text) => self.text(&text),
            Event::Code(code) => {
                let mut marks = self.marks();
                marks.code = true;
                self.push_inline(Inline::Text {
                    value: code.to_string(),
                    marks,
                });
            }
            Event::SoftBreak | Event::HardBreak => self.push_inline(Inline::Break),
            Event::Rule => self.push_block(Block::Rule),
            Event::TaskListMarker(done) => {
                let item = self.stack.iter_mut().rev().find_map(|f| match f {
                    Frame::Item { checked, .. } => Some(checked),
                    _ => None,
                });
                if let Some(checked) = item {
                    *checked = Some(done);
                }
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>, offset: usize) {
        match tag {
            Tag::Paragraph => {
                self.flush_item_text();
                self.stack.push(Frame::Paragraph(InlineBuf::default()));
            }
            Tag::Heading { level, .. } => {
                self.flush_item_text();
                self.stack.push(Frame::Heading {
                    level: level as u8,
                    buf: InlineBuf::default(),
                });
            }
            Tag::BlockQuote(_) => {
                self.flush_item_text();
                self.stack.push(Frame::Quote(Vec::new()));
            }
            Tag::CodeBlock(kind) => {
                self.flush_item_text();
                let language = match kind {
                    CodeBlockKind::Fenced(info) => info
                        .split_whitespace()
                        .next()
                        .map(str::to_string),
                    CodeBlockKind::Indented => None,
                };
                self.stack.push(Frame::Code {
                    language,
                    text: String::new(),
                });
            }
            Tag::HtmlBlock => {
                self.flush_item_text();
                self.stack.push(Frame::Html(String::new()));
            }
            Tag::List(start) => {
                self.flush_item_text();
                self.stack.push(Frame::List {
                    ordered: start.is_some(),
                    start: start.unwrap_or(1),
                    items: Vec::new(),
                });
            }
            Tag::Item => self.stack.push(Frame::Item {
                checked: None,
                blocks: Vec::new(),
                buf: InlineBuf::default(),
            }),
            Tag::Table(_) => {
                self.flush_item_text();
                self.stack.push(Frame::Table {
                    header: Vec::new(),
                    rows: Vec::new(),
                    row: Vec::new(),
                });
            }
            Tag::TableHead | Tag::TableRow => {
                if let Some(Frame::Table { row, .. }) = self.stack.last_mut() {
                    row.clear();
                }
            }
            Tag::TableCell => self.stack.push(Frame::Cell(InlineBuf::default())),
            Tag::Emphasis => self.emphasis += 1,
            Tag::Strong => self.strong += 1,
            Tag::Strikethrough => self.strikethrough += 1,
            Tag::Link { dest_url, .. } => {
                let kind = self.classify(&dest_url, offset);
                self.stack.push(Frame::Link {
                    kind,
                    buf: InlineBuf::default(),
                });
            }
            Tag::Image { dest_url, .. } => self.stack.push(Frame::Image {
                src: dest_url.to_string(),
                buf: InlineBuf::default(),
            }),
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => {
                if let Some(Frame::Paragraph(buf)) = self.stack.pop() {
                    self.finish_paragraph(buf);
                }
            }
            TagEnd::Heading(_) => {
                if let Some(Frame::Heading { level, buf }) = self.stack.pop() {
                    let (content, anchor) = buf.finish();
                    self.push_block(Block::Heading {
                        level,
                        content,
                        anchor,
                    });
                }
            }
            TagEnd::BlockQuote(_) => {
                if let Some(Frame::Quote(blocks)) = self.stack.pop() {
                    let block = self.quote_or_callout(blocks);
                    self.push_block(block);
                }
            }
            TagEnd::CodeBlock => {
                if let Some(Frame::Code { language, text }) = self.stack.pop() {
                    self.push_block(Block::Code {
                        language,
                        text: text.trim_end_matches('\n').to_string(),
                    });
                }
            }
            TagEnd::HtmlBlock => {
                if let Some(Frame::Html(raw)) = self.stack.pop() {
                    self.push_block(Block::Html {
                        raw: raw.trim_end().to_string(),
                    });
                }
            }
            TagEnd::List(_) => {
                if let Some(Frame::List {
                    ordered,
                    start,
                    items,
                }) = self.stack.pop()
                {
                    self.push_block(Block::List {
                        ordered,
                        start,
                        items,
                    });
                }
            }
            TagEnd::Item => {
                self.flush_item_text();
                if let Some(Frame::Item {
                    checked, blocks, ..
                }) = self.stack.pop()
                    && let Some(Frame::List { items, .. }) = self.stack.last_mut()
                {
                    items.push(ListItem { checked, blocks });
                }
            }
            TagEnd::Table => {
                if let Some(Frame::Table { header, rows, .. }) = self.stack.pop() {
                    self.push_block(Block::Table { header, rows });
                }
            }
            TagEnd::TableHead => {
                if let Some(Frame::Table { header, row, .. }) = self.stack.last_mut() {
                    *header = std::mem::take(row);
                }
            }
            TagEnd::TableRow => {
                if let Some(Frame::Table { rows, row, .. }) = self.stack.last_mut() {
                    rows.push(std::mem::take(row));
                }
            }
            TagEnd::TableCell => {
                if let Some(Frame::Cell(buf)) = self.stack.pop() {
                    let (content, _) = buf.finish();
                    if let Some(Frame::Table { row, .. }) = self.stack.last_mut() {
                        row.push(content);
                    }
                }
            }
            TagEnd::Emphasis => self.emphasis = self.emphasis.saturating_sub(1),
            TagEnd::Strong => self.strong = self.strong.saturating_sub(1),
            TagEnd::Strikethrough => self.strikethrough = self.strikethrough.saturating_sub(1),
            TagEnd::Link => {
                if let Some(Frame::Link { kind, buf }) = self.stack.pop() {
                    match kind {
                        LinkKind::Token(n) => self.push_inline(self.tokens[n].clone()),
                        LinkKind::Anchor(n) => {
                            let id = self.anchors[n].clone();
                            if let Some(parent) = self.inline_buf() {
                                parent.anchor = Some(id);
                            }
                        }
                        LinkKind::External(url) => self.push_inline(Inline::Link {
                            text: inline_text(&buf.content),
                            url,
                        }),
                    }
                }
            }
            TagEnd::Image => {
                if let Some(Frame::Image { src, buf }) = self.stack.pop() {
                    self.push_inline(Inline::Image {
                        alt: inline_text(&buf.content),
                        src,
                    });
                }
            }
            _ => {}
        }
    }

    /// A blockquote whose first line is `[!type]` becomes a callout.
    fn quote_or_callout(&mut self, mut blocks: Vec<Block>) -> Block {
        let (first_line, line_end) = match blocks.first() {
            Some(Block::Paragraph { content, .. }) => {
                let end = content
                    .iter()
                    .position(|i| matches!(i, Inline::Break))
                    .unwrap_or(content.len());
                (inline_text(&content[..end]), end)
            }
            _ => return Block::Quote { blocks },
        };

        let Some(header) = parse_callout_header(&first_line) else {
            return Block::Quote { blocks };
        };

        let mut anchor = None;
        let mut header_only = false;
        let mut title_line = Vec::new();
        if let Some(Block::Paragraph {
            content,
            anchor: first_anchor,
        }) = blocks.first_mut()
        {
            let body: Vec<Inline> = content.drain(line_end..).skip(1).collect();
            title_line = std::mem::replace(content, body);
            anchor = first_anchor.take();
            header_only = content.is_empty();
        }
        if header_only {
            blocks.remove(0);
        }

        // A title holding links or embeds opens the body instead, so they
        // still render as links under the default label.
        let mut title = header.title;
        let title_inlines = callout_title_inlines(title_line);
        if title_inlines
            .iter()
            .any(|i| !matches!(i, Inline::Text { .. }))
        {
            title = None;
            blocks.insert(
                0,
                Block::Paragraph {
                    content: title_inlines,
                    anchor: None,
                },
            );
        }

        if !header.kind.is_known() {
            self.unknown_callouts.push(header.kind.identifier.clone());
        }

        Block::Callout {
            kind: header.kind,
            title,
            folded: header.folded,
            blocks,
            anchor,
        }
    }
}

/// Inlines of a callout header line after the `[!type]` marker and fold sign.
fn callout_title_inlines(line: Vec<Inline>) -> Vec<Inline> {
    let mut out = Vec::new();
    let mut in_marker = true;
    for inline in line {
        match inline {
            Inline::Text { value, marks } if out.is_empty() => {
                let mut rest = value.as_str();
                if in_marker {
                    let Some(end) = rest.find(']') else {
                        continue;
                    };
                    in_marker = false;
                    rest = &rest[end + 1..];
                    rest = rest.strip_prefix(['+', '-']).unwrap_or(rest);
                }
                let rest = rest.trim_start();
                if !rest.is_empty() {
                    out.push(Inline::Text {
                        value: rest.to_string(),
                        marks,
                    });
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Attach `id` to the last block of `blocks`, or keep it on an empty
/// paragraph when that block cannot carry an anchor.
fn attach_anchor(blocks: &mut Vec<Block>, id: String) {
    if let Some(last) = blocks.last_mut()
        && last.set_anchor(id.clone())
    {
        return;
    }
    blocks.push(Block::Paragraph {
        content: Vec::new(),
        anchor: Some(id),
    });
}
