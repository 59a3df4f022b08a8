//! Token scanning engine for Obsidian-specific syntax.
//!
//! Uses a two-phase approach:
//! 1. pulldown-cmark pass: collect byte ranges of fenced/indented code blocks,
//!    inline code spans and raw HTML
//! 2. Regex pass: extract wikilinks, embeds and block references, skipping
//!    every match that starts inside an excluded range
//!
//! The regexes never see code as prose, so `[[x]]` in a code sample is
//! never a link.

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};
use std::ops::Range;
use vaultport_core::{LineIndex, SourcePosition, WikiLink};

use crate::parsers::block_refs::block_ref_candidates;
use crate::parsers::wikilinks::{WIKILINK, has_wikilink, parse_wikilink};

// ============================================================================
// Excluded ranges (code blocks, inline code, HTML)
// ============================================================================

/// Byte ranges where Obsidian syntax is not interpreted.
#[derive(Debug, Default, Clone)]
pub struct ExcludedRanges {
    ranges: Vec<Range<usize>>,
}

impl ExcludedRanges {
    /// Compute excluded ranges for a markdown document.
    pub fn compute(content: &str) -> Self {
        let mut excluded = ExcludedRanges::default();

        let mut opts = Options::empty();
        opts.insert(Options::ENABLE_TABLES);
        opts.insert(Options::ENABLE_STRIKETHROUGH);
        opts.insert(Options::ENABLE_TASKLISTS);

        let mut code_block_start: Option<usize> = None;

        for (event, range) in Parser::new_ext(content, opts).into_offset_iter() {
            match event {
                Event::Start(Tag::CodeBlock(_)) => {
                    code_block_start = Some(range.start);
                }
                Event::End(TagEnd::CodeBlock) => {
                    let start = code_block_start.take().unwrap_or(range.start);
                    excluded.add(start..range.end);
                }
                Event::Code(_) | Event::Html(_) | Event::InlineHtml(_) => {
                    excluded.add(range);
                }
                _ => {}
            }
        }

        excluded.optimize();
        excluded
    }

    /// Check if a byte offset falls within any excluded range.
    #[inline]
    pub fn contains(&self, offset: usize) -> bool {
        // Last range starting at or before `offset` is the only candidate.
        let idx = self.ranges.partition_point(|r| r.start <= offset);
        if idx == 0 {
            return false;
        }
        offset < self.ranges[idx - 1].end
    }

    /// Whether any part of `range` overlaps an excluded range.
    pub fn overlaps(&self, range: &Range<usize>) -> bool {
        self.ranges
            .iter()
            .any(|r| r.start < range.end && range.start < r.end)
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    fn add(&mut self, range: Range<usize>) {
        if range.start < range.end {
            self.ranges.push(range);
        }
    }

    /// Sort and merge overlapping ranges for efficient lookup.
    fn optimize(&mut self) {
        if self.ranges.is_empty() {
            return;
        }
        self.ranges.sort_by_key(|r| r.start);

        let mut merged: Vec<Range<usize>> = Vec::with_capacity(self.ranges.len());
        for range in self.ranges.drain(..) {
            match merged.last_mut() {
                Some(current) if range.start <= current.end => {
                    current.end = current.end.max(range.end);
                }
                _ => merged.push(range),
            }
        }
        self.ranges = merged;
    }
}

// ============================================================================
// Tokens
// ============================================================================

/// A wikilink or embed found in a document, with its source span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WikiLinkToken {
    pub link: WikiLink,
    pub position: SourcePosition,
}

impl WikiLinkToken {
    pub fn span(&self) -> Range<usize> {
        self.position.span()
    }
}

/// A trailing `^id` block marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockRef {
    pub id: String,
    /// Span of the marker including the whitespace before the caret
    pub position: SourcePosition,
}

/// Everything the engine extracts from one document.
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    /// Wikilinks and embeds, in document order
    pub wikilinks: Vec<WikiLinkToken>,
    /// Block markers, in document order
    pub block_refs: Vec<BlockRef>,
}

// ============================================================================
// Core scanning engine
// ============================================================================

/// Scanning engine for one document body.
pub struct ParseEngine<'a> {
    content: &'a str,
    index: LineIndex,
    excluded: ExcludedRanges,
}

impl<'a> ParseEngine<'a> {
    /// Create a new engine. Runs the pulldown-cmark pass immediately.
    pub fn new(content: &'a str) -> Self {
        Self {
            content,
            index: LineIndex::new(content),
            excluded: ExcludedRanges::compute(content),
        }
    }

    pub fn excluded(&self) -> &ExcludedRanges {
        &self.excluded
    }

    /// Run the regex pass.
    pub fn parse(&self) -> ScanResult {
        let wikilinks = self.parse_wikilinks();
        let block_refs = self.parse_block_refs(&wikilinks);
        ScanResult {
            wikilinks,
            block_refs,
        }
    }

    fn parse_wikilinks(&self) -> Vec<WikiLinkToken> {
        if !has_wikilink(self.content) {
            return Vec::new();
        }

        let bytes = self.content.as_bytes();
        let mut tokens = Vec::new();

        for caps in WIKILINK.captures_iter(self.content) {
            let (Some(whole), Some(bang), Some(inner)) = (caps.get(0), caps.get(1), caps.get(2))
            else {
                continue;
            };

            let bracket_start = bang.end();
            if self.excluded.contains(bracket_start) {
                continue;
            }

            // `\[[x]]` is literal text
            if bracket_start > 0 && bytes[bracket_start - 1] == b'\\' {
                continue;
            }

            // `\![[x]]` is a plain link after a literal `!`
            let escaped_bang =
                !bang.is_empty() && bang.start() > 0 && bytes[bang.start() - 1] == b'\\';
            let (start, is_embed) = if escaped_bang {
                (bracket_start, false)
            } else {
                (whole.start(), !bang.is_empty())
            };

            let raw = &self.content[start..whole.end()];
            let Some(link) = parse_wikilink(raw, inner.as_str(), is_embed) else {
                log::trace!("Skipping empty wikilink {:?}", raw);
                continue;
            };

            tokens.push(WikiLinkToken {
                link,
                position: SourcePosition::from_offset_indexed(
                    &self.index,
                    start,
                    whole.end() - start,
                ),
            });
        }

        tokens
    }

    fn parse_block_refs(&self, wikilinks: &[WikiLinkToken]) -> Vec<BlockRef> {
        block_ref_candidates(self.content)
            .into_iter()
            .filter(|(span, _)| !self.excluded.overlaps(span))
            .filter(|(span, _)| {
                !wikilinks.iter().any(|t| {
                    let t = t.span();
                    t.start < span.end && span.start < t.end
                })
            })
            .map(|(span, id)| BlockRef {
                id,
                position: SourcePosition::from_offset_indexed(
                    &self.index,
                    span.start,
                    span.end - span.start,
                ),
            })
            .collect()
    }
}

// ============================================================================
// Splicing
// ============================================================================

/// Replace byte ranges of `content`. Ranges must not overlap; they are
/// applied in ascending order of start offset.
pub fn splice(content: &str, replacements: Vec<(Range<usize>, String)>) -> String {
    splice_tracked(content, replacements).0
}

/// Like [`splice`], also returning where each replacement starts in the
/// output, in the order the replacements were given. Skipped (overlapping
/// or out-of-bounds) replacements map to `None`.
pub fn splice_tracked(
    content: &str,
    replacements: Vec<(Range<usize>, String)>,
) -> (String, Vec<Option<usize>>) {
    let mut offsets = vec![None; replacements.len()];
    let mut ordered: Vec<(usize, Range<usize>, String)> = replacements
        .into_iter()
        .enumerate()
        .map(|(n, (range, text))| (n, range, text))
        .collect();
    ordered.sort_by_key(|(_, range, _)| range.start);

    let mut out = String::with_capacity(content.len());
    let mut cursor = 0;
    for (n, range, text) in ordered {
        if range.start < cursor || range.end > content.len() {
            log::warn!("Skipping overlapping splice at {:?}", range);
            continue;
        }
        out.push_str(&content[cursor..range.start]);
        offsets[n] = Some(out.len());
        out.push_str(&text);
        cursor = range.end;
    }
    out.push_str(&content[cursor..]);
    (out, offsets)
}

// ============================================================================
// Tests
// ============================================================================
