//! # vaultport Parser
//!
//! Obsidian Flavored Markdown token extraction built on `pulldown-cmark`.
//!
//! This crate provides:
//! - Frontmatter splitting and YAML parsing
//! - Wikilinks `[[target#header^block|alias]]` and embeds `![[file]]`
//! - Callout headers `> [!type]- Title`
//! - Trailing block markers `^block-id`
//! - **Code block awareness**: nothing inside fenced code, inline code or raw
//!   HTML is ever interpreted as Obsidian syntax
//!
//! ## Architecture
//!
//! [`ParseEngine`] works in two phases:
//!
//! ### Phase 1: pulldown-cmark pass
//! - Builds excluded ranges (code blocks, inline code, HTML)
//!
//! ### Phase 2: Regex pass
//! - Extracts wikilinks, embeds and block markers, skipping excluded ranges
//! - Attaches 1-indexed line/column positions through a [`LineIndex`]
//!
//! ## Quick Start
//!
//! ```
//! use vaultport_parser::{extract, split_frontmatter};
//!
//! let doc = "---\ntitle: Plan\n---\nSee [[Roadmap#Q3|the roadmap]].\n\n```\n[[not a link]]\n```\n";
//! let (frontmatter, body) = split_frontmatter(doc);
//! assert_eq!(frontmatter, Some("title: Plan"));
//!
//! let links = extract(body);
//! assert_eq!(links.len(), 1);
//! assert_eq!(links[0].link.target, "Roadmap");
//! assert_eq!(links[0].link.header.as_deref(), Some("Q3"));
//! assert_eq!(links[0].link.alias.as_deref(), Some("the roadmap"));
//! ```

mod engine;
pub mod parsers;

pub use engine::{
    BlockRef, ExcludedRanges, ParseEngine, ScanResult, WikiLinkToken, splice, splice_tracked,
};
pub use parsers::{
    CalloutHeader, parse_callout_header, parse_frontmatter, parse_wikilink, split_frontmatter,
};

// Re-export core types for consumers
pub use vaultport_core::{LineIndex, SourcePosition, WikiLink};

// ============================================================================
// Simplified Public API
// ============================================================================

/// Extract all wikilinks and embeds from a document body, in document order.
///
/// # Example
/// ```
/// use vaultport_parser::extract;
///
/// let tokens = extract("See [[Note]] and ![[diagram.png]]");
/// assert_eq!(tokens.len(), 2);
/// assert!(tokens[1].link.is_embed);
/// ```
pub fn extract(content: &str) -> Vec<WikiLinkToken> {
    ParseEngine::new(content).parse().wikilinks
}

/// Extract trailing `^id` block markers outside code.
///
/// # Example
/// ```
/// use vaultport_parser::find_block_refs;
///
/// let refs = find_block_refs("A paragraph ^intro\n");
/// assert_eq!(refs[0].id, "intro");
/// ```
pub fn find_block_refs(content: &str) -> Vec<BlockRef> {
    ParseEngine::new(content).parse().block_refs
}

/// Raw link targets of a document body, in document order.
pub fn link_targets(content: &str) -> Vec<String> {
    extract(content)
        .into_iter()
        .map(|t| t.link.target)
        .collect()
}

/// Replace every wikilink token with the string returned by `f`.
/// Tokens for which `f` returns `None` are left as written.
pub fn rewrite<F>(content: &str, mut f: F) -> String
where
    F: FnMut(&WikiLinkToken) -> Option<String>,
{
    let replacements = extract(content)
        .iter()
        .filter_map(|token| f(token).map(|text| (token.span(), text)))
        .collect();
    splice(content, replacements)
}

/// Re-export commonly used items
pub mod prelude {
    pub use crate::engine::{BlockRef, ParseEngine, ScanResult, WikiLinkToken};
    pub use crate::parsers::{CalloutHeader, parse_callout_header, split_frontmatter};
    pub use crate::{extract, find_block_refs, link_targets, rewrite};
}
