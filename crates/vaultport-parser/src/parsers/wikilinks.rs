//! Wikilink field parsing: `[[target#header^block|alias]]`.
//!
//! Splitting order matters: the alias is cut at the first `|`, then the
//! block id at the last `^`, then the header at the first `#`. This keeps
//! `|` and `#` usable inside aliases.

use regex::Regex;
use std::sync::LazyLock;
use vaultport_core::WikiLink;

/// Wikilink or embed on a single line: `[[inner]]` / `![[inner]]`
pub(crate) static WIKILINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(!?)\[\[([^\[\]\n]*)\]\]").unwrap());

#[inline]
pub(crate) fn has_wikilink(content: &str) -> bool {
    content.contains("[[")
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// Parse the text between `[[` and `]]`.
///
/// Returns `None` when the target is empty after trimming; such tokens are
/// left in the document as literal text.
pub fn parse_wikilink(raw: &str, inner: &str, is_embed: bool) -> Option<WikiLink> {
    let (rest, alias) = match inner.split_once('|') {
        Some((rest, alias)) => (rest, non_empty(alias)),
        None => (inner, None),
    };

    // `\|` is how a pipe is escaped inside tables
    let rest = rest.strip_suffix('\\').unwrap_or(rest);

    let (rest, block_id) = match rest.rsplit_once('^') {
        Some((rest, block)) => (rest, non_empty(block)),
        None => (rest, None),
    };

    let (target, header) = match rest.split_once('#') {
        Some((target, header)) => (target, non_empty(header)),
        None => (rest, None),
    };

    let target = non_empty(target)?;

    Some(WikiLink {
        raw: raw.to_string(),
        target,
        alias,
        header,
        block_id,
        is_embed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(inner: &str) -> WikiLink {
        parse_wikilink(&format!("[[{}]]", inner), inner, false).unwrap()
    }

    #[test]
    fn test_plain() {
        let link = parse("Note");
        assert_eq!(link.target, "Note");
        assert_eq!(link.alias, None);
        assert_eq!(link.header, None);
        assert_eq!(link.block_id, None);
        assert!(!link.is_embed);
    }

    #[test]
    fn test_alias() {
        let link = parse("Note|Shown");
        assert_eq!(link.target, "Note");
        assert_eq!(link.alias.as_deref(), Some("Shown"));
        assert_eq!(link.header, None);
        assert_eq!(link.block_id, None);
    }

    #[test]
    fn test_header() {
        let link = parse("Note#Section Two");
        assert_eq!(link.target, "Note");
        assert_eq!(link.header.as_deref(), Some("Section Two"));
        assert_eq!(link.alias, None);
        assert_eq!(link.block_id, None);
    }

    #[test]
    fn test_block() {
        let link = parse("Note^abc-123");
        assert_eq!(link.target, "Note");
        assert_eq!(link.block_id.as_deref(), Some("abc-123"));
        assert_eq!(link.header, None);
        assert_eq!(link.alias, None);
    }

    #[test]
    fn test_header_and_alias() {
        let link = parse("Note#Header|Alias");
        assert_eq!(link.target, "Note");
        assert_eq!(link.header.as_deref(), Some("Header"));
        assert_eq!(link.alias.as_deref(), Some("Alias"));
        assert_eq!(link.block_id, None);
    }

    #[test]
    fn test_all_fields() {
        let link = parse(" folder/Note # Header ^ blk | My Alias ");
        assert_eq!(link.target, "folder/Note");
        assert_eq!(link.header.as_deref(), Some("Header"));
        assert_eq!(link.block_id.as_deref(), Some("blk"));
        assert_eq!(link.alias.as_deref(), Some("My Alias"));
    }

    #[test]
    fn test_embed_flag() {
        let link = parse_wikilink("![[image.png]]", "image.png", true).unwrap();
        assert!(link.is_embed);
        assert_eq!(link.target, "image.png");
        assert_eq!(link.raw, "![[image.png]]");
    }

    #[test]
    fn test_empty_target_rejected() {
        assert!(parse_wikilink("[[]]", "", false).is_none());
        assert!(parse_wikilink("[[  ]]", "  ", false).is_none());
        assert!(parse_wikilink("[[#Heading]]", "#Heading", false).is_none());
    }

    #[test]
    fn test_escaped_pipe_in_table() {
        let link = parse("Note\\|Alias");
        assert_eq!(link.target, "Note");
        assert_eq!(link.alias.as_deref(), Some("Alias"));
    }

    #[test]
    fn test_empty_alias_is_none() {
        let link = parse("Note|");
        assert_eq!(link.alias, None);
    }
}
