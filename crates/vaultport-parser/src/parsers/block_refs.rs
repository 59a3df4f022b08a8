//! Block reference markers: a trailing `^block-id` at the end of a line.

use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

/// `^id` preceded by whitespace or the line start and followed only by whitespace
static BLOCK_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?mR)(?:^|[ \t]+)\^([A-Za-z0-9_-]+)[ \t]*$").unwrap());

#[inline]
pub(crate) fn has_block_ref(content: &str) -> bool {
    content.contains('^')
}

/// All `(marker span, id)` pairs in document order. The span covers the
/// whitespace before the caret so removing it leaves no trailing blanks.
pub(crate) fn block_ref_candidates(content: &str) -> Vec<(Range<usize>, String)> {
    if !has_block_ref(content) {
        return Vec::new();
    }

    BLOCK_REF
        .captures_iter(content)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let id = caps.get(1)?.as_str().to_string();
            Some((whole.range(), id))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_marker() {
        let content = "Some paragraph text ^abc123\nNext line";
        let refs = block_ref_candidates(content);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].1, "abc123");
        assert_eq!(&content[refs[0].0.clone()], " ^abc123");
    }

    #[test]
    fn test_marker_on_own_line() {
        let refs = block_ref_candidates("- item\n\n^list-id\n");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].1, "list-id");
    }

    #[test]
    fn test_caret_inside_text_ignored() {
        assert!(block_ref_candidates("2^10 is 1024").is_empty());
        assert!(block_ref_candidates("x^2").is_empty());
        assert!(block_ref_candidates("see ^ref and more").is_empty());
    }

    #[test]
    fn test_crlf_line_endings() {
        let refs = block_ref_candidates("Para ^id1\r\nNext\r\n");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].1, "id1");
    }
}
