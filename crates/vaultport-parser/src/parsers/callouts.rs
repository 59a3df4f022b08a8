//! Callout header parser: `> [!NOTE]`, `> [!tip]- Title`, `[!custom-type]`.
//!
//! The callout type is an open-ended identifier. Known identifiers map onto
//! a [`CalloutFamily`](vaultport_core::CalloutFamily); unknown ones are kept
//! as custom kinds.

use regex::Regex;
use std::sync::LazyLock;
use vaultport_core::CalloutKind;

/// Matches a callout header, with or without the leading `>`
static CALLOUT_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:>\s*)?\[!([\w-]+)\]([+-]?)[ \t]*(.*?)\s*$").unwrap());

/// Parsed first line of a callout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalloutHeader {
    pub kind: CalloutKind,
    /// `Some(true)` for `-` (collapsed), `Some(false)` for `+` (expanded)
    pub folded: Option<bool>,
    pub title: Option<String>,
}

/// Fast pre-filter: skip regex if no callout marker exists.
#[inline]
pub fn has_callout(content: &str) -> bool {
    content.contains("[!")
}

/// Parse a single line as a callout header.
pub fn parse_callout_header(line: &str) -> Option<CalloutHeader> {
    if !has_callout(line) {
        return None;
    }

    let caps = CALLOUT_HEADER.captures(line)?;
    let kind = CalloutKind::parse(caps.get(1)?.as_str());
    let folded = match caps.get(2).map(|m| m.as_str()) {
        Some("-") => Some(true),
        Some("+") => Some(false),
        _ => None,
    };
    let title = caps
        .get(3)
        .map(|m| m.as_str().trim())
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    Some(CalloutHeader {
        kind,
        folded,
        title,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use vaultport_core::CalloutFamily;

    #[test]
    fn test_basic_header() {
        let header = parse_callout_header("> [!NOTE]").unwrap();
        assert_eq!(header.kind.family, Some(CalloutFamily::Note));
        assert_eq!(header.folded, None);
        assert_eq!(header.title, None);
    }

    #[test]
    fn test_fold_and_title() {
        let header = parse_callout_header("> [!warning]- Careful here").unwrap();
        assert_eq!(header.kind.identifier, "warning");
        assert_eq!(header.folded, Some(true));
        assert_eq!(header.title.as_deref(), Some("Careful here"));

        let header = parse_callout_header("[!tip]+").unwrap();
        assert_eq!(header.folded, Some(false));
    }

    #[test]
    fn test_custom_type_with_hyphen() {
        let header = parse_callout_header("> [!custom-type]").unwrap();
        assert_eq!(header.kind.identifier, "custom-type");
        assert!(!header.kind.is_known());
    }

    #[test]
    fn test_not_a_callout() {
        assert!(parse_callout_header("> plain quote").is_none());
        assert!(parse_callout_header("text [!note] later").is_none());
    }
}
