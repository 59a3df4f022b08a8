//! Callout kinds: `> [!note]`, `> [!warning]-`, and so on.
//!
//! Obsidian accepts any identifier after `[!`. Known identifiers map onto
//! a family with an icon; everything else is kept verbatim as a custom kind
//! and rendered with the generic fallback.

use serde::{Deserialize, Serialize};

/// Known callout families. Aliases share a family and its icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalloutFamily {
    Note,
    Abstract,
    Info,
    Todo,
    Tip,
    Success,
    Question,
    Warning,
    Failure,
    Danger,
    Bug,
    Example,
    Quote,
}

impl CalloutFamily {
    /// Map a lowercase identifier onto its family.
    pub fn from_identifier(identifier: &str) -> Option<Self> {
        let family = match identifier {
            "note" => Self::Note,
            "abstract" | "summary" | "tldr" => Self::Abstract,
            "info" => Self::Info,
            "todo" => Self::Todo,
            "tip" | "hint" | "important" => Self::Tip,
            "success" | "check" | "done" => Self::Success,
            "question" | "help" | "faq" => Self::Question,
            "warning" | "caution" | "attention" => Self::Warning,
            "failure" | "fail" | "missing" => Self::Failure,
            "danger" | "error" => Self::Danger,
            "bug" => Self::Bug,
            "example" => Self::Example,
            "quote" | "cite" => Self::Quote,
            _ => return None,
        };
        Some(family)
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Self::Note => "📝",
            Self::Abstract => "📄",
            Self::Info => "ℹ️",
            Self::Todo => "✅",
            Self::Tip => "💡",
            Self::Success => "✅",
            Self::Question => "❓",
            Self::Warning => "⚠️",
            Self::Failure => "❌",
            Self::Danger => "⚡",
            Self::Bug => "🐛",
            Self::Example => "📋",
            Self::Quote => "💬",
        }
    }
}

/// The type written in a callout header.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CalloutKind {
    /// Identifier as written, lowercased
    pub identifier: String,
    /// `None` for custom identifiers
    pub family: Option<CalloutFamily>,
}

impl CalloutKind {
    pub fn parse(identifier: &str) -> Self {
        let identifier = identifier.trim().to_lowercase();
        let family = CalloutFamily::from_identifier(&identifier);
        Self { identifier, family }
    }

    pub fn is_known(&self) -> bool {
        self.family.is_some()
    }

    pub fn emoji(&self) -> Option<&'static str> {
        self.family.map(|f| f.emoji())
    }

    /// Default label: `tldr` becomes `TL;DR`, `faq` becomes `FAQ`,
    /// anything else is title-cased per word (`custom-type` becomes `Custom-Type`).
    pub fn label(&self) -> String {
        match self.identifier.as_str() {
            "tldr" => "TL;DR".to_string(),
            "faq" => "FAQ".to_string(),
            other => title_case(other),
        }
    }

    /// The callout's own title when it has one, else the default label.
    pub fn display_label(&self, title: Option<&str>) -> String {
        title
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| self.label())
    }

    /// Header text: `📝 **Note:**`, `💡 **My title:**`, or `**Custom-Type:**`.
    pub fn header_markdown(&self, title: Option<&str>) -> String {
        let label = self.display_label(title);
        match self.emoji() {
            Some(emoji) => format!("{} **{}:**", emoji, label),
            None => format!("**{}:**", label),
        }
    }
}

fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if c.is_alphanumeric() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.push(c);
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aliases_share_family() {
        assert_eq!(CalloutKind::parse("TLDR").family, Some(CalloutFamily::Abstract));
        assert_eq!(CalloutKind::parse("cite").family, Some(CalloutFamily::Quote));
        assert_eq!(CalloutKind::parse("error").emoji(), Some("⚡"));
    }

    #[test]
    fn test_custom_kind() {
        let kind = CalloutKind::parse("custom-type");
        assert!(!kind.is_known());
        assert_eq!(kind.label(), "Custom-Type");
        assert_eq!(kind.header_markdown(None), "**Custom-Type:**");
    }

    #[test]
    fn test_header_markdown() {
        assert_eq!(CalloutKind::parse("note").header_markdown(None), "📝 **Note:**");
        assert_eq!(CalloutKind::parse("faq").header_markdown(None), "❓ **FAQ:**");
        assert_eq!(
            CalloutKind::parse("tip").header_markdown(Some("Shortcut")),
            "💡 **Shortcut:**"
        );
    }
}
