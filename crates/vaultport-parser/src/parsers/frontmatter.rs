//! Frontmatter extraction: `---\nYAML\n---`
//!
//! The YAML itself is treated as an opaque key-value map once parsed.

use regex::Regex;
use std::sync::LazyLock;
use vaultport_core::{Error, Metadata, Result};

/// Matches YAML frontmatter at the very start of a document
static FRONTMATTER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^---[ \t]*\r?\n(?:([\s\S]*?)\r?\n)?---[ \t]*(?:\r?\n|$)").unwrap());

/// Split a document into its frontmatter source and body.
///
/// Returns `(None, content)` when the document has no frontmatter block.
pub fn split_frontmatter(content: &str) -> (Option<&str>, &str) {
    match FRONTMATTER_PATTERN.captures(content) {
        Some(caps) => {
            let yaml = caps.get(1).map(|m| m.as_str()).unwrap_or("");
            let end = caps.get(0).map(|m| m.end()).unwrap_or(0);
            (Some(yaml), &content[end..])
        }
        None => (None, content),
    }
}

/// Parse frontmatter YAML into a metadata map.
///
/// An empty block yields an empty map. YAML that is not a mapping at the
/// top level is a parse error.
pub fn parse_frontmatter(yaml: &str) -> Result<Metadata> {
    if yaml.trim().is_empty() {
        return Ok(Metadata::new());
    }

    let value: serde_json::Value = serde_yaml::from_str(yaml)
        .map_err(|e| Error::parse_error(format!("Invalid frontmatter YAML: {}", e)))?;

    match value {
        serde_json::Value::Object(map) => Ok(map),
        serde_json::Value::Null => Ok(Metadata::new()),
        other => Err(Error::parse_error(format!(
            "Frontmatter must be a mapping, found {}",
            json_type_name(&other)
        ))),
    }
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "sequence",
        serde_json::Value::Object(_) => "mapping",
    }
}
